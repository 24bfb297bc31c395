#[cfg(test)]
pub mod test {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    /// Base file of the sample application.
    pub const BASE_INI: &str = r#"; sample application constants
base_path = @php/dir
app_env = @php/env:APP_ENV:testing
storage_path = php/dir:/storage
env_withoutdefault = php/env:DOTCONST_FIXTURE_UNSET
test_const = @php/const:INT_MAX
cache_dir = php/const:DIRECTORY_SEPARATOR@.cache

[test]
bool = true
int = 123
float = 987.5
str = "abc"
nothing = null
nested = @{storage_path}
nestedsub = @{test_nested}@/test

[database]
host = localhost
port = 5432
"#;

    /// Override applied when `APP_ENV` resolves to `testing`.
    pub const TESTING_INI: &str = "\
[test]
int = 456

[database]
host = test-db
name = fixtures
";

    /// Override applied when `APP_ENV` resolves to `production`.
    pub const PRODUCTION_INI: &str = "\
[database]
host = prod-db
";

    pub fn write_sample_app(dir: &Path) {
        fs::write(dir.join(".const.ini"), BASE_INI).unwrap();
        fs::write(dir.join(".const.testing.ini"), TESTING_INI).unwrap();
        fs::write(dir.join(".const.production.ini"), PRODUCTION_INI).unwrap();
    }

    /// A temporary directory holding the sample application.
    pub fn sample_app() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_sample_app(dir.path());
        dir
    }

    #[test]
    fn sample_app_parses() {
        let table = crate::ini::parse(BASE_INI).unwrap();
        assert_eq!(table.len(), 8);
        crate::ini::parse(TESTING_INI).unwrap();
        crate::ini::parse(PRODUCTION_INI).unwrap();
    }
}
