use std::collections::HashMap;

/// A snapshot of environment variables used by `php/env` lookups and by
/// `env(...)` expressions in compiled constants.
///
/// Built from the process with [`Environment::from_process`], or from
/// synthetic pairs so tests never have to mutate the real environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// An environment where every variable is unset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the current process environment. Variables whose name or
    /// value is not valid unicode are skipped.
    pub fn from_process() -> Self {
        Self::from_pairs(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, v.into_string().ok()?))
        }))
    }

    /// Build from explicit `(name, value)` pairs. Later pairs win.
    pub fn from_pairs<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a variable. Names are case-sensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}
