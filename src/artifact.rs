//! The compiled constants file.
//!
//! An artifact is a small line-oriented program: a preamble marker followed by
//! one `define` statement per constant, in definition order.
//!
//! ```text
//! #!dotconst v1
//! define BASE_PATH = "/srv/app";
//! define APP_ENV = env("APP_ENV", "testing");
//! define TEST_INT = 123;
//! define NESTED = STORAGE_PATH;
//! define NESTEDSUB = concat(NESTED, "/test");
//! ```
//!
//! Expressions are deliberately tiny:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `null`, `true`, `123`, `1.5`, `"text"` | JSON literal, type preserved |
//! | `env("NAME")` | environment variable, `null` when unset |
//! | `env("NAME", "default")` | environment variable, `default` when unset |
//! | `IDENT` | constant defined earlier in the file, else in the namespace |
//! | `const("NAME")` | the same, for names that are not plain identifiers |
//! | `concat(<expr>, "suffix")` | string concatenation |
//!
//! A constant name after `define` is likewise written bare when it is a plain
//! ASCII identifier and as a quoted string otherwise (`define "DB-HOST" = ...;`).
//!
//! `env(...)` is evaluated when the artifact is loaded, not when it is
//! compiled, so a compiled file behaves the same in every environment.

use std::fmt;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::constants::Constants;
use crate::env::Environment;
use crate::error::DotconstError;
use crate::types::{FlatConfig, Scalar};

/// First line of every compiled constants file.
pub const PREAMBLE: &str = "#!dotconst v1";

/// An expression computing a constant's value at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Scalar),
    Env { name: String, default: Option<String> },
    Const(String),
    Concat(Box<Expr>, String),
}

/// What an expression can see while it is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub env: &'a Environment,
    pub constants: &'a Constants,
    /// Values defined earlier in the same pass. Checked before `constants`.
    pub defined: &'a FlatConfig,
}

impl Expr {
    /// Wrap in `concat(...)` unless `suffix` is empty.
    pub fn with_suffix(self, suffix: &str) -> Expr {
        if suffix.is_empty() {
            self
        } else {
            Expr::Concat(Box::new(self), suffix.to_string())
        }
    }

    pub fn evaluate(&self, scope: &Scope<'_>) -> Result<Scalar, DotconstError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Env { name, default } => Ok(match scope.env.get(name) {
                Some(value) => Scalar::from(value),
                None => default.clone().map_or(Scalar::Null, Scalar::String),
            }),
            Expr::Const(name) => scope
                .defined
                .get(name)
                .or_else(|| scope.constants.get(name))
                .cloned()
                .ok_or_else(|| DotconstError::UndefinedConstant(name.clone())),
            Expr::Concat(head, suffix) => Ok(head.evaluate(scope)?.concat(suffix)),
        }
    }
}

fn quoted(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Words the expression grammar gives a meaning of its own.
const KEYWORDS: &[&str] = &["define", "null", "true", "false", "env", "const", "concat"];

/// Whether `name` can be written without quotes and read back unchanged.
fn is_bare_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&name)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value.to_json()),
            Expr::Env {
                name,
                default: None,
            } => write!(f, "env({})", quoted(name)),
            Expr::Env {
                name,
                default: Some(default),
            } => write!(f, "env({}, {})", quoted(name), quoted(default)),
            Expr::Const(name) if is_bare_name(name) => write!(f, "{name}"),
            Expr::Const(name) => write!(f, "const({})", quoted(name)),
            Expr::Concat(head, suffix) => write!(f, "concat({head}, {})", quoted(suffix)),
        }
    }
}

/// One `define NAME = <expr>;` line.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub name: String,
    pub expr: Expr,
}

impl Statement {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_bare_name(&self.name) {
            write!(f, "define {} = {};", self.name, self.expr)
        } else {
            write!(f, "define {} = {};", quoted(&self.name), self.expr)
        }
    }
}

/// A parsed or freshly compiled constants file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifact {
    pub statements: Vec<Statement>,
}

impl Artifact {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Parse artifact text. Errors carry the 1-based line and a reason.
    pub fn parse(content: &str) -> Result<Artifact, (usize, String)> {
        let mut lines = content.lines().enumerate();

        match lines.next() {
            Some((_, first)) if first.trim_end() == PREAMBLE => {}
            _ => return Err((1, format!("missing '{PREAMBLE}' preamble"))),
        }

        let mut statements = Vec::new();
        for (idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let statement = parse_statement(line).map_err(|reason| (idx + 1, reason))?;
            statements.push(statement);
        }
        Ok(Artifact { statements })
    }

    /// Read and parse an artifact from disk.
    pub fn read(path: &Path) -> Result<Artifact, DotconstError> {
        let content = std::fs::read_to_string(path).map_err(|e| DotconstError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Artifact::parse(&content).map_err(|(line, reason)| DotconstError::InvalidArtifact {
            path: path.to_path_buf(),
            line,
            reason,
        })
    }

    /// Write the artifact atomically: the content goes to a temp file in the
    /// target directory, which is then renamed over `path`.
    pub fn write(&self, path: &Path) -> Result<(), DotconstError> {
        let write_err = |e: std::io::Error| DotconstError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        temp.write_all(self.to_string().as_bytes())
            .map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(path).map_err(|e| write_err(e.error))?;

        debug!(path = %path.display(), statements = self.statements.len(), "wrote compiled constants");
        Ok(())
    }

    /// Evaluate every statement in order, each seeing the ones before it.
    pub fn evaluate(
        &self,
        env: &Environment,
        constants: &Constants,
    ) -> Result<FlatConfig, DotconstError> {
        let mut defined = FlatConfig::new();
        for statement in &self.statements {
            let value = statement.expr.evaluate(&Scope {
                env,
                constants,
                defined: &defined,
            })?;
            defined.insert(statement.name.clone(), value);
        }
        Ok(defined)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{PREAMBLE}")?;
        for statement in &self.statements {
            writeln!(f, "{statement}")?;
        }
        Ok(())
    }
}

// --- Parsing ---

fn parse_statement(line: &str) -> Result<Statement, String> {
    let mut cursor = Cursor::new(line.trim());
    if !cursor.eat_keyword("define") {
        return Err("expected 'define'".into());
    }
    let name = cursor.name()?;
    cursor.expect('=')?;
    let expr = cursor.expr()?;
    cursor.expect(';')?;
    cursor.skip_ws();
    if !cursor.at_end() {
        return Err(format!("unexpected text after ';': {}", cursor.rest()));
    }
    Ok(Statement { name, expr })
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(format!("expected '{c}' at: {}", self.rest()))
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let start = self.pos;
        match self.ident() {
            Some(word) if word == keyword => true,
            _ => {
                self.pos = start;
                false
            }
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
            _ => return None,
        }
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        Some(&self.src[start..self.pos])
    }

    /// A constant name: a bare identifier or a quoted string.
    fn name(&mut self) -> Result<String, String> {
        self.skip_ws();
        if self.peek() == Some(b'"') {
            return self.string();
        }
        self.ident()
            .map(str::to_string)
            .ok_or_else(|| "expected constant name after 'define'".to_string())
    }

    fn string(&mut self) -> Result<String, String> {
        self.skip_ws();
        if self.peek() != Some(b'"') {
            return Err(format!("expected string at: {}", self.rest()));
        }
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let mut i = start + 1;
        loop {
            match bytes.get(i) {
                Some(b'\\') => i += 2,
                Some(b'"') => break,
                Some(_) => i += 1,
                None => return Err("unterminated string".into()),
            }
        }
        self.pos = i + 1;
        serde_json::from_str(&self.src[start..self.pos]).map_err(|e| e.to_string())
    }

    fn number(&mut self) -> Result<Scalar, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
        {
            self.pos += 1;
        }
        let token = &self.src[start..self.pos];
        if let Ok(i) = token.parse::<i64>() {
            return Ok(Scalar::Integer(i));
        }
        token
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Scalar::Float)
            .ok_or_else(|| format!("invalid number literal: {token}"))
    }

    fn call_args_open(&mut self) -> bool {
        self.skip_ws();
        self.peek() == Some(b'(')
    }

    fn expr(&mut self) -> Result<Expr, String> {
        self.skip_ws();
        match self.peek() {
            Some(b'"') => return Ok(Expr::Literal(Scalar::String(self.string()?))),
            Some(b) if b == b'-' || b.is_ascii_digit() => return Ok(Expr::Literal(self.number()?)),
            _ => {}
        }

        let word = self
            .ident()
            .ok_or_else(|| format!("expected expression at: {}", self.rest()))?;
        match word {
            "null" => Ok(Expr::Literal(Scalar::Null)),
            "true" => Ok(Expr::Literal(Scalar::Bool(true))),
            "false" => Ok(Expr::Literal(Scalar::Bool(false))),
            "env" if self.call_args_open() => {
                self.expect('(')?;
                let name = self.string()?;
                let default = if self.eat(',') {
                    Some(self.string()?)
                } else {
                    None
                };
                self.expect(')')?;
                Ok(Expr::Env { name, default })
            }
            "const" if self.call_args_open() => {
                self.expect('(')?;
                let name = self.string()?;
                self.expect(')')?;
                Ok(Expr::Const(name))
            }
            "concat" if self.call_args_open() => {
                self.expect('(')?;
                let head = self.expr()?;
                self.expect(',')?;
                let suffix = self.string()?;
                self.expect(')')?;
                Ok(Expr::Concat(Box::new(head), suffix))
            }
            name => Ok(Expr::Const(name.to_string())),
        }
    }
}
