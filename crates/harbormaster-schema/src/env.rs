use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Variables visible to `${...}` substitution.
///
/// Values from the environment file win over the process environment. Both maps are
/// captured up front so substitution stays a pure function of this value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    file: BTreeMap<String, String>,
    process: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// File variables from `env_file` (missing file = none) over the current process environment.
    pub fn load(env_file: Option<&Path>) -> std::io::Result<Self> {
        let file = match env_file {
            Some(path) if path.is_file() => parse_env_file(&fs::read_to_string(path)?),
            _ => BTreeMap::new(),
        };
        Ok(Self {
            file,
            process: std::env::vars().collect(),
        })
    }

    #[must_use]
    pub fn with_file_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.file = vars;
        self
    }

    #[must_use]
    pub fn with_process_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.process = vars;
        self
    }

    #[must_use]
    pub fn set_file_var(mut self, key: &str, value: &str) -> Self {
        self.file.insert(key.to_owned(), value.to_owned());
        self
    }

    #[must_use]
    pub fn set_process_var(mut self, key: &str, value: &str) -> Self {
        self.process.insert(key.to_owned(), value.to_owned());
        self
    }

    /// File value, then process value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.file
            .get(key)
            .or_else(|| self.process.get(key))
            .map(String::as_str)
    }

    pub fn file_vars(&self) -> &BTreeMap<String, String> {
        &self.file
    }
}

/// Parse `KEY=VALUE` lines. Comments, blank lines and lines without `=` are skipped;
/// an `export ` prefix and matching surrounding quotes are removed.
pub fn parse_env_file(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_owned(), strip_quotes(value.trim()).to_owned());
    }
    vars
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
