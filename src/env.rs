use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// The shell's view of its environment: the key→string lookup service used for the
/// prompt variable and `HOME`.
///
/// The environment contains:
/// - `vars`: a snapshot of environment variables taken at startup.
/// - `current_dir`: the working directory as last set by `cd`.
/// - `should_exit`: set by the `exit` builtin; the interactive loop stops when it sees it.
///
/// Lookups only consult `vars`, never the live process environment, so tests can
/// hand in exactly the variables they want.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory.
    pub current_dir: PathBuf,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn from_process() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: stdenv::vars().collect(),
            current_dir,
            should_exit: false,
        }
    }

    /// An environment holding only the given variables.
    pub fn with_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            current_dir: stdenv::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn remove_var(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }
}
