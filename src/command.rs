use crate::error::{Result, ShellError};
use std::ffi::CString;
use std::ops::Index;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Status a child reports when its program image could not be replaced.
pub const EXEC_FAILURE: ExitCode = 127;

/// One parsed command line: `argv[0]` is the command name, the rest are its arguments.
///
/// Every token is an owned copy of the input, so the vector outlives the line it was
/// parsed from. Dropping the value releases all of it exactly once; consumers that are
/// done with a command take it by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Argv {
    args: Vec<String>,
}

impl Argv {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    /// The command name, or `None` for an empty vector.
    pub fn name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(String::as_str)
    }

    /// Convert into the NUL-terminated strings `execvp` expects.
    ///
    /// Done in the parent before forking so the child only has to exec.
    pub fn to_cstrings(&self) -> Result<Vec<CString>> {
        self.args
            .iter()
            .map(|a| CString::new(a.as_bytes()).map_err(|_| ShellError::InteriorNul(a.clone())))
            .collect()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.args
    }
}

impl Index<usize> for Argv {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.args[index]
    }
}

impl From<Vec<String>> for Argv {
    fn from(args: Vec<String>) -> Self {
        Self::new(args)
    }
}

impl<'a> From<&[&'a str]> for Argv {
    fn from(args: &[&'a str]) -> Self {
        Self::new(args.iter().map(|s| s.to_string()).collect())
    }
}
