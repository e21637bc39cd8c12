use nix::errno::Errno;
use nix::unistd::Pid;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ShellError>;

/// Everything that can go wrong while the shell handles a line or sets itself up.
///
/// Only [`ShellError::ProcessGroup`] and [`ShellError::Terminal`] raised by
/// [`Session::init`](crate::Session::init) are fatal; every other variant is
/// reported and the interactive loop moves on to the next line.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The line-input provider handed over no line at all.
    #[error("no input line to parse")]
    NoInput,

    /// `cd` was called without a target and `HOME` is not set.
    #[error("cd: HOME environment variable not set")]
    HomeNotSet,

    /// The directory change itself failed.
    #[error("cd: {}: {}", .path.display(), .source)]
    ChangeDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An argument can't be handed to `execvp` because it contains a NUL byte.
    #[error("{0:?}: argument contains a NUL byte")]
    InteriorNul(String),

    #[error("fork failed: {0}")]
    Fork(#[source] Errno),

    #[error("waitpid failed for {pid}: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: Errno,
    },

    #[error("couldn't put the shell in its own process group: {0}")]
    ProcessGroup(#[source] Errno),

    #[error("terminal control failed: {0}")]
    Terminal(#[source] Errno),

    #[error("can't open the controlling terminal: {0}")]
    TerminalOpen(#[source] std::io::Error),
}
