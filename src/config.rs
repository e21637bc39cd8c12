use argh::FromArgs;
use std::path::PathBuf;

/// Environment variable the prompt is read from.
pub const PROMPT_VAR: &str = "MY_PROMPT";

/// Prompt used when [`PROMPT_VAR`] is unset.
pub const DEFAULT_PROMPT: &str = "shell>";

#[derive(FromArgs, Debug, Default, PartialEq)]
/// A small interactive shell that hands the terminal to each command it runs.
pub struct Args {
    #[argh(switch, short = 'v')]
    /// print the version and exit.
    pub version: bool,

    #[argh(switch)]
    /// log at debug level unless RUST_LOG says otherwise.
    pub debug: bool,

    #[argh(option)]
    /// file to load command history from at startup and save it to on exit.
    pub history_file: Option<PathBuf>,

    #[argh(option)]
    /// keep at most this many words of a command line instead of the system ARG_MAX.
    pub max_args: Option<usize>,
}

/// Settings the session and the interactive loop are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt_var: String,
    pub default_prompt: String,
    pub history_file: Option<PathBuf>,
    /// Word cap for parsed lines; `None` means `sysconf(ARG_MAX)`.
    pub arg_max: Option<usize>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt_var: PROMPT_VAR.to_string(),
            default_prompt: DEFAULT_PROMPT.to_string(),
            history_file: None,
            arg_max: None,
        }
    }
}

impl From<&Args> for ShellConfig {
    fn from(args: &Args) -> Self {
        Self {
            history_file: args.history_file.clone(),
            arg_max: args.max_args,
            ..Self::default()
        }
    }
}

/// The string `-v` prints.
pub fn version_string() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
