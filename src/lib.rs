//! A small interactive shell with job-control-aware process launching.
//!
//! Each line is trimmed, split on whitespace and either handled by a builtin
//! (`cd`, `exit`) or run as an external program. When the shell owns a terminal,
//! every external program runs in its own process group, which holds the terminal's
//! foreground for as long as the program runs, so ^C and ^Z reach the program
//! rather than the shell. The shell takes the foreground back before it reads the
//! next line.
//!
//! The main entry point is [`Interpreter`], built from a [`Session`] (the shell's
//! terminal, process group and prompt), an [`Environment`] to look variables up in,
//! and a [`LineInput`] to read lines from.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
mod error;
mod external;
mod interpreter;
mod io_adapters;
pub mod lexer;
mod session;
pub mod terminal;

pub use builtin::Builtins;
pub use command::{Argv, ExitCode};
pub use config::{Args, ShellConfig};
pub use env::Environment;
pub use error::{Result, ShellError};
pub use external::run_external;
pub use interpreter::{Interpreter, Outcome};
pub use io_adapters::{LineInput, RustylineInput, ScriptedInput};
pub use session::{Session, get_prompt};
