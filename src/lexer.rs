//! Turning a raw input line into an argument vector.
//!
//! The line is first trimmed in place with [`trim_white`], then split by [`parse`]
//! on runs of spaces, tabs and newlines. There is no quoting, escaping or expansion:
//! every maximal run of non-separator characters becomes one argument.

use crate::command::Argv;
use crate::error::{Result, ShellError};
use nix::unistd::{SysconfVar, sysconf};

/// Used when the platform won't tell us its argument limit.
const FALLBACK_ARG_MAX: usize = 4096;

/// Characters that separate arguments.
const SEPARATORS: [char; 3] = [' ', '\t', '\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
}

struct LexingFSM<'a> {
    input: &'a str,
    limit: usize,
    state: LexingState,
    word_start: usize,
}

impl<'a> LexingFSM<'a> {
    fn new(input: &'a str, limit: usize) -> Self {
        LexingFSM {
            input,
            limit,
            state: LexingState::Start,
            word_start: 0,
        }
    }

    /// Walks the input once, copying each word out as soon as its end is seen.
    ///
    /// Stops early once `limit` words have been collected; the remainder of the
    /// line is dropped.
    fn make_args(mut self) -> Vec<String> {
        let mut out = Vec::new();

        for (pos, ch) in self.input.char_indices() {
            if out.len() >= self.limit {
                return out;
            }
            let is_separator = SEPARATORS.contains(&ch);
            match (self.state, is_separator) {
                (LexingState::Start, false) => {
                    self.word_start = pos;
                    self.state = LexingState::ReadingWord;
                }
                (LexingState::ReadingWord, true) => {
                    out.push(self.input[self.word_start..pos].to_string());
                    self.state = LexingState::Start;
                }
                _ => {}
            }
        }

        if self.state == LexingState::ReadingWord && out.len() < self.limit {
            out.push(self.input[self.word_start..].to_string());
        }
        out
    }
}

/// The most arguments a single command line may carry on this platform.
///
/// Taken from `sysconf(_SC_ARG_MAX)`; [`FALLBACK_ARG_MAX`] when the value is
/// unavailable.
pub fn arg_max() -> usize {
    match sysconf(SysconfVar::ARG_MAX) {
        Ok(Some(n)) if n > 0 => n as usize,
        _ => FALLBACK_ARG_MAX,
    }
}

/// Split `line` into an argument vector, keeping at most [`arg_max`] arguments.
///
/// Returns [`ShellError::NoInput`] when there is no line at all. An empty or
/// all-separator line yields an empty vector.
pub fn parse(line: Option<&str>) -> Result<Argv> {
    parse_with_limit(line, arg_max())
}

/// Same as [`parse`] with an explicit cap on the argument count.
///
/// Words past the cap are silently dropped.
pub fn parse_with_limit(line: Option<&str>, limit: usize) -> Result<Argv> {
    let line = line.ok_or(ShellError::NoInput)?;
    Ok(Argv::new(LexingFSM::new(line, limit).make_args()))
}

/// Strip leading and trailing whitespace from `line` without copying it.
///
/// Trailing whitespace is cut off the buffer itself; the returned slice then skips
/// the leading whitespace. An all-whitespace line comes back empty, which callers
/// treat as "no command".
pub fn trim_white(line: &mut String) -> &str {
    let end = line.trim_end().len();
    line.truncate(end);
    line.trim_start()
}
