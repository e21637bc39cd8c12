use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Where the interactive loop gets its lines from.
///
/// Implementations own the history list; the loop calls [`LineInput::record`] only
/// for lines that actually name a command.
pub trait LineInput {
    /// Read one line, or `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Remember `line` in the history.
    fn record(&mut self, line: &str);

    /// Called once when the loop is done, e.g. to persist history.
    fn close(&mut self) {}
}

/// Line editing and history backed by `rustyline`.
pub struct RustylineInput {
    editor: DefaultEditor,
    history_file: Option<PathBuf>,
}

impl RustylineInput {
    /// Create an editor, loading `history_file` if it exists.
    pub fn new(history_file: Option<PathBuf>) -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &history_file {
            match editor.load_history(path) {
                Ok(()) => debug!(path = %path.display(), "loaded history"),
                Err(ReadlineError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to load history"),
            }
        }
        Ok(Self {
            editor,
            history_file,
        })
    }
}

impl LineInput for RustylineInput {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            // ^C at the prompt abandons the line, like any other shell.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    fn record(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            warn!(error = %e, "failed to add history entry");
        }
    }

    fn close(&mut self) {
        if let Some(path) = &self.history_file {
            if let Err(e) = self.editor.save_history(path) {
                warn!(path = %path.display(), error = %e, "failed to save history");
            }
        }
    }
}

/// Feeds a fixed list of lines and keeps the recorded history in memory.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    /// Every line passed to [`LineInput::record`], in order.
    pub history: Vec<String>,
    /// Prompts shown so far.
    pub prompts: Vec<String>,
    pub closed: bool,
}

impl ScriptedInput {
    pub fn new<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl LineInput for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }

    fn record(&mut self, line: &str) {
        self.history.push(line.to_string());
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
