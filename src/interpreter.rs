use crate::builtin::Builtins;
use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::run_external;
use crate::io_adapters::LineInput;
use crate::lexer;
use crate::session::Session;
use anyhow::Context;
use tracing::{debug, error};

/// What happened to one line of input.
#[derive(Debug)]
pub enum Outcome {
    /// The line was empty after trimming; nothing was recorded or run.
    Blank,
    /// A builtin handled the line.
    Builtin,
    /// An external command ran and exited with this code.
    External(ExitCode),
    /// The line couldn't be run; the error has already been reported.
    Failed(ShellError),
}

/// The interactive loop: read a line, trim it, split it, then hand it to a builtin
/// or launch it.
///
/// Example
/// ```no_run
/// use pgsh::{Environment, Interpreter, RustylineInput, Session, ShellConfig};
/// let config = ShellConfig::default();
/// let env = Environment::from_process();
/// let session = Session::init(&config, &env).unwrap();
/// let input = RustylineInput::new(None).unwrap();
/// let mut sh = Interpreter::new(session, env, Box::new(input));
/// sh.repl().unwrap();
/// sh.finish();
/// ```
pub struct Interpreter {
    session: Session,
    env: Environment,
    builtins: Builtins,
    input: Box<dyn LineInput>,
    arg_limit: usize,
}

impl Interpreter {
    pub fn new(session: Session, env: Environment, input: Box<dyn LineInput>) -> Self {
        Self {
            session,
            env,
            builtins: Builtins::default(),
            input,
            arg_limit: lexer::arg_max(),
        }
    }

    /// Keep at most `limit` words of each line instead of the system's ARG_MAX.
    pub fn with_arg_limit(mut self, limit: usize) -> Self {
        self.arg_limit = limit;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Read and run lines until end of input or `exit`.
    ///
    /// Errors from individual commands are reported and the loop carries on; only a
    /// failure of the line-input provider ends it early.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        while !self.env.should_exit {
            let line = self
                .input
                .read_line(self.session.prompt())
                .context("failed to read a line of input")?;
            let Some(mut line) = line else {
                debug!("end of input");
                break;
            };
            self.execute_line(&mut line);
        }
        Ok(())
    }

    /// Run one raw line of input.
    ///
    /// The line is trimmed in place. Blank lines stop there; anything else goes
    /// into the history before it is parsed and run.
    pub fn execute_line(&mut self, line: &mut String) -> Outcome {
        let trimmed = lexer::trim_white(line);
        if trimmed.is_empty() {
            return Outcome::Blank;
        }
        self.input.record(trimmed);

        let argv = match lexer::parse_with_limit(Some(trimmed), self.arg_limit) {
            Ok(argv) => argv,
            Err(e) => return self.report(e),
        };

        let mut stderr = std::io::stderr();
        if self
            .builtins
            .try_builtin(&mut self.session, &mut self.env, &argv, &mut stderr)
        {
            return Outcome::Builtin;
        }

        match run_external(&self.session, argv) {
            Ok(code) => Outcome::External(code),
            Err(e) => self.report(e),
        }
    }

    fn report(&self, e: ShellError) -> Outcome {
        error!(error = %e, "command failed");
        eprintln!("{}", e);
        Outcome::Failed(e)
    }

    /// Persist history and tear the session down.
    pub fn finish(mut self) {
        self.input.close();
        self.session.teardown();
    }
}
