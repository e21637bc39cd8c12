use crate::command::Argv;
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::session::Session;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins run in-process without spawning a child. Most parse their arguments
/// with [`argh`].
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "cd" or "exit".
    fn name() -> &'static str;

    /// Build the command from the words following its name.
    fn from_words(args: &[&str]) -> std::result::Result<Self, EarlyExit>;

    /// Executes the command against the shell's session and environment.
    fn execute(self, session: &mut Session, env: &mut Environment) -> Result<()>;
}

/// Something the dispatcher can offer a command line to.
pub(crate) trait CommandFactory {
    /// Run `argv` if this factory recognizes its name.
    ///
    /// Returns whether the command was recognized, regardless of whether it
    /// succeeded; failures are written to `stderr`.
    fn try_run(
        &self,
        session: &mut Session,
        env: &mut Environment,
        argv: &Argv,
        stderr: &mut dyn Write,
    ) -> bool;
}

/// Factory for a single builtin type.
pub(crate) struct Factory<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> CommandFactory for Factory<T> {
    fn try_run(
        &self,
        session: &mut Session,
        env: &mut Environment,
        argv: &Argv,
        stderr: &mut dyn Write,
    ) -> bool {
        if argv.name() != Some(T::name()) {
            return false;
        }
        let args: Vec<&str> = argv.args().iter().map(String::as_str).collect();
        match T::from_words(&args) {
            Ok(cmd) => {
                if let Err(e) = cmd.execute(session, env) {
                    debug!(command = T::name(), error = %e, "builtin failed");
                    let _ = writeln!(stderr, "{}", e);
                }
            }
            Err(EarlyExit { output, status }) => {
                let _ = if status.is_err() {
                    write!(stderr, "{}", output)
                } else {
                    write!(std::io::stdout(), "{}", output)
                };
            }
        }
        true
    }
}

/// The set of builtins a shell dispatches to before launching anything.
pub struct Builtins {
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Builtins {
    /// Offer `argv` to each builtin in turn.
    ///
    /// Returns `false` for an empty vector or a name no builtin claims, meaning the
    /// caller should launch it as an external program. A recognized builtin always
    /// returns `true`, even if it failed.
    pub fn try_builtin(
        &self,
        session: &mut Session,
        env: &mut Environment,
        argv: &Argv,
        stderr: &mut dyn Write,
    ) -> bool {
        if argv.is_empty() {
            return false;
        }
        self.commands
            .iter()
            .any(|factory| factory.try_run(session, env, argv, stderr))
    }
}

impl Default for Builtins {
    /// The builtins this shell knows: `cd` and `exit`.
    fn default() -> Self {
        Self {
            commands: vec![
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Exit>::default()),
            ],
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    /// Every word is a path, even one starting with `-`.
    fn from_words(args: &[&str]) -> std::result::Result<Self, EarlyExit> {
        let words: Vec<&str> = std::iter::once("--").chain(args.iter().copied()).collect();
        <Cd as FromArgs>::from_args(&["cd"], &words)
    }

    fn execute(self, _session: &mut Session, env: &mut Environment) -> Result<()> {
        let target = match self.target {
            Some(t) => PathBuf::from(t),
            None => PathBuf::from(env.get_var("HOME").ok_or(ShellError::HomeNotSet)?),
        };

        env::set_current_dir(&target).map_err(|source| ShellError::ChangeDir {
            path: target.clone(),
            source,
        })?;
        env.current_dir = env::current_dir().unwrap_or(target);
        Ok(())
    }
}

/// Leave the shell. Trailing arguments are accepted and ignored.
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_words(_args: &[&str]) -> std::result::Result<Self, EarlyExit> {
        Ok(Exit)
    }

    fn execute(self, _session: &mut Session, env: &mut Environment) -> Result<()> {
        env.should_exit = true;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::terminal::fake::RecordingTerminal;
    use nix::unistd::getpgrp;
    use std::fs;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// Serialises tests that change the process working directory.
    pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn test_session() -> Session {
        let terminal = RecordingTerminal {
            interactive: false,
            ..RecordingTerminal::new()
        };
        Session::from_parts(Box::new(terminal), false, getpgrp(), "shell>".to_string())
    }

    fn dispatch(env: &mut Environment, words: &[&str]) -> (bool, String) {
        let mut session = test_session();
        let mut err = Vec::new();
        let handled = Builtins::default().try_builtin(&mut session, env, &Argv::from(words), &mut err);
        (handled, String::from_utf8(err).unwrap())
    }

    #[test]
    fn test_empty_argv_is_not_handled() {
        let mut env = Environment::default();
        let (handled, err) = dispatch(&mut env, &[]);
        assert!(!handled);
        assert!(err.is_empty());
    }

    #[test]
    fn test_unknown_command_is_not_handled() {
        let mut env = Environment::default();
        let (handled, err) = dispatch(&mut env, &["ls", "-la"]);
        assert!(!handled);
        assert!(err.is_empty());
        assert!(!env.should_exit);
    }

    #[test]
    fn test_exit_sets_flag_regardless_of_arguments() {
        for words in [&["exit"][..], &["exit", "3"], &["exit", "--help", "x"]] {
            let mut env = Environment::default();
            let (handled, err) = dispatch(&mut env, words);
            assert!(handled);
            assert!(err.is_empty());
            assert!(env.should_exit, "{:?}", words);
        }
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();

        let mut env = Environment::default();
        let target = canonical_temp.to_string_lossy().to_string();
        let (handled, err) = dispatch(&mut env, &["cd", &target]);

        assert!(handled);
        assert!(err.is_empty(), "unexpected error: {}", err);
        assert_eq!(fs::canonicalize(env::current_dir().unwrap()).unwrap(), canonical_temp);
        assert_eq!(env.current_dir, canonical_temp);

        env::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();

        let mut env = Environment::with_vars([("HOME", canonical_temp.to_string_lossy())]);
        let (handled, err) = dispatch(&mut env, &["cd"]);

        assert!(handled);
        assert!(err.is_empty(), "unexpected error: {}", err);
        assert_eq!(fs::canonicalize(env::current_dir().unwrap()).unwrap(), canonical_temp);

        env::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_without_home_reports_and_stays() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();

        let mut env = Environment::default();
        let (handled, err) = dispatch(&mut env, &["cd"]);

        assert!(handled);
        assert_eq!(err, "cd: HOME environment variable not set\n");
        assert_eq!(env::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_nonexistent_path_reports_and_stays() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();

        let mut env = Environment::default();
        let name = format!("/nonexistent_dir_for_pgsh_test_{}", std::process::id());
        let (handled, err) = dispatch(&mut env, &["cd", &name]);

        assert!(handled);
        assert!(err.starts_with(&format!("cd: {}: ", name)), "got {:?}", err);
        assert_eq!(env::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_error_is_typed() {
        let _lock = lock_current_dir();
        let mut session = test_session();
        let mut env = Environment::default();
        let cmd = Cd {
            target: Some("/nonexistent_dir_for_pgsh_typed".into()),
        };
        match cmd.execute(&mut session, &mut env) {
            Err(ShellError::ChangeDir { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent_dir_for_pgsh_typed"))
            }
            other => panic!("expected ChangeDir, got {:?}", other),
        }
    }

    #[test]
    fn test_cd_into_dash_prefixed_dir() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let base = fs::canonicalize(temp.path()).unwrap();
        for name in ["-dir", "--help"] {
            fs::create_dir(base.join(name)).unwrap();
        }

        for name in ["-dir", "--help"] {
            env::set_current_dir(&base).unwrap();
            let mut env = Environment::default();
            let (handled, err) = dispatch(&mut env, &["cd", name]);

            assert!(handled);
            assert!(err.is_empty(), "cd {}: unexpected error: {}", name, err);
            assert_eq!(
                fs::canonicalize(env::current_dir().unwrap()).unwrap(),
                base.join(name)
            );
        }

        env::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_rejects_extra_arguments() {
        let _lock = lock_current_dir();
        let orig = env::current_dir().unwrap();

        let mut env = Environment::default();
        let (handled, err) = dispatch(&mut env, &["cd", "/tmp", "/"]);

        assert!(handled);
        assert!(!err.is_empty());
        assert_eq!(env::current_dir().unwrap(), orig);
    }
}
