use crate::config::ShellConfig;
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::terminal::{Terminal, Tty};
use nix::sys::signal::{SigHandler, Signal, killpg, signal};
use nix::unistd::{Pid, getpgrp, getpid, setpgid};
use tracing::{debug, info, warn};

/// Signals an interactive shell ignores and its children put back to default.
pub(crate) const JOB_CONTROL_SIGNALS: [Signal; 5] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

/// Everything the shell owns for its whole lifetime.
///
/// Created once by [`Session::init`] before any command runs and passed by reference
/// to the dispatcher and the launcher. While no command is running, `pgid` is the
/// terminal's foreground group.
pub struct Session {
    terminal: Box<dyn Terminal>,
    interactive: bool,
    pgid: Pid,
    prompt: String,
}

impl Session {
    /// Set up a session on the terminal behind standard input.
    ///
    /// Blocks until the shell is in the foreground when started under another
    /// shell's job control. Errors are fatal: the caller should print them and exit.
    pub fn init(config: &ShellConfig, env: &Environment) -> Result<Self> {
        let terminal = Tty::stdin().map_err(ShellError::TerminalOpen)?;
        Self::init_with(Box::new(terminal), config, env)
    }

    pub fn init_with(
        mut terminal: Box<dyn Terminal>,
        config: &ShellConfig,
        env: &Environment,
    ) -> Result<Self> {
        let interactive = terminal.is_interactive();
        let pgid = if interactive {
            take_terminal(terminal.as_mut())?
        } else {
            getpgrp()
        };
        let prompt = get_prompt(env, config);
        info!(interactive, pgid = pgid.as_raw(), "shell session initialized");
        Ok(Self::from_parts(terminal, interactive, pgid, prompt))
    }

    pub(crate) fn from_parts(
        terminal: Box<dyn Terminal>,
        interactive: bool,
        pgid: Pid,
        prompt: String,
    ) -> Self {
        Self {
            terminal,
            interactive,
            pgid,
            prompt,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The shell's own process group.
    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn terminal(&self) -> &dyn Terminal {
        self.terminal.as_ref()
    }

    /// Release what the session holds and put the terminal modes back.
    ///
    /// Does not exit the process.
    pub fn teardown(self) {
        if self.interactive {
            if let Err(e) = self.terminal.restore_modes() {
                warn!(error = %e, "failed to restore terminal modes");
            }
        }
        debug!("shell session torn down");
    }
}

/// The prompt named by the configured variable, or the default prompt.
pub fn get_prompt(env: &Environment, config: &ShellConfig) -> String {
    env.get_var(&config.prompt_var)
        .unwrap_or_else(|| config.default_prompt.clone())
}

/// Wait for the foreground, then move into our own group and claim the terminal.
fn take_terminal(terminal: &mut dyn Terminal) -> Result<Pid> {
    loop {
        let pgrp = getpgrp();
        if terminal.foreground_group().map_err(ShellError::Terminal)? == pgrp {
            break;
        }
        debug!(pgrp = pgrp.as_raw(), "not in the foreground, stopping until we are");
        killpg(pgrp, Signal::SIGTTIN).map_err(ShellError::Terminal)?;
    }

    for sig in JOB_CONTROL_SIGNALS {
        // SAFETY: SIG_IGN installs no handler code.
        unsafe { signal(sig, SigHandler::SigIgn) }.map_err(ShellError::Terminal)?;
    }

    // A session leader already leads its group and isn't allowed to call setpgid.
    let pid = getpid();
    if getpgrp() != pid {
        setpgid(pid, pid).map_err(ShellError::ProcessGroup)?;
    }

    terminal
        .set_foreground_group(pid)
        .map_err(ShellError::Terminal)?;
    terminal.save_modes().map_err(ShellError::Terminal)?;
    Ok(pid)
}
