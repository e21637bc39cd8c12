use crate::command::{Argv, EXEC_FAILURE, ExitCode};
use crate::error::{Result, ShellError};
use crate::session::{JOB_CONTROL_SIGNALS, Session};
use nix::errno::Errno;
use nix::sys::signal::{SigHandler, Signal, kill, killpg, signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execvp, fork, getpid, setpgid, write};
use std::ffi::CString;
use tracing::{debug, warn};

/// Run an external command in the foreground and return its exit code.
///
/// When the session is interactive the child gets its own process group and the
/// terminal for as long as it runs; the shell takes the terminal back afterwards on
/// every path, including a failed wait. A child killed by a signal reports
/// `128 + signo`, one that couldn't exec reports [`EXEC_FAILURE`].
///
/// Fork failure comes back as [`ShellError::Fork`]; nothing else about the session
/// changes, so the caller can report it and carry on.
pub fn run_external(session: &Session, argv: Argv) -> Result<ExitCode> {
    let Some(name) = argv.name() else {
        return Ok(0);
    };
    let cargs = argv.to_cstrings()?;
    let prefix = format!("{}: ", name);

    // SAFETY: the child only adjusts its process group, signal dispositions and the
    // terminal before exec'ing; the exec arguments were allocated before the fork.
    match unsafe { fork() }.map_err(ShellError::Fork)? {
        ForkResult::Child => exec_child(session, &cargs, &prefix),
        ForkResult::Parent { child } => {
            debug!(pid = child.as_raw(), command = name, "launched external command");
            if session.is_interactive() {
                hand_terminal_to(session, child);
            }
            let status = wait_for(session, name, child);
            if session.is_interactive() {
                reclaim_terminal(session);
            }
            status
        }
    }
}

/// Never returns. Past the fork nothing here allocates or takes a lock: the
/// diagnostic goes straight to fd 2 and the process leaves through `_exit`.
fn exec_child(session: &Session, cargs: &[CString], prefix: &str) -> ! {
    if session.is_interactive() {
        let pid = getpid();
        let _ = setpgid(pid, pid);
        // SIGTTOU is still ignored here, so claiming the terminal from the
        // background can't stop us.
        let _ = session.terminal().set_foreground_group(pid);
        for sig in JOB_CONTROL_SIGNALS {
            // SAFETY: restoring the default disposition installs no handler code.
            let _ = unsafe { signal(sig, SigHandler::SigDfl) };
        }
    }

    let Err(err) = execvp(cargs[0].as_c_str(), cargs);
    let stderr = std::io::stderr();
    for part in [prefix, err.desc(), "\n"] {
        let _ = write(&stderr, part.as_bytes());
    }
    // SAFETY: _exit skips atexit handlers and buffered-stream flushing, which
    // belong to the parent.
    unsafe { libc::_exit(EXEC_FAILURE) }
}

/// Put the child in its own group and give that group the terminal.
///
/// The child does the same thing itself; whichever runs first wins and the other
/// call is a no-op or fails harmlessly.
fn hand_terminal_to(session: &Session, child: Pid) {
    if let Err(e) = setpgid(child, child) {
        debug!(pid = child.as_raw(), error = %e, "setpgid from parent failed");
    }
    if let Err(e) = session.terminal().set_foreground_group(child) {
        warn!(pid = child.as_raw(), error = %e, "failed to hand the terminal to the child");
    }
}

fn reclaim_terminal(session: &Session) {
    if let Err(e) = session.terminal().set_foreground_group(session.pgid()) {
        warn!(error = %e, "failed to take the terminal back");
    }
    if let Err(e) = session.terminal().restore_modes() {
        warn!(error = %e, "failed to restore terminal modes");
    }
}

/// Block until `child` exits or is killed.
///
/// A stopped child is resumed: without job control there is nothing to come back
/// to it with.
fn wait_for(session: &Session, name: &str, child: Pid) -> Result<ExitCode> {
    loop {
        match waitpid(child, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(_, code)) => {
                debug!(pid = child.as_raw(), code, "child exited");
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, sig, core_dumped)) => {
                debug!(pid = child.as_raw(), signal = %sig, core_dumped, "child killed");
                if sig != Signal::SIGINT {
                    let core = if core_dumped { " (core dumped)" } else { "" };
                    eprintln!("{}: terminated by {}{}", name, sig, core);
                }
                return Ok(terminated_by_signal(sig));
            }
            Ok(WaitStatus::Stopped(_, sig)) => {
                eprintln!("{}: stopped by {}; job control is not supported, resuming", name, sig);
                let resumed = if session.is_interactive() {
                    killpg(child, Signal::SIGCONT)
                } else {
                    kill(child, Signal::SIGCONT)
                };
                if let Err(e) = resumed {
                    warn!(pid = child.as_raw(), error = %e, "failed to resume stopped child");
                }
            }
            Ok(_) | Err(Errno::EINTR) => {}
            Err(source) => {
                warn!(pid = child.as_raw(), error = %source, "waitpid failed");
                return Err(ShellError::Wait { pid: child, source });
            }
        }
    }
}

fn terminated_by_signal(sig: Signal) -> ExitCode {
    128 + sig as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::fake::RecordingTerminal;
    use nix::unistd::getpgrp;

    fn session_on(terminal: &RecordingTerminal) -> Session {
        Session::from_parts(
            Box::new(terminal.clone()),
            terminal.interactive,
            getpgrp(),
            "shell>".to_string(),
        )
    }

    fn plain_session() -> Session {
        session_on(&RecordingTerminal {
            interactive: false,
            ..RecordingTerminal::new()
        })
    }

    fn argv(words: &[&str]) -> Argv {
        Argv::from(words)
    }

    #[test]
    fn test_exit_codes_are_passed_through() {
        let session = plain_session();
        assert_eq!(run_external(&session, argv(&["true"])).unwrap(), 0);
        assert_eq!(run_external(&session, argv(&["false"])).unwrap(), 1);
        assert_eq!(run_external(&session, argv(&["sh", "-c", "exit 3"])).unwrap(), 3);
    }

    #[test]
    fn test_missing_program_reports_exec_failure() {
        let session = plain_session();
        let code = run_external(&session, argv(&["definitely-not-a-command-pgsh"])).unwrap();
        assert_eq!(code, EXEC_FAILURE);
    }

    #[test]
    fn test_killed_child_reports_signal() {
        let session = plain_session();
        let code = run_external(&session, argv(&["sh", "-c", "kill -9 $$"])).unwrap();
        assert_eq!(code, 128 + 9);
    }

    #[test]
    fn test_empty_argv_launches_nothing() {
        let terminal = RecordingTerminal::new();
        let session = session_on(&terminal);
        assert_eq!(run_external(&session, Argv::default()).unwrap(), 0);
        assert!(terminal.transitions().is_empty());
    }

    #[test]
    fn test_nul_argument_is_rejected_before_fork() {
        let terminal = RecordingTerminal::new();
        let session = session_on(&terminal);
        let argv = Argv::new(vec!["echo".into(), "a\0b".into()]);
        assert!(matches!(
            run_external(&session, argv),
            Err(ShellError::InteriorNul(_))
        ));
        assert!(terminal.transitions().is_empty());
    }

    #[test]
    fn test_terminal_goes_to_child_and_back() {
        let terminal = RecordingTerminal::new();
        let session = session_on(&terminal);

        assert_eq!(run_external(&session, argv(&["true"])).unwrap(), 0);

        let transitions = terminal.transitions();
        assert_eq!(transitions.len(), 2, "transitions: {:?}", transitions);
        assert_ne!(transitions[0], session.pgid());
        assert_eq!(transitions[1], session.pgid());
        assert_eq!(terminal.foreground_group_now(), session.pgid());
        assert_eq!(terminal.restores.get(), 1);
    }

    #[test]
    fn test_terminal_comes_back_after_signal_death() {
        let terminal = RecordingTerminal::new();
        let session = session_on(&terminal);

        let code = run_external(&session, argv(&["sh", "-c", "kill -9 $$"])).unwrap();
        assert_eq!(code, 137);
        assert_eq!(terminal.transitions().last(), Some(&session.pgid()));
        assert_eq!(terminal.foreground_group_now(), session.pgid());
    }

    #[test]
    fn test_terminal_comes_back_after_exec_failure() {
        let terminal = RecordingTerminal::new();
        let session = session_on(&terminal);

        let code = run_external(&session, argv(&["definitely-not-a-command-pgsh"])).unwrap();
        assert_eq!(code, EXEC_FAILURE);
        assert_eq!(terminal.foreground_group_now(), session.pgid());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_child_runs_in_its_own_group_when_interactive() {
        let terminal = RecordingTerminal::new();
        let session = session_on(&terminal);

        // Field 5 of /proc/<pid>/stat is the process group.
        let script = r#"[ "$(cut -d' ' -f5 /proc/$$/stat)" = "$$" ]"#;
        let code = run_external(&session, argv(&["sh", "-c", script])).unwrap();
        assert_eq!(code, 0);
    }
}
