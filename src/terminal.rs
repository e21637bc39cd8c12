use nix::sys::termios::{SetArg, Termios, tcgetattr, tcsetattr};
use nix::unistd::{Pid, tcgetpgrp, tcsetpgrp};
use std::io::{self, IsTerminal};
use std::os::fd::{AsFd, OwnedFd};

/// The controlling terminal as far as job control is concerned.
///
/// Only the session and the process launcher touch it. The real implementation is
/// [`Tty`]; tests substitute a recorder to observe foreground-group transitions.
pub trait Terminal {
    /// Whether the descriptor is a real TTY.
    fn is_interactive(&self) -> bool;

    /// The process group currently in the foreground.
    fn foreground_group(&self) -> nix::Result<Pid>;

    /// Hand the foreground to `pgid`.
    fn set_foreground_group(&self, pgid: Pid) -> nix::Result<()>;

    /// Remember the current terminal attributes.
    fn save_modes(&mut self) -> nix::Result<()>;

    /// Re-apply the attributes remembered by [`Terminal::save_modes`], if any.
    fn restore_modes(&self) -> nix::Result<()>;
}

/// The terminal behind standard input.
///
/// Holds its own duplicate of the descriptor (close-on-exec, so children never see
/// it), released when the value is dropped.
#[derive(Debug)]
pub struct Tty {
    fd: OwnedFd,
    modes: Option<Termios>,
}

impl Tty {
    pub fn stdin() -> io::Result<Self> {
        let fd = io::stdin().as_fd().try_clone_to_owned()?;
        Ok(Self::from_fd(fd))
    }

    pub fn from_fd(fd: OwnedFd) -> Self {
        Self { fd, modes: None }
    }
}

impl Terminal for Tty {
    fn is_interactive(&self) -> bool {
        self.fd.is_terminal()
    }

    fn foreground_group(&self) -> nix::Result<Pid> {
        tcgetpgrp(&self.fd)
    }

    fn set_foreground_group(&self, pgid: Pid) -> nix::Result<()> {
        tcsetpgrp(&self.fd, pgid)
    }

    fn save_modes(&mut self) -> nix::Result<()> {
        self.modes = Some(tcgetattr(&self.fd)?);
        Ok(())
    }

    fn restore_modes(&self) -> nix::Result<()> {
        match &self.modes {
            Some(modes) => tcsetattr(&self.fd, SetArg::TCSADRAIN, modes),
            None => Ok(()),
        }
    }
}
