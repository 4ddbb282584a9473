// Terminal detachment for long-running servers
//
// The sequence is the classic double fork:
// 1. fork, parent leaves through _exit so atexit hooks never run twice
// 2. setsid in the child, then ignore SIGHUP
// 3. fork again, only the grandchild survives; it is not a session leader
//    and can never acquire a controlling terminal again
// 4. optionally chdir to /
// 5. optionally close inherited descriptors and point 0/1/2 at /dev/null
//
// This must run before any thread is started (including a Tokio runtime):
// only the calling thread survives a fork.

use crate::{EchoError, Result};
use std::fs::OpenOptions;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

/// Highest descriptor number (exclusive) closed during detachment
pub const MAX_FD: RawFd = 64;

/// What `detach_from_terminal` does besides leaving the session
#[derive(Debug, Clone)]
pub struct DetachOptions {
    /// chdir to `/` so the daemon does not pin a mounted filesystem
    pub change_dir: bool,
    /// Close descriptors below [`MAX_FD`] and reopen 0/1/2 on `/dev/null`
    pub redirect_stdio: bool,
    /// Descriptors left open even when `redirect_stdio` is set
    pub keep_fds: Vec<RawFd>,
}

impl DetachOptions {
    /// Keep `fd` open across the descriptor sweep
    pub fn keep_fd(mut self, fd: RawFd) -> Self {
        self.keep_fds.push(fd);
        self
    }

    pub fn with_change_dir(mut self, change_dir: bool) -> Self {
        self.change_dir = change_dir;
        self
    }

    pub fn with_redirect_stdio(mut self, redirect_stdio: bool) -> Self {
        self.redirect_stdio = redirect_stdio;
        self
    }
}

impl Default for DetachOptions {
    fn default() -> Self {
        Self {
            change_dir: true,
            redirect_stdio: true,
            keep_fds: Vec::new(),
        }
    }
}

/// Detaches the calling process from its terminal and session
///
/// On success the caller is running in the grandchild; the original process
/// and the intermediate child have already exited. Only a failure of the
/// first fork is reported, since nothing has changed at that point and the
/// caller can still abort startup. Later steps are best effort.
pub fn detach_from_terminal(options: &DetachOptions) -> Result<()> {
    fork_and_exit_parent().map_err(EchoError::Daemon)?;

    // SAFETY: plain syscalls with no pointers; single-threaded at this point.
    unsafe {
        libc::setsid();
        libc::signal(libc::SIGHUP, libc::SIG_IGN);
    }

    // A failed second fork leaves us as a session leader, which still works.
    let _ = fork_and_exit_parent();

    if options.change_dir {
        let _ = std::env::set_current_dir("/");
    }

    if options.redirect_stdio {
        close_descriptors(&options.keep_fds);
        redirect_stdio_to(Path::new("/dev/null"));
    }

    Ok(())
}

fn fork_and_exit_parent() -> std::io::Result<()> {
    // SAFETY: the caller guarantees no other threads exist, so the child
    // starts from a consistent copy of this one.
    match unsafe { libc::fork() } {
        -1 => Err(std::io::Error::last_os_error()),
        0 => Ok(()),
        // SAFETY: _exit skips atexit handlers and stdio flushing.
        _ => unsafe { libc::_exit(0) },
    }
}

fn close_descriptors(keep: &[RawFd]) {
    for fd in (0..MAX_FD).filter(|fd| !keep.contains(fd)) {
        // SAFETY: closing an unused or already closed descriptor is harmless.
        unsafe {
            libc::close(fd);
        }
    }
}

fn redirect_stdio_to(path: &Path) {
    let Ok(null) = OpenOptions::new().read(true).write(true).open(path) else {
        return;
    };
    let fd = null.as_raw_fd();

    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if fd != target {
            // SAFETY: both descriptors are valid; dup2 replaces the target.
            unsafe {
                libc::dup2(fd, target);
            }
        }
    }

    // The descriptor landed on 0, 1 or 2 after the sweep; keep it open.
    if fd <= libc::STDERR_FILENO {
        std::mem::forget(null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DetachOptions::default();
        assert!(options.change_dir);
        assert!(options.redirect_stdio);
        assert!(options.keep_fds.is_empty());
    }

    #[test]
    fn test_option_builders() {
        let options = DetachOptions::default()
            .with_change_dir(false)
            .with_redirect_stdio(false)
            .keep_fd(5)
            .keep_fd(7);
        assert!(!options.change_dir);
        assert!(!options.redirect_stdio);
        assert_eq!(options.keep_fds, vec![5, 7]);
    }
}
