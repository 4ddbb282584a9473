use crate::{EchoError, Result};
use std::path::{Path, PathBuf};

/// A file holding the daemon's process id, removed again on drop
///
/// Create it after [`detach_from_terminal`](super::detach_from_terminal)
/// returns so it records the surviving process. Use an absolute path when
/// detachment changes the working directory.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    pid: u32,
}

impl PidFile {
    /// Writes the current process id to `path`, replacing any old file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let pid = std::process::id();
        std::fs::write(&path, format!("{pid}\n")).map_err(|e| {
            EchoError::Config(format!("Failed to write pid file {}: {e}", path.display()))
        })?;
        Ok(Self { path, pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Reads a process id back from a pid file
    pub fn read(path: impl AsRef<Path>) -> Result<u32> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EchoError::Config(format!("Failed to read pid file {}: {e}", path.display()))
        })?;
        contents.trim().parse().map_err(|e| {
            EchoError::Config(format!("Invalid pid file {}: {e}", path.display()))
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
