//! Running the server as a background service

pub mod detach;
pub mod pid_file;

pub use detach::{DetachOptions, MAX_FD, detach_from_terminal};
pub use pid_file::PidFile;
