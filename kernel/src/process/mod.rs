//! Process Management
//!
//! This module provides process creation, joining and termination for
//! userspace programs. All lifecycle state lives in one [`ProcessTable`]
//! owned by the [`ProcessManager`].

pub mod exit;
pub mod join;
pub mod launcher;
pub mod manager;
pub mod table;


pub use launcher::validate_name;
pub use manager::{ProcessError, ProcessInfo, ProcessManager};
pub use table::{ExitStatus, Process, ProcessId, ProcessSnapshot, ProcessState, ProcessTable};
