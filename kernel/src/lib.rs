//! KPROC Kernel Library
//!
//! Process lifecycle subsystem of a small multiprogramming kernel: a user
//! program can start another program (`exec`), wait for one of its children
//! to finish and collect its exit status (`join`), and terminate itself
//! (`exit`).
//!
//! The crate is `no_std` + `alloc`. Binary loading and context switching are
//! supplied by the embedding kernel through the [`loader::ImageLoader`] and
//! [`scheduler::Scheduler`] traits; the syscall trap code hands decoded
//! registers to [`ProcessManager::dispatch`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod loader;
pub mod process;
pub mod scheduler;
pub mod syscall;


pub use config::KernelConfig;
pub use process::{ExitStatus, ProcessError, ProcessId, ProcessManager};
pub use syscall::{SyscallContext, SyscallError, SyscallNumber, UserMemory};
