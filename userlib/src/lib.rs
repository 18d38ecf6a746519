//! KPROC Userspace Library
//!
//! This library provides the system call wrappers user programs use to
//! manage processes on KPROC.
//!
//! # Architecture
//!
//! Userspace programs trap into the kernel with the `syscall` instruction.
//! This library provides safe Rust wrappers around the raw system calls,
//! generic over the [`syscall::SyscallTrap`] that carries them.
//!
//! # Example
//!
//! ```rust,ignore
//! use userlib::prelude::*;
//!
//! fn main_with(trap: &impl SyscallTrap) -> ! {
//!     let pid = exec(trap, "write10.coff", &[]).unwrap();
//!     let status = join(trap, pid).unwrap();
//!     exit(trap, status.exit_code().unwrap_or(-1));
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_op_in_unsafe_fn)]

pub mod process;
pub mod syscall;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::process::{exec, exit, halt, join, JoinStatus};
    pub use crate::syscall::{SyscallError, SyscallTrap};
}
