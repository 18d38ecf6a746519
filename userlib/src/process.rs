//! Process management for userspace.
//!
//! This module provides functions to start child programs, wait for them and
//! leave the current process.

use crate::syscall::{convert_result, SyscallError, SyscallNumber, SyscallTrap};

/// Longest executable name the kernel accepts, in bytes.
pub const MAX_NAME_LEN: usize = 256;

/// Outcome of a successful [`join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    /// The child called `exit` with this status.
    Exited(i32),
    /// The child was terminated by the kernel.
    Killed,
}

impl JoinStatus {
    /// Exit code (if exited normally).
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            JoinStatus::Exited(code) => Some(*code),
            JoinStatus::Killed => None,
        }
    }
}

/// Run the executable `name` in a new child process.
///
/// Returns the child's PID. `args` is reported to the kernel by count; the
/// strings themselves are not copied into the child.
pub fn exec<T: SyscallTrap + ?Sized>(trap: &T, name: &str, args: &[&str]) -> Result<u32, SyscallError> {
    if name.len() > MAX_NAME_LEN || name.as_bytes().contains(&0) {
        return Err(SyscallError::InvalidArgument);
    }
    let mut buf = [0u8; MAX_NAME_LEN + 1];
    buf[..name.len()].copy_from_slice(name.as_bytes());

    let ret = unsafe {
        trap.syscall(
            SyscallNumber::Exec,
            [buf.as_ptr() as u64, args.len() as u64, args.as_ptr() as u64],
        )
    };
    convert_result(ret).map(|pid| pid as u32)
}

/// Wait for the child `pid` to terminate.
pub fn join<T: SyscallTrap + ?Sized>(trap: &T, pid: u32) -> Result<JoinStatus, SyscallError> {
    let mut status: i32 = 0;
    let ret = unsafe {
        trap.syscall(
            SyscallNumber::Join,
            [pid as u64, &mut status as *mut i32 as u64, 0],
        )
    };
    match convert_result(ret)? {
        0 => Ok(JoinStatus::Killed),
        _ => Ok(JoinStatus::Exited(status)),
    }
}

/// Exit the current process.
pub fn exit<T: SyscallTrap + ?Sized>(trap: &T, code: i32) -> ! {
    unsafe {
        let _ = trap.syscall(SyscallNumber::Exit, [code as i64 as u64, 0, 0]);
    }
    // Should never reach here
    loop {
        core::hint::spin_loop();
    }
}

/// Stop the machine. Only the first process may do this.
pub fn halt<T: SyscallTrap + ?Sized>(trap: &T) -> Result<(), SyscallError> {
    let ret = unsafe { trap.syscall(SyscallNumber::Halt, [0; 3]) };
    convert_result(ret).map(|_| ())
}
