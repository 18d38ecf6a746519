//! System call handling module.
//!
//! This module implements the system call interface of the process
//! lifecycle subsystem. The architecture trap code saves the user registers
//! into a [`SyscallContext`] and calls [`ProcessManager::dispatch`] with the
//! calling process and a view of its memory.

pub mod handlers;

use alloc::string::String;

use crate::loader::ImageLoader;
use crate::process::{ProcessError, ProcessId, ProcessManager};
use crate::scheduler::Scheduler;

/// System call numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum SyscallNumber {
    /// Stop the machine (root process only).
    Halt = 0,
    /// Exit the current process.
    Exit = 1,
    /// Execute a program in a new child process.
    Exec = 2,
    /// Wait for a child process.
    Join = 3,
}

impl SyscallNumber {
    /// Human-readable name used in traces.
    pub fn name(&self) -> &'static str {
        match self {
            SyscallNumber::Halt => "halt",
            SyscallNumber::Exit => "exit",
            SyscallNumber::Exec => "exec",
            SyscallNumber::Join => "join",
        }
    }
}

impl TryFrom<u64> for SyscallNumber {
    type Error = ();

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SyscallNumber::Halt),
            1 => Ok(SyscallNumber::Exit),
            2 => Ok(SyscallNumber::Exec),
            3 => Ok(SyscallNumber::Join),
            _ => Err(()),
        }
    }
}

/// System call result.
pub type SyscallResult = Result<u64, SyscallError>;

/// System call error codes.
///
/// These are the negative values user programs see in the return register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum SyscallError {
    /// Invalid system call number.
    InvalidSyscall = -1,
    /// Invalid argument.
    InvalidArgument = -2,
    /// Permission denied.
    PermissionDenied = -3,
    /// Executable or process not found.
    NotFound = -4,
    /// No PID, table slot or memory available.
    ResourceExhausted = -5,
    /// Executable could not be loaded.
    LoadFailure = -6,
    /// Join target is not an un-joined child of the caller.
    InvalidJoin = -7,
}

impl From<ProcessError> for SyscallError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::ResourceExhausted => SyscallError::ResourceExhausted,
            ProcessError::NotFound => SyscallError::NotFound,
            ProcessError::InvalidJoin => SyscallError::InvalidJoin,
            ProcessError::LoadFailure => SyscallError::LoadFailure,
            ProcessError::InvalidArgument(_) => SyscallError::InvalidArgument,
            ProcessError::PermissionDenied => SyscallError::PermissionDenied,
        }
    }
}

/// System call context (registers at syscall time).
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct SyscallContext {
    /// System call number.
    pub syscall_num: u64,
    /// First argument.
    pub arg1: u64,
    /// Second argument.
    pub arg2: u64,
    /// Third argument.
    pub arg3: u64,
    /// Fourth argument.
    pub arg4: u64,
    /// Fifth argument.
    pub arg5: u64,
    /// Sixth argument.
    pub arg6: u64,
}

impl SyscallContext {
    /// Build a context for `num` with the leading arguments filled in.
    pub fn new(num: SyscallNumber, args: &[u64]) -> Self {
        let mut ctx = SyscallContext {
            syscall_num: num as u64,
            ..Default::default()
        };
        let slots = [
            &mut ctx.arg1,
            &mut ctx.arg2,
            &mut ctx.arg3,
            &mut ctx.arg4,
            &mut ctx.arg5,
            &mut ctx.arg6,
        ];
        for (slot, arg) in slots.into_iter().zip(args) {
            *slot = *arg;
        }
        ctx
    }
}

/// Access to the calling process's virtual memory.
///
/// Both operations fail softly: an address that is unmapped or not writable
/// yields `None` / `false` and the syscall reports `InvalidArgument`.
pub trait UserMemory {
    /// Read a NUL-terminated string of at most `max_len` bytes at `vaddr`.
    ///
    /// Returns `None` if the memory is unreadable, no terminator is found
    /// within `max_len` bytes, or the bytes are not UTF-8.
    fn read_cstr(&self, vaddr: u64, max_len: usize) -> Option<String>;

    /// Store a 32-bit little-endian integer at `vaddr`.
    fn write_i32(&mut self, vaddr: u64, value: i32) -> bool;
}

impl<L: ImageLoader, S: Scheduler> ProcessManager<L, S> {
    /// Dispatch a system call issued by `caller`.
    ///
    /// Returns the value for the user's return register: the result on
    /// success, a negative [`SyscallError`] code on failure. `exit` does not
    /// return.
    pub fn dispatch(&self, caller: ProcessId, ctx: &SyscallContext, mem: &mut dyn UserMemory) -> i64 {
        let result = match SyscallNumber::try_from(ctx.syscall_num) {
            Ok(syscall) => {
                #[cfg(feature = "trace-syscalls")]
                log::trace!(
                    "[SYSCALL] PID {} {}({:#x}, {:#x}, {:#x})",
                    caller,
                    syscall.name(),
                    ctx.arg1,
                    ctx.arg2,
                    ctx.arg3
                );
                self.handle(caller, syscall, ctx, mem)
            }
            Err(_) => {
                log::warn!("[SYSCALL] PID {} issued unknown syscall {}", caller, ctx.syscall_num);
                Err(SyscallError::InvalidSyscall)
            }
        };

        #[cfg(feature = "trace-syscalls")]
        log::trace!("[SYSCALL] PID {} -> {:?}", caller, result);

        match result {
            Ok(value) => value as i64,
            Err(err) => err as i64,
        }
    }
}
