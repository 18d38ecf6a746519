//! Raw system call interface.
//!
//! Programs reach the kernel through a [`SyscallTrap`]. On bare metal this
//! is the x86_64 `syscall` instruction ([`Native`]); a simulated machine
//! supplies its own trap that hands the registers to the kernel directly.

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
use core::arch::asm;

/// System call numbers - must match kernel's SyscallNumber enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum SyscallNumber {
    Halt = 0,
    Exit = 1,
    Exec = 2,
    Join = 3,
}

/// System call error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum SyscallError {
    /// Unknown system call number.
    InvalidSyscall = -1,
    /// Invalid argument or unreadable/unwritable pointer.
    InvalidArgument = -2,
    /// Operation not permitted.
    PermissionDenied = -3,
    /// No such executable or process.
    NotFound = -4,
    /// No PID, process slot or memory available.
    ResourceExhausted = -5,
    /// Executable could not be loaded.
    LoadFailure = -6,
    /// Not an un-joined child of the caller.
    InvalidJoin = -7,
    /// Unknown error.
    Unknown = -255,
}

impl SyscallError {
    /// Convert raw return value to error.
    pub fn from_raw(val: i64) -> Self {
        match val {
            -1 => Self::InvalidSyscall,
            -2 => Self::InvalidArgument,
            -3 => Self::PermissionDenied,
            -4 => Self::NotFound,
            -5 => Self::ResourceExhausted,
            -6 => Self::LoadFailure,
            -7 => Self::InvalidJoin,
            _ => Self::Unknown,
        }
    }
}

/// Result type for system calls.
pub type SyscallResult = Result<u64, SyscallError>;

/// Convert raw syscall return value to Result.
#[inline]
pub fn convert_result(ret: i64) -> SyscallResult {
    if ret >= 0 {
        Ok(ret as u64)
    } else {
        Err(SyscallError::from_raw(ret))
    }
}

/// Entry into the kernel.
pub trait SyscallTrap {
    /// Issue system call `nr` and return the raw result register.
    ///
    /// # Safety
    ///
    /// Pointer arguments must be valid for the access the call performs.
    unsafe fn syscall(&self, nr: SyscallNumber, args: [u64; 3]) -> i64;
}

/// The `syscall` instruction.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct Native;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
impl SyscallTrap for Native {
    #[inline]
    unsafe fn syscall(&self, nr: SyscallNumber, args: [u64; 3]) -> i64 {
        let ret: i64;
        asm!(
            "syscall",
            inout("rax") nr as u64 => ret,
            in("rdi") args[0],
            in("rsi") args[1],
            in("rdx") args[2],
            out("rcx") _,  // clobbered by syscall
            out("r11") _,  // clobbered by syscall
            options(nostack, preserves_flags)
        );
        ret
    }
}
