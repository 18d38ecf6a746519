//! Kernel configuration constants.
//!
//! This module contains the tunables of the process lifecycle subsystem.
//! Values here bound the process table and the names accepted by `exec`.

/// Maximum number of processes registered at once (running or awaiting
/// collection).
pub const MAX_PROCESSES: usize = 1024;

/// Maximum length of an executable name read from user memory, in bytes
/// (excluding the NUL terminator).
pub const MAX_NAME_LEN: usize = 256;

/// File name suffix every executable image must carry.
pub const EXECUTABLE_SUFFIX: &str = ".coff";

/// Largest PID handed out. PIDs travel through the syscall ABI as
/// non-negative `i32` values.
pub const PID_LIMIT: u32 = i32::MAX as u32;

/// Runtime configuration of the process manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Capacity of the process table.
    pub max_processes: usize,
    /// Longest executable name accepted by `exec`.
    pub max_name_len: usize,
    /// Required executable suffix, or `None` to accept any name.
    pub executable_suffix: Option<&'static str>,
    /// Stop the machine once the last running process terminates.
    pub halt_when_idle: bool,
}

impl KernelConfig {
    /// Default configuration.
    pub const fn new() -> Self {
        Self {
            max_processes: MAX_PROCESSES,
            max_name_len: MAX_NAME_LEN,
            executable_suffix: Some(EXECUTABLE_SUFFIX),
            halt_when_idle: true,
        }
    }

    /// Override the process table capacity.
    pub const fn with_max_processes(mut self, max_processes: usize) -> Self {
        self.max_processes = max_processes;
        self
    }

    /// Override the executable suffix check.
    pub const fn with_executable_suffix(mut self, suffix: Option<&'static str>) -> Self {
        self.executable_suffix = suffix;
        self
    }

    /// Enable or disable halting when no process is left running.
    pub const fn with_halt_when_idle(mut self, halt: bool) -> Self {
        self.halt_when_idle = halt;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
