//! Scheduler interface.
//!
//! The process lifecycle code never switches contexts itself. It asks the
//! scheduler to create an execution context for a freshly loaded process, to
//! put the current task to sleep while it waits for a child, and to make a
//! sleeping task runnable again once the child has exited.

use core::fmt;

use crate::process::ProcessId;

/// Unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Create a TaskId from a raw value.
    pub const fn new(id: u64) -> Self {
        TaskId(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Initial user-mode register state of a new process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    /// Process the context belongs to
    pub pid: ProcessId,
    /// Initial program counter
    pub entry_point: u64,
    /// Initial stack pointer
    pub stack_top: u64,
    /// First argument register (argument count)
    pub argc: u32,
    /// Second argument register (argument vector address)
    pub argv: u64,
}

/// The scheduler could not create an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// No kernel stack or task slot available
    NoResources,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::NoResources => write!(f, "no resources for a new task"),
        }
    }
}

/// Thread/CPU scheduler used by the process manager.
///
/// # Wakeup contract
///
/// `unblock(task)` must not be lost when it happens before `task` reaches
/// `block_current()`: the pending wakeup makes the next `block_current()`
/// of that task return immediately. Callers re-check their condition after
/// every return from `block_current()`, so spurious returns are allowed.
pub trait Scheduler: Send + Sync {
    /// Task currently running on this CPU.
    fn current(&self) -> TaskId;

    /// Create a runnable execution context for a newly loaded process.
    fn spawn(&self, name: &str, context: UserContext) -> Result<TaskId, SpawnError>;

    /// Put the current task to sleep until it is unblocked.
    fn block_current(&self);

    /// Make a blocked task runnable.
    fn unblock(&self, task: TaskId);

    /// Retire the current task and release its execution context.
    fn exit_current(&self) -> !;

    /// Stop the machine.
    fn halt(&self);
}
