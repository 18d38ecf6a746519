//! Process Table
//!
//! Maintains the table of every process that is running or whose exit status
//! is still waiting to be collected by its parent.
//!
//! One lock guards the records and the PID allocator together. Join and exit
//! both run their check-then-act sequences under that lock, which is what
//! keeps a child exiting concurrently with its parent going to sleep from
//! losing the wakeup.

use alloc::boxed::Box;
use alloc::collections::{BTreeSet, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use hashbrown::HashMap;
use spin::{Mutex, MutexGuard};

use super::manager::ProcessError;
use crate::config::PID_LIMIT;
use crate::loader::AddressSpace;
use crate::scheduler::TaskId;

/// Process ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Root process ID (always 0)
    pub const ROOT: ProcessId = ProcessId(0);

    /// Decode a PID passed through a syscall register.
    ///
    /// Returns `None` for negative or out-of-range values.
    pub fn from_raw(raw: i64) -> Option<Self> {
        if (0..=PID_LIMIT as i64).contains(&raw) {
            Some(ProcessId(raw as u32))
        } else {
            None
        }
    }

    /// Get the raw ID value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process called `exit` with this status
    Code(i32),
    /// The kernel terminated the process after an unhandled user exception
    Abnormal,
}

impl ExitStatus {
    /// Status code passed to `exit`, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Code(code) => Some(*code),
            ExitStatus::Abnormal => None,
        }
    }
}

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Process is alive (runnable, running or blocked)
    Running,
    /// Process has exited; the status awaits collection by `join`
    Exited(ExitStatus),
}

/// A process control record.
pub struct Process {
    /// Process ID
    pub pid: ProcessId,
    /// Parent process ID; `None` for the root process and for orphans
    pub parent: Option<ProcessId>,
    /// Executable name
    pub name: String,
    /// Lifecycle state
    pub state: ProcessState,
    /// Children that have not been joined yet
    pub children: BTreeSet<ProcessId>,
    /// Task of the parent currently blocked joining this process
    pub(crate) waiter: Option<TaskId>,
    /// Address space; `None` before loading completes and after exit
    pub(crate) space: Option<Box<dyn AddressSpace>>,
}

impl Process {
    /// Create a new record in state `Running`.
    pub fn new(pid: ProcessId, parent: Option<ProcessId>, name: String) -> Self {
        Self {
            pid,
            parent,
            name,
            state: ProcessState::Running,
            children: BTreeSet::new(),
            waiter: None,
            space: None,
        }
    }

    /// Whether the process has terminated.
    pub fn is_exited(&self) -> bool {
        matches!(self.state, ProcessState::Exited(_))
    }

    /// Exit status, present once the process has terminated.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self.state {
            ProcessState::Exited(status) => Some(status),
            ProcessState::Running => None,
        }
    }

    /// Record the exit status. The status is written exactly once.
    pub fn set_exited(&mut self, status: ExitStatus) {
        assert!(
            !self.is_exited(),
            "exit status of process {} written twice",
            self.pid
        );
        self.state = ProcessState::Exited(status);
    }

    /// Pages held by the address space, zero once released.
    pub fn resident_pages(&self) -> usize {
        self.space.as_ref().map_or(0, |space| space.page_count())
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("parent", &self.parent)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("children", &self.children)
            .field("waiter", &self.waiter)
            .field("resident_pages", &self.resident_pages())
            .finish()
    }
}

/// PID allocator.
///
/// Hands out never-used numbers first. A number is only recycled after its
/// record has left the table, so no parent can still be holding it as an
/// un-joined child.
struct PidAllocator {
    next: u32,
    recycled: VecDeque<u32>,
}

impl PidAllocator {
    const fn new() -> Self {
        Self {
            next: ProcessId::ROOT.0,
            recycled: VecDeque::new(),
        }
    }

    fn alloc(&mut self) -> Option<ProcessId> {
        if self.next <= PID_LIMIT {
            let pid = self.next;
            self.next += 1;
            Some(ProcessId(pid))
        } else {
            self.recycled.pop_front().map(ProcessId)
        }
    }

    fn dealloc(&mut self, pid: ProcessId) {
        self.recycled.push_back(pid.0);
    }

    /// Give back a number that no process ever ran under.
    ///
    /// If nothing was allocated since, the counter is rewound; otherwise the
    /// number is queued like any other.
    fn unreserve(&mut self, pid: ProcessId) {
        if pid.0 + 1 == self.next {
            self.next -= 1;
        } else {
            self.dealloc(pid);
        }
    }
}

/// Lock-protected contents of the process table.
pub(crate) struct TableInner {
    processes: HashMap<ProcessId, Process>,
    pids: PidAllocator,
    running: usize,
}

impl TableInner {
    fn new() -> Self {
        Self {
            processes: HashMap::new(),
            pids: PidAllocator::new(),
            running: 0,
        }
    }

    pub(crate) fn get(&self, pid: ProcessId) -> Option<&Process> {
        self.processes.get(&pid)
    }

    pub(crate) fn get_mut(&mut self, pid: ProcessId) -> Option<&mut Process> {
        self.processes.get_mut(&pid)
    }

    /// Number of records in state `Running`.
    pub(crate) fn running(&self) -> usize {
        self.running
    }

    /// Transition `pid` from Running to Exited.
    pub(crate) fn mark_exited(&mut self, pid: ProcessId, status: ExitStatus) -> Option<&mut Process> {
        let process = self.processes.get_mut(&pid)?;
        process.set_exited(status);
        self.running -= 1;
        Some(process)
    }

    /// Delete a record, unlink it from its parent and recycle its PID.
    pub(crate) fn remove(&mut self, pid: ProcessId) -> Option<Process> {
        let process = self.unlink(pid)?;
        self.pids.dealloc(pid);
        Some(process)
    }

    /// Delete the record of a launch that never started running.
    pub(crate) fn rollback(&mut self, pid: ProcessId) -> Option<Process> {
        let process = self.unlink(pid)?;
        self.pids.unreserve(pid);
        Some(process)
    }

    fn unlink(&mut self, pid: ProcessId) -> Option<Process> {
        let process = self.processes.remove(&pid)?;
        debug_assert!(
            process.waiter.is_none(),
            "process {} reclaimed while a joiner is pending",
            pid
        );
        if !process.is_exited() {
            self.running -= 1;
        }
        if let Some(parent) = process.parent {
            if let Some(parent) = self.processes.get_mut(&parent) {
                parent.children.remove(&pid);
            }
        }
        Some(process)
    }
}

/// Lightweight snapshot of a process record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: ProcessId,
    pub parent: Option<ProcessId>,
    pub name: String,
    pub state: ProcessState,
    /// Number of children not joined yet
    pub unjoined_children: usize,
    /// Pages still held by the address space
    pub resident_pages: usize,
}

impl From<&Process> for ProcessSnapshot {
    fn from(process: &Process) -> Self {
        Self {
            pid: process.pid,
            parent: process.parent,
            name: process.name.clone(),
            state: process.state,
            unjoined_children: process.children.len(),
            resident_pages: process.resident_pages(),
        }
    }
}

/// Global process table
pub struct ProcessTable {
    inner: Mutex<TableInner>,
    capacity: usize,
}

impl ProcessTable {
    /// Create a new empty process table
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(TableInner::new()),
            capacity,
        }
    }

    /// Lock the table.
    pub(crate) fn lock(&self) -> MutexGuard<'_, TableInner> {
        self.inner.lock()
    }

    /// Register a new process in state `Running`.
    ///
    /// A `Some` parent must be a running process; the new PID is added to its
    /// set of un-joined children in the same critical section.
    pub fn allocate(&self, parent: Option<ProcessId>, name: &str) -> Result<ProcessId, ProcessError> {
        let mut inner = self.inner.lock();

        if let Some(parent) = parent {
            match inner.get(parent) {
                Some(p) if !p.is_exited() => {}
                _ => return Err(ProcessError::NotFound),
            }
        }
        if inner.processes.len() >= self.capacity {
            return Err(ProcessError::ResourceExhausted);
        }
        let pid = inner.pids.alloc().ok_or(ProcessError::ResourceExhausted)?;
        debug_assert!(!inner.processes.contains_key(&pid));

        inner
            .processes
            .insert(pid, Process::new(pid, parent, String::from(name)));
        inner.running += 1;
        if let Some(parent) = parent {
            if let Some(parent) = inner.get_mut(parent) {
                parent.children.insert(pid);
            }
        }

        Ok(pid)
    }

    /// Look up a process by PID
    pub fn lookup(&self, pid: ProcessId) -> Result<ProcessSnapshot, ProcessError> {
        self.inner
            .lock()
            .get(pid)
            .map(ProcessSnapshot::from)
            .ok_or(ProcessError::NotFound)
    }

    /// Remove a process
    ///
    /// The record is returned so the caller can drop it, and with it the
    /// address space, after the table lock has been released.
    pub(crate) fn remove(&self, pid: ProcessId) -> Option<Process> {
        self.inner.lock().remove(pid)
    }

    /// Remove a record whose launch failed, handing its PID straight back.
    pub(crate) fn rollback(&self, pid: ProcessId) -> Option<Process> {
        self.inner.lock().rollback(pid)
    }

    /// Get count of registered processes
    pub fn count(&self) -> usize {
        self.inner.lock().processes.len()
    }

    /// Get count of processes that have not exited
    pub fn live_count(&self) -> usize {
        self.inner.lock().running
    }

    /// Table capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get a snapshot of all processes, ordered by PID.
    pub fn processes_snapshot(&self) -> Vec<ProcessSnapshot> {
        let inner = self.inner.lock();
        let mut snapshot: Vec<ProcessSnapshot> =
            inner.processes.values().map(ProcessSnapshot::from).collect();
        snapshot.sort_by_key(|p| p.pid);
        snapshot
    }
}
