//! Process Manager
//!
//! High-level process management: owns the process table together with the
//! image loader and scheduler it hands work to. The lifecycle operations are
//! split by concern:
//!
//! - [`launcher`](super::launcher): `exec` and root bootstrap
//! - [`join`](super::join): waiting for a child's exit status
//! - [`exit`](super::exit): termination and reclamation

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::AtomicBool;

use super::table::{ProcessId, ProcessSnapshot, ProcessState, ProcessTable};
use crate::config::KernelConfig;
use crate::loader::{ImageLoader, LoadError};
use crate::scheduler::{Scheduler, SpawnError};

/// Process management error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// No PID or process-table slot available
    ResourceExhausted,
    /// Image missing, or process unknown
    NotFound,
    /// Join target is not an un-joined child of the caller
    InvalidJoin,
    /// Image found but could not be loaded
    LoadFailure,
    /// Invalid argument
    InvalidArgument(&'static str),
    /// Caller is not allowed to perform the operation
    PermissionDenied,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::ResourceExhausted => write!(f, "process table exhausted"),
            ProcessError::NotFound => write!(f, "not found"),
            ProcessError::InvalidJoin => write!(f, "not an un-joined child of the caller"),
            ProcessError::LoadFailure => write!(f, "executable could not be loaded"),
            ProcessError::InvalidArgument(why) => write!(f, "invalid argument: {}", why),
            ProcessError::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

impl From<LoadError> for ProcessError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::NotFound => ProcessError::NotFound,
            LoadError::Malformed(_) => ProcessError::LoadFailure,
            LoadError::OutOfMemory => ProcessError::ResourceExhausted,
        }
    }
}

impl From<SpawnError> for ProcessError {
    fn from(e: SpawnError) -> Self {
        match e {
            SpawnError::NoResources => ProcessError::ResourceExhausted,
        }
    }
}

/// Process manager
pub struct ProcessManager<L: ImageLoader, S: Scheduler> {
    pub(super) table: ProcessTable,
    pub(super) loader: L,
    pub(super) scheduler: S,
    pub(super) config: KernelConfig,
    /// Set once the root process has been created
    pub(super) booted: AtomicBool,
}

impl<L: ImageLoader, S: Scheduler> ProcessManager<L, S> {
    /// Create a new process manager
    pub fn new(config: KernelConfig, loader: L, scheduler: S) -> Self {
        Self {
            table: ProcessTable::new(config.max_processes),
            loader,
            scheduler,
            config,
            booted: AtomicBool::new(false),
        }
    }

    /// The process table
    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    /// The image loader
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The scheduler
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Active configuration
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Get process info
    pub fn get_info(&self, pid: ProcessId) -> Option<ProcessInfo> {
        self.table.lookup(pid).ok().map(ProcessInfo::from)
    }

    /// List all processes
    pub fn list(&self) -> Vec<ProcessInfo> {
        self.table
            .processes_snapshot()
            .into_iter()
            .map(ProcessInfo::from)
            .collect()
    }
}

/// Process information (read-only view)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Process ID
    pub pid: ProcessId,
    /// Parent process ID
    pub parent: Option<ProcessId>,
    /// Executable name
    pub name: String,
    /// Current state
    pub state: ProcessState,
    /// Number of children not joined yet
    pub unjoined_children: usize,
}

impl From<ProcessSnapshot> for ProcessInfo {
    fn from(snapshot: ProcessSnapshot) -> Self {
        Self {
            pid: snapshot.pid,
            parent: snapshot.parent,
            name: snapshot.name,
            state: snapshot.state,
            unjoined_children: snapshot.unjoined_children,
        }
    }
}
