//! Image launcher: `exec`.
//!
//! `exec` registers the child, loads its image into a fresh address space and
//! hands the initial context to the scheduler. The caller never waits for the
//! child. Any failure after the PID was reserved rolls the record back, so a
//! failed `exec` leaves nothing behind in the table.

use core::sync::atomic::Ordering;

use super::manager::{ProcessError, ProcessManager};
use super::table::ProcessId;
use crate::config::KernelConfig;
use crate::loader::{ImageLoader, LoadedImage};
use crate::scheduler::{Scheduler, UserContext};

/// Check an executable name against the configured limits.
pub fn validate_name(config: &KernelConfig, name: &str) -> Result<(), ProcessError> {
    if name.is_empty() {
        return Err(ProcessError::InvalidArgument("empty executable name"));
    }
    if name.len() > config.max_name_len {
        return Err(ProcessError::InvalidArgument("executable name too long"));
    }
    if let Some(suffix) = config.executable_suffix {
        if !name.ends_with(suffix) || name.len() == suffix.len() {
            return Err(ProcessError::InvalidArgument("not an executable name"));
        }
    }
    Ok(())
}

impl<L: ImageLoader, S: Scheduler> ProcessManager<L, S> {
    /// Create the root process.
    ///
    /// The root process has no parent and is the only process allowed to
    /// halt the machine. It can be created once.
    pub fn spawn_root(&self, name: &str) -> Result<ProcessId, ProcessError> {
        validate_name(&self.config, name)?;
        if self.booted.swap(true, Ordering::SeqCst) {
            return Err(ProcessError::InvalidArgument("root process already exists"));
        }
        let pid = self.launch(None, name, 0).map_err(|e| {
            self.booted.store(false, Ordering::SeqCst);
            e
        })?;
        debug_assert_eq!(pid, ProcessId::ROOT);
        Ok(pid)
    }

    /// Execute the program `name` in a new child of `caller`.
    ///
    /// Returns the child's PID as soon as it has been handed to the
    /// scheduler. Only the argument count reaches the child; the argument
    /// strings are not copied.
    pub fn exec(&self, caller: ProcessId, name: &str, argc: i32) -> Result<ProcessId, ProcessError> {
        validate_name(&self.config, name)?;
        if argc < 0 {
            return Err(ProcessError::InvalidArgument("negative argument count"));
        }
        self.launch(Some(caller), name, argc as u32)
    }

    fn launch(&self, parent: Option<ProcessId>, name: &str, argc: u32) -> Result<ProcessId, ProcessError> {
        let pid = self.table.allocate(parent, name)?;

        let LoadedImage {
            entry_point,
            stack_top,
            space,
        } = match self.loader.load(name) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("[EXEC] Loading {} for PID {} failed: {}", name, pid, e);
                self.rollback(pid);
                return Err(e.into());
            }
        };
        let pages = space.page_count();

        {
            let mut table = self.table.lock();
            match table.get_mut(pid) {
                Some(process) => process.space = Some(space),
                None => unreachable!("PID {} removed while loading", pid),
            }
        }

        let context = UserContext {
            pid,
            entry_point,
            stack_top,
            argc,
            argv: 0,
        };
        if let Err(e) = self.scheduler.spawn(name, context) {
            log::warn!("[EXEC] No execution context for PID {}: {}", pid, e);
            self.rollback(pid);
            return Err(e.into());
        }

        match parent {
            Some(parent) => log::info!(
                "[EXEC] Created process {} (PID {}, parent {}, {} pages)",
                name,
                pid,
                parent,
                pages
            ),
            None => log::info!("[EXEC] Created root process {} (PID {})", name, pid),
        }

        Ok(pid)
    }

    /// Undo a partially completed launch.
    fn rollback(&self, pid: ProcessId) {
        // The address space, if any, is dropped here with the lock released.
        let record = self.table.rollback(pid);
        debug_assert!(record.is_some(), "rolled back PID {} twice", pid);
        log::debug!("[EXEC] Rolled back PID {}", pid);
    }
}
