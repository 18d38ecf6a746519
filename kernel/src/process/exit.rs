//! Process termination.
//!
//! Termination records the exit status, wakes a joining parent, releases the
//! address space and disowns the children. Records nobody can collect any
//! more (orphans and children of the exiting process that already exited)
//! are reclaimed on the spot. When the last running process is gone the
//! machine is halted.

use alloc::vec::Vec;

use super::manager::{ProcessError, ProcessManager};
use super::table::{ExitStatus, ProcessId};
use crate::loader::ImageLoader;
use crate::scheduler::Scheduler;

impl<L: ImageLoader, S: Scheduler> ProcessManager<L, S> {
    /// Terminate `pid` with the status code passed to `exit`.
    ///
    /// This only updates the kernel's books. The caller is still running on
    /// its own execution context and retires it afterwards with
    /// [`Scheduler::exit_current`].
    pub fn exit(&self, pid: ProcessId, code: i32) -> Result<(), ProcessError> {
        self.terminate(pid, ExitStatus::Code(code))
    }

    /// Terminate `pid` after an unhandled user exception.
    ///
    /// A parent joining the process observes an abnormal exit.
    pub fn terminate_abnormally(&self, pid: ProcessId) -> Result<(), ProcessError> {
        self.terminate(pid, ExitStatus::Abnormal)
    }

    fn terminate(&self, pid: ProcessId, status: ExitStatus) -> Result<(), ProcessError> {
        let mut reclaimed = Vec::new();

        let mut table = self.table.lock();
        let process = match table.get(pid) {
            Some(process) if !process.is_exited() => process,
            _ => return Err(ProcessError::NotFound),
        };
        let children: Vec<ProcessId> = process.children.iter().copied().collect();

        let (waiter, space, parent) = match table.mark_exited(pid, status) {
            Some(process) => (process.waiter.take(), process.space.take(), process.parent),
            None => unreachable!("PID {} vanished under the table lock", pid),
        };

        for child in children {
            let exited = match table.get_mut(child) {
                Some(record) if record.is_exited() => true,
                Some(record) => {
                    record.parent = None;
                    false
                }
                None => continue,
            };
            if exited {
                reclaimed.extend(table.remove(child));
            } else if let Some(process) = table.get_mut(pid) {
                process.children.remove(&child);
            }
        }

        // Nobody will ever join an orphan.
        if parent.is_none() {
            reclaimed.extend(table.remove(pid));
        }

        let idle = table.running() == 0;
        drop(table);

        drop(space);
        drop(reclaimed);

        if let Some(task) = waiter {
            self.scheduler.unblock(task);
        }

        match status {
            ExitStatus::Code(code) => log::info!("[EXIT] PID {} exited with status {}", pid, code),
            ExitStatus::Abnormal => log::warn!("[EXIT] PID {} terminated abnormally", pid),
        }

        if idle && self.config.halt_when_idle {
            log::info!("[EXIT] No processes left, halting");
            self.scheduler.halt();
        }

        Ok(())
    }

    /// Stop the machine on behalf of `caller`.
    ///
    /// Only the root process may halt.
    pub fn halt(&self, caller: ProcessId) -> Result<(), ProcessError> {
        if caller != ProcessId::ROOT {
            log::warn!("[PROC] PID {} is not allowed to halt", caller);
            return Err(ProcessError::PermissionDenied);
        }
        log::info!("[PROC] Halt requested by root process");
        self.scheduler.halt();
        Ok(())
    }
}
