//! Join coordinator.
//!
//! A parent collects the exit status of one of its children, sleeping until
//! the child terminates if necessary. The state check and the registration
//! as waiter happen under the table lock; the exiting child sets its state
//! and takes the waiter under the same lock. The wakeup itself is issued
//! after the lock is dropped and relies on the scheduler keeping a wakeup
//! that arrives before the parent actually sleeps.

use super::manager::{ProcessError, ProcessManager};
use super::table::{ExitStatus, ProcessId, ProcessState};
use crate::loader::ImageLoader;
use crate::scheduler::Scheduler;

impl<L: ImageLoader, S: Scheduler> ProcessManager<L, S> {
    /// Wait for `child` to terminate and collect its exit status.
    ///
    /// `child` must be an un-joined child of `caller`. The record is removed
    /// from the table once its status has been read, so each child can be
    /// joined exactly once.
    pub fn join(&self, caller: ProcessId, child: ProcessId) -> Result<ExitStatus, ProcessError> {
        let task = self.scheduler.current();

        loop {
            let mut table = self.table.lock();

            let is_child = table
                .get(caller)
                .map_or(false, |parent| parent.children.contains(&child));
            if !is_child {
                log::warn!("[JOIN] PID {} is not an un-joined child of {}", child, caller);
                return Err(ProcessError::InvalidJoin);
            }

            let record = match table.get_mut(child) {
                Some(record) => record,
                None => unreachable!("un-joined child {} missing from the table", child),
            };

            match record.state {
                ProcessState::Exited(status) => {
                    let reclaimed = table.remove(child);
                    drop(table);
                    drop(reclaimed);
                    log::debug!("[JOIN] PID {} collected {} ({:?})", caller, child, status);
                    return Ok(status);
                }
                ProcessState::Running => match record.waiter {
                    Some(other) if other != task => {
                        // Only the parent's own task may wait on its child.
                        return Err(ProcessError::InvalidJoin);
                    }
                    _ => record.waiter = Some(task),
                },
            }

            drop(table);
            log::debug!("[JOIN] PID {} ({}) waits for {}", caller, task, child);
            self.scheduler.block_current();
        }
    }
}
