//! System call handlers.
//!
//! This module implements the handlers for each system call.

use super::{SyscallContext, SyscallError, SyscallNumber, SyscallResult, UserMemory};
use crate::loader::ImageLoader;
use crate::process::{ExitStatus, ProcessId, ProcessManager};
use crate::scheduler::Scheduler;

impl<L: ImageLoader, S: Scheduler> ProcessManager<L, S> {
    /// Handle a system call.
    pub(super) fn handle(
        &self,
        caller: ProcessId,
        syscall: SyscallNumber,
        ctx: &SyscallContext,
        mem: &mut dyn UserMemory,
    ) -> SyscallResult {
        match syscall {
            SyscallNumber::Halt => self.handle_halt(caller),
            SyscallNumber::Exit => self.handle_exit(caller, ctx),
            SyscallNumber::Exec => self.handle_exec(caller, ctx, mem),
            SyscallNumber::Join => self.handle_join(caller, ctx, mem),
        }
    }

    /// Kill `caller` after an unhandled user exception.
    ///
    /// Called by the trap code instead of returning to user mode.
    pub fn handle_user_exception(&self, caller: ProcessId) -> ! {
        if let Err(e) = self.terminate_abnormally(caller) {
            log::warn!("[SYSCALL] Exception in PID {} with no live record: {}", caller, e);
        }
        self.scheduler().exit_current()
    }

    /// Stop the machine.
    fn handle_halt(&self, caller: ProcessId) -> SyscallResult {
        self.halt(caller)?;
        Ok(0)
    }

    /// Exit the current process.
    fn handle_exit(&self, caller: ProcessId, ctx: &SyscallContext) -> ! {
        let status = ctx.arg1 as i32;
        if let Err(e) = self.exit(caller, status) {
            log::warn!("[SYSCALL] exit by PID {} with no live record: {}", caller, e);
        }
        self.scheduler().exit_current()
    }

    /// Execute a program.
    ///
    /// arg1 = name pointer, arg2 = argc, arg3 = argv pointer (unused).
    fn handle_exec(&self, caller: ProcessId, ctx: &SyscallContext, mem: &mut dyn UserMemory) -> SyscallResult {
        let name = mem
            .read_cstr(ctx.arg1, self.config().max_name_len)
            .ok_or(SyscallError::InvalidArgument)?;
        let argc = ctx.arg2 as i32;

        let pid = self.exec(caller, &name, argc)?;
        Ok(pid.as_u32() as u64)
    }

    /// Wait for a child process.
    ///
    /// arg1 = child PID, arg2 = status pointer. Returns 1 when the child
    /// called `exit` (its status is stored at arg2) and 0 when it was killed.
    fn handle_join(&self, caller: ProcessId, ctx: &SyscallContext, mem: &mut dyn UserMemory) -> SyscallResult {
        let child = ProcessId::from_raw(ctx.arg1 as i32 as i64).ok_or(SyscallError::InvalidJoin)?;

        match self.join(caller, child)? {
            ExitStatus::Code(code) => {
                if !mem.write_i32(ctx.arg2, code) {
                    log::warn!(
                        "[SYSCALL] PID {} joined {} but status slot {:#x} is not writable",
                        caller,
                        child,
                        ctx.arg2
                    );
                    return Err(SyscallError::InvalidArgument);
                }
                Ok(1)
            }
            ExitStatus::Abnormal => Ok(0),
        }
    }
}
