//! End-to-end scenarios
//!
//! Whole programs running on the simulated machine and talking to the
//! kernel through `userlib`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kproc_e2e_tests::fixtures::{swap_status, WRITE10_STATUS};
use kproc_e2e_tests::{run, Fixtures, Machine, MachineConfig, ProgramRegistry, Transcript, DEFAULT_TIMEOUT};
use kproc_kernel::KernelConfig;
use userlib::prelude::*;

fn machine(transcript: &Transcript, extra: impl FnOnce(ProgramRegistry) -> ProgramRegistry) -> Machine {
    machine_with(MachineConfig::default(), transcript, extra)
}

fn machine_with(
    config: MachineConfig,
    transcript: &Transcript,
    extra: impl FnOnce(ProgramRegistry) -> ProgramRegistry,
) -> Machine {
    let registry = Fixtures::standard(ProgramRegistry::new(), transcript);
    Machine::new(config, extra(registry))
}

/// PID printed by an `"<who>: exec <name> -> <pid>"` line.
fn exec_pids(transcript: &Transcript, who: &str, name: &str) -> Vec<u32> {
    let prefix = format!("{}: exec {} -> ", who, name);
    transcript
        .matching(&prefix)
        .iter()
        .map(|line| line[prefix.len()..].parse().unwrap())
        .collect()
}

#[test]
fn exec_then_join_reports_exit_status() {
    let transcript = Transcript::new();
    let t = transcript.clone();
    let machine = machine(&transcript, |r| {
        r.program("init.coff", 4, move |trap| {
            let pid = exec(trap, "write10.coff", &[]).unwrap();
            let status = join(trap, pid).unwrap();
            t.log(format!("init: {:?}", status));
            0
        })
    });

    let report = run(&machine, "init.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(
        transcript.matching("init:"),
        vec![format!("init: {:?}", JoinStatus::Exited(WRITE10_STATUS))]
    );
    assert_eq!(transcript.matching("write10[").len(), 10);
}

#[test]
fn exec1_joins_children_in_order() {
    let transcript = Transcript::new();
    let machine = machine(&transcript, |r| r);

    let report = run(&machine, "exec1.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);

    let pids = exec_pids(&transcript, "exec1", "write10.coff");
    assert_eq!(pids.len(), 3);
    let mut distinct = pids.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), 3, "PID reused across children: {:?}", pids);
    let joined: Vec<_> = transcript.matching("exec1: joined");
    let expected: Vec<_> = pids
        .iter()
        .map(|pid| format!("exec1: joined {} status {}", pid, WRITE10_STATUS))
        .collect();
    assert_eq!(joined, expected);
}

#[test]
fn exec3_statuses_belong_to_their_instances() {
    let transcript = Transcript::new();
    let machine = machine(&transcript, |r| r);

    let report = run(&machine, "exec3.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);

    let swap4 = exec_pids(&transcript, "exec3", "swap4.coff")[0];
    let swap5 = exec_pids(&transcript, "exec3", "swap5.coff")[0];
    assert_ne!(swap4, swap5);
    let joined = transcript.matching("exec3: joined");
    assert!(joined.contains(&format!("exec3: joined {} status {}", swap4, swap_status(4, swap4))));
    assert!(joined.contains(&format!("exec3: joined {} status {}", swap5, swap_status(5, swap5))));
}

#[test]
fn exec9_unjoined_children_are_reclaimed() {
    let transcript = Transcript::new();
    let machine = machine(&transcript, |r| r);

    let report = run(&machine, "exec9.coff", DEFAULT_TIMEOUT).unwrap();
    // The machine only halts after the last orphan has exited.
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(exec_pids(&transcript, "exec9", "write10.coff").len(), 6);
    assert_eq!(transcript.matching("write10[").len(), 60);
}

#[test]
fn multitest_runs_nested_programs() {
    let transcript = Transcript::new();
    let machine = machine(&transcript, |r| r);

    let report = run(&machine, "multitest.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);

    let joined = transcript.matching("multitest: joined");
    assert_eq!(joined.len(), 7);
    assert!(joined.iter().all(|line| !line.contains("killed")));
    // The nested exec1 and exec3 report success through their own status.
    assert_eq!(transcript.matching("exec1: joined").len(), 3);
    assert_eq!(transcript.matching("exec3: joined").len(), 2);
    assert!(transcript.matching("multitest: join").iter().all(|l| !l.contains("failed")));
}

#[test]
fn concurrent_instances_of_one_image() {
    const K: usize = 8;
    let transcript = Transcript::new();
    let t = transcript.clone();
    let machine = machine(&transcript, |r| {
        r.program("init.coff", 4, move |trap| {
            let pids: Vec<u32> = (0..K).map(|_| exec(trap, "swap4.coff", &[]).unwrap()).collect();
            for pid in pids.iter().rev() {
                match join(trap, *pid) {
                    Ok(JoinStatus::Exited(code)) if code == swap_status(4, *pid) => {}
                    other => t.log(format!("init: {} gave {:?}", pid, other)),
                }
            }
            let mut unique = pids.clone();
            unique.sort();
            unique.dedup();
            t.log(format!("init: {} distinct", unique.len()));
            0
        })
    });

    let report = run(&machine, "init.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(transcript.matching("init:"), vec![format!("init: {} distinct", K)]);
}

#[test]
fn join_sleeps_until_child_exits() {
    let transcript = Transcript::new();
    let t = transcript.clone();
    let machine = machine(&transcript, |r| {
        r.program("slow.coff", 2, |_| {
            thread::sleep(Duration::from_millis(50));
            7
        })
        .program("init.coff", 4, move |trap| {
            let pid = exec(trap, "slow.coff", &[]).unwrap();
            t.log(format!("init: {:?}", join(trap, pid)));
            0
        })
    });

    let report = run(&machine, "init.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(
        transcript.matching("init:"),
        vec![format!("init: {:?}", Ok::<_, SyscallError>(JoinStatus::Exited(7)))]
    );
}

#[test]
fn exception_is_reported_as_abnormal_exit() {
    let transcript = Transcript::new();
    let t = transcript.clone();
    let machine = machine(&transcript, |r| {
        r.program("init.coff", 4, move |trap| {
            let pid = exec(trap, "abort.coff", &[]).unwrap();
            t.log(format!("init: {:?}", join(trap, pid)));
            0
        })
    });

    let report = run(&machine, "init.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(
        transcript.matching("init:"),
        vec![format!("init: {:?}", Ok::<_, SyscallError>(JoinStatus::Killed))]
    );
}

#[test]
fn invalid_joins_are_refused() {
    let transcript = Transcript::new();
    let t = transcript.clone();
    let machine = machine(&transcript, |r| {
        r.program("peek.coff", 2, |trap| {
            // PID 0 is the parent here, not a child.
            match join(trap, 0) {
                Err(SyscallError::InvalidJoin) => 0,
                _ => 1,
            }
        })
        .program("init.coff", 4, move |trap| {
            let me = trap.pid().as_u32();
            t.log(format!("self {:?}", join(trap, me)));
            t.log(format!("stranger {:?}", join(trap, 4242)));

            let child = exec(trap, "peek.coff", &[]).unwrap();
            t.log(format!("first {:?}", join(trap, child)));
            t.log(format!("again {:?}", join(trap, child)));
            0
        })
    });

    let report = run(&machine, "init.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    let invalid = format!("{:?}", Err::<JoinStatus, _>(SyscallError::InvalidJoin));
    assert_eq!(
        transcript.lines(),
        vec![
            format!("self {}", invalid),
            format!("stranger {}", invalid),
            format!("first {:?}", Ok::<_, SyscallError>(JoinStatus::Exited(0))),
            format!("again {}", invalid),
        ]
    );
}

#[test]
fn only_root_may_halt() {
    let transcript = Transcript::new();
    let t = transcript.clone();
    let machine = machine_with(
        MachineConfig {
            kernel: KernelConfig::new().with_halt_when_idle(false),
            ..MachineConfig::default()
        },
        &transcript,
        |r| {
            r.program("rogue.coff", 2, |trap| match halt(trap) {
                Err(SyscallError::PermissionDenied) => 0,
                _ => 1,
            })
            .program("init.coff", 4, move |trap| {
                let pid = exec(trap, "rogue.coff", &[]).unwrap();
                t.log(format!("rogue {:?}", join(trap, pid)));
                t.log(format!("halt {:?}", halt(trap)));
                0
            })
        },
    );

    let report = run(&machine, "init.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(
        transcript.lines(),
        vec![
            format!("rogue {:?}", Ok::<_, SyscallError>(JoinStatus::Exited(0))),
            format!("halt {:?}", Ok::<_, SyscallError>(())),
        ]
    );
}

#[test]
fn failed_exec_reports_errors_and_leaves_nothing() {
    let transcript = Transcript::new();
    let t = transcript.clone();
    let machine = machine_with(
        MachineConfig {
            physical_pages: 40,
            ..MachineConfig::default()
        },
        &transcript,
        |r| {
            r.corrupt("broken.coff", "overlapping sections")
                .program("huge.coff", 64, |_| 0)
                .program("init.coff", 4, move |trap| {
                    for name in ["missing.coff", "broken.coff", "huge.coff", "write10", ""] {
                        t.log(format!("{} {:?}", name, exec(trap, name, &[])));
                    }
                    let pid = exec(trap, "write10.coff", &[]).unwrap();
                    t.log(format!("write10.coff {:?}", join(trap, pid)));
                    0
                })
        },
    );

    let report = run(&machine, "init.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(
        transcript.matching("missing.coff"),
        vec![format!("missing.coff {:?}", Err::<u32, _>(SyscallError::NotFound))]
    );
    assert_eq!(
        transcript.matching("broken.coff"),
        vec![format!("broken.coff {:?}", Err::<u32, _>(SyscallError::LoadFailure))]
    );
    assert_eq!(
        transcript.matching("huge.coff"),
        vec![format!("huge.coff {:?}", Err::<u32, _>(SyscallError::ResourceExhausted))]
    );
    assert_eq!(
        transcript.matching("write10 "),
        vec![format!("write10 {:?}", Err::<u32, _>(SyscallError::InvalidArgument))]
    );
    assert_eq!(
        transcript.matching("write10.coff"),
        vec![format!(
            "write10.coff {:?}",
            Ok::<_, SyscallError>(JoinStatus::Exited(WRITE10_STATUS))
        )]
    );
}

#[test]
fn task_limit_is_resource_exhaustion() {
    let transcript = Transcript::new();
    let t = transcript.clone();
    let release = Arc::new(AtomicBool::new(false));
    let gate = release.clone();
    let machine = machine_with(
        MachineConfig {
            max_tasks: 2,
            ..MachineConfig::default()
        },
        &transcript,
        |r| {
            r.program("gated.coff", 2, move |_| {
                while !gate.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
                0
            })
            .program("init.coff", 4, move |trap| {
                let first = exec(trap, "gated.coff", &[]).unwrap();
                // Root and the gated child occupy both task slots.
                t.log(format!("second {:?}", exec(trap, "write10.coff", &[])));
                release.store(true, Ordering::SeqCst);
                join(trap, first).unwrap();
                0
            })
        },
    );

    let report = run(&machine, "init.coff", DEFAULT_TIMEOUT).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(
        transcript.lines(),
        vec![format!("second {:?}", Err::<u32, _>(SyscallError::ResourceExhausted))]
    );
}

#[test]
fn orphan_outliving_its_parent_is_reclaimed() {
    let transcript = Transcript::new();
    let t = transcript.clone();
    let machine = machine(&transcript, |r| {
        r.program("slow.coff", 2, |_| {
            thread::sleep(Duration::from_millis(50));
            3
        })
        .program("orphaner.coff", 2, |trap| {
            exec(trap, "slow.coff", &[]).unwrap();
            0
        })
        .program("init.coff", 4, move |trap| {
            let pid = exec(trap, "orphaner.coff", &[]).unwrap();
            t.log(format!("orphaner {:?}", join(trap, pid)));
            0
        })
    });

    let report = run(&machine, "init.coff", DEFAULT_TIMEOUT).unwrap();
    // Root and orphaner are gone long before slow.coff; the halt waits for it.
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(
        transcript.lines(),
        vec![format!("orphaner {:?}", Ok::<_, SyscallError>(JoinStatus::Exited(0)))]
    );
}

#[test]
fn boot_rejects_missing_root_image() {
    let transcript = Transcript::new();
    let machine = machine(&transcript, |r| r);
    assert!(run(&machine, "nothing.coff", Duration::from_millis(10)).is_err());
    assert!(machine.kernel().list().is_empty());
    assert_eq!(machine.resident_pages(), 0);
}
