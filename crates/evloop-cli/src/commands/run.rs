//! `evloop run`: push a synthetic workload through one loop.
//!
//! The worker is held on a gate task while the workload is submitted, so the
//! per-lane tally reflects the bound rather than how fast the worker drains.

use anyhow::{bail, Context};
use crossbeam::channel::bounded;
use evloop_core::{EventLoop, LoopConfig, LoopStats, SubmitError, TaskHandle, TaskKind};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// How long to wait for any single accepted task
const TASK_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for the loop to stop
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub name: Option<String>,
    pub max_queue_size: Option<usize>,
    pub immediate: usize,
    pub delayed: usize,
    pub delay_ms: u64,
    pub json: bool,
}

/// Per-lane submission tally
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LaneTally {
    pub accepted: usize,
    pub rejected: usize,
}

impl LaneTally {
    fn admit<T>(
        &mut self,
        result: Result<TaskHandle<T>, SubmitError>,
        handles: &mut Vec<TaskHandle<T>>,
    ) -> anyhow::Result<()> {
        match result {
            Ok(handle) => {
                self.accepted += 1;
                handles.push(handle);
            }
            Err(err) if err.is_queue_full() => self.rejected += 1,
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}

/// What one `run` did
#[derive(Debug)]
pub struct RunReport {
    pub config: LoopConfig,
    pub immediate: LaneTally,
    pub delayed: LaneTally,
    /// Accepted tasks that did not resolve in time
    pub unresolved: usize,
    pub elapsed: Duration,
    /// Snapshot taken once every accepted task resolved; counts the gate task
    pub stats: LoopStats,
}

/// Spawn a loop, submit the workload, wait for it and shut the loop down
pub fn run_workload(args: &RunArgs) -> anyhow::Result<RunReport> {
    let config = super::resolve_config(
        args.config.as_deref(),
        args.name.clone(),
        args.max_queue_size,
    )?;
    let event_loop = EventLoop::with_config(config.clone()).context("Failed to start event loop")?;
    let delay = Duration::from_millis(args.delay_ms);
    let started = Instant::now();

    let (entered_tx, entered_rx) = bounded::<()>(1);
    let (release_tx, release_rx) = bounded::<()>(0);
    event_loop.execute(move || {
        let _ = entered_tx.send(());
        let _ = release_rx.recv();
    })?;
    entered_rx
        .recv_timeout(TASK_TIMEOUT)
        .context("Event loop never started the gate task")?;

    let mut handles = Vec::with_capacity(args.immediate + args.delayed);
    let mut immediate = LaneTally::default();
    let mut delayed = LaneTally::default();

    for i in 0..args.immediate {
        immediate.admit(event_loop.submit(TaskKind::Compute, move || i), &mut handles)?;
    }
    for i in 0..args.delayed {
        delayed.admit(
            event_loop.schedule(TaskKind::Io, move || i, delay),
            &mut handles,
        )?;
    }
    drop(release_tx);

    let mut unresolved = 0;
    for handle in handles {
        if handle.get_timeout(TASK_TIMEOUT).is_err() {
            unresolved += 1;
        }
    }
    let elapsed = started.elapsed();
    let stats = event_loop.stats();

    if !event_loop.shutdown().wait_timeout(SHUTDOWN_TIMEOUT) {
        bail!("Event loop '{}' did not terminate within {:?}", config.name, SHUTDOWN_TIMEOUT);
    }
    info!(loop_name = %config.name, ?elapsed, "workload finished");

    Ok(RunReport {
        config,
        immediate,
        delayed,
        unresolved,
        elapsed,
        stats,
    })
}

pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let report = run_workload(&args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        report.print();
    }
    Ok(())
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "config": self.config,
            "immediate": {
                "accepted": self.immediate.accepted,
                "rejected": self.immediate.rejected,
            },
            "delayed": {
                "accepted": self.delayed.accepted,
                "rejected": self.delayed.rejected,
            },
            "unresolved": self.unresolved,
            "elapsed_ms": self.elapsed.as_secs_f64() * 1000.0,
            "stats": self.stats,
        })
    }

    fn print(&self) {
        println!("Loop:           {}", self.config.name);
        println!("Max queue size: {}", self.config.max_queue_size);
        println!(
            "Immediate:      {} accepted, {} rejected",
            self.immediate.accepted, self.immediate.rejected
        );
        println!(
            "Delayed:        {} accepted, {} rejected",
            self.delayed.accepted, self.delayed.rejected
        );
        println!(
            "Executed:       {} ({} failed)",
            self.stats.executed(),
            self.stats.failed
        );
        if self.unresolved > 0 {
            println!("Unresolved:     {}", self.unresolved);
        }
        println!("Elapsed:        {:.2?}", self.elapsed);
    }
}
