//! Benchmark Driver
//!
//! Closed-loop workers pushing workload windows through a shared [`KvClient`] until a
//! deadline, then totalling completed operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::client::KvClient;
use crate::config::ClientConfig;
use crate::error::{KvError, Result};
use crate::workload::{Workload, WorkloadKind, YcsbWorkload};

// == Bench Plan ==
/// Shape of one benchmark run.
#[derive(Debug, Clone)]
pub struct BenchPlan {
    pub workers: usize,
    pub duration: Duration,
    pub workload: WorkloadKind,
    pub key_space: u64,
    pub value_size: usize,
}

impl BenchPlan {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            workers: config.num_clients.max(1),
            duration: Duration::from_secs(config.bench_secs),
            workload: config.workload,
            key_space: config.key_space,
            value_size: config.value_size,
        }
    }
}

// == Bench Report ==
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchReport {
    pub total_ops: u64,
    pub elapsed: Duration,
    pub ops_per_sec: f64,
}

impl BenchReport {
    fn new(total_ops: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        Self {
            total_ops,
            elapsed,
            ops_per_sec: if secs > 0.0 { total_ops as f64 / secs } else { 0.0 },
        }
    }
}

// == Worker ==
/// Runs windows until `stop` is set and returns how many operations completed.
///
/// The flag is only checked between windows, so a window in flight always finishes.
pub async fn run_worker(
    client: Arc<KvClient>,
    mut workload: Box<dyn Workload>,
    value: String,
    stop: Arc<AtomicBool>,
) -> Result<u64> {
    let mut completed = 0u64;
    while !stop.load(Ordering::Relaxed) {
        let window = client.aggregator().fill_window(workload.as_mut(), &value);
        let n = window.len() as u64;
        client.execute_window(window).await?;
        completed += n;
        // A window answered entirely from the client cache never awaits.
        tokio::task::yield_now().await;
    }
    Ok(completed)
}

// == Run Benchmark ==
/// Starts `plan.workers` workers, stops them after `plan.duration`, and sums their work.
///
/// A failing worker stops the whole run; its error is returned once every worker is done.
pub async fn run_benchmark(client: Arc<KvClient>, plan: &BenchPlan) -> Result<BenchReport> {
    let stop = Arc::new(AtomicBool::new(false));
    let value = "x".repeat(plan.value_size);
    let started = Instant::now();

    info!(
        "Running {} with {} workers for {:?}",
        plan.workload, plan.workers, plan.duration
    );

    let mut workers = JoinSet::new();
    for _ in 0..plan.workers {
        let workload = Box::new(YcsbWorkload::new(plan.workload, plan.key_space));
        let stop = stop.clone();
        let client = client.clone();
        let value = value.clone();
        workers.spawn(async move {
            let outcome = run_worker(client, workload, value, stop.clone()).await;
            if outcome.is_err() {
                stop.store(true, Ordering::Relaxed);
            }
            outcome
        });
    }

    let deadline = {
        let stop = stop.clone();
        let duration = plan.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            stop.store(true, Ordering::Relaxed);
        })
    };

    let mut total_ops = 0u64;
    let mut first_err: Option<KvError> = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(ops)) => total_ops += ops,
            Ok(Err(e)) => {
                error!("Worker failed: {}", e);
                first_err.get_or_insert(e);
            }
            Err(e) => {
                first_err.get_or_insert(KvError::Internal(format!("worker panicked: {}", e)));
            }
        }
    }
    deadline.abort();

    if let Some(e) = first_err {
        return Err(e);
    }

    let report = BenchReport::new(total_ops, started.elapsed());
    info!(
        "Completed {} ops in {:.2}s: {:.0} ops/s",
        report.total_ops,
        report.elapsed.as_secs_f64(),
        report.ops_per_sec
    );
    Ok(report)
}
