//! Runs a workload with concurrent virtual users and prints a summary.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sketches_ddsketch::DDSketch;
use yansi::Paint;

use crate::config::Config;
use crate::http::Transport;
use crate::random;
use crate::request::{Operation, VuId};
use crate::workload::Driver;

/// Runs `driver` against `transport` with [`Config::vus`] concurrent virtual users.
///
/// Every virtual user repeatedly generates one request and awaits its response until
/// [`Config::duration`] elapsed or the shared [`Config::iterations`] budget is used up. Requests
/// that are in flight when the deadline passes are allowed to complete.
pub async fn run<D, T>(transport: Arc<T>, driver: Arc<D>, config: &Config) -> Result<Summary>
where
    D: Driver + 'static,
    T: Transport,
{
    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message(format!("Running {} virtual users:", config.vus));
    bar.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let deadline = tokio::time::Instant::now() + config.duration;
    let budget = config.iterations.map(|n| Arc::new(AtomicU64::new(n)));

    let tasks: Vec<_> = (1..=config.vus)
        .map(|vu| {
            let virtual_user = VirtualUser {
                id: VuId(vu),
                seed: rand::random(),
                deadline,
                budget: budget.clone(),
            };
            tokio::spawn(virtual_user.run(Arc::clone(&transport), Arc::clone(&driver)))
        })
        .collect();

    let finished_tasks = futures::future::join_all(tasks).await;
    bar.finish_and_clear();

    let mut summary = Summary {
        vus: config.vus,
        elapsed: start.elapsed(),
        ..Default::default()
    };
    for task in finished_tasks {
        let metrics = task.context("virtual user panicked")?;
        summary.merge(&metrics)?;
    }

    tracing::debug!(
        iterations = summary.iterations(),
        elapsed = ?summary.elapsed,
        "run finished"
    );

    Ok(summary)
}

/// Tries to take one iteration from the shared budget.
fn take_iteration(budget: &AtomicU64) -> bool {
    budget
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        .is_ok()
}

struct VirtualUser {
    id: VuId,
    seed: u64,
    deadline: tokio::time::Instant,
    budget: Option<Arc<AtomicU64>>,
}

impl VirtualUser {
    async fn run<D, T>(self, transport: Arc<T>, driver: Arc<D>) -> Summary
    where
        D: Driver + 'static,
        T: Transport,
    {
        let mut rng = random::seeded(self.seed);
        let mut metrics = Summary::default();

        while tokio::time::Instant::now() < self.deadline {
            let within_budget = match &self.budget {
                Some(budget) => take_iteration(budget),
                None => true,
            };
            if !within_budget {
                break;
            }

            let request = driver.next_request(self.id, &mut rng);
            let operation = request.operation();

            let start = Instant::now();
            let result = transport.send(&request).await;
            let latency = start.elapsed();

            let succeeded = match result {
                Ok(status) if status.is_success() => true,
                Ok(status) => {
                    tracing::debug!(vu = %self.id, key = request.key(), %status, "{operation} failed");
                    false
                }
                Err(err) => {
                    tracing::debug!(
                        vu = %self.id,
                        key = request.key(),
                        error = &err as &dyn std::error::Error,
                        "{operation} failed"
                    );
                    false
                }
            };

            metrics.operation_mut(operation).record(latency, succeeded);
        }

        metrics
    }
}

/// Latency and failures of one kind of operation.
#[derive(Default)]
pub struct OperationMetrics {
    /// Latency of every completed request in seconds, including failed ones.
    pub timing: DDSketch,
    /// Requests that errored or returned a non-success status.
    pub failures: u64,
}

impl OperationMetrics {
    fn record(&mut self, latency: Duration, succeeded: bool) {
        self.timing.add(latency.as_secs_f64());
        if !succeeded {
            self.failures += 1;
        }
    }

    fn merge(&mut self, other: &Self) -> Result<()> {
        self.timing
            .merge(&other.timing)
            .map_err(|err| anyhow::anyhow!("failed to merge latency sketches: {err:?}"))?;
        self.failures += other.failures;
        Ok(())
    }

    /// Number of requests sent, including failures.
    pub fn count(&self) -> u64 {
        self.timing.count() as u64
    }
}

impl fmt::Debug for OperationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationMetrics")
            .field("count", &self.count())
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

/// Aggregated results of a run.
#[derive(Debug, Default)]
pub struct Summary {
    /// Number of virtual users that took part.
    pub vus: u32,
    /// Wall-clock time of the run, including the drain of in-flight requests.
    pub elapsed: Duration,
    /// Results of `GET /read` requests.
    pub reads: OperationMetrics,
    /// Results of `POST /create` requests.
    pub creates: OperationMetrics,
}

impl Summary {
    /// Total number of completed iterations.
    pub fn iterations(&self) -> u64 {
        self.reads.count() + self.creates.count()
    }

    /// Total number of failed iterations.
    pub fn failures(&self) -> u64 {
        self.reads.failures + self.creates.failures
    }

    /// Metrics for the given kind of operation.
    pub fn operation(&self, operation: Operation) -> &OperationMetrics {
        match operation {
            Operation::Read => &self.reads,
            Operation::Create => &self.creates,
        }
    }

    fn operation_mut(&mut self, operation: Operation) -> &mut OperationMetrics {
        match operation {
            Operation::Read => &mut self.reads,
            Operation::Create => &mut self.creates,
        }
    }

    fn merge(&mut self, other: &Self) -> Result<()> {
        self.reads.merge(&other.reads)?;
        self.creates.merge(&other.creates)?;
        Ok(())
    }
}

/// Prints the summary of a run to stdout.
pub fn print_summary(name: &str, summary: &Summary) {
    println!();
    println!(
        "{} {} (vus: {}, elapsed: {:.2?})",
        "## Workload".bold(),
        name.bold().blue(),
        summary.vus.bold(),
        summary.elapsed
    );

    for operation in [Operation::Read, Operation::Create] {
        let metrics = summary.operation(operation);
        if metrics.count() == 0 {
            continue;
        }

        print!(
            "{} ({} ops",
            format!("{operation}:").bold().green(),
            metrics.count().bold()
        );
        if metrics.failures > 0 {
            print!(
                ", {}",
                format!("{} FAILURES", metrics.failures).bold().red()
            );
        }
        println!(")");
        print_ops(&metrics.timing, summary.elapsed);
        println!();
        print_percentiles(&metrics.timing, Duration::from_secs_f64);
    }

    println!();
    println!(
        "{} {} iterations, {} failed",
        "## TOTALS".bold(),
        summary.iterations().bold(),
        summary.failures().bold()
    );
}

fn print_percentiles<T: fmt::Debug>(sketch: &DDSketch, map: impl Fn(f64) -> T) {
    let ops = sketch.count();
    let avg = map(sketch.sum().unwrap_or_default() / ops as f64);
    let quantile = |q| map(sketch.quantile(q).ok().flatten().unwrap_or_default());
    let p50 = quantile(0.5);
    let p90 = quantile(0.9);
    let p99 = quantile(0.99);
    println!(
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    );
}

fn print_ops(sketch: &DDSketch, duration: Duration) {
    let ops = sketch.count();
    let ops_ps = ops as f64 / duration.as_secs_f64();
    print!("  {:.2} operations/s", ops_ps.bold());
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::StatusCode;

    use crate::error::Error;
    use crate::request::Request;
    use crate::workload::{MixedWorkloadGenerator, PopularKeyReader, WriteOnlyGenerator};

    use super::*;

    /// Records every request and answers with a fixed status.
    #[derive(Debug)]
    struct Recorder {
        status: Option<StatusCode>,
        requests: Mutex<Vec<(VuId, Request)>>,
    }

    impl Recorder {
        fn new(status: Option<StatusCode>) -> Arc<Self> {
            Arc::new(Self {
                status,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<Request> {
            let requests = self.requests.lock().unwrap();
            requests.iter().map(|(_, r)| r.clone()).collect()
        }
    }

    #[async_trait::async_trait]
    impl Transport for Recorder {
        async fn send(&self, request: &Request) -> crate::Result<StatusCode> {
            let vu = match request {
                Request::Create { value, .. } => {
                    let id = value.split('-').nth(1).unwrap().parse().unwrap();
                    VuId(id)
                }
                Request::Read { .. } => VuId(0),
            };
            self.requests.lock().unwrap().push((vu, request.clone()));
            tokio::task::yield_now().await;

            match self.status {
                Some(status) => Ok(status),
                None => Err(Error::InvalidUrl(url::ParseError::EmptyHost)),
            }
        }
    }

    fn config(vus: u32, iterations: u64) -> Config {
        Config {
            vus,
            iterations: Some(iterations),
            duration: Duration::from_secs(30),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn stops_after_iteration_budget() {
        let transport = Recorder::new(Some(StatusCode::OK));
        let driver = Arc::new(PopularKeyReader { hot_key_max: 3000 });

        let summary = run(transport.clone(), driver, &config(4, 100))
            .await
            .unwrap();

        assert_eq!(summary.iterations(), 100);
        assert_eq!(summary.reads.count(), 100);
        assert_eq!(summary.failures(), 0);
        assert_eq!(summary.vus, 4);

        let requests = transport.requests();
        assert_eq!(requests.len(), 100);
        assert!(requests.iter().all(|r| r.path() == "/read"));
    }

    #[tokio::test]
    async fn stops_at_deadline() {
        let transport = Recorder::new(Some(StatusCode::OK));
        let driver = Arc::new(WriteOnlyGenerator { keyspace: 10 });
        let config = Config {
            vus: 2,
            duration: Duration::from_millis(50),
            ..Default::default()
        };

        let summary = run(transport.clone(), driver, &config).await.unwrap();

        assert!(summary.creates.count() > 0);
        assert_eq!(summary.reads.count(), 0);
        assert!(summary.elapsed >= Duration::from_millis(50));
        assert_eq!(transport.requests().len() as u64, summary.iterations());
    }

    #[tokio::test]
    async fn each_vu_writes_its_own_values() {
        let transport = Recorder::new(Some(StatusCode::OK));
        let driver = Arc::new(WriteOnlyGenerator { keyspace: 10 });

        run(transport.clone(), driver, &config(3, 60)).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 60);
        for (vu, request) in requests.iter() {
            assert!((1..=3).contains(&vu.0), "{request:?}");
            let Request::Create { value, .. } = request else {
                panic!("expected a create request");
            };
            assert!(value.starts_with(&format!("val-{vu}-")));
        }
    }

    #[tokio::test]
    async fn counts_failed_statuses() {
        let transport = Recorder::new(Some(StatusCode::NOT_FOUND));
        let driver = Arc::new(PopularKeyReader { hot_key_max: 10 });

        let summary = run(transport, driver, &config(2, 20)).await.unwrap();

        assert_eq!(summary.reads.count(), 20);
        assert_eq!(summary.reads.failures, 20);
        assert_eq!(summary.creates.failures, 0);
    }

    #[tokio::test]
    async fn counts_transport_errors() {
        let transport = Recorder::new(None);
        let driver = Arc::new(MixedWorkloadGenerator {
            keyspace: 10,
            get_ratio: 0.0,
            put_ratio: 1.0,
        });

        let summary = run(transport, driver, &config(1, 5)).await.unwrap();

        assert_eq!(summary.creates.count(), 5);
        assert_eq!(summary.creates.failures, 5);
        assert_eq!(summary.reads.count(), 0);
    }

    #[test]
    fn iteration_budget_is_exhaustible() {
        let budget = AtomicU64::new(2);
        assert!(take_iteration(&budget));
        assert!(take_iteration(&budget));
        assert!(!take_iteration(&budget));
        assert_eq!(budget.load(Ordering::Relaxed), 0);
    }
}
