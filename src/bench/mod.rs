//! Latency comparison runner
//!
//! For every target server and every endpoint, fire `concurrent` calls at
//! once, wait for all of them, and record how long the batch took. Failed
//! calls do not abort a batch; they are kept as `"Error: ..."` entries so
//! the batch size stays visible in the report.
//!
//! With the default 2000 ms delay and `concurrent` below the worker count,
//! every route finishes a batch in about one delay. Push `concurrent` past
//! the event loop's worker count and its blocking routes (`servicesync`,
//! `serviceblock`, `clientsync`) start taking `ceil(concurrent / workers) × delay`.
//! The thread-per-request server keeps them at one delay up to its pool size.

use chrono::{DateTime, Utc};
use colored::Colorize;
use std::fmt::Write as _;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::client::{fanout::fan_out, PersonClient};
use crate::{PocError, Result};

/// Placeholder replaced by the call index in endpoint templates
pub const ID_PLACEHOLDER: &str = "{id}";

/// A server to benchmark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub base_url: String,
}

impl Target {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }
}

/// Parses `name=url`
impl FromStr for Target {
    type Err = PocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
                Ok(Target::new(name.trim(), url.trim()))
            }
            _ => Err(PocError::InvalidInput(format!(
                "Expected NAME=URL for a target, got {:?}",
                s
            ))),
        }
    }
}

/// What to run
#[derive(Debug, Clone)]
pub struct BenchPlan {
    pub targets: Vec<Target>,
    /// Templates relative to `/persons`, e.g. `/{id}/service`
    pub endpoints: Vec<String>,
    /// Calls fired at once per endpoint
    pub concurrent: usize,
}

impl Default for BenchPlan {
    fn default() -> Self {
        Self {
            targets: vec![
                Target::new("EventLoop", "http://localhost:8082"),
                Target::new("ThreadPerRequest", "http://localhost:8081"),
            ],
            endpoints: default_endpoints(),
            concurrent: 1,
        }
    }
}

pub fn default_endpoints() -> Vec<String> {
    ["service", "serviceblock", "servicesync", "client", "clientsync"]
        .iter()
        .map(|action| format!("/{}/{}", ID_PLACEHOLDER, action))
        .collect()
}

/// Outcome of one endpoint on one target
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub target: String,
    pub endpoint: String,
    pub calls: usize,
    pub errors: usize,
    pub first_error: Option<String>,
    /// One entry per call, in call order; failures as `"Error: ..."` strings
    pub results: Vec<serde_json::Value>,
    pub elapsed: Duration,
}

/// All batches of one target
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub target: Target,
    pub batches: Vec<BatchReport>,
    pub elapsed: Duration,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct BenchSummary {
    pub started_at: DateTime<Utc>,
    pub concurrent: usize,
    pub targets: Vec<TargetReport>,
    pub elapsed: Duration,
}

impl BenchSummary {
    pub fn total_errors(&self) -> usize {
        self.targets
            .iter()
            .flat_map(|t| t.batches.iter())
            .map(|b| b.errors)
            .sum()
    }

    /// Human readable table
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} started {} with {} concurrent call(s)",
            "Bench".bold(),
            self.started_at.to_rfc3339(),
            self.concurrent
        );

        for target in &self.targets {
            let _ = writeln!(
                out,
                "\n{} {} ({} ms)",
                target.target.name.bold().cyan(),
                target.target.base_url,
                target.elapsed.as_millis()
            );
            for batch in &target.batches {
                let errors = if batch.errors == 0 {
                    "0 errors".green()
                } else {
                    format!("{} errors", batch.errors).red()
                };
                let _ = writeln!(
                    out,
                    "  {:<24} {:>4} calls {:>8} ms  {}",
                    batch.endpoint,
                    batch.calls,
                    batch.elapsed.as_millis(),
                    errors
                );
            }
        }

        let _ = writeln!(out, "\n{} {} ms", "Total".bold(), self.elapsed.as_millis());
        out
    }
}

/// Runs a [`BenchPlan`]
pub struct BenchRunner {
    client: PersonClient,
    plan: BenchPlan,
}

impl BenchRunner {
    pub fn new(plan: BenchPlan) -> Result<Self> {
        let first = plan
            .targets
            .first()
            .ok_or_else(|| PocError::InvalidInput("Bench plan has no targets".to_string()))?;
        let client = PersonClient::new(&first.base_url)?;
        Ok(Self { client, plan })
    }

    /// Use a preconfigured client (timeouts etc.); its base URL is replaced per target
    pub fn with_client(mut self, client: PersonClient) -> Self {
        self.client = client;
        self
    }

    pub fn plan(&self) -> &BenchPlan {
        &self.plan
    }

    pub async fn run(&self) -> Result<BenchSummary> {
        let started_at = Utc::now();
        let start_all = Instant::now();
        info!(">>>>>>>>>>>> Start all");

        let mut targets = Vec::with_capacity(self.plan.targets.len());
        for target in &self.plan.targets {
            let start_target = Instant::now();
            info!(">>>>>>>> Start for {}, on {}", target.name, target.base_url);

            let client = self.client.with_base_url(&target.base_url)?;
            let mut batches = Vec::with_capacity(self.plan.endpoints.len());
            for endpoint in &self.plan.endpoints {
                batches.push(run_batch(&client, &target.name, endpoint, self.plan.concurrent).await);
            }

            let elapsed = start_target.elapsed();
            info!(">>>>>>>> End for {} on {} ms", target.name, elapsed.as_millis());
            targets.push(TargetReport {
                target: target.clone(),
                batches,
                elapsed,
            });
        }

        let elapsed = start_all.elapsed();
        info!(">>>>>>>>>>>> End all on {} ms", elapsed.as_millis());
        Ok(BenchSummary {
            started_at,
            concurrent: self.plan.concurrent,
            targets,
            elapsed,
        })
    }
}

/// Fire `concurrent` calls of one endpoint at once and wait for all of them
pub async fn run_batch(
    client: &PersonClient,
    target: &str,
    endpoint: &str,
    concurrent: usize,
) -> BatchReport {
    let paths: Vec<String> = (0..concurrent)
        .map(|i| endpoint.replace(ID_PLACEHOLDER, &i.to_string()))
        .collect();

    info!(">>>> Running for {}, endpoint {}, on {}", target, endpoint, client.base_url());
    let start = Instant::now();

    let outcomes = fan_out(paths.iter(), concurrent, |path| client.retrieve_via_endpoint(path)).await;
    let elapsed = start.elapsed();

    let mut errors = 0;
    let mut first_error = None;
    let results: Vec<serde_json::Value> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(value) => value,
            Err(e) => {
                errors += 1;
                let entry = format!("Error: {}", e);
                first_error.get_or_insert_with(|| entry.clone());
                serde_json::Value::String(entry)
            }
        })
        .collect();

    if let Some(e) = &first_error {
        error!(">>>> ERROR: {}", e);
    }
    info!(
        ">>>> Finished {} calls for {}, endpoint {}... on {} ms",
        results.len(),
        target,
        endpoint,
        elapsed.as_millis()
    );

    BatchReport {
        target: target.to_string(),
        endpoint: endpoint.to_string(),
        calls: results.len(),
        errors,
        first_error,
        results,
        elapsed,
    }
}
