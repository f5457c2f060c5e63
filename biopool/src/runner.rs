//! Run reports and the multi-seed batch runner.
//!
//! A single [`SimWorld::run`] yields a [`SimulationReport`]. The
//! [`BatchRunner`] builds one world per seed from a factory, runs each to the
//! same [`RunConfig`] and aggregates the results into a [`BatchReport`].

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::RunConfig;
use crate::error::SimulationResult;
use crate::sim::SimWorld;

/// Why a run returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The next entry lies past the horizon
    HorizonReached,
    /// A population fell to the continue threshold
    Extinction {
        /// Name of the first population found at or below the threshold
        population: String,
    },
    /// The queue ran dry
    QueueExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::HorizonReached => write!(f, "horizon reached"),
            StopReason::Extinction { population } => write!(f, "extinction of '{population}'"),
            StopReason::QueueExhausted => write!(f, "queue exhausted"),
        }
    }
}

/// Core metrics collected during a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    /// Wall-clock time taken for the simulation
    pub wall_time: Duration,
    /// Simulated time reached
    pub simulated_time: f64,
    /// Number of entries handled
    pub events_processed: u64,
    /// Entries dropped as exact repeats of the previous one
    pub duplicates_skipped: u64,
    /// Primary entries dropped because the actor's slot had moved on
    pub stale_skipped: u64,
    /// Entries refused before being queued
    pub events_rejected: u64,
}

impl SimulationMetrics {
    fn accumulate(&mut self, other: &SimulationMetrics) {
        self.wall_time += other.wall_time;
        self.simulated_time += other.simulated_time;
        self.events_processed += other.events_processed;
        self.duplicates_skipped += other.duplicates_skipped;
        self.stale_skipped += other.stale_skipped;
        self.events_rejected += other.events_rejected;
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Seed of the world
    pub seed: u64,
    /// Why the run returned
    pub stop_reason: StopReason,
    /// Counters, cumulative over every run of the same world
    pub metrics: SimulationMetrics,
    /// Population sizes at the end, in registration order
    pub final_sizes: Vec<(String, usize)>,
}

impl SimulationReport {
    /// Final size of a population.
    pub fn final_size(&self, population: &str) -> Option<usize> {
        self.final_sizes
            .iter()
            .find(|(name, _)| name == population)
            .map(|(_, size)| *size)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Report ===")?;
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(f, "Stop Reason: {}", self.stop_reason)?;
        writeln!(f, "Wall Time: {:?}", self.metrics.wall_time)?;
        writeln!(f, "Simulated Time: {:.4}", self.metrics.simulated_time)?;
        writeln!(f, "Events Processed: {}", self.metrics.events_processed)?;
        writeln!(
            f,
            "Skipped: {} duplicate, {} stale; Rejected: {}",
            self.metrics.duplicates_skipped, self.metrics.stale_skipped, self.metrics.events_rejected
        )?;
        writeln!(f)?;
        for (name, size) in &self.final_sizes {
            writeln!(f, "{name}: {size}")?;
        }
        Ok(())
    }
}

/// Aggregate of a batch of runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Number of iterations executed
    pub iterations: usize,
    /// Number of runs that built and ran
    pub successful_runs: usize,
    /// Number of runs whose world failed to build or run
    pub failed_runs: usize,
    /// Runs that stopped on extinction
    pub extinctions: usize,
    /// Metrics summed over successful runs
    pub metrics: SimulationMetrics,
    /// Report of every successful run
    pub reports: Vec<SimulationReport>,
    /// Seeds used for each iteration
    pub seeds_used: Vec<u64>,
    /// Seeds whose run failed
    pub seeds_failing: Vec<u64>,
}

impl BatchReport {
    /// Calculate the success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            (self.successful_runs as f64 / self.iterations as f64) * 100.0
        }
    }

    /// Share of successful runs that ended in extinction, as a percentage.
    pub fn extinction_rate(&self) -> f64 {
        if self.successful_runs == 0 {
            0.0
        } else {
            (self.extinctions as f64 / self.successful_runs as f64) * 100.0
        }
    }

    /// Get the average wall time per iteration.
    pub fn average_wall_time(&self) -> Duration {
        if self.successful_runs == 0 {
            Duration::ZERO
        } else {
            self.metrics.wall_time / self.successful_runs as u32
        }
    }

    /// Get the average simulated time per iteration.
    pub fn average_simulated_time(&self) -> f64 {
        if self.successful_runs == 0 {
            0.0
        } else {
            self.metrics.simulated_time / self.successful_runs as f64
        }
    }

    /// Get the average number of events processed per iteration.
    pub fn average_events_processed(&self) -> f64 {
        if self.successful_runs == 0 {
            0.0
        } else {
            self.metrics.events_processed as f64 / self.successful_runs as f64
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Batch Report ===")?;
        writeln!(f, "Iterations: {}", self.iterations)?;
        writeln!(f, "Successful: {}", self.successful_runs)?;
        writeln!(f, "Failed: {}", self.failed_runs)?;
        writeln!(f, "Success Rate: {:.2}%", self.success_rate())?;
        writeln!(f, "Extinctions: {} ({:.2}%)", self.extinctions, self.extinction_rate())?;
        writeln!(f)?;
        writeln!(f, "Average Wall Time: {:?}", self.average_wall_time())?;
        writeln!(f, "Average Simulated Time: {:.4}", self.average_simulated_time())?;
        writeln!(
            f,
            "Average Events Processed: {:.1}",
            self.average_events_processed()
        )?;

        if !self.seeds_failing.is_empty() {
            writeln!(f)?;
            writeln!(f, "Faulty seeds: {:?}", self.seeds_failing)?;
        }

        writeln!(f)?;

        Ok(())
    }
}

/// Runs the same scenario over many seeds.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    iterations: usize,
    seeds: Vec<u64>,
    base_seed: u64,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunner {
    /// One iteration, seeds derived from base seed 0.
    pub fn new() -> Self {
        Self {
            iterations: 1,
            seeds: Vec::new(),
            base_seed: 0,
        }
    }

    /// Set the number of iterations to run.
    pub fn set_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Use these seeds first; further iterations get derived seeds.
    pub fn set_seeds(mut self, seeds: Vec<u64>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Base from which missing seeds are derived.
    pub fn set_base_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    fn seed_for(&self, iteration: usize) -> u64 {
        match self.seeds.get(iteration) {
            Some(seed) => *seed,
            None => {
                let mut hasher = DefaultHasher::new();
                self.base_seed.hash(&mut hasher);
                iteration.hash(&mut hasher);
                hasher.finish()
            }
        }
    }

    /// Build a world per seed with `factory` and run it to `config`.
    #[instrument(skip_all)]
    pub fn run<F>(&self, config: &RunConfig, mut factory: F) -> BatchReport
    where
        F: FnMut(u64) -> SimulationResult<SimWorld>,
    {
        let mut report = BatchReport::default();

        for iteration in 0..self.iterations {
            let seed = self.seed_for(iteration);
            report.seeds_used.push(seed);
            report.iterations += 1;
            info!(
                "Starting iteration {} with seed {} (iteration {}/{})",
                iteration + 1,
                seed,
                iteration + 1,
                self.iterations
            );

            match factory(seed).and_then(|mut world| world.run(config)) {
                Ok(run) => {
                    if matches!(run.stop_reason, StopReason::Extinction { .. }) {
                        report.extinctions += 1;
                    }
                    report.metrics.accumulate(&run.metrics);
                    report.successful_runs += 1;
                    report.reports.push(run);
                }
                Err(e) => {
                    warn!(seed, error = %e, "iteration failed");
                    report.failed_runs += 1;
                    report.seeds_failing.push(seed);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_seeds_come_first() {
        let runner = BatchRunner::new().set_seeds(vec![11, 12]).set_base_seed(5);
        assert_eq!(runner.seed_for(0), 11);
        assert_eq!(runner.seed_for(1), 12);
        assert_eq!(runner.seed_for(2), runner.seed_for(2));
        assert_ne!(runner.seed_for(2), runner.seed_for(3));
    }

    #[test]
    fn empty_batch_reports_zero_rates() {
        let report = BatchReport::default();
        assert_eq!(report.success_rate(), 0.0);
        assert_eq!(report.average_events_processed(), 0.0);
        assert!(report.to_string().contains("=== Batch Report ==="));
    }

    #[test]
    fn report_display_lists_final_sizes() {
        let report = SimulationReport {
            seed: 4,
            stop_reason: StopReason::Extinction {
                population: "prey".into(),
            },
            metrics: SimulationMetrics::default(),
            final_sizes: vec![("prey".into(), 2), ("predators".into(), 9)],
        };
        let text = report.to_string();
        assert!(text.contains("Stop Reason: extinction of 'prey'"));
        assert!(text.contains("predators: 9"));
        assert_eq!(report.final_size("prey"), Some(2));
        assert_eq!(report.final_size("plants"), None);
    }
}
