//! Simulation of many sync cycles against a drifting in-memory segment.
//!
//! Every cycle checks that the record mirrors the segment and that exactly
//! one event went out per transition, with a share of deliveries failing.

use async_stream::stream;
use futures::stream::{Stream, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segsync_sdk::{
    EventKind, Identity, MemorySource, MembershipSet, MemoryStore, RecordingNotifier, RunOutcome,
    SegmentSync, StateStore, SyncConfigBuilder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Knobs for a simulation.
#[derive(Clone, Debug)]
pub struct SimulationParams {
    pub runs: usize,
    pub population: usize,
    /// Probability that a member flips in or out between two runs.
    pub churn: f64,
    /// Probability that a member's deliveries are rejected.
    pub failure_rate: f64,
    /// Probability that a run observes an empty segment.
    pub empty_rate: f64,
    pub seed: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            runs: 200,
            population: 500,
            churn: 0.05,
            failure_rate: 0.02,
            empty_rate: 0.05,
            seed: 42,
        }
    }
}

/// Statistics collected during a simulation
#[derive(Clone, Debug, Default)]
pub struct SimulationStats {
    pub runs: usize,
    pub population: usize,
    pub joined: usize,
    pub left: usize,
    pub failed_deliveries: usize,
    pub writes: usize,
    pub skipped_empty: usize,
    pub unchanged: usize,
    pub divergences: usize,
    pub total_time: Duration,
    pub avg_cycle_time: Duration,
}

impl SimulationStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Simulation Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Runs:                      {:>30} ║", self.runs);
        println!("║  Population:                {:>30} ║", self.population);
        println!("║  Joined events:             {:>30} ║", self.joined);
        println!("║  Left events:               {:>30} ║", self.left);
        println!("║  Failed deliveries:         {:>30} ║", self.failed_deliveries);
        println!("║  Record writes:             {:>30} ║", self.writes);
        println!("║  Unchanged runs:            {:>30} ║", self.unchanged);
        println!("║  Skipped (empty fetch):     {:>30} ║", self.skipped_empty);
        println!("║  Divergences:               {:>30} ║", self.divergences);
        println!(
            "║  Total Time:                {:>29}s ║",
            format!("{:.3}", self.total_time.as_secs_f64())
        );
        println!("║  Average Cycle Time:        {:>28}µs ║", self.avg_cycle_time.as_micros());
        println!("╚════════════════════════════════════════════════════════════╝");
    }

    pub fn converged(&self) -> bool {
        self.divergences == 0
    }
}

fn member(i: usize) -> Identity {
    Identity::new(format!("member-{:05}@example.com", i))
}

/// Yields the segment membership observed by each run.
fn membership_generator(params: SimulationParams) -> impl Stream<Item = MembershipSet> {
    stream! {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut present: Vec<bool> = (0..params.population).map(|_| rng.gen_bool(0.5)).collect();

        for _ in 0..params.runs {
            if rng.gen_bool(params.empty_rate) {
                yield MembershipSet::new();
                continue;
            }
            for flag in present.iter_mut() {
                if rng.gen_bool(params.churn) {
                    *flag = !*flag;
                }
            }
            yield present
                .iter()
                .enumerate()
                .filter(|(_, p)| **p)
                .map(|(i, _)| member(i))
                .collect();
        }
    }
}

/// Drive `params.runs` sync cycles and verify every one of them.
pub async fn simulate(params: SimulationParams) -> SimulationStats {
    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(1));

    let notifier = Arc::new(RecordingNotifier::new());
    for i in 0..params.population {
        if rng.gen_bool(params.failure_rate) {
            notifier.fail_for(member(i));
        }
    }

    let config = SyncConfigBuilder::new()
        .segment_id("simulated")
        .segment_name("Simulated Segment")
        .api_key("unused")
        .page_size(100)
        .build_unchecked();
    let sync = SegmentSync::new(
        Arc::new(MemorySource::new()),
        notifier.clone(),
        Arc::new(MemoryStore::new()),
        config,
    );

    let mut stats = SimulationStats {
        runs: params.runs,
        population: params.population,
        ..Default::default()
    };
    let mut cycle_times = Vec::with_capacity(params.runs);
    let mut runs = Box::pin(membership_generator(params));

    while let Some(segment) = runs.next().await {
        sync.source().set_members(segment.iter().cloned());
        notifier.clear();
        let before = sync.store().load();

        let cycle_start = Instant::now();
        let outcome = sync.run_once().await;
        cycle_times.push(cycle_start.elapsed());

        let after = sync.store().load();
        let joined: MembershipSet = notifier.attempts_of(EventKind::Joined).into_iter().collect();
        let left: MembershipSet = notifier.attempts_of(EventKind::Left).into_iter().collect();

        let consistent = match outcome {
            Ok(RunOutcome::SkippedEmpty) => {
                stats.skipped_empty += 1;
                after == before && notifier.attempts().is_empty()
            }
            Ok(RunOutcome::Unchanged { .. }) => {
                stats.unchanged += 1;
                after == before && notifier.attempts().is_empty()
            }
            Ok(RunOutcome::Applied(summary)) => {
                stats.writes += 1;
                stats.joined += summary.added.len();
                stats.left += summary.removed.len();
                stats.failed_deliveries += summary.report.failures();
                after.members == segment && joined == summary.added && left == summary.removed
            }
            Err(e) => {
                tracing::error!(error = %e, "Simulated cycle failed");
                false
            }
        };

        if !consistent {
            stats.divergences += 1;
        }
    }

    stats.total_time = start.elapsed();
    stats.avg_cycle_time = if cycle_times.is_empty() {
        Duration::ZERO
    } else {
        cycle_times.iter().sum::<Duration>() / cycle_times.len() as u32
    };
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulation_converges() {
        let stats = simulate(SimulationParams {
            runs: 40,
            population: 60,
            churn: 0.2,
            failure_rate: 0.1,
            empty_rate: 0.1,
            seed: 7,
        })
        .await;

        assert!(stats.converged());
        assert_eq!(stats.runs, 40);
        assert_eq!(stats.writes + stats.unchanged + stats.skipped_empty, 40);
        assert!(stats.joined > 0);
    }

    #[tokio::test]
    async fn test_simulation_is_deterministic_per_seed() {
        let params = SimulationParams {
            runs: 15,
            population: 30,
            ..Default::default()
        };

        let a = simulate(params.clone()).await;
        let b = simulate(params).await;

        assert_eq!(a.joined, b.joined);
        assert_eq!(a.left, b.left);
        assert_eq!(a.writes, b.writes);
    }
}
