use biopool::{
    BatchRunner, BirthEvent, DeathEvent, EventKind, InteractEvent, PopulationConfig, RunConfig,
    SimWorld, SimulationBuilder, SimulationResult, StaticTrait, StopReason, WallEvent,
};

fn world(seed: u64) -> SimulationResult<SimWorld> {
    let mut b = SimulationBuilder::new();
    b.seed(seed);
    let cells = b.add_population(PopulationConfig::new("cells", 25, 10.0, 10.0).with_capacity(80));
    b.add_trait(cells, StaticTrait::new("birth_rate", 1.0))?;
    b.add_trait(cells, StaticTrait::new("death_rate", 0.6))?;
    b.add_trait(cells, StaticTrait::new("velocity", 1.5))?;
    b.add_trait(cells, StaticTrait::new("radius", 0.1))?;
    b.add_trait(cells, StaticTrait::new("bump_radius", 0.1))?;
    b.add_event(cells, "birth", EventKind::Birth(BirthEvent::default()), true);
    b.add_event(cells, "death", EventKind::Death(DeathEvent::default()), true);
    b.add_event(cells, "wall", EventKind::Wall(WallEvent::default()), true);
    b.add_event(cells, "bump", EventKind::Interact(InteractEvent::default()), true);
    b.build()
}

fn missing_death_rate(seed: u64) -> SimulationResult<SimWorld> {
    let mut b = SimulationBuilder::new();
    b.seed(seed);
    let cells = b.add_population(PopulationConfig::new("cells", 5, 10.0, 10.0));
    b.add_event(cells, "death", EventKind::Death(DeathEvent::default()), true);
    b.build()
}

fn fingerprint(seed: u64) -> (String, Vec<(String, usize)>, u64) {
    let mut w = world(seed).expect("valid configuration");
    let report = w.run(&RunConfig::new(8.0)).expect("valid run parameters");
    let history = serde_json::to_string(w.history()).expect("serializable history");
    (history, report.final_sizes, report.metrics.events_processed)
}

#[test]
fn same_seed_same_run() {
    let first = fingerprint(42);
    for _ in 0..3 {
        assert_eq!(fingerprint(42), first);
    }
}

#[test]
fn different_seeds_diverge() {
    assert_ne!(fingerprint(1).0, fingerprint(2).0);
}

#[test]
fn stepping_matches_running() {
    let mut stepped = world(9).expect("valid configuration");
    let mut ran = world(9).expect("valid configuration");

    while stepped.has_pending_events() {
        if stepped.current_time() > 3.0 {
            break;
        }
        stepped.step();
    }
    let horizon = stepped.current_time();
    let report = ran
        .run(&RunConfig::new(horizon).with_continue_threshold(0))
        .expect("valid run parameters");

    assert_eq!(report.stop_reason, StopReason::HorizonReached);
    assert_eq!(ran.current_time(), horizon);
    // run also drains entries sharing the last timestamp
    let (ran_times, stepped_times) = (ran.history().time(), stepped.history().time());
    assert!(ran_times.starts_with(stepped_times));
    assert!(ran_times[stepped_times.len()..].iter().all(|t| *t == horizon));
}

#[test]
fn batch_runner_aggregates_and_reports_failures() {
    let runner = BatchRunner::new().set_iterations(3).set_seeds(vec![1, 2, 3]);
    let report = runner.run(&RunConfig::new(2.0), |seed| {
        if seed == 2 {
            missing_death_rate(seed)
        } else {
            world(seed)
        }
    });

    assert_eq!(report.iterations, 3);
    assert_eq!(report.successful_runs, 2);
    assert_eq!(report.failed_runs, 1);
    assert_eq!(report.seeds_used, vec![1, 2, 3]);
    assert_eq!(report.seeds_failing, vec![2]);
    assert_eq!(report.reports.len(), 2);
    assert_eq!(
        report.metrics.events_processed,
        report.reports.iter().map(|r| r.metrics.events_processed).sum::<u64>()
    );
    assert!(report.to_string().contains("Faulty seeds: [2]"));
}

#[test]
fn derived_seeds_are_distinct() {
    let report = BatchRunner::new()
        .set_iterations(4)
        .set_base_seed(77)
        .run(&RunConfig::new(0.5), world);
    let mut seeds = report.seeds_used.clone();
    seeds.sort_unstable();
    seeds.dedup();
    assert_eq!(seeds.len(), 4);
    assert_eq!(report.successful_runs, 4);
}
