use biopool::{
    BirthEvent, CategoricalTrait, DeathEvent, EventKind, InfectionEvent, InteractEvent,
    PauseEvent, PopulationConfig, RunConfig, SimWorld, SimulationBuilder, SimulationResult,
    StaticTrait, Status, StopReason, Target, Trigger, TraitValue, WallEvent, INFECTED, RECOVERED,
    SUSCEPTIBLE,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn dying_world(seed: u64) -> SimulationResult<SimWorld> {
    let mut b = SimulationBuilder::new();
    b.seed(seed);
    let cells = b.add_population(PopulationConfig::new("cells", 10, 10.0, 10.0));
    b.add_trait(cells, StaticTrait::new("death_rate", 5.0))?;
    b.add_event(cells, "death", EventKind::Death(DeathEvent::default()), true);
    b.build()
}

fn growing_world(seed: u64) -> SimulationResult<SimWorld> {
    let mut b = SimulationBuilder::new();
    b.seed(seed);
    let cells = b.add_population(PopulationConfig::new("cells", 30, 10.0, 10.0).with_capacity(100));
    b.add_trait(cells, StaticTrait::new("birth_rate", 1.0))?;
    b.add_trait(cells, StaticTrait::new("death_rate", 0.5))?;
    b.add_event(cells, "birth", EventKind::Birth(BirthEvent::default()), true);
    b.add_event(cells, "death", EventKind::Death(DeathEvent::default()), true);
    b.build()
}

#[test]
fn high_death_rate_stops_early() {
    init_tracing();
    let mut world = dying_world(1).expect("valid configuration");
    let report = world
        .run(&RunConfig::new(100.0).with_continue_threshold(2))
        .expect("valid run parameters");

    assert_eq!(
        report.stop_reason,
        StopReason::Extinction {
            population: "cells".into()
        }
    );
    assert_eq!(report.final_size("cells"), Some(2));
    assert_eq!(report.metrics.events_processed, 8);
    assert!(world.current_time() < 100.0);

    let history = world.history();
    assert_eq!(history.len() as u64, report.metrics.events_processed + 1);
    assert!(history.time().windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(history.time().last().copied(), Some(world.current_time()));
    assert_eq!(history.sizes("cells").and_then(|s| s.last()).copied(), Some(2));
}

#[test]
fn horizon_keeps_future_entries_and_run_continues() {
    init_tracing();
    let mut world = growing_world(5).expect("valid configuration");

    let first = world.run(&RunConfig::new(1.0)).expect("valid run parameters");
    assert_eq!(first.stop_reason, StopReason::HorizonReached);
    assert!(world.current_time() <= 1.0);
    assert!(world.has_pending_events());

    let second = world.run(&RunConfig::new(2.0)).expect("valid run parameters");
    assert_eq!(second.stop_reason, StopReason::HorizonReached);
    assert!(world.current_time() <= 2.0);
    assert!(second.metrics.events_processed >= first.metrics.events_processed);
    assert_eq!(second.metrics.events_rejected, 0);

    // every survivor has both clocks running
    let now = world.current_time();
    let birth = world.registry().find("birth").expect("registered");
    let death = world.registry().find("death").expect("registered");
    let cells = world.population("cells").expect("registered");
    for e in cells.store().iter() {
        assert!(e.pending(birth).is_some_and(|p| p.time > now));
        assert!(e.pending(death).is_some_and(|p| p.time > now));
    }
}

fn logistic_world(seed: u64) -> SimulationResult<SimWorld> {
    let mut b = SimulationBuilder::new();
    b.seed(seed);
    let cells = b.add_population(PopulationConfig::new("cells", 30, 10.0, 10.0).with_capacity(60));
    b.add_trait(cells, StaticTrait::new("birth_rate", 1.0))?;
    b.add_trait(cells, StaticTrait::new("death_rate", 0.2))?;
    b.add_event(cells, "birth", EventKind::Birth(BirthEvent::default()), true);
    b.add_event(cells, "death", EventKind::Death(DeathEvent::default()), true);
    b.build()
}

#[test]
fn births_outpace_deaths_up_to_capacity() {
    init_tracing();
    let mut world = logistic_world(21).expect("valid configuration");
    let report = world
        .run(&RunConfig::new(15.0).with_continue_threshold(0))
        .expect("valid run parameters");
    assert_eq!(report.stop_reason, StopReason::HorizonReached);
    assert_eq!(report.metrics.events_rejected, 0);

    let cells = world.population("cells").expect("registered");
    let births = cells.next_id().0 - 30;
    let deaths = births + 30 - cells.size() as u64;
    assert!(births > deaths, "{births} births, {deaths} deaths");
    assert!(cells.size() > 30);

    let sizes = world.history().sizes("cells").expect("recorded");
    assert!(sizes.iter().all(|&n| n <= 60));

    let now = world.current_time();
    let birth = world.registry().find("birth").expect("registered");
    let death = world.registry().find("death").expect("registered");
    let newborns: Vec<_> = cells.store().iter().filter(|e| e.id.0 >= 30).collect();
    assert!(!newborns.is_empty());
    for e in newborns {
        assert!(e.pending(birth).is_some_and(|p| p.time > now));
        assert!(e.pending(death).is_some_and(|p| p.time > now));
    }
}

#[test]
fn zero_runtime_is_a_configuration_error() {
    let mut world = growing_world(5).expect("valid configuration");
    assert!(world.run(&RunConfig::new(0.0)).is_err());
}

fn predator_prey(seed: u64) -> SimulationResult<SimWorld> {
    let mut b = SimulationBuilder::new();
    b.seed(seed);

    let prey = b.add_population(PopulationConfig::new("prey", 60, 20.0, 20.0).with_capacity(150));
    b.add_trait(prey, StaticTrait::new("birth_rate", 0.8))?;
    b.add_trait(prey, StaticTrait::new("radius", 0.2))?;
    b.add_trait(prey, StaticTrait::new("offspring_dist_max", 1.5))?;
    b.add_trait(prey, StaticTrait::new("hunt_radius", 0.2))?;
    let prey_index = b.add_index(prey);

    let predators = b.add_population(PopulationConfig::new("predators", 8, 20.0, 20.0));
    b.add_trait(predators, StaticTrait::new("velocity", 2.0))?;
    b.add_trait(predators, StaticTrait::new("radius", 0.3))?;
    b.add_trait(predators, StaticTrait::new("death_rate", 0.1))?;
    b.add_trait(predators, StaticTrait::new("hunt_radius", 0.3))?;

    let prey_birth = b.add_event(
        prey,
        "prey_birth",
        EventKind::Birth(BirthEvent::searching(prey_index, false)),
        true,
    );
    let eaten = b.add_event(prey, "eaten", EventKind::Death(DeathEvent::default()), false);

    b.add_event(predators, "wall", EventKind::Wall(WallEvent::default()), true);
    b.add_event(predators, "predator_death", EventKind::Death(DeathEvent::default()), true);
    let hunt = b.add_event(
        predators,
        "hunt",
        EventKind::Interact(InteractEvent::with(prey)),
        true,
    );
    let offspring = b.add_event(
        predators,
        "predator_birth",
        EventKind::Birth(BirthEvent::default()),
        false,
    );

    b.add_trigger(hunt, Trigger::handle(eaten, Target::Extra))?;
    b.add_trigger(hunt, Trigger::handle(offspring, Target::Actor))?;
    b.add_trigger(prey_birth, Trigger::InteractWithNewcomer { event: hunt })?;
    b.build()
}

#[test]
fn predators_eat_prey_and_index_follows_births_and_deaths() {
    init_tracing();
    let mut world = predator_prey(11).expect("valid configuration");
    let report = world
        .run(&RunConfig::new(10.0).with_continue_threshold(0))
        .expect("valid run parameters");

    assert_eq!(report.metrics.events_rejected, 0);
    let prey = world.population("prey").expect("registered");
    assert_eq!(world.context().indices[0].len(), prey.size());

    let now = world.current_time();
    let prey_birth = world.registry().find("prey_birth").expect("registered");
    for e in prey.store().iter() {
        assert!(e.pending(prey_birth).is_some_and(|p| p.time > now));
    }

    let predator_death = world.registry().find("predator_death").expect("registered");
    let predators = world.population("predators").expect("registered");
    for e in predators.store().iter() {
        assert!(e.pending(predator_death).is_some_and(|p| p.time > now));
        assert!(e.x >= 0.0 && e.x <= 20.0 && e.y >= 0.0 && e.y <= 20.0);
    }

    // searched placement keeps prey apart
    let bodies: Vec<_> = prey.store().iter().map(|e| (e.id, e.x, e.y)).collect();
    for &(id, x, y) in bodies.iter().filter(|(id, _, _)| id.0 >= 60) {
        for &(other, ox, oy) in &bodies {
            if other.0 < id.0 {
                assert!((ox - x).hypot(oy - y) > 0.4 - 1e-9, "{id} overlaps {other}");
            }
        }
    }
}

fn sir_world(seed: u64) -> SimulationResult<SimWorld> {
    let mut b = SimulationBuilder::new();
    b.seed(seed);
    let hosts = b.add_population(PopulationConfig::new("hosts", 40, 10.0, 10.0));
    b.add_trait(hosts, StaticTrait::new("velocity", 1.0))?;
    b.add_trait(hosts, StaticTrait::new("radius", 0.2))?;
    b.add_trait(hosts, StaticTrait::new("contact_radius", 0.3))?;
    b.add_trait(hosts, StaticTrait::new("recovery_rate", 0.2))?;
    b.add_trait(hosts, StaticTrait::new("rest", 0.5))?;
    b.add_trait(
        hosts,
        CategoricalTrait::new("sir", [SUSCEPTIBLE, INFECTED], [0.8, 0.2]).tracked(),
    )?;

    let wall = b.add_event(hosts, "wall", EventKind::Wall(WallEvent::default()), true);
    let contact = b.add_event(
        hosts,
        "contact",
        EventKind::Interact(InteractEvent::default()),
        true,
    );
    let sir = b.add_event(
        hosts,
        "sir",
        EventKind::Infection(InfectionEvent::default()),
        false,
    );
    let rest = b.add_event(
        hosts,
        "rest",
        EventKind::Pause(PauseEvent::suspending([wall, contact])),
        false,
    );
    b.add_trigger(contact, Trigger::handle(sir, Target::Actor))?;
    b.add_trigger(contact, Trigger::handle(rest, Target::Actor))?;
    b.build()
}

#[test]
fn infection_spreads_without_reinfection() {
    init_tracing();
    let mut world = sir_world(3).expect("valid configuration");
    let report = world
        .run(&RunConfig::new(20.0).with_continue_threshold(0))
        .expect("valid run parameters");
    assert_eq!(report.final_size("hosts"), Some(40));
    assert_eq!(report.metrics.events_rejected, 0);

    let series = world
        .history()
        .trait_history("hosts", "sir")
        .expect("tracked trait");
    assert_eq!(series.len(), world.history().len());
    let susceptible = TraitValue::from(SUSCEPTIBLE);
    let recovered = TraitValue::from(RECOVERED);
    for tick in series {
        assert_eq!(tick.total(), 40);
    }
    for w in series.windows(2) {
        assert!(w[1].count(&susceptible) <= w[0].count(&susceptible));
        assert!(w[1].count(&recovered) >= w[0].count(&recovered));
    }

    for e in world.population("hosts").expect("registered").store().iter() {
        let (vx, vy) = e.velocity();
        match e.status {
            Status::Inactive => assert_eq!((vx, vy), (0.0, 0.0)),
            Status::Active => assert!((vx.hypot(vy) - 1.0).abs() < 1e-9),
        }
    }
}
