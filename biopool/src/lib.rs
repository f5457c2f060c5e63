//! # Biopool
//!
//! A discrete-event kernel for individual-based population simulations in a
//! rectangular 2D domain.
//!
//! Individuals live in populations, carry heritable traits and perform
//! events: birth, death, pairwise contact, wall bounces, pauses, turns toward
//! attractors and SIR infection. Each individual keeps one pending instance
//! per primary event; a single global queue orders those instances by time
//! and the world handles them one by one, moving every mobile individual in
//! straight lines between ticks.
//!
//! ## Example Usage
//!
//! ```rust
//! use biopool::{
//!     BirthEvent, DeathEvent, EventKind, PopulationConfig, RunConfig, SimulationBuilder,
//!     StaticTrait,
//! };
//!
//! let mut builder = SimulationBuilder::new();
//! builder.seed(42);
//! let cells = builder.add_population(PopulationConfig::new("cells", 50, 10.0, 10.0).with_capacity(200));
//! builder.add_trait(cells, StaticTrait::new("birth_rate", 1.0)).unwrap();
//! builder.add_trait(cells, StaticTrait::new("death_rate", 0.5)).unwrap();
//! builder.add_event(cells, "birth", EventKind::Birth(BirthEvent::default()), true);
//! builder.add_event(cells, "death", EventKind::Death(DeathEvent::default()), true);
//!
//! let mut world = builder.build().unwrap();
//! let report = world.run(&RunConfig::new(10.0)).unwrap();
//! println!("{report}");
//! assert!(world.current_time() <= 10.0);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Closed-form collision times between moving discs.
pub mod collision;
/// Run parameters and the world builder.
pub mod config;
/// Error types and utilities for simulation operations.
pub mod error;
/// Event variants, triggers and the event registry.
pub mod events;
/// Individuals, their storage and populations.
pub mod population;
/// Seeded random number generation.
pub mod rng;
/// Run reports and the batch runner.
pub mod runner;
/// Queue, handler context, history and the simulation loop.
pub mod sim;
/// Spatial indexing and offspring placement.
pub mod spatial;
/// Heritable traits.
pub mod traits;

// Public API exports
pub use config::{RunConfig, SimulationBuilder, DEFAULT_CONTINUE_THRESHOLD};
pub use error::{ConfigError, RejectReason, SimulationError, SimulationResult, StoreError};
pub use events::{
    Bounce, BirthEvent, DeathEvent, EventId, EventKind, EventRegistry, EventSpec, InfectionEvent,
    InteractEvent, PauseEvent, Placement, RotateEvent, Target, Trigger, TriggerFn, WallEvent,
    INFECTED, RECOVERED, SUSCEPTIBLE,
};
pub use population::{
    Entity, EntityId, EntityStore, Motion, Pending, Population, PopulationConfig, PopulationId,
    Status,
};
pub use rng::SimRng;
pub use runner::{BatchReport, BatchRunner, SimulationMetrics, SimulationReport, StopReason};
pub use sim::{
    EventInstance, EventParams, EventQueue, History, Payload, ScheduledEvent, SimContext,
    SimWorld, StepOutcome,
};
pub use spatial::{IndexId, SpatialIndex};
pub use traits::{
    CategoricalTrait, LinkedTrait, MutableHaploidConfig, MutableHaploidTrait, StaticTrait, Trait,
    TraitCounts, TraitValue,
};
