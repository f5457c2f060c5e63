//! The event queue, handler context, history and the simulation loop.

mod context;
mod history;
mod queue;
mod world;

pub use context::SimContext;
pub use history::{History, TraitSeries};
pub use queue::{EventInstance, EventParams, EventQueue, Payload, ScheduledEvent};
pub use world::{SimWorld, StepOutcome};
