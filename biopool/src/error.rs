use thiserror::Error;

use crate::population::{EntityId, PopulationId};

/// Errors that can occur while building or running a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The simulation could not be constructed from the given configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A type alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Construction-time configuration errors.
///
/// These are fatal: a [`crate::SimulationBuilder`] refuses to produce a world
/// when any of them is detected, so a run never starts half-configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A population id does not refer to a registered population.
    #[error("unknown population id {0}")]
    UnknownPopulation(usize),
    /// An event id does not refer to a registered event.
    #[error("unknown event id {0}")]
    UnknownEvent(usize),
    /// A spatial index id does not refer to a registered index.
    #[error("unknown spatial index id {0}")]
    UnknownIndex(usize),
    /// Two items of the same kind share a name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName {
        /// What was being named (population, event, trait)
        kind: &'static str,
        /// The offending name
        name: String,
    },
    /// An entity present at build time lacks an attribute an event needs.
    #[error("population '{population}' entity {entity} is missing attribute '{attribute}'")]
    MissingAttribute {
        /// Population name
        population: String,
        /// Entity lacking the attribute
        entity: EntityId,
        /// Attribute name
        attribute: String,
    },
    /// A numeric or structural parameter is outside its allowed domain.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Human readable reason
        reason: String,
    },
    /// A spatial index was bound to a population whose entities move.
    #[error("spatial index {index} is bound to moving population '{population}'")]
    IndexedPopulationMoves {
        /// Index id
        index: usize,
        /// Population name
        population: String,
    },
    /// An index used by an event covers a different population than expected.
    #[error("spatial index {index} covers population {actual}, expected {expected}")]
    IndexPopulationMismatch {
        /// Index id
        index: usize,
        /// Population the event needs
        expected: PopulationId,
        /// Population the index covers
        actual: PopulationId,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Entity store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The id is already live in the store.
    #[error("entity {0} already exists")]
    DuplicateId(EntityId),
}

/// Reasons a queue entry is refused before being pushed.
///
/// Rejections are logged and counted, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    /// Scheduled time is NaN or infinite.
    #[error("non-finite event time {0}")]
    NonFiniteTime(f64),
    /// Scheduled time does not lie after the current clock.
    #[error("event time {time} is not after current time {now}")]
    NotInFuture {
        /// Entry time
        time: f64,
        /// Current clock
        now: f64,
    },
    /// Entry references an event that was never registered.
    #[error("unknown event id {0}")]
    UnknownEvent(usize),
}
