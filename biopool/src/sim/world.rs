use std::time::{Duration, Instant};

use tracing::{debug, instrument, trace, warn};

use crate::config::RunConfig;
use crate::error::{RejectReason, SimulationResult};
use crate::events::{EventId, EventRegistry};
use crate::population::Population;
use crate::runner::{SimulationMetrics, SimulationReport, StopReason};

use super::{EventInstance, EventQueue, History, ScheduledEvent, SimContext};

/// What a single [`SimWorld::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// An entry was handled and the clock moved to `time`
    Handled {
        /// New clock value
        time: f64,
        /// Event that ran
        event: EventId,
    },
    /// The entry repeated the one handled just before and was dropped
    Duplicate,
    /// The entry no longer matched its actor's pending slot and was dropped
    Stale,
    /// Nothing left to pop
    Exhausted,
}

/// The simulation world: populations, events, the global queue and the clock.
///
/// Built by [`crate::SimulationBuilder`]. Handlers never touch the queue; the
/// world validates and pushes whatever they return.
#[derive(Debug)]
pub struct SimWorld {
    ctx: SimContext,
    registry: EventRegistry,
    queue: EventQueue,
    current_time: f64,
    next_sequence: u64,
    last_handled: Option<EventInstance>,
    history: History,

    // Event processing metrics
    events_processed: u64,
    duplicates_skipped: u64,
    stale_skipped: u64,
    events_rejected: u64,
}

impl SimWorld {
    /// World at time zero over initialized state; the queue gets the first
    /// entry of every individual and history its first row.
    pub(crate) fn new(ctx: SimContext, registry: EventRegistry) -> Self {
        let mut world = Self {
            ctx,
            registry,
            queue: EventQueue::new(),
            current_time: 0.0,
            next_sequence: 0,
            last_handled: None,
            history: History::new(),
            events_processed: 0,
            duplicates_skipped: 0,
            stale_skipped: 0,
            events_rejected: 0,
        };

        let first: Vec<EventInstance> = world
            .ctx
            .populations
            .iter()
            .flat_map(|pop| {
                pop.store()
                    .ids()
                    .into_iter()
                    .filter_map(|id| pop.next_event_for(id))
            })
            .collect();
        for instance in first {
            // rejections are counted and logged
            let _ = world.schedule(instance);
        }
        world.history.record(0.0, &world.ctx.populations);
        world
    }

    /// Current simulation time.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Seed of the world's random source.
    pub fn seed(&self) -> u64 {
        self.ctx.rng.seed()
    }

    /// Handler state.
    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// Registered events.
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Populations in registration order.
    pub fn populations(&self) -> &[Population] {
        &self.ctx.populations
    }

    /// Population by name.
    pub fn population(&self, name: &str) -> Option<&Population> {
        self.ctx.populations.iter().find(|p| p.name() == name)
    }

    /// Recorded history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Returns `true` if there are entries waiting to be processed.
    pub fn has_pending_events(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Returns the number of entries waiting to be processed.
    pub fn pending_event_count(&self) -> usize {
        self.queue.len()
    }

    /// Push an entry after checking it is well formed.
    ///
    /// Rejected entries are logged and counted; they never abort the run.
    pub fn schedule(&mut self, instance: EventInstance) -> Result<(), RejectReason> {
        if let Err(reason) = instance.validate(self.current_time, self.registry.len()) {
            warn!(event = %instance.event, actor = %instance.params.actor, %reason, "queue entry rejected");
            self.events_rejected += 1;
            return Err(reason);
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.schedule(ScheduledEvent::new(instance, sequence));
        Ok(())
    }

    /// Whether a primary entry still matches its actor's pending slot.
    fn is_current(&self, instance: &EventInstance) -> bool {
        let Some(spec) = self.registry.get(instance.event) else {
            return false;
        };
        if !spec.is_primary {
            return true;
        }
        self.ctx
            .population(spec.population)
            .and_then(|p| p.get(instance.params.actor))
            .and_then(|e| e.pending(instance.event))
            .is_some_and(|slot| slot.time == instance.time && slot.extra == instance.params.extra)
    }

    /// Processes the earliest entry and advances time.
    #[instrument(skip(self))]
    pub fn step(&mut self) -> StepOutcome {
        let Some(scheduled) = self.queue.pop_earliest() else {
            return StepOutcome::Exhausted;
        };
        let instance = scheduled.into_instance();

        if self
            .last_handled
            .as_ref()
            .is_some_and(|last| instance.is_repeat_of(last))
        {
            trace!(event = %instance.event, actor = %instance.params.actor, "duplicate entry");
            self.duplicates_skipped += 1;
            return StepOutcome::Duplicate;
        }
        if !self.is_current(&instance) {
            trace!(event = %instance.event, actor = %instance.params.actor, time = instance.time, "stale entry");
            self.stale_skipped += 1;
            return StepOutcome::Stale;
        }
        let Some(spec) = self.registry.get(instance.event) else {
            return StepOutcome::Stale;
        };
        let (population, is_primary) = (spec.population, spec.is_primary);

        let lapse = instance.time - self.current_time;
        if lapse > 0.0 {
            for pop in self.ctx.populations.iter_mut() {
                pop.apply_lapse(lapse);
            }
        }
        self.current_time = instance.time;

        let actor = instance.params.actor;
        if is_primary {
            if let Some(e) = self
                .ctx
                .population_mut(population)
                .and_then(|p| p.get_mut(actor))
            {
                e.set_pending(instance.event, None);
            }
        }

        let mut produced = self.registry.handle(&mut self.ctx, instance.event, instance.params);
        if is_primary {
            produced.extend(
                self.ctx
                    .population(population)
                    .and_then(|p| p.next_event_for(actor)),
            );
        }
        for next in produced {
            // rejections are counted and logged
            let _ = self.schedule(next);
        }

        self.events_processed += 1;
        self.history.record(self.current_time, &self.ctx.populations);
        let event = instance.event;
        self.last_handled = Some(instance);
        StepOutcome::Handled {
            time: self.current_time,
            event,
        }
    }

    /// Run until the next entry lies past `config.runtime`, the queue runs
    /// dry, or a population shrinks to `config.continue_threshold`.
    ///
    /// Entries past the horizon stay queued, so calling `run` again with a
    /// later horizon continues where this call stopped.
    #[instrument(skip(self))]
    pub fn run(&mut self, config: &RunConfig) -> SimulationResult<SimulationReport> {
        config.validate()?;
        let start = Instant::now();

        let stop_reason = loop {
            match self.queue.peek_earliest() {
                None => break StopReason::QueueExhausted,
                Some(next) if next.time() > config.runtime => break StopReason::HorizonReached,
                Some(_) => {}
            }
            if let StepOutcome::Handled { .. } = self.step() {
                if let Some(pop) = self
                    .ctx
                    .populations
                    .iter()
                    .find(|p| p.size() <= config.continue_threshold)
                {
                    break StopReason::Extinction {
                        population: pop.name().to_string(),
                    };
                }
            }
        };
        debug!(
            time = self.current_time,
            events = self.events_processed,
            reason = %stop_reason,
            "simulation stopped"
        );

        let mut metrics = self.extract_metrics();
        metrics.wall_time = start.elapsed();
        Ok(SimulationReport {
            seed: self.seed(),
            stop_reason,
            metrics,
            final_sizes: self
                .ctx
                .populations
                .iter()
                .map(|p| (p.name().to_string(), p.size()))
                .collect(),
        })
    }

    /// Counters accumulated since the world was built.
    pub fn extract_metrics(&self) -> SimulationMetrics {
        SimulationMetrics {
            wall_time: Duration::ZERO,
            simulated_time: self.current_time,
            events_processed: self.events_processed,
            duplicates_skipped: self.duplicates_skipped,
            stale_skipped: self.stale_skipped,
            events_rejected: self.events_rejected,
        }
    }
}
