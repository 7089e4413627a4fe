use crate::core::errors::{FirstError, Result, SimulationError};
use crate::core::execution::engine::Engine;
use crate::core::types::{LinkId, PendingLink, StateId};
use indexmap::IndexSet;
use log::{debug, error, trace, warn};
use std::collections::{BTreeSet, HashSet};
use std::mem;

/// Pending propagation work and the bookkeeping around it
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    /// Pairs waiting for the next step, in first-enqueued order
    pending: IndexSet<PendingLink>,
    /// Spare buffer swapped in while a batch runs
    scratch: IndexSet<PendingLink>,
    /// Pairs that ended a step short-circuited
    short_circuited: IndexSet<PendingLink>,
    /// Pending sets seen during the current `step_all`
    history: HashSet<BTreeSet<PendingLink>>,
    stepping: bool,
}

impl Scheduler {
    fn enqueue(&mut self, pair: PendingLink) -> bool {
        self.pending.insert(pair)
    }

    pub(crate) fn purge_link(&mut self, link: LinkId) {
        self.pending.retain(|(_, pending)| *pending != link);
        self.short_circuited.retain(|(_, pending)| *pending != link);
    }

    pub(crate) fn purge_state(&mut self, state: StateId) {
        self.pending.retain(|(pending, _)| *pending != state);
        self.short_circuited.retain(|(pending, _)| *pending != state);
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.scratch.clear();
        self.short_circuited.clear();
        self.history.clear();
    }
}

impl Engine {
    /// Schedule `link` for propagation in `state`. Idempotent.
    pub fn value_changed(&mut self, state: StateId, link: LinkId) {
        if self.scheduler.enqueue((state, link)) {
            trace!("enqueued {} in {}", link, state);
        }
    }

    /// Drop all pending work for a link that no longer exists
    pub(crate) fn link_removed(&mut self, link: LinkId) {
        self.scheduler.purge_link(link);
    }

    pub fn has_links_to_update(&self) -> bool {
        !self.scheduler.pending.is_empty()
    }

    /// Pending pairs in the order they will be propagated
    pub fn pending_links(&self) -> Vec<PendingLink> {
        self.scheduler.pending.iter().copied().collect()
    }

    /// Whether the pair still names a link of a circuit and one of that
    /// circuit's live states
    fn is_live(&self, state: StateId, link: LinkId) -> bool {
        self.link_circuit(link).is_some()
            && self
                .states
                .get(&state)
                .and_then(|entry| self.circuits.get(&entry.circuit))
                .map_or(false, |circuit| circuit.contains_state(state))
    }

    /// Propagate exactly the pairs pending at the call.
    ///
    /// Work caused by this batch is left for the next step. Short circuits
    /// are only reported once nothing is left pending and they persist.
    /// Called from inside a running step, this is a no-op.
    pub fn step(&mut self) -> Result<()> {
        if self.scheduler.stepping {
            return Ok(());
        }
        self.scheduler.stepping = true;
        let result = self.step_batch();
        self.scheduler.stepping = false;
        result
    }

    fn step_batch(&mut self) -> Result<()> {
        let mut batch = mem::take(&mut self.scheduler.scratch);
        mem::swap(&mut batch, &mut self.scheduler.pending);
        debug!("step: propagating {} links", batch.len());

        let mut errors = FirstError::new();
        for &(state, link) in &batch {
            if !self.is_live(state, link) {
                continue;
            }
            match self.propagate_signal(state, link) {
                Ok(()) => {}
                Err(err) if err.is_short_circuit() => {
                    warn!("{} in {}: {}", link, state, err);
                    self.scheduler.short_circuited.insert((state, link));
                }
                Err(err) => {
                    error!("propagating {} in {} failed: {}", link, state, err);
                    errors.record(err);
                }
            }
        }
        batch.clear();
        self.scheduler.scratch = batch;
        errors.into_result()?;

        if !self.scheduler.short_circuited.is_empty() && self.scheduler.pending.is_empty() {
            let remembered: Vec<PendingLink> = self.scheduler.short_circuited.iter().copied().collect();
            for (state, link) in remembered {
                if self.is_live(state, link) && self.is_short_circuited(state, link)? {
                    self.merged_value(state, link)?;
                }
            }
            self.scheduler.short_circuited.clear();
        }
        Ok(())
    }

    /// Step until nothing is pending.
    ///
    /// Each pending set is remembered; once sets seen before have come back
    /// `oscillation_threshold` times in total the run stops with
    /// [`SimulationError::Oscillation`]. Other failures are held until the
    /// queue drains, a general error taking precedence over a short circuit.
    pub fn step_all(&mut self) -> Result<()> {
        if self.scheduler.stepping {
            return Ok(());
        }
        self.scheduler.history.clear();
        let threshold = self.config.oscillation_threshold.max(1);

        let mut repeat_count = 0;
        let mut errors = FirstError::new();
        let mut short_circuit = None;

        while !self.scheduler.pending.is_empty() {
            let snapshot: BTreeSet<PendingLink> = self.scheduler.pending.iter().copied().collect();
            if self.scheduler.history.contains(&snapshot) {
                repeat_count += 1;
                if repeat_count >= threshold {
                    error!("oscillation: pending work repeated {} times", repeat_count);
                    return Err(SimulationError::Oscillation);
                }
            }
            self.scheduler.history.insert(snapshot);

            match self.step() {
                Ok(()) => {}
                Err(err) if err.is_short_circuit() => short_circuit = Some(err),
                Err(err) => errors.record(err),
            }
        }

        errors.into_result()?;
        short_circuit.map_or(Ok(()), Err)
    }

    /// Reset every state of every circuit
    pub fn reset(&mut self) -> Result<()> {
        let states: Vec<StateId> = self
            .circuits
            .values()
            .flat_map(|circuit| circuit.states.iter().copied())
            .collect();

        let mut errors = FirstError::new();
        for state in states {
            errors.check(self.reset_state(state));
        }
        errors.into_result()
    }
}
