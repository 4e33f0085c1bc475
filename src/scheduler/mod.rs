//! ChunkedScheduler: Cooperative, time-sliced tagging passes
//!
//! # State machine
//! `Idle → Sizing → {SyncPass | ChunkedPass} → Complete`
//!
//! Small workloads run synchronously in one go. Large ones are cut into
//! slices: each `step()` processes terms until the slice budget is spent and
//! returns `Continue`; the host calls `step()` again at its next opportunity
//! (animation frame, timer tick). There is no cancellation: a started pass
//! runs until `Done`.
//!
//! Both strategies walk the exact same (region, term) sequence, so the
//! resulting markers are identical; only the slicing differs.

pub mod clock;

pub use clock::*;

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::dom::{ContentTree, NodeId};
use crate::glossary::{BlacklistSet, TermTable};
use crate::scanner::{count_regions, MatchEngine, MatchOutcome};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassStrategy {
    Sync,
    Chunked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Sizing,
    SyncPass,
    ChunkedPass,
    Complete,
}

/// What the host should do after a `step()`
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Work remains; schedule another step
    Continue,
    /// The pass is complete
    Done,
}

/// A term that could not be matched (non-fatal)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermFailure {
    pub term_index: usize,
    pub label: String,
    pub message: String,
}

/// Counters for one pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassStats {
    pub text_units: usize,
    pub slices: usize,
    pub terms_attempted: usize,
    pub terms_blacklisted: usize,
    pub terms_tagged: usize,
    pub markers_created: usize,
    pub failures: Vec<TermFailure>,
}

/// One region walked against the whole term list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub region: NodeId,
    next_term: usize,
}

impl WorkUnit {
    fn new(region: NodeId) -> Self {
        Self { region, next_term: 0 }
    }
}

// =============================================================================
// ChunkedScheduler
// =============================================================================

/// Drives the match engine over every (region, term) pair
#[derive(Debug)]
pub struct ChunkedScheduler<C: Clock = InstantClock> {
    config: SchedulerConfig,
    clock: C,
    state: SchedulerState,
    strategy: Option<PassStrategy>,
    units: Vec<WorkUnit>,
    current: usize,
    stats: PassStats,
}

impl Default for ChunkedScheduler<InstantClock> {
    fn default() -> Self {
        Self::new(SchedulerConfig::default(), InstantClock::new())
    }
}

impl<C: Clock> ChunkedScheduler<C> {
    pub fn new(config: SchedulerConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            state: SchedulerState::Idle,
            strategy: None,
            units: Vec::new(),
            current: 0,
            stats: PassStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn strategy(&self) -> Option<PassStrategy> {
        self.strategy
    }

    pub fn stats(&self) -> &PassStats {
        &self.stats
    }

    pub fn regions(&self) -> Vec<NodeId> {
        self.units.iter().map(|u| u.region).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.state == SchedulerState::Complete
    }

    /// Size the workload and pick a strategy. Resets any previous pass.
    pub fn start(&mut self, tree: &ContentTree, regions: &[NodeId]) -> PassStrategy {
        self.state = SchedulerState::Sizing;
        self.units = regions.iter().copied().map(WorkUnit::new).collect();
        self.current = 0;
        self.stats = PassStats::default();

        let text_units = count_regions(tree, regions);
        self.stats.text_units = text_units;

        let strategy = if text_units > self.config.chunk_threshold {
            self.state = SchedulerState::ChunkedPass;
            PassStrategy::Chunked
        } else {
            self.state = SchedulerState::SyncPass;
            PassStrategy::Sync
        };
        log::debug!(
            "{} text units over {} regions: {:?} pass",
            text_units,
            regions.len(),
            strategy
        );
        self.strategy = Some(strategy);
        strategy
    }

    /// Advance the pass. A sync pass finishes in one call; a chunked pass
    /// processes at least one term and stops once the slice budget is spent.
    pub fn step(
        &mut self,
        tree: &mut ContentTree,
        engine: &mut MatchEngine,
        table: &TermTable,
        blacklist: &BlacklistSet,
    ) -> StepOutcome {
        match self.state {
            SchedulerState::Idle | SchedulerState::Sizing | SchedulerState::Complete => StepOutcome::Done,
            SchedulerState::SyncPass => {
                self.stats.slices += 1;
                while self.run_one(tree, engine, table, blacklist) {}
                self.finish()
            }
            SchedulerState::ChunkedPass => {
                self.stats.slices += 1;
                let started = self.clock.now_ms();
                let before = self.stats.terms_attempted;
                loop {
                    if !self.run_one(tree, engine, table, blacklist) || !self.has_work(table) {
                        return self.finish();
                    }
                    if self.clock.now_ms() - started > self.config.slice_budget_ms {
                        break;
                    }
                }
                log::trace!(
                    "slice {} processed {} terms",
                    self.stats.slices,
                    self.stats.terms_attempted - before
                );
                StepOutcome::Continue
            }
        }
    }

    /// Step until done; for hosts without an event loop
    pub fn run_to_completion(
        &mut self,
        tree: &mut ContentTree,
        engine: &mut MatchEngine,
        table: &TermTable,
        blacklist: &BlacklistSet,
    ) -> &PassStats {
        while self.step(tree, engine, table, blacklist) == StepOutcome::Continue {}
        &self.stats
    }

    fn finish(&mut self) -> StepOutcome {
        self.state = SchedulerState::Complete;
        log::debug!(
            "pass complete: {} terms in {} slices, {} markers, {} failures",
            self.stats.terms_attempted,
            self.stats.slices,
            self.stats.markers_created,
            self.stats.failures.len()
        );
        StepOutcome::Done
    }

    fn has_work(&self, table: &TermTable) -> bool {
        self.units[self.current.min(self.units.len())..]
            .iter()
            .any(|u| u.next_term < table.len())
    }

    /// Process the next (region, term) pair. False when nothing is left.
    fn run_one(
        &mut self,
        tree: &mut ContentTree,
        engine: &mut MatchEngine,
        table: &TermTable,
        blacklist: &BlacklistSet,
    ) -> bool {
        while self.current < self.units.len() && self.units[self.current].next_term >= table.len() {
            self.current += 1;
        }
        let unit = match self.units.get_mut(self.current) {
            Some(unit) => unit,
            None => return false,
        };

        let index = unit.next_term;
        unit.next_term += 1;
        let region = unit.region;

        let term = match table.get(index) {
            Some(term) => term,
            None => return false,
        };

        self.stats.terms_attempted += 1;
        match engine.tag_term(tree, region, term, index, blacklist) {
            Ok(MatchOutcome::Blacklisted) => self.stats.terms_blacklisted += 1,
            Ok(MatchOutcome::NoMatch) => {}
            Ok(outcome) => {
                self.stats.terms_tagged += 1;
                self.stats.markers_created += outcome.marker_count();
            }
            Err(e) => {
                log::warn!("term {} ({:?}) skipped: {}", index, term.label, e);
                self.stats.failures.push(TermFailure {
                    term_index: index,
                    label: term.label.clone(),
                    message: e.to_string(),
                });
            }
        }
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
