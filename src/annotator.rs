//! Annotator: Coordinator for a page's glossary pass
//!
//! # Pass order
//! 1. Resolve target regions (fallback: `<body>`)
//! 2. Scheduler tags every term into every target, sync or sliced
//! 3. Unnest markers in every target
//! 4. Present surviving markers (focus wrapping, popovers)
//! 5. Strip markers from excluded regions and release their popovers
//!
//! # Usage
//! ```rust,ignore
//! let mut annotator = Annotator::new(table, GlossaryConfig::default(), Describer);
//! let report = annotator.annotate(&mut tree)?;
//!
//! // or, one slice per animation frame:
//! let mut job = annotator.begin(&tree)?;
//! while annotator.step(&mut job, &mut tree)? == StepOutcome::Continue {}
//! ```

use serde::{Deserialize, Serialize};

use crate::config::GlossaryConfig;
use crate::dom::{select_regions, ContentTree, Fallback, NodeId};
use crate::error::{GlossError, Result};
use crate::glossary::{BlacklistSet, TermTable};
use crate::presenter::{AnnotationPresenter, PopoverCapability};
use crate::scanner::{strip_markers, unnest_markers, MatchEngine};
use crate::scheduler::{ChunkedScheduler, Clock, InstantClock, PassStrategy, StepOutcome, TermFailure};

// =============================================================================
// Types
// =============================================================================

/// Summary of one completed pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationReport {
    pub strategy: PassStrategy,
    pub regions: usize,
    pub text_units: usize,
    pub slices: usize,
    pub terms_attempted: usize,
    pub terms_blacklisted: usize,
    pub markers_created: usize,
    pub markers_unnested: usize,
    pub markers_stripped: usize,
    pub popovers_attached: usize,
    pub failures: Vec<TermFailure>,
    pub elapsed_us: u64,
}

/// A pass in progress. Drive it with [`Annotator::step`].
#[derive(Debug)]
pub struct AnnotationJob<C: Clock = InstantClock> {
    scheduler: ChunkedScheduler<C>,
    targets: Vec<NodeId>,
    started: instant::Instant,
    report: Option<AnnotationReport>,
}

impl<C: Clock> AnnotationJob<C> {
    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn strategy(&self) -> Option<PassStrategy> {
        self.scheduler.strategy()
    }

    pub fn is_done(&self) -> bool {
        self.report.is_some()
    }

    /// Available once the job is done
    pub fn report(&self) -> Option<&AnnotationReport> {
        self.report.as_ref()
    }
}

// =============================================================================
// Annotator
// =============================================================================

pub struct Annotator<P: PopoverCapability> {
    table: TermTable,
    config: GlossaryConfig,
    blacklist: BlacklistSet,
    engine: MatchEngine,
    presenter: AnnotationPresenter<P>,
    pending: Vec<NodeId>,
}

impl<P: PopoverCapability> Annotator<P> {
    pub fn new(table: TermTable, config: GlossaryConfig, capability: P) -> Self {
        let blacklist = config.blacklist_set();
        let presenter = AnnotationPresenter::new(capability, config.presenter.clone());
        Self {
            table,
            config,
            blacklist,
            engine: MatchEngine::new(),
            presenter,
            pending: Vec::new(),
        }
    }

    /// Swap in a differently configured match engine
    pub fn with_engine(mut self, engine: MatchEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn table(&self) -> &TermTable {
        &self.table
    }

    pub fn config(&self) -> &GlossaryConfig {
        &self.config
    }

    pub fn presenter(&self) -> &AnnotationPresenter<P> {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut AnnotationPresenter<P> {
        &mut self.presenter
    }

    /// True if `region` overlaps a pass that has not finished
    pub fn is_busy(&self, tree: &ContentTree, region: NodeId) -> bool {
        self.pending.iter().any(|&p| {
            tree.is_inclusive_descendant(region, p) || tree.is_inclusive_descendant(p, region)
        })
    }

    /// Run a whole pass synchronously (slicing still applies internally)
    pub fn annotate(&mut self, tree: &mut ContentTree) -> Result<AnnotationReport> {
        let mut job = self.begin(tree)?;
        while self.step(&mut job, tree)? == StepOutcome::Continue {}
        job.report.ok_or_else(|| GlossError::PassPending("ended without a report".to_string()))
    }

    /// Start a pass over the configured targets using the wall clock
    pub fn begin(&mut self, tree: &ContentTree) -> Result<AnnotationJob> {
        self.begin_with_clock(tree, InstantClock::new())
    }

    pub fn begin_with_clock<C: Clock>(&mut self, tree: &ContentTree, clock: C) -> Result<AnnotationJob<C>> {
        let targets = select_regions(tree, self.config.target.as_deref(), Fallback::Body);
        if let Some(&busy) = targets.iter().find(|&&t| self.is_busy(tree, t)) {
            return Err(GlossError::RegionBusy(busy));
        }

        let mut scheduler = ChunkedScheduler::new(self.config.scheduler.clone(), clock);
        scheduler.start(tree, &targets);
        self.pending.extend(targets.iter().copied());

        Ok(AnnotationJob {
            scheduler,
            targets,
            started: instant::Instant::now(),
            report: None,
        })
    }

    /// Advance `job` by one slice. When tagging completes, the post-pass
    /// (unnest, present, strip) runs in the same call.
    pub fn step<C: Clock>(&mut self, job: &mut AnnotationJob<C>, tree: &mut ContentTree) -> Result<StepOutcome> {
        if job.is_done() {
            return Ok(StepOutcome::Done);
        }
        match job.scheduler.step(tree, &mut self.engine, &self.table, &self.blacklist) {
            StepOutcome::Continue => Ok(StepOutcome::Continue),
            StepOutcome::Done => {
                self.pending.retain(|p| !job.targets.contains(p));
                let report = self.finish(job, tree)?;
                log::info!(
                    "glossary pass done: {} markers kept over {} regions in {}us",
                    report.popovers_attached,
                    report.regions,
                    report.elapsed_us
                );
                job.report = Some(report);
                Ok(StepOutcome::Done)
            }
        }
    }

    fn finish<C: Clock>(&mut self, job: &AnnotationJob<C>, tree: &mut ContentTree) -> Result<AnnotationReport> {
        let mut markers_unnested = 0;
        for &target in &job.targets {
            markers_unnested += unnest_markers(tree, target)?;
        }

        let mut popovers_attached = 0;
        for &target in &job.targets {
            popovers_attached += self.presenter.present_region(tree, target, &self.table)?;
        }

        let mut markers_stripped = 0;
        for region in select_regions(tree, self.config.exclude.as_deref(), Fallback::None) {
            for marker in strip_markers(tree, region)? {
                if self.presenter.release(tree, marker)? {
                    popovers_attached = popovers_attached.saturating_sub(1);
                }
                markers_stripped += 1;
            }
        }

        let stats = job.scheduler.stats();
        Ok(AnnotationReport {
            strategy: job.scheduler.strategy().unwrap_or(PassStrategy::Sync),
            regions: job.targets.len(),
            text_units: stats.text_units,
            slices: stats.slices,
            terms_attempted: stats.terms_attempted,
            terms_blacklisted: stats.terms_blacklisted,
            markers_created: stats.markers_created,
            markers_unnested,
            markers_stripped,
            popovers_attached,
            failures: stats.failures.clone(),
            elapsed_us: job.started.elapsed().as_micros() as u64,
        })
    }

    /// Key handler for the host page. Escape closes every open popover.
    pub fn handle_key(&mut self, key: &str) -> usize {
        match key {
            "Escape" | "Esc" => self.dismiss_all(),
            _ => 0,
        }
    }

    pub fn dismiss_all(&mut self) -> usize {
        self.presenter.dismiss_all()
    }

    /// Forget pending passes and destroy every popover
    pub fn teardown(&mut self) {
        self.presenter.teardown();
        self.pending.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
