//! Strand netlist optimization passes
//!
//! Passes rewrite a [`Design`] in place and report what they changed. The
//! only pass today is [`NoDangle`], which removes dead events and signals
//! left behind by elaboration.

pub mod error;
pub mod nodangle;

pub use error::{OptError, Result};
pub use nodangle::{eliminate, EliminationStats, NoDangle};

use strand_netlist::{Design, DesignStats};

/// Result of running an optimization pass
#[derive(Debug, Clone, Default)]
pub struct PassResult {
    /// Name of the pass
    pub pass_name: String,
    pub before: DesignStats,
    pub after: DesignStats,
    /// Whether the pass made any changes
    pub changed: bool,
    /// Additional statistics
    pub extra: Vec<(String, String)>,
}

impl PassResult {
    /// Create a new pass result
    pub fn new(pass_name: &str) -> Self {
        Self {
            pass_name: pass_name.to_string(),
            ..Default::default()
        }
    }

    /// Record the "before" stats
    pub fn record_before(&mut self, design: &Design) {
        self.before = design.stats();
    }

    /// Record the "after" stats and whether anything changed
    pub fn record_after(&mut self, design: &Design) {
        self.after = design.stats();
        self.changed = self.before != self.after;
    }

    /// Add a pass-specific statistic
    pub fn add_extra(&mut self, key: &str, value: &str) {
        self.extra.push((key.to_string(), value.to_string()));
    }

    /// Number of signals removed
    pub fn signal_reduction(&self) -> usize {
        self.before.signals.saturating_sub(self.after.signals)
    }

    /// Number of events removed
    pub fn event_reduction(&self) -> usize {
        self.before.events.saturating_sub(self.after.events)
    }
}

impl std::fmt::Display for PassResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: signals {} → {} (-{}), events {} → {} (-{}), nexuses {} → {}",
            self.pass_name,
            self.before.signals,
            self.after.signals,
            self.signal_reduction(),
            self.before.events,
            self.after.events,
            self.event_reduction(),
            self.before.nexuses,
            self.after.nexuses,
        )?;
        for (key, value) in &self.extra {
            write!(f, ", {} {}", key, value)?;
        }
        Ok(())
    }
}

/// A whole-design rewrite
pub trait Pass {
    fn name(&self) -> &str;

    fn run(&mut self, design: &mut Design) -> Result<PassResult>;
}

/// Run a sequence of passes, stopping at the first error
pub fn run_passes(design: &mut Design, passes: &mut [Box<dyn Pass>]) -> Result<Vec<PassResult>> {
    let mut results = Vec::with_capacity(passes.len());
    for pass in passes.iter_mut() {
        let result = pass.run(design)?;
        tracing::info!("{}", result);
        results.push(result);
    }
    Ok(results)
}
