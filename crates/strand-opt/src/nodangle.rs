//! Dangling object elimination
//!
//! Removes events nothing waits on or triggers (after merging structurally
//! identical ones), signals with no connections, and compiler-made signals
//! whose every bit is already carried by a declared signal. Deleting one
//! object can strand another, so the walk repeats until an iteration
//! deletes nothing.

use crate::error::{OptError, Result};
use crate::{Pass, PassResult};
use strand_netlist::{Design, EventId, Functor, SignalId};
use tracing::{debug, trace};

/// Ceiling on fixed-point iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EliminationStats {
    pub iterations: usize,
    pub events_merged: usize,
    pub events_deleted: usize,
    pub signals_deleted: usize,
}

impl EliminationStats {
    /// Events and signals deleted
    pub fn deletions(&self) -> usize {
        self.events_deleted + self.signals_deleted
    }
}

pub struct NoDangle {
    max_iterations: usize,
    stats: EliminationStats,
    count: usize,
}

impl NoDangle {
    /// Create an eliminator with the default iteration ceiling
    pub fn new() -> Self {
        Self::with_max_iterations(DEFAULT_MAX_ITERATIONS)
    }

    /// Create an eliminator that gives up after `max_iterations`
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            stats: EliminationStats::default(),
            count: 0,
        }
    }

    /// Statistics of the last run
    pub fn stats(&self) -> EliminationStats {
        self.stats
    }

    /// Run to a fixed point
    pub fn eliminate(&mut self, design: &mut Design) -> Result<EliminationStats> {
        self.stats = EliminationStats::default();
        loop {
            if self.stats.iterations == self.max_iterations {
                return Err(OptError::NoFixedPoint {
                    pass: self.name().to_string(),
                    iterations: self.stats.iterations,
                });
            }
            self.stats.iterations += 1;
            self.count = 0;
            design.functor(self)?;
            debug!(
                "nodangle iteration {}: {} deletions",
                self.stats.iterations, self.count
            );
            if self.count == 0 {
                break;
            }
        }
        Ok(self.stats)
    }

    /// Every pin shares its nexus with some declared (non-local) signal
    fn shadowed_by_declared_signals(
        design: &Design,
        id: SignalId,
    ) -> strand_netlist::Result<bool> {
        let sig = design.signal(id)?;
        let conn = design.connectivity();
        for pin in sig.pins() {
            let Some(nexus) = conn.nexus_of(pin) else {
                return Ok(false);
            };
            let significant = conn.members(nexus).filter(|m| *m != pin).any(|m| {
                m.as_signal()
                    .and_then(|s| design.signal(s).ok())
                    .map(|s| !s.local)
                    .unwrap_or(false)
            });
            if !significant {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Default for NoDangle {
    fn default() -> Self {
        Self::new()
    }
}

impl Functor for NoDangle {
    fn event(&mut self, design: &mut Design, event: EventId) -> strand_netlist::Result<()> {
        if let Some(survivor) = design.find_similar_event(event) {
            design.replace_event(event, survivor)?;
            self.stats.events_merged += 1;
        }
        if design.event(event)?.is_dead() {
            design.delete_event(event)?;
            self.stats.events_deleted += 1;
            self.count += 1;
        }
        Ok(())
    }

    fn signal(&mut self, design: &mut Design, id: SignalId) -> strand_netlist::Result<()> {
        let sig = design.signal(id)?;
        if sig.eref() > 0 {
            return Ok(());
        }
        if sig.is_port() && design.scope(sig.scope)?.is_subroutine() {
            return Ok(());
        }

        let conn = design.connectivity();
        if sig.pins().all(|pin| !conn.is_linked(pin)) {
            trace!("{} is unconnected", sig.full_name);
            return self.delete(design, id);
        }

        if !sig.local {
            return Ok(());
        }
        if Self::shadowed_by_declared_signals(design, id)? {
            trace!("{} is shadowed by declared signals", sig.full_name);
            return self.delete(design, id);
        }
        Ok(())
    }
}

impl NoDangle {
    fn delete(&mut self, design: &mut Design, id: SignalId) -> strand_netlist::Result<()> {
        design.delete_signal(id)?;
        self.stats.signals_deleted += 1;
        self.count += 1;
        Ok(())
    }
}

impl Pass for NoDangle {
    fn name(&self) -> &str {
        "nodangle"
    }

    fn run(&mut self, design: &mut Design) -> Result<PassResult> {
        let mut result = PassResult::new(self.name());
        result.record_before(design);
        let stats = self.eliminate(design)?;
        result.record_after(design);
        result.add_extra("iterations", &stats.iterations.to_string());
        result.add_extra("merged events", &stats.events_merged.to_string());
        Ok(result)
    }
}

/// Run dangling object elimination with the default iteration ceiling
pub fn eliminate(design: &mut Design) -> Result<EliminationStats> {
    NoDangle::new().eliminate(design)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_netlist::{
        Expression, Pin, PortKind, ProcessKind, Scope, ScopeKind, SignalDecl, SourceSpan,
        Statement,
    };

    fn top() -> (Design, strand_netlist::ScopeId) {
        let mut design = Design::new("nodangle");
        let top = design
            .add_scope(None, Scope::new("top", ScopeKind::Module))
            .unwrap();
        (design, top)
    }

    #[test]
    fn test_unconnected_signal_is_deleted() {
        let (mut design, top) = top();
        let x = design.add_signal(top, SignalDecl::new("x", 3)).unwrap();
        let stats = eliminate(&mut design).unwrap();
        assert!(!design.is_signal_alive(x));
        assert_eq!(stats.signals_deleted, 1);
        assert_eq!(stats.iterations, 2);
    }

    #[test]
    fn test_referenced_signal_survives() {
        let (mut design, top) = top();
        let x = design.add_signal(top, SignalDecl::new("x", 1)).unwrap();
        design
            .add_process(
                top,
                ProcessKind::Initial,
                Statement::assign(x, Expression::integer(1)),
                SourceSpan::unknown(),
            )
            .unwrap();
        eliminate(&mut design).unwrap();
        assert!(design.is_signal_alive(x));
    }

    #[test]
    fn test_task_ports_survive() {
        let (mut design, top) = top();
        let task = design
            .add_scope(Some(top), Scope::new("t", ScopeKind::Task))
            .unwrap();
        let func = design
            .add_scope(Some(top), Scope::new("f", ScopeKind::Function))
            .unwrap();
        let a = design
            .add_signal(task, SignalDecl::new("a", 1).port(PortKind::Input))
            .unwrap();
        let r = design
            .add_signal(func, SignalDecl::new("r", 1).port(PortKind::Output))
            .unwrap();
        let tmp = design.add_signal(task, SignalDecl::new("tmp", 1)).unwrap();
        eliminate(&mut design).unwrap();
        assert!(design.is_signal_alive(a));
        assert!(design.is_signal_alive(r));
        assert!(!design.is_signal_alive(tmp));
    }

    #[test]
    fn test_shadowed_local_is_deleted() {
        let (mut design, top) = top();
        let x = design.add_signal(top, SignalDecl::new("x", 2)).unwrap();
        let t = design.add_local_signal(top, 2).unwrap();
        design.connect_signals(t, x).unwrap();
        let stats = eliminate(&mut design).unwrap();
        assert!(!design.is_signal_alive(t));
        assert!(design.is_signal_alive(x));
        assert_eq!(stats.signals_deleted, 1);
    }

    #[test]
    fn test_partially_shadowed_local_survives() {
        let (mut design, top) = top();
        let x = design.add_signal(top, SignalDecl::new("x", 1)).unwrap();
        let t = design.add_local_signal(top, 2).unwrap();
        let u = design.add_local_signal(top, 1).unwrap();
        design.connect(Pin::signal(t, 0), Pin::signal(x, 0)).unwrap();
        design.connect(Pin::signal(t, 1), Pin::signal(u, 0)).unwrap();
        let stats = eliminate(&mut design).unwrap();
        assert_eq!(stats.deletions(), 0);
        assert_eq!(stats.iterations, 1);
        assert!(design.is_signal_alive(t));
        assert!(design.is_signal_alive(u));
    }

    #[test]
    fn test_iteration_ceiling() {
        let (mut design, top) = top();
        design.add_signal(top, SignalDecl::new("x", 1)).unwrap();
        let err = NoDangle::with_max_iterations(1)
            .eliminate(&mut design)
            .unwrap_err();
        assert!(matches!(err, OptError::NoFixedPoint { iterations: 1, .. }));
    }
}
