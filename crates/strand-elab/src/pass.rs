//! Design-wide delay resolution
//!
//! Resolves the delay specification of every node and turns every pending
//! `#delay` statement into either a tick count or a runtime expression.
//! Gates get their non-constant delays as nets.

use crate::error::{DelayError, Result};
use crate::resolve::{calculate_value, resolve};
use strand_netlist::{
    DelayAmount, DelayValue, Design, Diagnostics, NodeId, NodeKind, ProcessId, ScopeId, Statement,
};
use tracing::{debug, info};

/// Counters reported by [`resolve_design`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelayStats {
    pub node_specs: usize,
    pub statements: usize,
    pub constant: usize,
    pub runtime: usize,
    pub nets: usize,
}

impl DelayStats {
    fn count(&mut self, value: &DelayValue) {
        match value {
            DelayValue::Ticks(_) => self.constant += 1,
            DelayValue::Runtime(_) => self.runtime += 1,
            DelayValue::Net(_) => self.nets += 1,
        }
    }
}

pub fn resolve_design(design: &mut Design, diags: &mut Diagnostics) -> Result<DelayStats> {
    let mut stats = DelayStats::default();

    let pending: Vec<(NodeId, ScopeId, bool)> = design
        .nodes()
        .filter(|n| n.delay.is_some())
        .map(|n| (n.id, n.scope, matches!(n.kind, NodeKind::Logic { .. })))
        .collect();
    for (id, scope, as_nets) in pending {
        let Some(spec) = design.node(id)?.delay.clone() else {
            continue;
        };
        let delays = resolve(design, scope, &spec, as_nets, diags)?;
        for value in delays.values() {
            stats.count(value);
        }
        design.set_node_delays(id, delays)?;
        stats.node_specs += 1;
    }

    let procs: Vec<(ProcessId, ScopeId)> =
        design.processes().iter().map(|p| (p.id, p.scope)).collect();
    for (id, scope) in procs {
        let mut body = design.take_process_body(id)?;
        let result = resolve_statements(design, scope, &mut body, &mut stats);
        // The body goes back even on failure so reference counts stay whole.
        design.restore_process_body(id, body)?;
        result?;
    }

    info!(
        "Resolved {} node delay specifications and {} delay statements",
        stats.node_specs, stats.statements
    );
    debug!(
        "Delay values: {} constant, {} runtime, {} nets",
        stats.constant, stats.runtime, stats.nets
    );
    Ok(stats)
}

fn resolve_statements(
    design: &Design,
    scope: ScopeId,
    body: &mut Statement,
    stats: &mut DelayStats,
) -> Result<()> {
    let mut failure: Option<DelayError> = None;
    body.walk_mut(&mut |stmt| {
        if failure.is_some() {
            return;
        }
        if let Statement::Delay { amount, .. } = stmt {
            let DelayAmount::Pending(expr) = amount else {
                return;
            };
            match calculate_value(design, scope, expr) {
                Ok(value) => {
                    stats.count(&value);
                    stats.statements += 1;
                    *amount = match value {
                        DelayValue::Ticks(ticks) => DelayAmount::Ticks(ticks),
                        DelayValue::Runtime(expr) => DelayAmount::Runtime(expr),
                        DelayValue::Net(sig) => {
                            DelayAmount::Runtime(strand_netlist::Expression::signal(sig))
                        }
                    };
                }
                Err(err) => failure = Some(err),
            }
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
