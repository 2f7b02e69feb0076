//! Graph-wide pass protocol
//!
//! A [`Functor`] is handed every event, signal and node of a design in a
//! fixed order: scopes are visited children first; within a scope events
//! come before signals. Nodes are visited after all scopes. The set of
//! objects is snapshotted per scope, and objects deleted earlier in the
//! same walk are skipped, so a functor may freely delete what it is given.

use crate::design::Design;
use crate::error::Result;
use crate::ids::{EventId, NodeId, ScopeId, SignalId};

pub trait Functor {
    fn event(&mut self, _design: &mut Design, _event: EventId) -> Result<()> {
        Ok(())
    }

    fn signal(&mut self, _design: &mut Design, _signal: SignalId) -> Result<()> {
        Ok(())
    }

    fn node(&mut self, _design: &mut Design, _node: NodeId) -> Result<()> {
        Ok(())
    }
}

impl Design {
    /// Scopes in post-order (every child before its parent)
    pub fn scopes_post_order(&self) -> Vec<ScopeId> {
        fn visit(design: &Design, id: ScopeId, out: &mut Vec<ScopeId>) {
            if let Ok(scope) = design.scope(id) {
                for child in scope.children() {
                    visit(design, *child, out);
                }
            }
            out.push(id);
        }

        let mut out = Vec::new();
        for root in self.root_scopes() {
            visit(self, *root, &mut out);
        }
        out
    }

    /// Apply `fun` to every live object of the design
    pub fn functor<F: Functor + ?Sized>(&mut self, fun: &mut F) -> Result<()> {
        for scope in self.scopes_post_order() {
            let events: Vec<EventId> = self.scope(scope)?.events().collect();
            for event in events {
                if self.event(event).is_ok() {
                    fun.event(self, event)?;
                }
            }

            let signals: Vec<SignalId> = self.scope(scope)?.signals().collect();
            for signal in signals {
                if self.is_signal_alive(signal) {
                    fun.signal(self, signal)?;
                }
            }
        }

        let nodes: Vec<NodeId> = self.nodes().map(|n| n.id).collect();
        for node in nodes {
            if self.node(node).is_ok() {
                fun.node(self, node)?;
            }
        }
        Ok(())
    }
}
