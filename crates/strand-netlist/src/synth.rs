//! Structural synthesis of small expressions
//!
//! Used when a delay must be carried by a live net: the expression is built
//! out of constant drivers and gates, and the returned signal carries its
//! value.

use crate::design::{Design, LogicOp, NodeKind};
use crate::error::{NetlistError, Result};
use crate::expr::{BinaryOp, ExprKind, Expression, UnaryOp};
use crate::ids::{ScopeId, SignalId};
use crate::nexus::Pin;
use tracing::trace;

impl Expression {
    /// Build hardware driving a signal with this expression's value.
    ///
    /// Returns `Ok(None)` when the expression has no structural form (reals,
    /// strings, arithmetic, unbound names, or operands of different widths).
    /// The whole tree is checked first, so a `None` leaves the design
    /// untouched.
    pub fn synthesize(&self, design: &mut Design, scope: ScopeId) -> Result<Option<SignalId>> {
        if self.synthesized_width(design).is_none() {
            trace!("{} has no structural form", self);
            return Ok(None);
        }
        self.build(design, scope).map(Some)
    }

    /// Width of the signal `synthesize` would produce, or `None` if any
    /// part of the tree cannot be built
    fn synthesized_width(&self, design: &Design) -> Option<u32> {
        match &self.kind {
            ExprKind::Signal(id) => design.signal(*id).ok().map(|sig| sig.width),
            ExprKind::Number(value) => Some(value.width() as u32),
            ExprKind::Unary { op, operand } => {
                let width = operand.synthesized_width(design)?;
                match op {
                    UnaryOp::BitNot => Some(width),
                    UnaryOp::Not if width == 1 => Some(width),
                    _ => None,
                }
            }
            ExprKind::Binary { op, left, right } => {
                bitwise_gate(*op)?;
                let width = left.synthesized_width(design)?;
                (right.synthesized_width(design)? == width).then_some(width)
            }
            ExprKind::Real(_) | ExprKind::String(_) | ExprKind::Ident(_) => None,
        }
    }

    fn build(&self, design: &mut Design, scope: ScopeId) -> Result<SignalId> {
        match &self.kind {
            ExprKind::Signal(id) => Ok(*id),
            ExprKind::Number(value) => {
                let width = value.width() as u32;
                let node = design.add_node(
                    scope,
                    "const",
                    NodeKind::Constant {
                        value: value.clone(),
                    },
                    width,
                )?;
                let out = design.add_local_signal(scope, width)?;
                for idx in 0..width {
                    design.connect(Pin::node(node, idx), Pin::signal(out, idx))?;
                }
                trace!("Synthesized constant {} onto {}", value, out);
                Ok(out)
            }
            ExprKind::Unary { operand, .. } => {
                let input = operand.build(design, scope)?;
                let width = design.signal(input)?.width;
                gates(design, scope, LogicOp::Not, &[input], width)
            }
            ExprKind::Binary { op, left, right } => {
                let gate = bitwise_gate(*op).ok_or_else(|| not_structural(self))?;
                let l = left.build(design, scope)?;
                let r = right.build(design, scope)?;
                let width = design.signal(l)?.width;
                gates(design, scope, gate, &[l, r], width)
            }
            ExprKind::Real(_) | ExprKind::String(_) | ExprKind::Ident(_) => {
                Err(not_structural(self))
            }
        }
    }
}

fn bitwise_gate(op: BinaryOp) -> Option<LogicOp> {
    match op {
        BinaryOp::BitAnd => Some(LogicOp::And),
        BinaryOp::BitOr => Some(LogicOp::Or),
        BinaryOp::BitXor => Some(LogicOp::Xor),
        _ => None,
    }
}

fn not_structural(expr: &Expression) -> NetlistError {
    NetlistError::Invariant(format!("{} has no structural form", expr))
}

/// One gate per bit, output on pin 0, inputs on pins 1..
fn gates(
    design: &mut Design,
    scope: ScopeId,
    op: LogicOp,
    inputs: &[SignalId],
    width: u32,
) -> Result<SignalId> {
    let out = design.add_local_signal(scope, width)?;
    for bit in 0..width {
        let gate = design.add_node(
            scope,
            format!("{:?}", op).to_lowercase(),
            NodeKind::Logic { op },
            inputs.len() as u32 + 1,
        )?;
        design.connect(Pin::node(gate, 0), Pin::signal(out, bit))?;
        for (idx, input) in inputs.iter().enumerate() {
            design.connect(Pin::node(gate, idx as u32 + 1), Pin::signal(*input, bit))?;
        }
    }
    Ok(out)
}
