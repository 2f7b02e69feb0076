//! Expression trees
//!
//! Expressions arrive from the elaborator either fully bound (signal
//! references are [`SignalId`]s) or, for delay expressions that have not been
//! evaluated yet, with bare identifiers that [`Expression::elaborate`] binds
//! against a scope.

use crate::bits::{Bit, BitVector};
use crate::design::Design;
use crate::error::{NetlistError, Result};
use crate::ids::{ScopeId, SignalId};
use crate::span::SourceSpan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameter chains deeper than this are treated as self-referential
const MAX_PARAMETER_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Arithmetic negation (`-a`)
    Neg,
    /// Logical not (`!a`)
    Not,
    /// Bitwise not (`~a`)
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// Sized four-valued constant
    Number(BitVector),
    /// Real constant
    Real(f64),
    /// String literal
    String(String),
    /// Name not yet bound to a parameter or signal
    Ident(String),
    /// Bound signal reference
    Signal(SignalId),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(flatten)]
    pub kind: ExprKind,
    #[serde(default)]
    pub span: SourceSpan,
}

impl Expression {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            span: SourceSpan::unknown(),
        }
    }

    pub fn number(value: BitVector) -> Self {
        Self::new(ExprKind::Number(value))
    }

    /// 32-bit unsigned integer constant
    pub fn integer(value: u64) -> Self {
        Self::number(BitVector::from_u64(value, 32))
    }

    pub fn real(value: f64) -> Self {
        Self::new(ExprKind::Real(value))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::new(ExprKind::String(text.into()))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Ident(name.into()))
    }

    pub fn signal(id: SignalId) -> Self {
        Self::new(ExprKind::Signal(id))
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Self::new(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ExprKind::Number(_) | ExprKind::Real(_))
    }

    pub fn as_number(&self) -> Option<&BitVector> {
        match &self.kind {
            ExprKind::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self.kind {
            ExprKind::Real(value) => Some(value),
            _ => None,
        }
    }

    /// Call `f` for every bound signal referenced by this expression
    pub fn visit_signals(&self, f: &mut impl FnMut(SignalId)) {
        match &self.kind {
            ExprKind::Signal(id) => f(*id),
            ExprKind::Unary { operand, .. } => operand.visit_signals(f),
            ExprKind::Binary { left, right, .. } => {
                left.visit_signals(f);
                right.visit_signals(f);
            }
            _ => {}
        }
    }

    /// Bind identifiers against `scope`: parameters first (walking outward
    /// through parent scopes), then signals.
    pub fn elaborate(&self, design: &Design, scope: ScopeId) -> Result<Expression> {
        self.elaborate_depth(design, scope, 0)
    }

    fn elaborate_depth(&self, design: &Design, scope: ScopeId, depth: usize) -> Result<Expression> {
        let kind = match &self.kind {
            ExprKind::Ident(name) => {
                if depth < MAX_PARAMETER_DEPTH {
                    if let Some((owner, value)) = design.lookup_parameter(scope, name) {
                        let mut bound = value.elaborate_depth(design, owner, depth + 1)?;
                        if !bound.span.is_known() {
                            bound.span = self.span.clone();
                        }
                        return Ok(bound);
                    }
                }
                match design.resolve_signal(scope, name) {
                    Some(id) => ExprKind::Signal(id),
                    None => {
                        return Err(NetlistError::UnresolvedName {
                            name: name.clone(),
                            span: self.span.clone(),
                        })
                    }
                }
            }
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: Box::new(operand.elaborate_depth(design, scope, depth)?),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: Box::new(left.elaborate_depth(design, scope, depth)?),
                right: Box::new(right.elaborate_depth(design, scope, depth)?),
            },
            other => other.clone(),
        };
        Ok(Expression {
            kind,
            span: self.span.clone(),
        })
    }

    /// Fold constant subtrees. Non-constant parts are kept as-is.
    pub fn fold(&self) -> Expression {
        let folded = match &self.kind {
            ExprKind::Unary { op, operand } => {
                let operand = operand.fold();
                fold_unary(*op, &operand).unwrap_or_else(|| ExprKind::Unary {
                    op: *op,
                    operand: Box::new(operand),
                })
            }
            ExprKind::Binary { op, left, right } => {
                let (left, right) = (left.fold(), right.fold());
                fold_binary(*op, &left, &right).unwrap_or_else(|| ExprKind::Binary {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            other => other.clone(),
        };
        Expression {
            kind: folded,
            span: self.span.clone(),
        }
    }
}

fn width_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn fold_unary(op: UnaryOp, operand: &Expression) -> Option<ExprKind> {
    match (&operand.kind, op) {
        (ExprKind::Real(r), UnaryOp::Neg) => Some(ExprKind::Real(-r)),
        (ExprKind::Real(r), UnaryOp::Not) => Some(ExprKind::Number(BitVector::from_u64(
            (*r == 0.0) as u64,
            1,
        ))),
        (ExprKind::Number(v), UnaryOp::Neg) => {
            let value = v.to_u64()?;
            let width = v.width();
            Some(ExprKind::Number(BitVector::from_u64(
                value.wrapping_neg() & width_mask(width),
                width,
            )))
        }
        (ExprKind::Number(v), UnaryOp::BitNot) => Some(ExprKind::Number(v.map(Bit::not))),
        (ExprKind::Number(v), UnaryOp::Not) => {
            let any_one = v.bits().iter().any(|b| *b == Bit::One);
            let bit = if any_one {
                Bit::Zero
            } else if v.is_defined() {
                Bit::One
            } else {
                Bit::X
            };
            Some(ExprKind::Number(BitVector::new(vec![bit])))
        }
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, left: &Expression, right: &Expression) -> Option<ExprKind> {
    match (&left.kind, &right.kind) {
        (ExprKind::Number(a), ExprKind::Number(b)) => match op {
            BinaryOp::BitAnd => Some(ExprKind::Number(a.zip_with(b, Bit::and))),
            BinaryOp::BitOr => Some(ExprKind::Number(a.zip_with(b, Bit::or))),
            BinaryOp::BitXor => Some(ExprKind::Number(a.zip_with(b, Bit::xor))),
            _ => {
                let (x, y) = (a.to_u64()?, b.to_u64()?);
                let width = a.width().max(b.width());
                let value = match op {
                    BinaryOp::Add => x.wrapping_add(y),
                    BinaryOp::Sub => x.wrapping_sub(y),
                    BinaryOp::Mul => x.wrapping_mul(y),
                    BinaryOp::Div if y != 0 => x / y,
                    _ => return None,
                };
                Some(ExprKind::Number(BitVector::from_u64(
                    value & width_mask(width),
                    width,
                )))
            }
        },
        (ExprKind::Real(_), _) | (_, ExprKind::Real(_)) => {
            let (x, y) = (real_value(left)?, real_value(right)?);
            let value = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
                _ => return None,
            };
            Some(ExprKind::Real(value))
        }
        _ => None,
    }
}

fn real_value(expr: &Expression) -> Option<f64> {
    match &expr.kind {
        ExprKind::Real(r) => Some(*r),
        ExprKind::Number(v) => v.to_u64().map(|n| n as f64),
        _ => None,
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Number(v) => write!(f, "{}", v),
            ExprKind::Real(r) => write!(f, "{}", r),
            ExprKind::String(s) => write!(f, "\"{}\"", s),
            ExprKind::Ident(name) => write!(f, "{}", name),
            ExprKind::Signal(id) => write!(f, "{}", id),
            ExprKind::Unary { op, operand } => {
                let sym = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::BitNot => "~",
                };
                write!(f, "{}({})", sym, operand)
            }
            ExprKind::Binary { op, left, right } => {
                let sym = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::BitAnd => "&",
                    BinaryOp::BitOr => "|",
                    BinaryOp::BitXor => "^",
                };
                write!(f, "({} {} {})", left, sym, right)
            }
        }
    }
}
