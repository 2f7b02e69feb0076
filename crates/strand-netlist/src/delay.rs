//! Delay specifications (rise/fall/decay) and their resolved form

use crate::error::{NetlistError, Result};
use crate::expr::Expression;
use crate::ids::SignalId;
use std::sync::Arc;

/// One delay slot expression.
///
/// `Shared` trees belong to another owner as well (for example a primitive
/// model whose delays outlive any single instance); dropping the
/// specification only releases this reference.
#[derive(Debug, Clone, PartialEq)]
pub enum DelayExpr {
    Owned(Box<Expression>),
    Shared(Arc<Expression>),
}

impl DelayExpr {
    pub fn owned(expr: Expression) -> Self {
        DelayExpr::Owned(Box::new(expr))
    }

    pub fn shared(expr: Arc<Expression>) -> Self {
        DelayExpr::Shared(expr)
    }

    pub fn expr(&self) -> &Expression {
        match self {
            DelayExpr::Owned(e) => e,
            DelayExpr::Shared(e) => e,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, DelayExpr::Shared(_))
    }
}

/// Up to three delay expressions: rise, fall and decay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelaySpec {
    slots: [Option<DelayExpr>; 3],
}

impl DelaySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single owned delay (`#5`). Rise must not already be set.
    pub fn set_delay(&mut self, expr: Expression) -> Result<()> {
        if self.slots[0].is_some() {
            return Err(NetlistError::Invariant(
                "rise delay assigned twice".to_string(),
            ));
        }
        self.slots[0] = Some(DelayExpr::owned(expr));
        Ok(())
    }

    /// Full delay list (`#(r, f, d)`), replacing any previous contents
    pub fn set_delays(&mut self, exprs: Vec<DelayExpr>) -> Result<()> {
        if exprs.len() > 3 {
            return Err(NetlistError::Invariant(format!(
                "{} delay values given, at most 3 allowed",
                exprs.len()
            )));
        }
        self.slots = [None, None, None];
        for (slot, expr) in self.slots.iter_mut().zip(exprs) {
            *slot = Some(expr);
        }
        Ok(())
    }

    /// Builder form used by the loader and tests
    pub fn from_exprs(exprs: Vec<Expression>) -> Result<Self> {
        let mut spec = Self::new();
        spec.set_delays(exprs.into_iter().map(DelayExpr::owned).collect())?;
        Ok(spec)
    }

    pub fn slot(&self, idx: usize) -> Option<&Expression> {
        self.slots.get(idx)?.as_ref().map(DelayExpr::expr)
    }

    pub fn rise(&self) -> Option<&Expression> {
        self.slot(0)
    }

    pub fn fall(&self) -> Option<&Expression> {
        self.slot(1)
    }

    pub fn decay(&self) -> Option<&Expression> {
        self.slot(2)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

/// One resolved delay value
#[derive(Debug, Clone, PartialEq)]
pub enum DelayValue {
    /// Constant, in ticks of the design precision
    Ticks(u64),
    /// Computed at run time from an expression
    Runtime(Expression),
    /// Driven by a live signal
    Net(SignalId),
}

impl DelayValue {
    pub fn ticks(&self) -> Option<u64> {
        match self {
            DelayValue::Ticks(t) => Some(*t),
            _ => None,
        }
    }

    pub fn net(&self) -> Option<SignalId> {
        match self {
            DelayValue::Net(id) => Some(*id),
            _ => None,
        }
    }
}

/// Resolved rise/fall/decay triple; all absent means "no delay"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDelays {
    pub rise: Option<DelayValue>,
    pub fall: Option<DelayValue>,
    pub decay: Option<DelayValue>,
}

impl ResolvedDelays {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.rise.is_none() && self.fall.is_none() && self.decay.is_none()
    }

    pub fn values(&self) -> impl Iterator<Item = &DelayValue> {
        [&self.rise, &self.fall, &self.decay]
            .into_iter()
            .filter_map(Option::as_ref)
    }
}
