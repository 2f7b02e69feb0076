//! Behavioral statement trees attached to processes

use crate::expr::Expression;
use crate::ids::{EventId, SignalId};
use crate::span::SourceSpan;
use serde::{Deserialize, Serialize};

/// Assignment target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LValue {
    pub signal: SignalId,
    /// Bit-select index for `x[i] = ...` style targets
    #[serde(default)]
    pub mux: Option<Box<Expression>>,
}

impl LValue {
    pub fn new(signal: SignalId) -> Self {
        Self { signal, mux: None }
    }

    pub fn with_mux(signal: SignalId, index: Expression) -> Self {
        Self {
            signal,
            mux: Some(Box::new(index)),
        }
    }
}

/// Blocking procedural assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    pub lvals: Vec<LValue>,
    pub rval: Expression,
    #[serde(default)]
    pub span: SourceSpan,
}

/// Amount of a `#delay` statement.
///
/// The elaborator hands over `Pending` expressions; delay resolution turns
/// them into `Ticks` (compile-time constant at design precision) or `Runtime`
/// (the delay is computed while the thread runs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayAmount {
    Pending(Expression),
    Ticks(u64),
    Runtime(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Assign(Assign),
    Block(Vec<Statement>),
    Condit {
        cond: Expression,
        if_true: Box<Statement>,
        if_false: Option<Box<Statement>>,
        span: SourceSpan,
    },
    Delay {
        amount: DelayAmount,
        body: Box<Statement>,
        span: SourceSpan,
    },
    Noop,
    SysTask {
        name: String,
        args: Vec<Expression>,
        span: SourceSpan,
    },
    /// `@(event) body`
    Wait {
        events: Vec<EventId>,
        body: Box<Statement>,
        span: SourceSpan,
    },
    /// `-> event`
    Trigger { event: EventId, span: SourceSpan },
    While {
        cond: Expression,
        body: Box<Statement>,
        span: SourceSpan,
    },
    Forever {
        body: Box<Statement>,
        span: SourceSpan,
    },
}

impl Statement {
    pub fn assign(target: SignalId, value: Expression) -> Self {
        Statement::Assign(Assign {
            lvals: vec![LValue::new(target)],
            span: value.span.clone(),
            rval: value,
        })
    }

    pub fn condit(cond: Expression, if_true: Statement, if_false: Option<Statement>) -> Self {
        Statement::Condit {
            span: cond.span.clone(),
            cond,
            if_true: Box::new(if_true),
            if_false: if_false.map(Box::new),
        }
    }

    pub fn delay(amount: DelayAmount, body: Statement) -> Self {
        Statement::Delay {
            amount,
            body: Box::new(body),
            span: SourceSpan::unknown(),
        }
    }

    pub fn systask(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Statement::SysTask {
            name: name.into(),
            args,
            span: SourceSpan::unknown(),
        }
    }

    pub fn wait(events: Vec<EventId>, body: Statement) -> Self {
        Statement::Wait {
            events,
            body: Box::new(body),
            span: SourceSpan::unknown(),
        }
    }

    pub fn trigger(event: EventId) -> Self {
        Statement::Trigger {
            event,
            span: SourceSpan::unknown(),
        }
    }

    /// Short name of the statement kind, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Assign(_) => "assign",
            Statement::Block(_) => "block",
            Statement::Condit { .. } => "condit",
            Statement::Delay { .. } => "delay",
            Statement::Noop => "noop",
            Statement::SysTask { .. } => "stask",
            Statement::Wait { .. } => "wait",
            Statement::Trigger { .. } => "trigger",
            Statement::While { .. } => "while",
            Statement::Forever { .. } => "forever",
        }
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            Statement::Assign(assign) => Some(&assign.span),
            Statement::Block(_) | Statement::Noop => None,
            Statement::Condit { span, .. }
            | Statement::Delay { span, .. }
            | Statement::SysTask { span, .. }
            | Statement::Wait { span, .. }
            | Statement::Trigger { span, .. }
            | Statement::While { span, .. }
            | Statement::Forever { span, .. } => Some(span),
        }
    }

    /// Direct sub-statements
    pub fn children(&self) -> Vec<&Statement> {
        match self {
            Statement::Block(stmts) => stmts.iter().collect(),
            Statement::Condit {
                if_true, if_false, ..
            } => std::iter::once(if_true.as_ref())
                .chain(if_false.as_deref())
                .collect(),
            Statement::Delay { body, .. }
            | Statement::Wait { body, .. }
            | Statement::While { body, .. }
            | Statement::Forever { body, .. } => vec![body.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Pre-order walk over this statement and all nested statements
    pub fn walk(&self, f: &mut impl FnMut(&Statement)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Pre-order mutable walk
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Statement)) {
        f(self);
        match self {
            Statement::Block(stmts) => {
                for stmt in stmts {
                    stmt.walk_mut(f);
                }
            }
            Statement::Condit {
                if_true, if_false, ..
            } => {
                if_true.walk_mut(f);
                if let Some(stmt) = if_false {
                    stmt.walk_mut(f);
                }
            }
            Statement::Delay { body, .. }
            | Statement::Wait { body, .. }
            | Statement::While { body, .. }
            | Statement::Forever { body, .. } => body.walk_mut(f),
            _ => {}
        }
    }

    /// Expressions owned directly by this statement (not its children)
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            Statement::Assign(assign) => std::iter::once(&assign.rval)
                .chain(assign.lvals.iter().filter_map(|l| l.mux.as_deref()))
                .collect(),
            Statement::Condit { cond, .. } | Statement::While { cond, .. } => vec![cond],
            Statement::Delay { amount, .. } => match amount {
                DelayAmount::Pending(e) | DelayAmount::Runtime(e) => vec![e],
                DelayAmount::Ticks(_) => Vec::new(),
            },
            Statement::SysTask { args, .. } => args.iter().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_visits_nested_statements() {
        let body = Statement::Block(vec![
            Statement::condit(
                Expression::signal(SignalId(0)),
                Statement::assign(SignalId(1), Expression::integer(1)),
                Some(Statement::Noop),
            ),
            Statement::delay(DelayAmount::Ticks(5), Statement::trigger(EventId(0))),
        ]);
        let mut kinds = Vec::new();
        body.walk(&mut |s| kinds.push(s.kind_name()));
        assert_eq!(
            kinds,
            vec!["block", "condit", "assign", "noop", "delay", "trigger"]
        );
    }

    #[test]
    fn test_expressions_include_mux_index() {
        let stmt = Statement::Assign(Assign {
            lvals: vec![LValue::with_mux(SignalId(2), Expression::signal(SignalId(3)))],
            rval: Expression::integer(0),
            span: SourceSpan::unknown(),
        });
        assert_eq!(stmt.expressions().len(), 2);
    }
}
