//! JSON netlist loader
//!
//! The elaborator hands over its design as JSON. Scopes nest; signals,
//! events, nodes, connections and processes are declared in the scope that
//! owns them and refer to each other by name. Names without a dot are
//! searched outward from the declaring scope; dotted names are full
//! hierarchical paths.
//!
//! ```json
//! {
//!   "name": "counter",
//!   "scopes": [{
//!     "name": "top", "kind": "module", "time_unit": -9, "time_precision": -12,
//!     "signals": [{"name": "x", "width": 4}],
//!     "processes": [{"kind": "initial",
//!                    "body": {"kind": "assign", "lval": "x", "rval": "4'b1010"}}]
//!   }]
//! }
//! ```

use crate::bits::BitVector;
use crate::delay::DelaySpec;
use crate::design::{
    Design, Edge, LogicOp, NodeKind, PortKind, ProcessKind, Scope, ScopeKind, SignalDecl,
};
use crate::error::{NetlistError, Result};
use crate::expr::{BinaryOp, Expression, UnaryOp};
use crate::ids::{EventId, ScopeId};
use crate::nexus::Pin;
use crate::span::SourceSpan;
use crate::stmt::{Assign, DelayAmount, LValue, Statement};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct DesignDesc {
    #[serde(default = "default_design_name")]
    pub name: String,
    #[serde(default)]
    pub precision: Option<i32>,
    pub scopes: Vec<ScopeDesc>,
}

fn default_design_name() -> String {
    "design".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ScopeDesc {
    pub name: String,
    #[serde(default = "default_scope_kind")]
    pub kind: ScopeKind,
    #[serde(default)]
    pub time_unit: Option<i32>,
    /// Defaults to the time unit
    #[serde(default)]
    pub time_precision: Option<i32>,
    #[serde(default)]
    pub parameters: IndexMap<String, ExprDesc>,
    #[serde(default)]
    pub signals: Vec<SignalDesc>,
    #[serde(default)]
    pub events: Vec<EventDesc>,
    #[serde(default)]
    pub nodes: Vec<NodeDesc>,
    /// Each group lists pin references that are connected together
    #[serde(default)]
    pub connections: Vec<Vec<String>>,
    #[serde(default)]
    pub processes: Vec<ProcessDesc>,
    #[serde(default)]
    pub scopes: Vec<ScopeDesc>,
}

fn default_scope_kind() -> ScopeKind {
    ScopeKind::Module
}

#[derive(Debug, Deserialize)]
pub struct SignalDesc {
    pub name: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default)]
    pub port: PortKind,
    #[serde(default)]
    pub local: bool,
    /// References from outside the statement trees (for example from
    /// constructs this back end does not lower)
    #[serde(default)]
    pub eref: u32,
    #[serde(default)]
    pub span: SourceSpan,
}

fn default_width() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct EventDesc {
    pub name: String,
    #[serde(default)]
    pub probes: Vec<ProbeDesc>,
}

#[derive(Debug, Deserialize)]
pub struct ProbeDesc {
    pub edge: Edge,
    pub pins: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDesc {
    Logic {
        name: String,
        op: LogicOp,
        #[serde(default)]
        inputs: Option<u32>,
        #[serde(default)]
        delay: Vec<ExprDesc>,
    },
    Constant {
        name: String,
        value: String,
    },
}

/// Expression in the interchange format.
///
/// Integers and floats map to 32-bit numbers and reals; text is a sized
/// literal (`4'b10x1`, `12`) when it starts with a digit or `'`, and a name
/// otherwise. Operators are objects: `{"op": "add", "args": [a, b]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExprDesc {
    Int(u64),
    Float(f64),
    Text(String),
    Str { string: String },
    Op { op: String, args: Vec<ExprDesc> },
}

impl ExprDesc {
    pub fn to_expression(&self) -> Result<Expression> {
        Ok(match self {
            ExprDesc::Int(v) => Expression::integer(*v),
            ExprDesc::Float(v) => Expression::real(*v),
            ExprDesc::Str { string } => Expression::string(string.clone()),
            ExprDesc::Text(text) => {
                if text.starts_with(|c: char| c.is_ascii_digit() || c == '\'') {
                    Expression::number(text.parse::<BitVector>()?)
                } else {
                    Expression::ident(text.clone())
                }
            }
            ExprDesc::Op { op, args } => {
                let operands = args
                    .iter()
                    .map(ExprDesc::to_expression)
                    .collect::<Result<Vec<_>>>()?;
                build_operator(op, operands)?
            }
        })
    }
}

fn build_operator(op: &str, mut operands: Vec<Expression>) -> Result<Expression> {
    let unary = match op {
        "neg" => Some(UnaryOp::Neg),
        "not" => Some(UnaryOp::Not),
        "bit_not" => Some(UnaryOp::BitNot),
        _ => None,
    };
    if let Some(op) = unary {
        return match operands.pop() {
            Some(operand) if operands.is_empty() => Ok(Expression::unary(op, operand)),
            _ => Err(NetlistError::Invariant(format!(
                "operator {:?} takes one operand",
                op
            ))),
        };
    }
    let binary = match op {
        "add" => BinaryOp::Add,
        "sub" => BinaryOp::Sub,
        "mul" => BinaryOp::Mul,
        "div" => BinaryOp::Div,
        "and" | "bit_and" => BinaryOp::BitAnd,
        "or" | "bit_or" => BinaryOp::BitOr,
        "xor" | "bit_xor" => BinaryOp::BitXor,
        other => {
            return Err(NetlistError::Invariant(format!(
                "unknown operator `{}`",
                other
            )))
        }
    };
    if operands.len() != 2 {
        return Err(NetlistError::Invariant(format!(
            "operator {:?} takes two operands",
            binary
        )));
    }
    let right = operands.pop();
    let left = operands.pop();
    match (left, right) {
        (Some(l), Some(r)) => Ok(Expression::binary(binary, l, r)),
        _ => Err(NetlistError::Invariant("missing operand".to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LvalDesc {
    Name(String),
    Indexed { signal: String, mux: ExprDesc },
}

#[derive(Debug, Deserialize)]
pub struct ProcessDesc {
    pub kind: ProcessKind,
    pub body: StmtDesc,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StmtDesc {
    Assign {
        #[serde(default)]
        lval: Option<LvalDesc>,
        #[serde(default)]
        lvals: Vec<LvalDesc>,
        rval: ExprDesc,
        #[serde(default)]
        span: SourceSpan,
    },
    Block {
        stmts: Vec<StmtDesc>,
    },
    Condit {
        cond: ExprDesc,
        then: Box<StmtDesc>,
        #[serde(default, rename = "else")]
        otherwise: Option<Box<StmtDesc>>,
        #[serde(default)]
        span: SourceSpan,
    },
    Delay {
        amount: ExprDesc,
        body: Box<StmtDesc>,
        #[serde(default)]
        span: SourceSpan,
    },
    Noop,
    Systask {
        name: String,
        #[serde(default)]
        args: Vec<ExprDesc>,
        #[serde(default)]
        span: SourceSpan,
    },
    Wait {
        events: Vec<String>,
        body: Box<StmtDesc>,
        #[serde(default)]
        span: SourceSpan,
    },
    Trigger {
        event: String,
        #[serde(default)]
        span: SourceSpan,
    },
    While {
        cond: ExprDesc,
        body: Box<StmtDesc>,
        #[serde(default)]
        span: SourceSpan,
    },
    Forever {
        body: Box<StmtDesc>,
        #[serde(default)]
        span: SourceSpan,
    },
}

/// Load a design from JSON text
pub fn load_design(json: &str) -> Result<Design> {
    let desc: DesignDesc = serde_json::from_str(json)?;
    build_design(&desc)
}

/// Load a design from a JSON file
pub fn load_design_file(path: impl AsRef<Path>) -> Result<Design> {
    let path = path.as_ref();
    debug!("Loading netlist from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    load_design(&text)
}

/// Build a design from its parsed description
pub fn build_design(desc: &DesignDesc) -> Result<Design> {
    let mut design = Design::new(desc.name.clone());

    // Declarations first so that any statement or connection can name any
    // signal in the hierarchy.
    let mut scopes = Vec::new();
    for scope in &desc.scopes {
        declare_scope(&mut design, None, scope, &mut scopes)?;
    }
    for (id, scope) in &scopes {
        build_structure(&mut design, *id, scope)?;
    }
    for (id, scope) in &scopes {
        for proc in &scope.processes {
            let body = build_statement(&design, *id, &proc.body)?;
            design.add_process(*id, proc.kind, body, proc.span.clone())?;
        }
    }

    if let Some(precision) = desc.precision {
        design.set_precision(precision);
    }
    let stats = design.stats();
    info!(
        "Loaded design {}: {} scopes, {} signals, {} processes",
        design.name, stats.scopes, stats.signals, stats.processes
    );
    Ok(design)
}

fn declare_scope<'a>(
    design: &mut Design,
    parent: Option<ScopeId>,
    desc: &'a ScopeDesc,
    out: &mut Vec<(ScopeId, &'a ScopeDesc)>,
) -> Result<()> {
    let mut scope = Scope::new(desc.name.clone(), desc.kind);
    if let Some(unit) = desc.time_unit {
        scope = scope.with_timescale(unit, desc.time_precision.unwrap_or(unit));
    }
    let id = design.add_scope(parent, scope)?;
    for (name, value) in &desc.parameters {
        design.set_parameter(id, name.clone(), value.to_expression()?)?;
    }
    for sig in &desc.signals {
        let decl = SignalDecl::new(sig.name.clone(), sig.width)
            .port(sig.port)
            .with_span(sig.span.clone());
        let decl = if sig.local { decl.local() } else { decl };
        let sid = design.add_signal(id, decl)?;
        for _ in 0..sig.eref {
            design.add_external_ref(sid)?;
        }
    }
    for ev in &desc.events {
        design.add_event(id, ev.name.clone())?;
    }
    out.push((id, desc));
    for child in &desc.scopes {
        declare_scope(design, Some(id), child, out)?;
    }
    Ok(())
}

fn build_structure(design: &mut Design, scope: ScopeId, desc: &ScopeDesc) -> Result<()> {
    for node in &desc.nodes {
        match node {
            NodeDesc::Logic {
                name,
                op,
                inputs,
                delay,
            } => {
                let inputs = inputs.unwrap_or(match op {
                    LogicOp::Buf | LogicOp::Not => 1,
                    _ => 2,
                });
                let id = design.add_node(scope, name.clone(), NodeKind::Logic { op: *op }, inputs + 1)?;
                if !delay.is_empty() {
                    let exprs = delay
                        .iter()
                        .map(ExprDesc::to_expression)
                        .collect::<Result<Vec<_>>>()?;
                    design.set_node_delay(id, DelaySpec::from_exprs(exprs)?)?;
                }
            }
            NodeDesc::Constant { name, value } => {
                let value: BitVector = value.parse()?;
                let width = value.width() as u32;
                design.add_node(scope, name.clone(), NodeKind::Constant { value }, width)?;
            }
        }
    }

    for ev in &desc.events {
        let id = design
            .find_event(scope, &ev.name)
            .ok_or_else(|| NetlistError::UnknownEvent(ev.name.clone()))?;
        for probe in &ev.probes {
            let mut targets = Vec::new();
            for text in &probe.pins {
                targets.extend(resolve_pins(design, scope, text)?);
            }
            design.add_probe(id, probe.edge, &targets)?;
        }
    }

    for group in &desc.connections {
        let mut groups = group.iter();
        let Some(first) = groups.next() else {
            continue;
        };
        let base = resolve_pins(design, scope, first)?;
        for text in groups {
            let pins = resolve_pins(design, scope, text)?;
            if pins.len() != base.len() {
                return Err(NetlistError::WidthMismatch {
                    left: first.clone(),
                    left_width: base.len(),
                    right: text.clone(),
                    right_width: pins.len(),
                });
            }
            for (a, b) in base.iter().zip(&pins) {
                design.connect(*a, *b)?;
            }
        }
        if group.len() == 1 {
            for pin in base {
                design.link(pin)?;
            }
        }
    }
    Ok(())
}

/// Resolve `name`, `name[3]`, `path.name` or `path.name[3]` to pins of a
/// signal or node
fn resolve_pins(design: &Design, scope: ScopeId, text: &str) -> Result<Vec<Pin>> {
    let (name, index) = match text.strip_suffix(']').and_then(|t| t.split_once('[')) {
        Some((name, idx)) => {
            let idx = idx
                .trim()
                .parse::<u32>()
                .map_err(|_| NetlistError::InvalidNumber(text.to_string()))?;
            (name.trim(), Some(idx))
        }
        None => (text.trim(), None),
    };

    if let Some(sig) = design.resolve_signal(scope, name) {
        let width = design.signal(sig)?.width;
        return Ok(match index {
            Some(idx) => vec![Pin::signal(sig, idx)],
            None => (0..width).map(|i| Pin::signal(sig, i)).collect(),
        });
    }

    let (owner, base) = match name.rsplit_once('.') {
        Some((path, base)) => (
            design
                .find_scope(path)
                .ok_or_else(|| NetlistError::UnknownScope(path.to_string()))?,
            base,
        ),
        None => (scope, name),
    };
    let node = design
        .scope(owner)?
        .nodes()
        .iter()
        .copied()
        .find(|id| design.node(*id).map(|n| n.name == base).unwrap_or(false))
        .ok_or_else(|| NetlistError::UnknownSignal(text.to_string()))?;
    let count = design.node(node)?.pin_count;
    Ok(match index {
        Some(idx) => vec![Pin::node(node, idx)],
        None => (0..count).map(|i| Pin::node(node, i)).collect(),
    })
}

fn resolve_event(design: &Design, scope: ScopeId, name: &str) -> Result<EventId> {
    design
        .resolve_event(scope, name)
        .ok_or_else(|| NetlistError::UnknownEvent(name.to_string()))
}

fn bound(design: &Design, scope: ScopeId, desc: &ExprDesc) -> Result<Expression> {
    desc.to_expression()?.elaborate(design, scope)
}

fn build_lval(design: &Design, scope: ScopeId, desc: &LvalDesc) -> Result<LValue> {
    let (name, mux) = match desc {
        LvalDesc::Name(name) => (name, None),
        LvalDesc::Indexed { signal, mux } => (signal, Some(mux)),
    };
    let signal = design
        .resolve_signal(scope, name)
        .ok_or_else(|| NetlistError::UnknownSignal(name.clone()))?;
    Ok(match mux {
        Some(mux) => LValue::with_mux(signal, bound(design, scope, mux)?),
        None => LValue::new(signal),
    })
}

fn build_statement(design: &Design, scope: ScopeId, desc: &StmtDesc) -> Result<Statement> {
    let sub = |d: &StmtDesc| build_statement(design, scope, d).map(Box::new);
    Ok(match desc {
        StmtDesc::Assign {
            lval,
            lvals,
            rval,
            span,
        } => {
            let lvals = lval
                .iter()
                .chain(lvals)
                .map(|l| build_lval(design, scope, l))
                .collect::<Result<Vec<_>>>()?;
            if lvals.is_empty() {
                return Err(NetlistError::Invariant(format!(
                    "{}: assignment without a target",
                    span
                )));
            }
            Statement::Assign(Assign {
                lvals,
                rval: bound(design, scope, rval)?,
                span: span.clone(),
            })
        }
        StmtDesc::Block { stmts } => Statement::Block(
            stmts
                .iter()
                .map(|s| build_statement(design, scope, s))
                .collect::<Result<Vec<_>>>()?,
        ),
        StmtDesc::Condit {
            cond,
            then,
            otherwise,
            span,
        } => Statement::Condit {
            cond: bound(design, scope, cond)?,
            if_true: sub(then)?,
            if_false: otherwise.as_deref().map(sub).transpose()?,
            span: span.clone(),
        },
        // Delay amounts stay unbound until delay resolution, which binds
        // them against the scope's parameters and time unit.
        StmtDesc::Delay { amount, body, span } => Statement::Delay {
            amount: DelayAmount::Pending(amount.to_expression()?.with_span(span.clone())),
            body: sub(body)?,
            span: span.clone(),
        },
        StmtDesc::Noop => Statement::Noop,
        StmtDesc::Systask { name, args, span } => Statement::SysTask {
            name: name.clone(),
            args: args
                .iter()
                .map(|a| bound(design, scope, a))
                .collect::<Result<Vec<_>>>()?,
            span: span.clone(),
        },
        StmtDesc::Wait { events, body, span } => Statement::Wait {
            events: events
                .iter()
                .map(|e| resolve_event(design, scope, e))
                .collect::<Result<Vec<_>>>()?,
            body: sub(body)?,
            span: span.clone(),
        },
        StmtDesc::Trigger { event, span } => Statement::Trigger {
            event: resolve_event(design, scope, event)?,
            span: span.clone(),
        },
        StmtDesc::While { cond, body, span } => Statement::While {
            cond: bound(design, scope, cond)?,
            body: sub(body)?,
            span: span.clone(),
        },
        StmtDesc::Forever { body, span } => Statement::Forever {
            body: sub(body)?,
            span: span.clone(),
        },
    })
}
