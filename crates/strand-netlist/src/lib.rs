//! Strand netlist
//!
//! In-memory representation of an elaborated circuit:
//! - `nexus`: the connectivity graph of pins and nexuses
//! - `design`: the netlist store (scopes, signals, nodes, events, processes)
//! - `expr` / `stmt`: expression and behavioral statement trees
//! - `delay`: rise/fall/decay specifications and resolved delays
//! - `functor`: the graph-wide pass protocol
//! - `loader`: the JSON interchange format produced by the elaborator

pub mod bits;
pub mod delay;
pub mod design;
pub mod diagnostics;
pub mod error;
pub mod expr;
pub mod functor;
pub mod ids;
pub mod loader;
pub mod nexus;
pub mod span;
pub mod stmt;
mod synth;

pub use bits::{Bit, BitVector};
pub use delay::{DelayExpr, DelaySpec, DelayValue, ResolvedDelays};
pub use design::{
    Design, DesignStats, Edge, Event, LogicOp, Node, NodeKind, PortKind, Process, ProcessKind,
    Scope, ScopeKind, Signal, SignalDecl,
};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{NetlistError, Result};
pub use expr::{BinaryOp, ExprKind, Expression, UnaryOp};
pub use functor::Functor;
pub use ids::{EventId, NexusId, NodeId, ProcessId, ScopeId, SignalId};
pub use loader::{load_design, load_design_file};
pub use nexus::{Connectivity, Nexus, Pin, PinOwner};
pub use span::SourceSpan;
pub use stmt::{Assign, DelayAmount, LValue, Statement};
