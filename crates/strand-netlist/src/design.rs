//! The netlist store
//!
//! `Design` owns every scope, signal, node, event and process of an
//! elaborated circuit. Objects live in arenas addressed by stable ids;
//! deleted objects leave a tombstone so ids are never reused and a stale id
//! is reported instead of aliasing a newer object.
//!
//! The store keeps the bookkeeping the optimizer relies on:
//! - every pin is a member of at most one nexus (see [`Connectivity`])
//! - each signal counts the expression references made to it (`eref`)
//! - each event counts the statements waiting on it and triggering it

use crate::bits::BitVector;
use crate::delay::{DelaySpec, DelayValue, ResolvedDelays};
use crate::error::{NetlistError, Result};
use crate::expr::Expression;
use crate::ids::{EventId, NexusId, NodeId, ProcessId, ScopeId, SignalId};
use crate::nexus::{Connectivity, Pin, PinOwner};
use crate::span::SourceSpan;
use crate::stmt::Statement;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Module,
    Task,
    Function,
    Begin,
    Fork,
}

/// Hierarchical namespace
#[derive(Debug, Clone)]
pub struct Scope {
    pub name: String,
    pub full_name: String,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Declared time unit as a power of ten (-9 = 1ns)
    pub time_unit: i32,
    /// Declared time precision as a power of ten
    pub time_precision: i32,
    /// Whether the source gave this scope a timescale
    pub timescale_declared: bool,
    pub parameters: IndexMap<String, Expression>,
    signals: IndexMap<String, SignalId>,
    events: IndexMap<String, EventId>,
    nodes: Vec<NodeId>,
    children: Vec<ScopeId>,
}

impl Scope {
    pub fn new(name: impl Into<String>, kind: ScopeKind) -> Self {
        Self {
            name: name.into(),
            full_name: String::new(),
            kind,
            parent: None,
            time_unit: 0,
            time_precision: 0,
            timescale_declared: false,
            parameters: IndexMap::new(),
            signals: IndexMap::new(),
            events: IndexMap::new(),
            nodes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_timescale(mut self, unit: i32, precision: i32) -> Self {
        self.time_unit = unit;
        self.time_precision = precision;
        self.timescale_declared = true;
        self
    }

    /// Tasks and functions bind their ports positionally
    pub fn is_subroutine(&self) -> bool {
        matches!(self.kind, ScopeKind::Task | ScopeKind::Function)
    }

    pub fn signals(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.signals.values().copied()
    }

    pub fn events(&self) -> impl Iterator<Item = EventId> + '_ {
        self.events.values().copied()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    #[default]
    NotAPort,
    Input,
    Output,
    Inout,
}

/// A named vector of bits with one pin per bit
#[derive(Debug, Clone)]
pub struct Signal {
    pub id: SignalId,
    pub name: String,
    pub full_name: String,
    pub scope: ScopeId,
    pub width: u32,
    pub port: PortKind,
    /// Synthesized by the compiler rather than declared in source
    pub local: bool,
    pub span: SourceSpan,
    eref: u32,
}

impl Signal {
    pub fn pin(&self, index: u32) -> Pin {
        Pin::signal(self.id, index)
    }

    pub fn pins(&self) -> impl Iterator<Item = Pin> + '_ {
        (0..self.width).map(move |i| self.pin(i))
    }

    pub fn pin_count(&self) -> u32 {
        self.width
    }

    /// Number of expression references to this signal
    pub fn eref(&self) -> u32 {
        self.eref
    }

    pub fn is_port(&self) -> bool {
        self.port != PortKind::NotAPort
    }
}

/// Construction parameters for a signal
#[derive(Debug, Clone)]
pub struct SignalDecl {
    pub name: String,
    pub width: u32,
    pub port: PortKind,
    pub local: bool,
    pub span: SourceSpan,
}

impl SignalDecl {
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            port: PortKind::NotAPort,
            local: false,
            span: SourceSpan::unknown(),
        }
    }

    pub fn port(mut self, port: PortKind) -> Self {
        self.port = port;
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Any,
    Pos,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOp {
    Buf,
    Not,
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Gate; pin 0 is the output, pins 1.. the inputs
    Logic { op: LogicOp },
    /// Drives a constant value, one pin per bit
    Constant { value: BitVector },
    /// Event probe watching the nexuses its pins are linked to
    Probe { event: EventId, edge: Edge },
}

/// A structural device connected to the graph through its pins
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub scope: ScopeId,
    pub kind: NodeKind,
    pub pin_count: u32,
    pub delay: Option<DelaySpec>,
    pub delays: ResolvedDelays,
    pub span: SourceSpan,
}

impl Node {
    pub fn pin(&self, index: u32) -> Pin {
        Pin::node(self.id, index)
    }

    pub fn pins(&self) -> impl Iterator<Item = Pin> + '_ {
        (0..self.pin_count).map(move |i| self.pin(i))
    }
}

/// Wait/trigger rendezvous point
#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub scope: ScopeId,
    pub probes: Vec<NodeId>,
    pub span: SourceSpan,
    nwait: u32,
    ntrig: u32,
}

impl Event {
    /// Statements waiting on this event
    pub fn nwait(&self) -> u32 {
        self.nwait
    }

    /// Statements that trigger this event
    pub fn ntrig(&self) -> u32 {
        self.ntrig
    }

    pub fn is_dead(&self) -> bool {
        self.nwait == 0 && self.ntrig == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Initial,
    Always,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub id: ProcessId,
    pub kind: ProcessKind,
    pub scope: ScopeId,
    pub body: Statement,
    pub span: SourceSpan,
}

/// Object counts of a design
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignStats {
    pub scopes: usize,
    pub signals: usize,
    pub local_signals: usize,
    pub nodes: usize,
    pub events: usize,
    pub processes: usize,
    pub nexuses: usize,
}

/// Top-level owner of an elaborated circuit
#[derive(Debug, Clone)]
pub struct Design {
    pub name: String,
    precision: Option<i32>,
    scopes: Vec<Scope>,
    roots: Vec<ScopeId>,
    signals: Vec<Option<Signal>>,
    nodes: Vec<Option<Node>>,
    events: Vec<Option<Event>>,
    processes: Vec<Process>,
    connectivity: Connectivity,
    local_counter: u32,
}

impl Design {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            precision: None,
            scopes: Vec::new(),
            roots: Vec::new(),
            signals: Vec::new(),
            nodes: Vec::new(),
            events: Vec::new(),
            processes: Vec::new(),
            connectivity: Connectivity::new(),
            local_counter: 0,
        }
    }

    /// Simulation time precision (power of ten). Defaults to the finest
    /// precision declared by any scope.
    pub fn precision(&self) -> i32 {
        self.precision.unwrap_or(0)
    }

    pub fn set_precision(&mut self, precision: i32) {
        self.precision = Some(precision);
    }

    /// Give every scope without a declared timescale the time unit `unit`
    /// (and the same precision). The design precision is refined to match.
    pub fn apply_default_timescale(&mut self, unit: i32) {
        let mut applied = 0;
        for scope in self.scopes.iter_mut().filter(|s| !s.timescale_declared) {
            scope.time_unit = unit;
            scope.time_precision = unit;
            scope.timescale_declared = true;
            applied += 1;
        }
        if applied > 0 {
            self.precision = Some(self.precision.map_or(unit, |p| p.min(unit)));
            debug!("Applied default time unit {} to {} scopes", unit, applied);
        }
    }

    // ---- scopes ----------------------------------------------------------

    pub fn add_scope(&mut self, parent: Option<ScopeId>, mut scope: Scope) -> Result<ScopeId> {
        let id = ScopeId(self.scopes.len() as u32);
        scope.full_name = match parent {
            Some(p) => {
                let parent_scope = self.scope(p)?;
                if parent_scope
                    .children
                    .iter()
                    .any(|c| self.scopes[c.index()].name == scope.name)
                {
                    return Err(NetlistError::DuplicateName {
                        scope: parent_scope.full_name.clone(),
                        name: scope.name,
                    });
                }
                format!("{}.{}", parent_scope.full_name, scope.name)
            }
            None => {
                if self.roots.iter().any(|r| self.scopes[r.index()].name == scope.name) {
                    return Err(NetlistError::DuplicateName {
                        scope: "$root".to_string(),
                        name: scope.name,
                    });
                }
                scope.name.clone()
            }
        };
        scope.parent = parent;
        if scope.timescale_declared {
            self.precision = Some(match self.precision {
                Some(p) => p.min(scope.time_precision),
                None => scope.time_precision,
            });
        }
        match parent {
            Some(p) => self.scopes[p.index()].children.push(id),
            None => self.roots.push(id),
        }
        debug!("Added scope {} ({:?})", scope.full_name, scope.kind);
        self.scopes.push(scope);
        Ok(id)
    }

    pub fn scope(&self, id: ScopeId) -> Result<&Scope> {
        self.scopes
            .get(id.index())
            .ok_or_else(|| NetlistError::UnknownScope(id.to_string()))
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> Result<&mut Scope> {
        self.scopes
            .get_mut(id.index())
            .ok_or_else(|| NetlistError::UnknownScope(id.to_string()))
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, s)| (ScopeId(i as u32), s))
    }

    pub fn root_scopes(&self) -> &[ScopeId] {
        &self.roots
    }

    /// Look a scope up by its dotted hierarchical name
    pub fn find_scope(&self, full_name: &str) -> Option<ScopeId> {
        self.scopes
            .iter()
            .position(|s| s.full_name == full_name)
            .map(|i| ScopeId(i as u32))
    }

    pub fn set_parameter(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        value: Expression,
    ) -> Result<()> {
        self.scope_mut(scope)?.parameters.insert(name.into(), value);
        Ok(())
    }

    /// Find a parameter visible from `scope`, returning the scope that
    /// declares it so its value can be bound in the right context
    pub fn lookup_parameter(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &Expression)> {
        let mut cur = Some(scope);
        while let Some(id) = cur {
            let s = self.scopes.get(id.index())?;
            if let Some(value) = s.parameters.get(name) {
                return Some((id, value));
            }
            cur = s.parent;
        }
        None
    }

    // ---- signals ---------------------------------------------------------

    pub fn add_signal(&mut self, scope: ScopeId, decl: SignalDecl) -> Result<SignalId> {
        let id = SignalId(self.signals.len() as u32);
        let owner = self.scope(scope)?;
        if owner.signals.contains_key(&decl.name) {
            return Err(NetlistError::DuplicateName {
                scope: owner.full_name.clone(),
                name: decl.name,
            });
        }
        let full_name = format!("{}.{}", owner.full_name, decl.name);
        self.scopes[scope.index()]
            .signals
            .insert(decl.name.clone(), id);
        trace!("Added signal {} [{}]", full_name, decl.width);
        self.signals.push(Some(Signal {
            id,
            name: decl.name,
            full_name,
            scope,
            width: decl.width,
            port: decl.port,
            local: decl.local,
            span: decl.span,
            eref: 0,
        }));
        Ok(id)
    }

    /// Create a compiler-synthesized signal with a fresh name
    pub fn add_local_signal(&mut self, scope: ScopeId, width: u32) -> Result<SignalId> {
        self.scope(scope)?;
        let name = loop {
            let candidate = format!("_s{}", self.local_counter);
            self.local_counter += 1;
            if self.find_signal(scope, &candidate).is_none() {
                break candidate;
            }
        };
        self.add_signal(scope, SignalDecl::new(name, width).local())
    }

    pub fn signal(&self, id: SignalId) -> Result<&Signal> {
        self.signals
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| NetlistError::DeadObject(id.to_string()))
    }

    pub fn signal_mut(&mut self, id: SignalId) -> Result<&mut Signal> {
        self.signals
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| NetlistError::DeadObject(id.to_string()))
    }

    pub fn is_signal_alive(&self, id: SignalId) -> bool {
        self.signal(id).is_ok()
    }

    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().flatten()
    }

    /// Find a signal by name in `scope`
    pub fn find_signal(&self, scope: ScopeId, name: &str) -> Option<SignalId> {
        self.scopes.get(scope.index())?.signals.get(name).copied()
    }

    /// Resolve a name as seen from `scope`. Dotted names are hierarchical
    /// paths; plain names search outward through the parent scopes.
    pub fn resolve_signal(&self, scope: ScopeId, name: &str) -> Option<SignalId> {
        if let Some((path, base)) = name.rsplit_once('.') {
            let owner = self.find_scope(path)?;
            return self.find_signal(owner, base);
        }
        let mut cur = Some(scope);
        while let Some(id) = cur {
            if let Some(sig) = self.find_signal(id, name) {
                return Some(sig);
            }
            cur = self.scopes.get(id.index())?.parent;
        }
        None
    }

    /// Record a reference to `id` from outside the statement trees
    pub fn add_external_ref(&mut self, id: SignalId) -> Result<()> {
        self.signal_mut(id)?.eref += 1;
        Ok(())
    }

    /// Delete a signal, unlinking all its pins first
    pub fn delete_signal(&mut self, id: SignalId) -> Result<()> {
        let sig = self.signal(id)?;
        if sig.eref > 0 {
            return Err(NetlistError::Invariant(format!(
                "deleting {} with {} expression references",
                sig.full_name, sig.eref
            )));
        }
        let pins: Vec<Pin> = sig.pins().collect();
        let (scope, name) = (sig.scope, sig.name.clone());
        for pin in pins {
            self.connectivity.unlink(pin);
        }
        self.scopes[scope.index()].signals.shift_remove(&name);
        if let Some(slot) = self.signals.get_mut(id.index()) {
            if let Some(sig) = slot.take() {
                debug!("Deleted signal {}", sig.full_name);
            }
        }
        Ok(())
    }

    // ---- nodes -----------------------------------------------------------

    pub fn add_node(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        kind: NodeKind,
        pin_count: u32,
    ) -> Result<NodeId> {
        self.scope(scope)?;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node {
            id,
            name: name.into(),
            scope,
            kind,
            pin_count,
            delay: None,
            delays: ResolvedDelays::none(),
            span: SourceSpan::unknown(),
        }));
        self.scopes[scope.index()].nodes.push(id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| NetlistError::DeadObject(id.to_string()))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| NetlistError::DeadObject(id.to_string()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().flatten()
    }

    /// Attach a delay specification to a node. Signals named by the
    /// expressions count as expression references.
    pub fn set_node_delay(&mut self, id: NodeId, spec: DelaySpec) -> Result<()> {
        let new_refs = Self::delay_spec_refs(&spec);
        if let Some(old) = self.node_mut(id)?.delay.replace(spec) {
            for sig in Self::delay_spec_refs(&old) {
                self.release_ref(sig)?;
            }
        }
        for sig in new_refs {
            self.add_external_ref(sig)?;
        }
        Ok(())
    }

    fn delay_spec_refs(spec: &DelaySpec) -> Vec<SignalId> {
        let mut refs = Vec::new();
        for idx in 0..3 {
            if let Some(expr) = spec.slot(idx) {
                expr.visit_signals(&mut |s| refs.push(s));
            }
        }
        refs
    }

    /// Store resolved delays on a node; nets named by the new values gain an
    /// expression reference, nets named by the old values lose one
    pub fn set_node_delays(&mut self, id: NodeId, delays: ResolvedDelays) -> Result<()> {
        let old = std::mem::take(&mut self.node_mut(id)?.delays);
        for net in old.values().filter_map(DelayValue::net) {
            self.release_ref(net)?;
        }
        for net in delays.values().filter_map(DelayValue::net) {
            self.add_external_ref(net)?;
        }
        self.node_mut(id)?.delays = delays;
        Ok(())
    }

    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let pins: Vec<Pin> = node.pins().collect();
        let nets: Vec<SignalId> = node.delays.values().filter_map(DelayValue::net).collect();
        let scope = node.scope;
        let probed = match node.kind {
            NodeKind::Probe { event, .. } => Some(event),
            _ => None,
        };
        for pin in pins {
            self.connectivity.unlink(pin);
        }
        for net in nets {
            self.release_ref(net)?;
        }
        if let Some(event) = probed {
            if let Ok(ev) = self.event_mut(event) {
                ev.probes.retain(|p| *p != id);
            }
        }
        self.scopes[scope.index()].nodes.retain(|n| *n != id);
        self.nodes[id.index()] = None;
        trace!("Deleted {}", id);
        Ok(())
    }

    // ---- events ----------------------------------------------------------

    pub fn add_event(&mut self, scope: ScopeId, name: impl Into<String>) -> Result<EventId> {
        let name = name.into();
        let owner = self.scope(scope)?;
        if owner.events.contains_key(&name) {
            return Err(NetlistError::DuplicateName {
                scope: owner.full_name.clone(),
                name,
            });
        }
        let id = EventId(self.events.len() as u32);
        self.scopes[scope.index()].events.insert(name.clone(), id);
        self.events.push(Some(Event {
            id,
            name,
            scope,
            probes: Vec::new(),
            span: SourceSpan::unknown(),
            nwait: 0,
            ntrig: 0,
        }));
        Ok(id)
    }

    /// Add a probe to `event`, linking probe pin `i` to `targets[i]`
    pub fn add_probe(&mut self, event: EventId, edge: Edge, targets: &[Pin]) -> Result<NodeId> {
        let ev = self.event(event)?;
        let (scope, name) = (ev.scope, format!("{}.probe{}", ev.name, ev.probes.len()));
        let node = self.add_node(
            scope,
            name,
            NodeKind::Probe { event, edge },
            targets.len() as u32,
        )?;
        for (idx, target) in targets.iter().enumerate() {
            self.connect(Pin::node(node, idx as u32), *target)?;
        }
        self.event_mut(event)?.probes.push(node);
        Ok(node)
    }

    pub fn event(&self, id: EventId) -> Result<&Event> {
        self.events
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| NetlistError::DeadObject(id.to_string()))
    }

    fn event_mut(&mut self, id: EventId) -> Result<&mut Event> {
        self.events
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| NetlistError::DeadObject(id.to_string()))
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().flatten()
    }

    pub fn find_event(&self, scope: ScopeId, name: &str) -> Option<EventId> {
        self.scopes.get(scope.index())?.events.get(name).copied()
    }

    /// Resolve an event name as seen from `scope`, like [`Design::resolve_signal`]
    pub fn resolve_event(&self, scope: ScopeId, name: &str) -> Option<EventId> {
        if let Some((path, base)) = name.rsplit_once('.') {
            return self.find_event(self.find_scope(path)?, base);
        }
        let mut cur = Some(scope);
        while let Some(id) = cur {
            if let Some(ev) = self.find_event(id, name) {
                return Some(ev);
            }
            cur = self.scopes.get(id.index())?.parent;
        }
        None
    }

    /// Structural key of an event: the sorted (edge, probed nexus) pairs of
    /// all probe pins. Events without probes, or with an unlinked probe pin,
    /// have no key and are never similar to anything.
    pub fn event_key(&self, id: EventId) -> Option<Vec<(Edge, NexusId)>> {
        let ev = self.event(id).ok()?;
        if ev.probes.is_empty() {
            return None;
        }
        let mut key = Vec::new();
        for probe in &ev.probes {
            let node = self.node(*probe).ok()?;
            let NodeKind::Probe { edge, .. } = node.kind else {
                return None;
            };
            for pin in node.pins() {
                key.push((edge, self.connectivity.nexus_of(pin)?));
            }
        }
        key.sort();
        Some(key)
    }

    /// Another live event in the same scope with the same structure
    pub fn find_similar_event(&self, id: EventId) -> Option<EventId> {
        let key = self.event_key(id)?;
        let scope = self.event(id).ok()?.scope;
        self.scopes[scope.index()]
            .events
            .values()
            .copied()
            .filter(|other| *other != id)
            .find(|other| self.event_key(*other).as_ref() == Some(&key))
    }

    /// Redirect every wait and trigger of `dup` onto `survivor`. Afterwards
    /// `dup` has no waiters and no triggers.
    pub fn replace_event(&mut self, dup: EventId, survivor: EventId) -> Result<()> {
        if dup == survivor {
            return Err(NetlistError::Invariant(format!(
                "replacing {} with itself",
                dup
            )));
        }
        self.event(dup)?;
        self.event(survivor)?;
        for proc in &mut self.processes {
            proc.body.walk_mut(&mut |stmt| match stmt {
                Statement::Wait { events, .. } if events.contains(&dup) => {
                    let mut seen = Vec::with_capacity(events.len());
                    for ev in events.drain(..) {
                        let ev = if ev == dup { survivor } else { ev };
                        if !seen.contains(&ev) {
                            seen.push(ev);
                        }
                    }
                    *events = seen;
                }
                Statement::Trigger { event, .. } if *event == dup => *event = survivor,
                _ => {}
            });
        }
        for id in [dup, survivor] {
            let (nwait, ntrig) = self.count_event_uses(id);
            let ev = self.event_mut(id)?;
            ev.nwait = nwait;
            ev.ntrig = ntrig;
        }
        debug!("Replaced {} with {}", dup, survivor);
        Ok(())
    }

    fn count_event_uses(&self, id: EventId) -> (u32, u32) {
        let (mut nwait, mut ntrig) = (0, 0);
        for proc in &self.processes {
            proc.body.walk(&mut |stmt| match stmt {
                Statement::Wait { events, .. } => {
                    nwait += events.iter().filter(|e| **e == id).count() as u32
                }
                Statement::Trigger { event, .. } if *event == id => ntrig += 1,
                _ => {}
            });
        }
        (nwait, ntrig)
    }

    /// Delete an event that nothing waits on or triggers, with its probes
    pub fn delete_event(&mut self, id: EventId) -> Result<()> {
        let ev = self.event(id)?;
        if !ev.is_dead() {
            return Err(NetlistError::Invariant(format!(
                "deleting event {} with {} waiters and {} triggers",
                ev.name, ev.nwait, ev.ntrig
            )));
        }
        let probes = ev.probes.clone();
        let (scope, name) = (ev.scope, ev.name.clone());
        for probe in probes {
            self.delete_node(probe)?;
        }
        self.scopes[scope.index()].events.shift_remove(&name);
        self.events[id.index()] = None;
        debug!("Deleted event {}", name);
        Ok(())
    }

    // ---- connectivity ----------------------------------------------------

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn nexus_of(&self, pin: Pin) -> Option<NexusId> {
        self.connectivity.nexus_of(pin)
    }

    fn pin_count(&self, owner: PinOwner) -> Result<u32> {
        Ok(match owner {
            PinOwner::Signal(id) => self.signal(id)?.pin_count(),
            PinOwner::Node(id) => self.node(id)?.pin_count,
        })
    }

    fn check_pin(&self, pin: Pin) -> Result<()> {
        let count = self.pin_count(pin.owner)?;
        if pin.index >= count {
            return Err(NetlistError::PinOutOfRange {
                object: pin.owner.to_string(),
                pin: pin.index,
                count,
            });
        }
        Ok(())
    }

    /// Give a pin its own nexus if it has none
    pub fn link(&mut self, pin: Pin) -> Result<NexusId> {
        self.check_pin(pin)?;
        Ok(self.connectivity.link(pin))
    }

    /// Make two pins electrically equivalent
    pub fn connect(&mut self, a: Pin, b: Pin) -> Result<NexusId> {
        self.check_pin(a)?;
        self.check_pin(b)?;
        Ok(self.connectivity.connect(a, b))
    }

    /// Connect two signals bit for bit
    pub fn connect_signals(&mut self, a: SignalId, b: SignalId) -> Result<()> {
        let (left, right) = (self.signal(a)?, self.signal(b)?);
        if left.width != right.width {
            return Err(NetlistError::WidthMismatch {
                left: left.full_name.clone(),
                left_width: left.width as usize,
                right: right.full_name.clone(),
                right_width: right.width as usize,
            });
        }
        for idx in 0..left.width {
            self.connectivity
                .connect(Pin::signal(a, idx), Pin::signal(b, idx));
        }
        Ok(())
    }

    // ---- processes -------------------------------------------------------

    pub fn add_process(
        &mut self,
        scope: ScopeId,
        kind: ProcessKind,
        body: Statement,
        span: SourceSpan,
    ) -> Result<ProcessId> {
        self.scope(scope)?;
        self.count_statement_refs(&body)?;
        let id = ProcessId(self.processes.len() as u32);
        self.processes.push(Process {
            id,
            kind,
            scope,
            body,
            span,
        });
        Ok(id)
    }

    pub fn process(&self, id: ProcessId) -> Result<&Process> {
        self.processes
            .get(id.index())
            .ok_or_else(|| NetlistError::DeadObject(id.to_string()))
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Detach a process body for rewriting. Its references are released
    /// until [`Design::restore_process_body`] puts a body back.
    pub fn take_process_body(&mut self, id: ProcessId) -> Result<Statement> {
        let body = std::mem::replace(
            &mut self
                .processes
                .get_mut(id.index())
                .ok_or_else(|| NetlistError::DeadObject(id.to_string()))?
                .body,
            Statement::Noop,
        );
        self.release_statement_refs(&body)?;
        Ok(body)
    }

    pub fn restore_process_body(&mut self, id: ProcessId, body: Statement) -> Result<()> {
        self.count_statement_refs(&body)?;
        self.processes
            .get_mut(id.index())
            .ok_or_else(|| NetlistError::DeadObject(id.to_string()))?
            .body = body;
        Ok(())
    }

    fn statement_refs(stmt: &Statement) -> (Vec<SignalId>, Vec<EventId>, Vec<EventId>) {
        let (mut sigs, mut waits, mut trigs) = (Vec::new(), Vec::new(), Vec::new());
        stmt.walk(&mut |s| {
            for expr in s.expressions() {
                expr.visit_signals(&mut |id| sigs.push(id));
            }
            match s {
                Statement::Assign(assign) => sigs.extend(assign.lvals.iter().map(|l| l.signal)),
                Statement::Wait { events, .. } => waits.extend(events.iter().copied()),
                Statement::Trigger { event, .. } => trigs.push(*event),
                _ => {}
            }
        });
        (sigs, waits, trigs)
    }

    fn count_statement_refs(&mut self, stmt: &Statement) -> Result<()> {
        let (sigs, waits, trigs) = Self::statement_refs(stmt);
        for id in &sigs {
            self.signal(*id)?;
        }
        for id in waits.iter().chain(&trigs) {
            self.event(*id)?;
        }
        for id in sigs {
            self.add_external_ref(id)?;
        }
        for id in waits {
            self.event_mut(id)?.nwait += 1;
        }
        for id in trigs {
            self.event_mut(id)?.ntrig += 1;
        }
        Ok(())
    }

    fn release_statement_refs(&mut self, stmt: &Statement) -> Result<()> {
        let (sigs, waits, trigs) = Self::statement_refs(stmt);
        for id in sigs {
            self.release_ref(id)?;
        }
        for id in waits {
            let ev = self.event_mut(id)?;
            ev.nwait = ev.nwait.checked_sub(1).ok_or_else(|| {
                NetlistError::Invariant(format!("wait count underflow on {}", id))
            })?;
        }
        for id in trigs {
            let ev = self.event_mut(id)?;
            ev.ntrig = ev.ntrig.checked_sub(1).ok_or_else(|| {
                NetlistError::Invariant(format!("trigger count underflow on {}", id))
            })?;
        }
        Ok(())
    }

    fn release_ref(&mut self, id: SignalId) -> Result<()> {
        let sig = self.signal_mut(id)?;
        sig.eref = sig.eref.checked_sub(1).ok_or_else(|| {
            NetlistError::Invariant(format!("reference count underflow on {}", sig.full_name))
        })?;
        Ok(())
    }

    // ---- reporting -------------------------------------------------------

    pub fn stats(&self) -> DesignStats {
        DesignStats {
            scopes: self.scopes.len(),
            signals: self.signals().count(),
            local_signals: self.signals().filter(|s| s.local).count(),
            nodes: self.nodes().count(),
            events: self.events().count(),
            processes: self.processes.len(),
            nexuses: self.connectivity.nexus_count(),
        }
    }

    /// Full consistency check of the connectivity graph against the arenas
    pub fn validate(&self) -> Result<()> {
        self.connectivity.validate().map_err(NetlistError::Invariant)?;
        for (_, nexus) in self.connectivity.iter() {
            for pin in nexus.links() {
                self.check_pin(pin)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::Statement;

    fn design() -> (Design, ScopeId) {
        let mut design = Design::new("test");
        let top = design
            .add_scope(None, Scope::new("top", ScopeKind::Module).with_timescale(-9, -12))
            .unwrap();
        (design, top)
    }

    #[test]
    fn test_default_timescale_only_fills_undeclared_scopes() {
        let (mut design, top) = design();
        let sub = design
            .add_scope(Some(top), Scope::new("u1", ScopeKind::Module))
            .unwrap();
        assert_eq!(design.precision(), -12);

        design.apply_default_timescale(-15);
        assert_eq!(design.scope(top).unwrap().time_unit, -9);
        assert_eq!(design.scope(sub).unwrap().time_unit, -15);
        assert_eq!(design.precision(), -15);
    }

    #[test]
    fn test_names_and_precision() {
        let (mut design, top) = design();
        let sub = design
            .add_scope(Some(top), Scope::new("u1", ScopeKind::Module).with_timescale(-6, -15))
            .unwrap();
        assert_eq!(design.precision(), -15);
        assert_eq!(design.scope(sub).unwrap().full_name, "top.u1");

        let x = design.add_signal(top, SignalDecl::new("x", 4)).unwrap();
        assert_eq!(design.resolve_signal(sub, "x"), Some(x));
        assert_eq!(design.resolve_signal(sub, "top.x"), Some(x));
        assert!(design.add_signal(top, SignalDecl::new("x", 1)).is_err());

        let local = design.add_local_signal(top, 2).unwrap();
        assert!(design.signal(local).unwrap().local);
        assert_eq!(design.signal(local).unwrap().full_name, "top._s0");
    }

    #[test]
    fn test_delete_signal_unlinks_pins() {
        let (mut design, top) = design();
        let a = design.add_signal(top, SignalDecl::new("a", 1)).unwrap();
        let b = design.add_signal(top, SignalDecl::new("b", 1)).unwrap();
        design.connect_signals(a, b).unwrap();
        assert_eq!(design.connectivity().nexus_count(), 1);

        design.delete_signal(a).unwrap();
        assert!(!design.is_signal_alive(a));
        assert_eq!(design.find_signal(top, "a"), None);
        let nex = design.nexus_of(Pin::signal(b, 0)).unwrap();
        assert_eq!(design.connectivity().members(nex).count(), 1);

        design.delete_signal(b).unwrap();
        assert_eq!(design.connectivity().nexus_count(), 0);
        design.validate().unwrap();
    }

    #[test]
    fn test_referenced_signal_cannot_be_deleted() {
        let (mut design, top) = design();
        let x = design.add_signal(top, SignalDecl::new("x", 1)).unwrap();
        let body = Statement::assign(x, Expression::integer(0));
        let proc = design
            .add_process(top, ProcessKind::Initial, body, SourceSpan::unknown())
            .unwrap();
        assert_eq!(design.signal(x).unwrap().eref(), 1);
        assert!(design.delete_signal(x).is_err());

        let body = design.take_process_body(proc).unwrap();
        assert_eq!(design.signal(x).unwrap().eref(), 0);
        design.restore_process_body(proc, body).unwrap();
        assert_eq!(design.signal(x).unwrap().eref(), 1);
    }

    #[test]
    fn test_similar_events_merge() {
        let (mut design, top) = design();
        let clk = design.add_signal(top, SignalDecl::new("clk", 1)).unwrap();
        let e1 = design.add_event(top, "e1").unwrap();
        let e2 = design.add_event(top, "e2").unwrap();
        design.add_probe(e1, Edge::Pos, &[Pin::signal(clk, 0)]).unwrap();
        design.add_probe(e2, Edge::Pos, &[Pin::signal(clk, 0)]).unwrap();

        for ev in [e1, e2] {
            let body = Statement::wait(vec![ev], Statement::Noop);
            design
                .add_process(top, ProcessKind::Always, body, SourceSpan::unknown())
                .unwrap();
        }

        assert_eq!(design.find_similar_event(e2), Some(e1));
        design.replace_event(e2, e1).unwrap();
        assert_eq!(design.event(e1).unwrap().nwait(), 2);
        assert!(design.event(e2).unwrap().is_dead());

        design.delete_event(e2).unwrap();
        assert_eq!(design.events().count(), 1);
        assert_eq!(design.nodes().count(), 1);
        for proc in design.processes() {
            assert!(matches!(&proc.body, Statement::Wait { events, .. } if events == &vec![e1]));
        }
    }

    #[test]
    fn test_different_edges_are_not_similar() {
        let (mut design, top) = design();
        let clk = design.add_signal(top, SignalDecl::new("clk", 1)).unwrap();
        let e1 = design.add_event(top, "e1").unwrap();
        let e2 = design.add_event(top, "e2").unwrap();
        let named = design.add_event(top, "named").unwrap();
        design.add_probe(e1, Edge::Pos, &[Pin::signal(clk, 0)]).unwrap();
        design.add_probe(e2, Edge::Neg, &[Pin::signal(clk, 0)]).unwrap();
        assert_eq!(design.find_similar_event(e1), None);
        assert_eq!(design.find_similar_event(named), None);
    }

    #[test]
    fn test_pin_range_checked() {
        let (mut design, top) = design();
        let x = design.add_signal(top, SignalDecl::new("x", 2)).unwrap();
        let y = design.add_signal(top, SignalDecl::new("y", 3)).unwrap();
        assert!(matches!(
            design.connect(Pin::signal(x, 2), Pin::signal(y, 0)),
            Err(NetlistError::PinOutOfRange { .. })
        ));
        assert!(matches!(
            design.connect_signals(x, y),
            Err(NetlistError::WidthMismatch { .. })
        ));
    }
}
