//! Connectivity graph: pins, links and nexuses
//!
//! A nexus is the set of all pins that are electrically the same node. Pins
//! are addressed by `(owner, index)`; the nexus arena hands out stable
//! [`NexusId`]s and recycles the slot of a nexus as soon as its last member
//! is unlinked, so an empty nexus is never observable.

use crate::ids::{NexusId, NodeId, SignalId};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Object that owns a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PinOwner {
    Signal(SignalId),
    Node(NodeId),
}

/// One terminal of a signal or node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pin {
    pub owner: PinOwner,
    pub index: u32,
}

impl Pin {
    pub fn signal(id: SignalId, index: u32) -> Self {
        Self {
            owner: PinOwner::Signal(id),
            index,
        }
    }

    pub fn node(id: NodeId, index: u32) -> Self {
        Self {
            owner: PinOwner::Node(id),
            index,
        }
    }

    pub fn as_signal(&self) -> Option<SignalId> {
        match self.owner {
            PinOwner::Signal(id) => Some(id),
            PinOwner::Node(_) => None,
        }
    }
}

impl fmt::Display for PinOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinOwner::Signal(id) => write!(f, "{}", id),
            PinOwner::Node(id) => write!(f, "{}", id),
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.owner, self.index)
    }
}

/// Equivalence class of connected pins. Member order is link order.
#[derive(Debug, Clone, Default)]
pub struct Nexus {
    links: IndexSet<Pin>,
}

impl Nexus {
    pub fn links(&self) -> impl Iterator<Item = Pin> + '_ {
        self.links.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, pin: Pin) -> bool {
        self.links.contains(&pin)
    }
}

/// Arena of nexuses plus the pin → nexus membership index
#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    slots: Vec<Option<Nexus>>,
    free: Vec<u32>,
    membership: HashMap<Pin, NexusId>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nexus_of(&self, pin: Pin) -> Option<NexusId> {
        self.membership.get(&pin).copied()
    }

    pub fn is_linked(&self, pin: Pin) -> bool {
        self.membership.contains_key(&pin)
    }

    pub fn nexus(&self, id: NexusId) -> Option<&Nexus> {
        self.slots.get(id.index()).and_then(|slot| slot.as_ref())
    }

    /// Members of a nexus in link order (empty for a stale id)
    pub fn members(&self, id: NexusId) -> impl Iterator<Item = Pin> + '_ {
        self.nexus(id).into_iter().flat_map(|nexus| nexus.links())
    }

    /// Number of live nexuses
    pub fn nexus_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NexusId, &Nexus)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|n| (NexusId(idx as u32), n)))
    }

    /// Make sure `pin` belongs to a nexus, creating a singleton if needed
    pub fn link(&mut self, pin: Pin) -> NexusId {
        if let Some(id) = self.nexus_of(pin) {
            return id;
        }
        let mut nexus = Nexus::default();
        nexus.links.insert(pin);
        let id = self.alloc(nexus);
        self.membership.insert(pin, id);
        id
    }

    /// Join the nexuses of two pins. The larger nexus survives and the members
    /// of the smaller one are appended to it.
    pub fn connect(&mut self, a: Pin, b: Pin) -> NexusId {
        let na = self.link(a);
        let nb = self.link(b);
        if na == nb {
            return na;
        }

        let (keep, gone) = if self.len_of(na) >= self.len_of(nb) {
            (na, nb)
        } else {
            (nb, na)
        };

        let moved = self.slots[gone.index()]
            .take()
            .map(|n| n.links)
            .unwrap_or_default();
        self.free.push(gone.0);

        for pin in &moved {
            self.membership.insert(*pin, keep);
        }
        if let Some(nexus) = self.slots[keep.index()].as_mut() {
            nexus.links.extend(moved);
        }
        keep
    }

    /// Remove `pin` from its nexus. The nexus is released when it becomes
    /// empty. Returns false if the pin was not linked.
    pub fn unlink(&mut self, pin: Pin) -> bool {
        let Some(id) = self.membership.remove(&pin) else {
            return false;
        };
        let now_empty = match self.slots[id.index()].as_mut() {
            Some(nexus) => {
                nexus.links.shift_remove(&pin);
                nexus.links.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.slots[id.index()] = None;
            self.free.push(id.0);
        }
        true
    }

    /// Check that membership and nexus contents agree and no nexus is empty
    pub fn validate(&self) -> Result<(), String> {
        for (id, nexus) in self.iter() {
            if nexus.is_empty() {
                return Err(format!("{} is empty", id));
            }
            for pin in nexus.links() {
                if self.nexus_of(pin) != Some(id) {
                    return Err(format!("{} listed in {} but indexed elsewhere", pin, id));
                }
            }
        }
        for (pin, id) in &self.membership {
            match self.nexus(*id) {
                Some(nexus) if nexus.contains(*pin) => {}
                _ => return Err(format!("{} indexed to {} but not a member", pin, id)),
            }
        }
        Ok(())
    }

    fn len_of(&self, id: NexusId) -> usize {
        self.nexus(id).map_or(0, |n| n.len())
    }

    fn alloc(&mut self, nexus: Nexus) -> NexusId {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx as usize] = Some(nexus);
                NexusId(idx)
            }
            None => {
                self.slots.push(Some(nexus));
                NexusId((self.slots.len() - 1) as u32)
            }
        }
    }
}
