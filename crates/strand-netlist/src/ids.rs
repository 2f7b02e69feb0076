//! Stable handles into the design arenas.
//!
//! Scopes, signals, nodes, events and processes are never moved once
//! allocated; deletion leaves a tombstone, so their handles either resolve
//! to the object they were created for or to nothing. Nexus handles are the
//! exception: the connectivity arena reuses released slots, so a
//! [`NexusId`] is only meaningful until the next link or unlink.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of the object in its arena
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Hierarchical scope (module, task, function, named block)
    ScopeId,
    "scope#"
);
arena_id!(
    /// Net or variable vector
    SignalId,
    "sig#"
);
arena_id!(
    /// Structural device: logic gate, constant driver or event probe
    NodeId,
    "node#"
);
arena_id!(
    /// Wait/trigger rendezvous object
    EventId,
    "event#"
);
arena_id!(
    /// Behavioral process (initial/always)
    ProcessId,
    "proc#"
);
arena_id!(
    /// Equivalence class of connected pins. Slots are recycled, so look
    /// the id up again after changing connectivity.
    NexusId,
    "nexus#"
);
