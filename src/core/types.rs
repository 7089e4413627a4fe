use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global id counter shared by every engine in the process.
///
/// Ids are never reused, so a stale id can only fail to resolve; it can
/// never alias a newer object.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! engine_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            pub(crate) fn next() -> Self {
                Self(next_id())
            }

            /// Raw numeric value, useful for logging
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

engine_id!(
    /// Identifies a component created in an engine
    ComponentId,
    "component"
);
engine_id!(
    /// Identifies a net; changes whenever the net is absorbed by a merge
    LinkId,
    "link"
);
engine_id!(
    /// Identifies a circuit
    CircuitId,
    "circuit"
);
engine_id!(
    /// Identifies one evaluation context of a circuit
    StateId,
    "state"
);

impl ComponentId {
    /// Create a handle for the port at `index`
    pub fn port(&self, index: usize) -> PortId {
        PortId {
            component: *self,
            index,
        }
    }
}

/// Handle for one port of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId {
    pub(crate) component: ComponentId,
    pub(crate) index: usize,
}

impl PortId {
    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Port({}[{}])", self.component, self.index)
    }
}

/// Unit of pending propagation work
pub type PendingLink = (StateId, LinkId);
