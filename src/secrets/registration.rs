//! Per-pod bookkeeping of referenced secrets.
//!
//! The table remembers which keys each pod referenced when it was last
//! registered, so that a re-registration only touches the keys whose
//! reference count actually changes.

use std::collections::{BTreeSet, HashMap};

use crate::domain::ObjectKey;

/// Difference between a pod's previous and current secret references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDelta {
    /// Referenced now, not before.
    pub added: BTreeSet<ObjectKey>,
    /// Referenced before and still referenced.
    pub retained: BTreeSet<ObjectKey>,
    /// Referenced before, no longer referenced.
    pub removed: BTreeSet<ObjectKey>,
}

/// Maps pod identity to the secret keys it last referenced.
///
/// Not synchronized; the owner guards it.
#[derive(Debug, Default)]
pub struct RegistrationTable {
    pods: HashMap<ObjectKey, BTreeSet<ObjectKey>>,
}

impl RegistrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `keys` as the current references of `pod` and return the change
    /// relative to its previous registration.
    pub fn register(&mut self, pod: ObjectKey, keys: BTreeSet<ObjectKey>) -> RegistrationDelta {
        let previous = self.pods.insert(pod, keys.clone()).unwrap_or_default();

        RegistrationDelta {
            added: keys.difference(&previous).cloned().collect(),
            retained: keys.intersection(&previous).cloned().collect(),
            removed: previous.difference(&keys).cloned().collect(),
        }
    }

    /// Forget `pod`, returning the keys it referenced.
    pub fn unregister(&mut self, pod: &ObjectKey) -> Option<BTreeSet<ObjectKey>> {
        self.pods.remove(pod)
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}
