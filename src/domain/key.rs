//! Object identity shared by secrets and pods.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace-qualified identity of an object.
///
/// Used both as the cache key for a secret and as the registration key for a
/// pod.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_display() {
        assert_eq!(ObjectKey::new("default", "registry-creds").to_string(), "default/registry-creds");
    }

    #[test]
    fn test_namespace_is_part_of_identity() {
        let mut keys = HashSet::new();
        keys.insert(ObjectKey::new("a", "token"));
        keys.insert(ObjectKey::new("b", "token"));
        keys.insert(ObjectKey::new("a", "token"));
        assert_eq!(keys.len(), 2);
    }
}
