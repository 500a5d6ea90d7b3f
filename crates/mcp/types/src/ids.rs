//! Record identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace-qualified record name, the unique key of every stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
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

    #[test]
    fn test_object_key_display() {
        let key = ObjectKey::new("default", "web");
        assert_eq!(key.to_string(), "default/web");
    }

    #[test]
    fn test_object_key_ordering() {
        let a = ObjectKey::new("a", "z");
        let b = ObjectKey::new("b", "a");
        assert!(a < b);
    }
}
