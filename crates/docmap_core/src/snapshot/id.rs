//! Managed object identifier.

use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a managed object.
///
/// Either random, for objects that have no primary key yet, or derived
/// from the collection name and primary key so that loading the same
/// document twice yields the same identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 16]);

impl ObjectId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// Derives the identifier of a document from its collection and primary key.
    #[must_use]
    pub fn from_key(collection: &str, key: &str) -> Self {
        let name = format!("{collection}/{key}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).into_bytes())
    }

    /// Creates an identifier from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Converts to a UUID.
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_uuid())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid())
    }
}

impl FromStr for ObjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self::from)
    }
}

impl From<Uuid> for ObjectId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.into_bytes())
    }
}

impl From<ObjectId> for Uuid {
    fn from(id: ObjectId) -> Self {
        id.to_uuid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_unique() {
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn key_derivation_is_stable() {
        let a = ObjectId::from_key("users", "42");
        assert_eq!(a, ObjectId::from_key("users", "42"));
        assert_ne!(a, ObjectId::from_key("users", "43"));
        assert_ne!(a, ObjectId::from_key("orders", "42"));
    }

    #[test]
    fn display_parses_back() {
        let id = ObjectId::new();
        let parsed: ObjectId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<ObjectId>().is_err());
    }

    #[test]
    fn bytes_roundtrip() {
        let bytes = [7u8; 16];
        assert_eq!(*ObjectId::from_bytes(bytes).as_bytes(), bytes);
    }
}
