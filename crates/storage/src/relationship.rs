//! Declarative links between tables.
//!
//! Relationships only drive `join_related`; they are not enforced as
//! referential integrity.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    /// The target holds `foreign_key` pointing at this table's `id` (one match).
    HasOne,
    /// The target holds `foreign_key` pointing at this table's `id`.
    HasMany,
    /// This table holds `foreign_key` pointing at the target's `id`.
    BelongsTo,
}

/// A link from the owning table to `target`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub target: String,
    pub foreign_key: String,
}

impl Relationship {
    pub fn new(kind: RelationKind, target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            foreign_key: foreign_key.into(),
        }
    }

    pub fn has_one(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(RelationKind::HasOne, target, foreign_key)
    }

    pub fn has_many(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(RelationKind::HasMany, target, foreign_key)
    }

    pub fn belongs_to(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(RelationKind::BelongsTo, target, foreign_key)
    }

    /// Returns `(owner_field, target_field)`: the fields compared when joining
    /// owner records to target records.
    pub fn join_keys(&self) -> (&str, &str) {
        match self.kind {
            RelationKind::BelongsTo => (self.foreign_key.as_str(), tabula_core::ID_FIELD),
            RelationKind::HasOne | RelationKind::HasMany => {
                (tabula_core::ID_FIELD, self.foreign_key.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_keys() {
        assert_eq!(Relationship::belongs_to("users", "user_id").join_keys(), ("user_id", "id"));
        assert_eq!(Relationship::has_many("posts", "user_id").join_keys(), ("id", "user_id"));
        assert_eq!(Relationship::has_one("profiles", "user_id").join_keys(), ("id", "user_id"));
    }

    #[test]
    fn test_serde_shape() {
        let rel = Relationship::has_many("posts", "user_id");
        let json = serde_json::to_string(&rel).unwrap();
        assert_eq!(json, r#"{"type":"hasMany","target":"posts","foreignKey":"user_id"}"#);
        let back: Relationship = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rel);
    }
}
