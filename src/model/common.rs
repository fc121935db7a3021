use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable, opaque identifier of an entity. Survives every revision.
pub type Bbid = Uuid;
pub type RevisionId = i64;
pub type DataId = i64;
pub type SetId = i64;
pub type EditorId = i64;

pub fn generate_bbid() -> Bbid {
    Uuid::new_v4()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Author,
    Edition,
    EditionGroup,
    Publisher,
    Work,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Author,
        EntityType::Edition,
        EntityType::EditionGroup,
        EntityType::Publisher,
        EntityType::Work,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Author => "Author",
            EntityType::Edition => "Edition",
            EntityType::EditionGroup => "EditionGroup",
            EntityType::Publisher => "Publisher",
            EntityType::Work => "Work",
        }
    }

    /// URL path segment for this type, e.g. `edition-group`
    pub fn slug(&self) -> &'static str {
        match self {
            EntityType::Author => "author",
            EntityType::Edition => "edition",
            EntityType::EditionGroup => "edition-group",
            EntityType::Publisher => "publisher",
            EntityType::Work => "work",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.slug() == slug)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unrecognized entity type: '{}'", s))
    }
}

/// Reference tables that turn ids into display labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    Language,
    IdentifierType,
    RelationshipType,
    AuthorType,
    Gender,
    EditionFormat,
    EditionStatus,
    EditionGroupType,
    PublisherType,
    WorkType,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Language => "language",
            LookupKind::IdentifierType => "identifier_type",
            LookupKind::RelationshipType => "relationship_type",
            LookupKind::AuthorType => "author_type",
            LookupKind::Gender => "gender",
            LookupKind::EditionFormat => "edition_format",
            LookupKind::EditionStatus => "edition_status",
            LookupKind::EditionGroupType => "edition_group_type",
            LookupKind::PublisherType => "publisher_type",
            LookupKind::WorkType => "work_type",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_slugs_round_trip() {
        for entity_type in EntityType::ALL {
            assert_eq!(EntityType::from_slug(entity_type.slug()), Some(entity_type));
            assert_eq!(entity_type.as_str().parse::<EntityType>().unwrap(), entity_type);
        }
        assert_eq!(EntityType::from_slug("EditionGroup"), None);
        assert!("Creator".parse::<EntityType>().is_err());
    }
}
