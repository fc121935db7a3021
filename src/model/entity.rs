use serde::{Deserialize, Serialize};

use crate::model::{Bbid, DataId, EntityType, RevisionId, SetId};

/// Entity header: the stable identity plus the pointer to its master revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityHeader {
    pub bbid: Bbid,
    pub entity_type: EntityType,
    /// None only while the entity is being created
    pub master_revision_id: Option<RevisionId>,
}

/// Immutable snapshot of an entity's state. Every field points at an
/// immutable row; a changed sub-object is a new row with a new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    pub alias_set_id: Option<SetId>,
    pub identifier_set_id: Option<SetId>,
    pub relationship_set_id: Option<SetId>,
    pub language_set_id: Option<SetId>,
    pub publisher_set_id: Option<SetId>,
    pub release_event_set_id: Option<SetId>,
    pub annotation_id: Option<i64>,
    pub disambiguation_id: Option<i64>,
    pub attributes: EntityAttributes,
}

impl EntityData {
    pub fn empty(entity_type: EntityType) -> Self {
        Self {
            alias_set_id: None,
            identifier_set_id: None,
            relationship_set_id: None,
            language_set_id: None,
            publisher_set_id: None,
            release_event_set_id: None,
            annotation_id: None,
            disambiguation_id: None,
            attributes: EntityAttributes::empty(entity_type),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.attributes.entity_type()
    }
}

/// Type-specific scalar attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType")]
pub enum EntityAttributes {
    Author(AuthorAttributes),
    Edition(EditionAttributes),
    EditionGroup(EditionGroupAttributes),
    Publisher(PublisherAttributes),
    Work(WorkAttributes),
}

impl EntityAttributes {
    pub fn empty(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Author => EntityAttributes::Author(AuthorAttributes::default()),
            EntityType::Edition => EntityAttributes::Edition(EditionAttributes::default()),
            EntityType::EditionGroup => {
                EntityAttributes::EditionGroup(EditionGroupAttributes::default())
            }
            EntityType::Publisher => EntityAttributes::Publisher(PublisherAttributes::default()),
            EntityType::Work => EntityAttributes::Work(WorkAttributes::default()),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityAttributes::Author(_) => EntityType::Author,
            EntityAttributes::Edition(_) => EntityType::Edition,
            EntityAttributes::EditionGroup(_) => EntityType::EditionGroup,
            EntityAttributes::Publisher(_) => EntityType::Publisher,
            EntityAttributes::Work(_) => EntityType::Work,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorAttributes {
    pub type_id: Option<i32>,
    pub gender_id: Option<i32>,
    pub begin_date: Option<String>,
    pub end_date: Option<String>,
    pub ended: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditionAttributes {
    pub edition_group_bbid: Option<Bbid>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub depth: Option<i32>,
    pub weight: Option<i32>,
    pub pages: Option<i32>,
    pub format_id: Option<i32>,
    pub status_id: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditionGroupAttributes {
    pub type_id: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublisherAttributes {
    pub type_id: Option<i32>,
    pub begin_date: Option<String>,
    pub end_date: Option<String>,
    pub ended: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkAttributes {
    pub type_id: Option<i32>,
}

/// Kinds of immutable item sets hanging off an entity's data row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetKind {
    Alias,
    Identifier,
    Relationship,
    Language,
    Publisher,
    ReleaseEvent,
}

impl SetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetKind::Alias => "alias",
            SetKind::Identifier => "identifier",
            SetKind::Relationship => "relationship",
            SetKind::Language => "language",
            SetKind::Publisher => "publisher",
            SetKind::ReleaseEvent => "release_event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alias {
    pub name: String,
    pub sort_name: String,
    #[serde(default)]
    pub language_id: Option<i32>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub type_id: i32,
    pub value: String,
}

/// A typed, directed link between two entities. Stored in the relationship
/// set of both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub type_id: i32,
    pub source_bbid: Bbid,
    pub target_bbid: Bbid,
}

impl Relationship {
    pub fn involves(&self, bbid: &Bbid) -> bool {
        &self.source_bbid == bbid || &self.target_bbid == bbid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEvent {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: i64,
    pub content: String,
    pub last_revision_id: RevisionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disambiguation {
    pub id: i64,
    pub comment: String,
}

/// An entity's data with every set resolved into its items
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityContent {
    pub aliases: Vec<Alias>,
    pub identifiers: Vec<Identifier>,
    pub relationships: Vec<Relationship>,
    pub annotation: Option<String>,
    pub disambiguation: Option<String>,
    pub languages: Vec<i32>,
    pub publishers: Vec<Bbid>,
    pub release_events: Vec<ReleaseEvent>,
    pub attributes: EntityAttributes,
}

impl EntityContent {
    pub fn default_alias(&self) -> Option<&Alias> {
        self.aliases
            .iter()
            .find(|alias| alias.default)
            .or_else(|| self.aliases.first())
    }
}

/// The API representation of an entity at its master revision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub bbid: Bbid,
    pub entity_type: EntityType,
    pub revision_id: Option<RevisionId>,
    pub data_id: Option<DataId>,
    pub deleted: bool,
    pub default_alias: Option<Alias>,
    pub content: Option<EntityContent>,
}
