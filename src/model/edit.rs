use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::model::{Alias, Bbid, EntityAttributes, Identifier, Relationship, ReleaseEvent};

/// The proposed state of an entity, as submitted by an entity editor form.
///
/// Sets are full replacements: an omitted list clears that set. Omitted
/// `attributes` keep the entity's current attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityEdit {
    pub aliases: Vec<Alias>,
    pub identifiers: Vec<Identifier>,
    pub relationships: Vec<RelationshipEdit>,
    pub annotation: Option<String>,
    pub disambiguation: Option<String>,
    pub languages: Vec<i32>,
    pub publishers: Vec<Bbid>,
    pub release_events: Vec<ReleaseEvent>,
    pub attributes: Option<EntityAttributes>,
    pub note: Option<String>,
}

/// A relationship as submitted; a missing end refers to the entity being
/// edited (which may not have a BBID yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEdit {
    pub type_id: i32,
    #[serde(default)]
    pub source_bbid: Option<Bbid>,
    #[serde(default)]
    pub target_bbid: Option<Bbid>,
}

impl RelationshipEdit {
    pub fn resolve(&self, own_bbid: Bbid) -> Relationship {
        Relationship {
            type_id: self.type_id,
            source_bbid: self.source_bbid.unwrap_or(own_bbid),
            target_bbid: self.target_bbid.unwrap_or(own_bbid),
        }
    }
}

impl EntityEdit {
    /// Aliases with exactly one default: the first flagged one, or the first alias
    pub fn normalized_aliases(&self) -> Vec<Alias> {
        let default_index = self
            .aliases
            .iter()
            .position(|alias| alias.default)
            .unwrap_or(0);
        self.aliases
            .iter()
            .enumerate()
            .map(|(index, alias)| Alias {
                default: index == default_index,
                ..alias.clone()
            })
            .collect()
    }

    pub fn normalized_languages(&self) -> Vec<i32> {
        self.languages.iter().copied().sorted().dedup().collect()
    }

    pub fn normalized_publishers(&self) -> Vec<Bbid> {
        self.publishers.iter().copied().sorted().dedup().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteRequest {
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(name: &str, default: bool) -> Alias {
        Alias {
            name: name.to_string(),
            sort_name: name.to_string(),
            language_id: None,
            primary: true,
            default,
        }
    }

    #[test]
    fn test_first_alias_becomes_default_when_none_flagged() {
        let edit = EntityEdit {
            aliases: vec![alias("A", false), alias("B", false)],
            ..Default::default()
        };
        let aliases = edit.normalized_aliases();
        assert!(aliases[0].default);
        assert!(!aliases[1].default);
    }

    #[test]
    fn test_only_first_flagged_alias_stays_default() {
        let edit = EntityEdit {
            aliases: vec![alias("A", false), alias("B", true), alias("C", true)],
            ..Default::default()
        };
        let defaults: Vec<_> = edit
            .normalized_aliases()
            .into_iter()
            .map(|a| a.default)
            .collect();
        assert_eq!(defaults, vec![false, true, false]);
    }

    #[test]
    fn test_edit_deserializes_from_camel_case() {
        let json = r#"{
            "aliases": [{"name": "Ursula K. Le Guin", "sortName": "Le Guin, Ursula K."}],
            "relationships": [{"typeId": 8, "targetBbid": "6c1a8e3e-0bd6-4a3b-9c2e-9b3f0d1f7a10"}],
            "languages": [3, 1, 3],
            "attributes": {"entityType": "Author", "beginDate": "1929-10-21"},
            "note": "initial import"
        }"#;
        let edit: EntityEdit = serde_json::from_str(json).unwrap();
        assert_eq!(edit.aliases.len(), 1);
        assert_eq!(edit.relationships[0].source_bbid, None);
        assert_eq!(edit.normalized_languages(), vec![1, 3]);
        match edit.attributes {
            Some(EntityAttributes::Author(attrs)) => {
                assert_eq!(attrs.begin_date.as_deref(), Some("1929-10-21"));
                assert!(!attrs.ended);
            }
            other => panic!("unexpected attributes: {:?}", other),
        }
    }
}
