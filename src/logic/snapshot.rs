use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::model::{EntityAttributes, EntityContent, EntityData, LookupKind};
use crate::store::{LookupStore, Transaction};

use super::load::load_content;

/// A lookup row as it appears in a snapshot. Unknown ids fall back to the
/// id itself so a change is still visible.
async fn lookup(
    tx: &mut dyn Transaction,
    kind: LookupKind,
    id: Option<i32>,
    key: &str,
) -> Result<Option<Value>> {
    let Some(id) = id else {
        return Ok(None);
    };
    let label = tx
        .get_label(kind, id)
        .await?
        .unwrap_or_else(|| id.to_string());
    Ok(Some(json!({ key: label })))
}

fn insert_some(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

/// The camelCase JSON shape of an entity's data, as compared by the
/// revision diff. Absent values are omitted rather than null.
pub async fn snapshot(tx: &mut dyn Transaction, data: &EntityData) -> Result<Value> {
    let content = load_content(tx, data).await?;
    snapshot_content(tx, &content).await
}

pub async fn snapshot_content(tx: &mut dyn Transaction, content: &EntityContent) -> Result<Value> {
    let mut map = Map::new();

    if !content.aliases.is_empty() {
        let mut aliases = Vec::with_capacity(content.aliases.len());
        for alias in &content.aliases {
            let mut entry = Map::new();
            entry.insert("name".into(), json!(alias.name));
            entry.insert("sortName".into(), json!(alias.sort_name));
            insert_some(
                &mut entry,
                "language",
                lookup(tx, LookupKind::Language, alias.language_id, "name").await?,
            );
            entry.insert("primary".into(), json!(alias.primary));
            aliases.push(Value::Object(entry));
        }

        let default_index = content
            .aliases
            .iter()
            .position(|alias| alias.default)
            .unwrap_or(0);
        let mut alias_set = Map::new();
        alias_set.insert("defaultAlias".into(), aliases[default_index].clone());
        alias_set.insert("aliases".into(), Value::Array(aliases));
        map.insert("aliasSet".into(), Value::Object(alias_set));
    }

    if !content.identifiers.is_empty() {
        let mut identifiers = Vec::with_capacity(content.identifiers.len());
        for identifier in &content.identifiers {
            let label = lookup(tx, LookupKind::IdentifierType, Some(identifier.type_id), "label")
                .await?;
            identifiers.push(json!({ "type": label, "value": identifier.value }));
        }
        map.insert("identifierSet".into(), json!({ "identifiers": identifiers }));
    }

    if !content.relationships.is_empty() {
        let mut relationships = Vec::with_capacity(content.relationships.len());
        for relationship in &content.relationships {
            let label = lookup(
                tx,
                LookupKind::RelationshipType,
                Some(relationship.type_id),
                "label",
            )
            .await?;
            relationships.push(json!({
                "type": label,
                "sourceBbid": relationship.source_bbid,
                "targetBbid": relationship.target_bbid,
            }));
        }
        map.insert(
            "relationshipSet".into(),
            json!({ "relationships": relationships }),
        );
    }

    insert_some(
        &mut map,
        "annotation",
        content.annotation.as_ref().map(|c| json!({ "content": c })),
    );
    insert_some(
        &mut map,
        "disambiguation",
        content.disambiguation.as_ref().map(|c| json!({ "comment": c })),
    );

    match &content.attributes {
        EntityAttributes::Author(attrs) => {
            insert_some(&mut map, "beginDate", attrs.begin_date.as_ref().map(|d| json!(d)));
            insert_some(&mut map, "endDate", attrs.end_date.as_ref().map(|d| json!(d)));
            insert_some(
                &mut map,
                "gender",
                lookup(tx, LookupKind::Gender, attrs.gender_id, "name").await?,
            );
            map.insert("ended".into(), json!(attrs.ended));
            insert_some(
                &mut map,
                "type",
                lookup(tx, LookupKind::AuthorType, attrs.type_id, "label").await?,
            );
        }
        EntityAttributes::Edition(attrs) => {
            insert_some(
                &mut map,
                "editionGroupBbid",
                attrs.edition_group_bbid.map(|bbid| json!(bbid)),
            );
            if !content.publishers.is_empty() {
                let publishers: Vec<Value> = content
                    .publishers
                    .iter()
                    .map(|bbid| json!({ "bbid": bbid }))
                    .collect();
                map.insert("publishers".into(), Value::Array(publishers));
            }
            if !content.release_events.is_empty() {
                let events: Vec<Value> = content
                    .release_events
                    .iter()
                    .map(|event| match &event.date {
                        Some(date) => json!({ "date": date }),
                        None => json!({}),
                    })
                    .collect();
                map.insert("releaseEvents".into(), Value::Array(events));
            }
            insert_languages(tx, &mut map, &content.languages).await?;
            insert_some(&mut map, "width", attrs.width.map(|v| json!(v)));
            insert_some(&mut map, "height", attrs.height.map(|v| json!(v)));
            insert_some(&mut map, "depth", attrs.depth.map(|v| json!(v)));
            insert_some(&mut map, "weight", attrs.weight.map(|v| json!(v)));
            insert_some(&mut map, "pages", attrs.pages.map(|v| json!(v)));
            insert_some(
                &mut map,
                "editionFormat",
                lookup(tx, LookupKind::EditionFormat, attrs.format_id, "label").await?,
            );
            insert_some(
                &mut map,
                "editionStatus",
                lookup(tx, LookupKind::EditionStatus, attrs.status_id, "label").await?,
            );
        }
        EntityAttributes::EditionGroup(attrs) => {
            insert_some(
                &mut map,
                "type",
                lookup(tx, LookupKind::EditionGroupType, attrs.type_id, "label").await?,
            );
        }
        EntityAttributes::Publisher(attrs) => {
            insert_some(&mut map, "beginDate", attrs.begin_date.as_ref().map(|d| json!(d)));
            insert_some(&mut map, "endDate", attrs.end_date.as_ref().map(|d| json!(d)));
            map.insert("ended".into(), json!(attrs.ended));
            insert_some(
                &mut map,
                "type",
                lookup(tx, LookupKind::PublisherType, attrs.type_id, "label").await?,
            );
        }
        EntityAttributes::Work(attrs) => {
            insert_languages(tx, &mut map, &content.languages).await?;
            insert_some(
                &mut map,
                "type",
                lookup(tx, LookupKind::WorkType, attrs.type_id, "label").await?,
            );
        }
    }

    Ok(Value::Object(map))
}

async fn insert_languages(
    tx: &mut dyn Transaction,
    map: &mut Map<String, Value>,
    languages: &[i32],
) -> Result<()> {
    if languages.is_empty() {
        return Ok(());
    }
    let mut names = Vec::with_capacity(languages.len());
    for id in languages {
        if let Some(language) = lookup(tx, LookupKind::Language, Some(*id), "name").await? {
            names.push(language);
        }
    }
    map.insert("languages".into(), Value::Array(names));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alias, AuthorAttributes, Identifier};
    use crate::store::{MemoryStore, Store};

    fn content(attributes: EntityAttributes) -> EntityContent {
        EntityContent {
            aliases: Vec::new(),
            identifiers: Vec::new(),
            relationships: Vec::new(),
            annotation: None,
            disambiguation: None,
            languages: Vec::new(),
            publishers: Vec::new(),
            release_events: Vec::new(),
            attributes,
        }
    }

    #[tokio::test]
    async fn test_author_snapshot_resolves_lookups() {
        let store = MemoryStore::new();
        store.seed_lookup(LookupKind::Gender, 2, "Female").await;
        store.seed_lookup(LookupKind::IdentifierType, 9, "VIAF").await;
        let mut tx = store.begin().await.unwrap();

        let mut author = content(EntityAttributes::Author(AuthorAttributes {
            gender_id: Some(2),
            type_id: Some(1),
            begin_date: Some("1929-10-21".into()),
            ..Default::default()
        }));
        author.aliases.push(Alias {
            name: "Ursula K. Le Guin".into(),
            sort_name: "Le Guin, Ursula K.".into(),
            language_id: None,
            primary: true,
            default: true,
        });
        author.identifiers.push(Identifier {
            type_id: 9,
            value: "12345".into(),
        });

        let value = snapshot_content(tx.as_mut(), &author).await.unwrap();
        assert_eq!(value["gender"], json!({"name": "Female"}));
        assert_eq!(value["type"], json!({"label": "1"}));
        assert_eq!(value["beginDate"], json!("1929-10-21"));
        assert!(value.get("endDate").is_none());
        assert_eq!(value["ended"], json!(false));
        assert_eq!(value["aliasSet"]["defaultAlias"]["name"], json!("Ursula K. Le Guin"));
        assert!(value["aliasSet"]["aliases"][0].get("language").is_none());
        assert_eq!(
            value["identifierSet"]["identifiers"][0],
            json!({"type": {"label": "VIAF"}, "value": "12345"})
        );
    }

    #[tokio::test]
    async fn test_empty_sets_are_omitted() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let value = snapshot_content(
            tx.as_mut(),
            &content(EntityAttributes::empty(crate::model::EntityType::Work)),
        )
        .await
        .unwrap();
        assert_eq!(value, json!({}));
    }
}
