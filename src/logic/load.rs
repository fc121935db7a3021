use anyhow::Result;
use std::collections::HashSet;

use crate::error::{RevisionError, RevisionResult};
use crate::model::{
    Alias, Bbid, DataId, EntityContent, EntityData, EntityHeader, EntityType, EntityView,
    Identifier, Relationship, ReleaseEvent,
};
use crate::store::{EntityStore, RedirectStore, RevisionStore, SetStore, Transaction};

use super::sets::load_items;

/// An entity header together with the data at its master revision
#[derive(Debug, Clone)]
pub struct LoadedEntity {
    pub header: EntityHeader,
    pub data_id: Option<DataId>,
    pub data: Option<EntityData>,
}

impl LoadedEntity {
    pub fn is_deleted(&self) -> bool {
        self.header.master_revision_id.is_some() && self.data.is_none()
    }

    pub fn bbid(&self) -> Bbid {
        self.header.bbid
    }

    pub fn entity_type(&self) -> EntityType {
        self.header.entity_type
    }
}

pub async fn load_entity(tx: &mut dyn Transaction, bbid: &Bbid) -> Result<Option<LoadedEntity>> {
    let Some(header) = tx.get_entity(bbid).await? else {
        return Ok(None);
    };

    let data_id = match header.master_revision_id {
        Some(revision_id) => tx
            .get_entity_revision(revision_id, bbid)
            .await?
            .and_then(|er| er.data_id),
        None => None,
    };

    let data = match data_id {
        Some(id) => tx.get_entity_data(id).await?,
        None => None,
    };

    Ok(Some(LoadedEntity {
        header,
        data_id,
        data,
    }))
}

/// Load an entity that must exist, have the given type and not be deleted
pub async fn load_live_entity(
    tx: &mut dyn Transaction,
    entity_type: EntityType,
    bbid: &Bbid,
) -> RevisionResult<LoadedEntity> {
    let entity = load_entity(tx, bbid)
        .await?
        .filter(|entity| entity.entity_type() == entity_type)
        .ok_or_else(|| RevisionError::not_found(format!("{} {}", entity_type, bbid)))?;

    if entity.is_deleted() {
        return Err(RevisionError::not_found(format!(
            "{} {} has been deleted",
            entity_type, bbid
        )));
    }
    Ok(entity)
}

/// Resolve every set of a data row into its items
pub async fn load_content(tx: &mut dyn Transaction, data: &EntityData) -> Result<EntityContent> {
    let aliases: Vec<Alias> = load_items(tx, data.alias_set_id).await?;
    let identifiers: Vec<Identifier> = load_items(tx, data.identifier_set_id).await?;
    let relationships: Vec<Relationship> = load_items(tx, data.relationship_set_id).await?;
    let languages: Vec<i32> = load_items(tx, data.language_set_id).await?;
    let publishers: Vec<Bbid> = load_items(tx, data.publisher_set_id).await?;
    let release_events: Vec<ReleaseEvent> = load_items(tx, data.release_event_set_id).await?;

    let annotation = match data.annotation_id {
        Some(id) => tx.get_annotation(id).await?.map(|a| a.content),
        None => None,
    };
    let disambiguation = match data.disambiguation_id {
        Some(id) => tx.get_disambiguation(id).await?.map(|d| d.comment),
        None => None,
    };

    Ok(EntityContent {
        aliases,
        identifiers,
        relationships,
        annotation,
        disambiguation,
        languages,
        publishers,
        release_events,
        attributes: data.attributes.clone(),
    })
}

/// Follow redirects from merged-away entities to the entity that survives
pub async fn resolve_redirect(tx: &mut dyn Transaction, bbid: &Bbid) -> Result<Bbid> {
    let mut current = *bbid;
    let mut seen = HashSet::from([current]);
    while let Some(target) = tx.get_redirect(&current).await? {
        if !seen.insert(target) {
            anyhow::bail!("Redirect cycle detected at {}", target);
        }
        current = target;
    }
    Ok(current)
}

pub async fn entity_view(tx: &mut dyn Transaction, bbid: &Bbid) -> RevisionResult<EntityView> {
    let entity = load_entity(tx, bbid)
        .await?
        .ok_or_else(|| RevisionError::not_found(format!("Entity {}", bbid)))?;

    let content = match &entity.data {
        Some(data) => Some(load_content(tx, data).await?),
        None => None,
    };

    Ok(EntityView {
        bbid: entity.bbid(),
        entity_type: entity.entity_type(),
        revision_id: entity.header.master_revision_id,
        data_id: entity.data_id,
        deleted: entity.is_deleted(),
        default_alias: content
            .as_ref()
            .and_then(|content| content.default_alias().cloned()),
        content,
    })
}
