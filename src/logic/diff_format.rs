//! Turns structural changes between two entity snapshots into labelled,
//! human-readable rows.

use itertools::Itertools;
use serde_json::Value;

use crate::model::{Bbid, Change, DiffRow, EntityType, RowKind};

/// A field inside an alias entry (or the default alias)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AliasField {
    Name,
    SortName,
    Language,
    Primary,
}

impl AliasField {
    fn parse(rest: &[&str]) -> Option<Self> {
        match rest {
            ["name"] => Some(AliasField::Name),
            ["sortName"] => Some(AliasField::SortName),
            ["language"] | ["language", "name"] => Some(AliasField::Language),
            ["primary"] => Some(AliasField::Primary),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AliasField::Name => "Name",
            AliasField::SortName => "Sort Name",
            AliasField::Language => "Language",
            AliasField::Primary => "Primary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentifierField {
    Value,
    Type,
}

impl IdentifierField {
    fn parse(rest: &[&str]) -> Option<Self> {
        match rest {
            ["value"] => Some(IdentifierField::Value),
            ["type"] | ["type", "label"] => Some(IdentifierField::Type),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationshipField {
    Type,
    Source,
    Target,
}

impl RelationshipField {
    fn parse(rest: &[&str]) -> Option<Self> {
        match rest {
            ["type"] | ["type", "label"] => Some(RelationshipField::Type),
            ["sourceBbid"] => Some(RelationshipField::Source),
            ["targetBbid"] => Some(RelationshipField::Target),
            _ => None,
        }
    }
}

/// Paths every entity type shares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommonField {
    AliasSet,
    Aliases,
    AliasEntry(usize, AliasField),
    DefaultAlias(AliasField),
    IdentifierSet,
    Identifiers,
    IdentifierEntry(usize, IdentifierField),
    RelationshipSet,
    Relationships,
    RelationshipEntry(usize, RelationshipField),
    Annotation,
    Disambiguation,
}

/// Type-specific paths. Which of these a type understands is decided by
/// that type's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeField {
    BeginDate,
    EndDate,
    Gender,
    Ended,
    Type,
    EditionGroup,
    Publishers,
    PublisherEntry(usize),
    ReleaseEvents,
    ReleaseEventEntry(usize),
    Languages,
    LanguageEntry(usize),
    Width,
    Height,
    Depth,
    Weight,
    Pages,
    EditionFormat,
    EditionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldPath {
    Common(CommonField),
    Attribute(AttributeField),
}

fn index(segment: &str) -> Option<usize> {
    segment.parse().ok()
}

impl FieldPath {
    fn parse(path: &[String]) -> Option<Self> {
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        let common = |field| Some(FieldPath::Common(field));
        let attribute = |field| Some(FieldPath::Attribute(field));

        match segments.as_slice() {
            ["aliasSet"] => common(CommonField::AliasSet),
            ["aliasSet", "aliases"] => common(CommonField::Aliases),
            ["aliasSet", "aliases", i, rest @ ..] => {
                common(CommonField::AliasEntry(index(i)?, AliasField::parse(rest)?))
            }
            ["aliasSet", "defaultAlias"] => common(CommonField::DefaultAlias(AliasField::Name)),
            ["aliasSet", "defaultAlias", rest @ ..] => {
                common(CommonField::DefaultAlias(AliasField::parse(rest)?))
            }
            ["identifierSet"] => common(CommonField::IdentifierSet),
            ["identifierSet", "identifiers"] => common(CommonField::Identifiers),
            ["identifierSet", "identifiers", i, rest @ ..] => common(
                CommonField::IdentifierEntry(index(i)?, IdentifierField::parse(rest)?),
            ),
            ["relationshipSet"] => common(CommonField::RelationshipSet),
            ["relationshipSet", "relationships"] => common(CommonField::Relationships),
            ["relationshipSet", "relationships", i, rest @ ..] => common(
                CommonField::RelationshipEntry(index(i)?, RelationshipField::parse(rest)?),
            ),
            ["annotation"] | ["annotation", "content"] => common(CommonField::Annotation),
            ["disambiguation"] | ["disambiguation", "comment"] => {
                common(CommonField::Disambiguation)
            }
            ["beginDate"] => attribute(AttributeField::BeginDate),
            ["endDate"] => attribute(AttributeField::EndDate),
            ["gender"] | ["gender", "name"] => attribute(AttributeField::Gender),
            ["ended"] => attribute(AttributeField::Ended),
            ["type"] | ["type", "label"] => attribute(AttributeField::Type),
            ["editionGroupBbid"] => attribute(AttributeField::EditionGroup),
            ["publishers"] => attribute(AttributeField::Publishers),
            ["publishers", i] | ["publishers", i, "bbid"] => {
                attribute(AttributeField::PublisherEntry(index(i)?))
            }
            ["releaseEvents"] => attribute(AttributeField::ReleaseEvents),
            ["releaseEvents", i] | ["releaseEvents", i, "date"] => {
                attribute(AttributeField::ReleaseEventEntry(index(i)?))
            }
            ["languages"] => attribute(AttributeField::Languages),
            ["languages", i] | ["languages", i, "name"] => {
                attribute(AttributeField::LanguageEntry(index(i)?))
            }
            ["width"] => attribute(AttributeField::Width),
            ["height"] => attribute(AttributeField::Height),
            ["depth"] => attribute(AttributeField::Depth),
            ["weight"] => attribute(AttributeField::Weight),
            ["pages"] => attribute(AttributeField::Pages),
            ["editionFormat"] | ["editionFormat", "label"] => {
                attribute(AttributeField::EditionFormat)
            }
            ["editionStatus"] | ["editionStatus", "label"] => {
                attribute(AttributeField::EditionStatus)
            }
            _ => None,
        }
    }
}

/// Text for a single value: strings and numbers as-is, booleans as Yes/No,
/// and objects by their label, name, date, bbid, content or comment.
pub fn display(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Array(_) => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(if *flag { "Yes" } else { "No" }.to_string()),
        Value::Object(map) => ["label", "name", "date", "bbid", "content", "comment"]
            .iter()
            .find_map(|key| map.get(*key).and_then(display)),
    }
}

fn single(value: &Value) -> Option<Vec<String>> {
    display(value).map(|text| vec![text])
}

fn list(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = value.as_array()?.iter().filter_map(display).collect();
    (!items.is_empty()).then_some(items)
}

fn alias_with_sort_name(value: &Value) -> Option<Vec<String>> {
    let name = value.get("name").and_then(display)?;
    let sort_name = value.get("sortName").and_then(display).unwrap_or_default();
    Some(vec![format!("{} ({})", name, sort_name)])
}

fn identifier_text(value: &Value) -> Option<String> {
    let label = value.get("type").and_then(display).unwrap_or_default();
    let text = value.get("value").and_then(display)?;
    Some(format!("{}: {}", label, text))
}

fn alias_names(set: &Value) -> Option<Vec<String>> {
    list(set.get("aliases")?)
}

fn identifier_list(identifiers: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = identifiers
        .as_array()?
        .iter()
        .filter_map(identifier_text)
        .collect();
    (!items.is_empty()).then_some(items)
}

fn identifier_texts(set: &Value) -> Option<Vec<String>> {
    identifier_list(set.get("identifiers")?)
}

/// Shape a row from rendered sides. Both sides absent means no row; a New
/// kind or missing old side keeps only the new values; a Deleted kind or
/// missing new side keeps only the old values.
pub fn format_row(
    kind: RowKind,
    label: impl Into<String>,
    old_values: Option<Vec<String>>,
    new_values: Option<Vec<String>>,
) -> Option<DiffRow> {
    let (kind, old_values, new_values) = match (old_values, new_values) {
        (None, None) => return None,
        (_, new_values) if kind == RowKind::New => (RowKind::New, None, new_values),
        (None, new_values) => (RowKind::New, None, new_values),
        (old_values, _) if kind == RowKind::Deleted => (RowKind::Deleted, old_values, None),
        (old_values, None) => (RowKind::Deleted, old_values, None),
        (old_values, new_values) => (kind, old_values, new_values),
    };
    Some(DiffRow {
        kind,
        label: label.into(),
        old_values,
        new_values,
    })
}

/// Render both sides of a change with the same function
fn format_sides(
    change: &Change,
    label: impl Into<String>,
    render: impl Fn(&Value) -> Option<Vec<String>>,
) -> Vec<DiffRow> {
    let (kind, lhs, rhs) = change.sides();
    format_row(kind, label, lhs.and_then(&render), rhs.and_then(&render))
        .into_iter()
        .collect()
}

fn relationship_rows(bbid: &Bbid, kind: RowKind, relationship: &Value) -> Vec<DiffRow> {
    let own = bbid.to_string();
    let source = relationship.get("sourceBbid").and_then(display);
    let place = |values: Option<Vec<String>>| match kind {
        RowKind::Deleted => (values, None),
        RowKind::New | RowKind::Edited => (None, values),
    };

    let entity_row = if source.as_deref() == Some(own.as_str()) {
        let (old, new) = place(source.map(|s| vec![s]));
        format_row(kind, "Relationship Source Entity", old, new)
    } else {
        let target = relationship.get("targetBbid").and_then(display);
        let (old, new) = place(target.map(|t| vec![t]));
        format_row(kind, "Relationship Target Entity", old, new)
    };

    let (old, new) = place(relationship.get("type").and_then(single));
    let type_row = format_row(kind, "Relationship Type", old, new);

    entity_row.into_iter().chain(type_row).collect()
}

fn format_relationship_set(bbid: &Bbid, change: &Change) -> Vec<DiffRow> {
    let (kind, lhs, rhs) = change.sides();
    let (kind, side) = match (kind, lhs, rhs) {
        (RowKind::Deleted, Some(lhs), _) => (RowKind::Deleted, lhs),
        (_, _, Some(rhs)) => (RowKind::New, rhs),
        _ => return Vec::new(),
    };
    side.get("relationships")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .flat_map(|relationship| relationship_rows(bbid, kind, relationship))
                .collect()
        })
        .unwrap_or_default()
}

fn format_common(bbid: &Bbid, field: CommonField, change: &Change) -> Vec<DiffRow> {
    match field {
        CommonField::AliasSet => {
            let (kind, lhs, rhs) = change.sides();
            match kind {
                RowKind::New => {
                    let default_alias = rhs
                        .and_then(|set| set.get("defaultAlias"))
                        .and_then(|alias| alias.get("name"))
                        .and_then(single);
                    format_row(RowKind::New, "Default Alias", None, default_alias)
                        .into_iter()
                        .chain(format_row(
                            RowKind::New,
                            "Aliases",
                            None,
                            rhs.and_then(alias_names),
                        ))
                        .collect()
                }
                RowKind::Deleted | RowKind::Edited => format_row(
                    kind,
                    "Aliases",
                    lhs.and_then(alias_names),
                    rhs.and_then(alias_names),
                )
                .into_iter()
                .collect(),
            }
        }
        CommonField::Aliases => match change {
            Change::Array { .. } => format_sides(change, "Aliases", alias_with_sort_name),
            _ => format_sides(change, "Aliases", list),
        },
        CommonField::AliasEntry(i, field) => {
            format_sides(change, format!("Alias {} -> {}", i, field.label()), single)
        }
        CommonField::DefaultAlias(field) => {
            let label = match field {
                AliasField::Name => "Default Alias".to_string(),
                other => format!("Default Alias -> {}", other.label()),
            };
            format_sides(change, label, single)
        }
        CommonField::IdentifierSet => format_sides(change, "Identifiers", identifier_texts),
        CommonField::Identifiers => match change {
            Change::Array { index, .. } => {
                format_sides(change, format!("Identifier {}", index), |value| {
                    identifier_text(value).map(|text| vec![text])
                })
            }
            _ => format_sides(change, "Identifiers", identifier_list),
        },
        CommonField::IdentifierEntry(i, IdentifierField::Value) => {
            format_sides(change, format!("Identifier {} -> Value", i), single)
        }
        CommonField::IdentifierEntry(i, IdentifierField::Type) => {
            format_sides(change, format!("Identifier {} -> Type", i), single)
        }
        CommonField::RelationshipSet => format_relationship_set(bbid, change),
        CommonField::Relationships => match change {
            Change::Array { .. } => {
                let (kind, lhs, rhs) = change.sides();
                match (lhs, rhs) {
                    (_, Some(rhs)) => relationship_rows(bbid, kind, rhs),
                    (Some(lhs), None) => relationship_rows(bbid, kind, lhs),
                    (None, None) => Vec::new(),
                }
            }
            _ => format_relationship_set(bbid, change),
        },
        CommonField::RelationshipEntry(i, field) => {
            let label = match field {
                RelationshipField::Type => format!("Relationship {} -> Type", i),
                RelationshipField::Source => format!("Relationship {} -> Source Entity", i),
                RelationshipField::Target => format!("Relationship {} -> Target Entity", i),
            };
            format_sides(change, label, single)
        }
        CommonField::Annotation => format_sides(change, "Annotation", single),
        CommonField::Disambiguation => format_sides(change, "Disambiguation", single),
    }
}

/// A set-valued attribute: the whole list, one appended or removed item, or
/// one edited item
fn format_collection(
    change: &Change,
    whole_label: &str,
    item_label: impl Fn(usize) -> String,
) -> Vec<DiffRow> {
    match change {
        Change::Array { index, .. } => format_sides(change, item_label(*index), single),
        _ => format_sides(change, whole_label, list),
    }
}

type Rows = Option<Vec<DiffRow>>;

fn format_author(field: AttributeField, change: &Change) -> Rows {
    match field {
        AttributeField::BeginDate => Some(format_sides(change, "Begin Date", single)),
        AttributeField::EndDate => Some(format_sides(change, "End Date", single)),
        AttributeField::Gender => Some(format_sides(change, "Gender", single)),
        AttributeField::Ended => Some(format_sides(change, "Ended", single)),
        AttributeField::Type => Some(format_sides(change, "Author Type", single)),
        AttributeField::EditionGroup
        | AttributeField::Publishers
        | AttributeField::PublisherEntry(_)
        | AttributeField::ReleaseEvents
        | AttributeField::ReleaseEventEntry(_)
        | AttributeField::Languages
        | AttributeField::LanguageEntry(_)
        | AttributeField::Width
        | AttributeField::Height
        | AttributeField::Depth
        | AttributeField::Weight
        | AttributeField::Pages
        | AttributeField::EditionFormat
        | AttributeField::EditionStatus => None,
    }
}

fn format_edition(field: AttributeField, change: &Change) -> Rows {
    match field {
        AttributeField::EditionGroup => Some(format_sides(change, "Edition Group", single)),
        AttributeField::Publishers => Some(format_collection(change, "Publishers", |i| {
            format!("Publisher {}", i)
        })),
        AttributeField::PublisherEntry(i) => {
            Some(format_sides(change, format!("Publisher {}", i), single))
        }
        AttributeField::ReleaseEvents => Some(format_collection(change, "Release Date", |_| {
            "Release Date".to_string()
        })),
        AttributeField::ReleaseEventEntry(_) => {
            Some(format_sides(change, "Release Date", single))
        }
        AttributeField::Languages => Some(format_collection(change, "Language", |i| {
            format!("Language {}", i)
        })),
        AttributeField::LanguageEntry(i) => {
            Some(format_sides(change, format!("Language {}", i), single))
        }
        AttributeField::Width => Some(format_sides(change, "Width", single)),
        AttributeField::Height => Some(format_sides(change, "Height", single)),
        AttributeField::Depth => Some(format_sides(change, "Depth", single)),
        AttributeField::Weight => Some(format_sides(change, "Weight", single)),
        AttributeField::Pages => Some(format_sides(change, "Page Count", single)),
        AttributeField::EditionFormat => Some(format_sides(change, "Edition Format", single)),
        AttributeField::EditionStatus => Some(format_sides(change, "Edition Status", single)),
        AttributeField::BeginDate
        | AttributeField::EndDate
        | AttributeField::Gender
        | AttributeField::Ended
        | AttributeField::Type => None,
    }
}

fn format_edition_group(field: AttributeField, change: &Change) -> Rows {
    match field {
        AttributeField::Type => Some(format_sides(change, "Edition Group Type", single)),
        AttributeField::BeginDate
        | AttributeField::EndDate
        | AttributeField::Gender
        | AttributeField::Ended
        | AttributeField::EditionGroup
        | AttributeField::Publishers
        | AttributeField::PublisherEntry(_)
        | AttributeField::ReleaseEvents
        | AttributeField::ReleaseEventEntry(_)
        | AttributeField::Languages
        | AttributeField::LanguageEntry(_)
        | AttributeField::Width
        | AttributeField::Height
        | AttributeField::Depth
        | AttributeField::Weight
        | AttributeField::Pages
        | AttributeField::EditionFormat
        | AttributeField::EditionStatus => None,
    }
}

fn format_publisher(field: AttributeField, change: &Change) -> Rows {
    match field {
        AttributeField::BeginDate => Some(format_sides(change, "Begin Date", single)),
        AttributeField::EndDate => Some(format_sides(change, "End Date", single)),
        AttributeField::Ended => Some(format_sides(change, "Ended", single)),
        AttributeField::Type => Some(format_sides(change, "Publisher Type", single)),
        AttributeField::Gender
        | AttributeField::EditionGroup
        | AttributeField::Publishers
        | AttributeField::PublisherEntry(_)
        | AttributeField::ReleaseEvents
        | AttributeField::ReleaseEventEntry(_)
        | AttributeField::Languages
        | AttributeField::LanguageEntry(_)
        | AttributeField::Width
        | AttributeField::Height
        | AttributeField::Depth
        | AttributeField::Weight
        | AttributeField::Pages
        | AttributeField::EditionFormat
        | AttributeField::EditionStatus => None,
    }
}

fn format_work(field: AttributeField, change: &Change) -> Rows {
    match field {
        AttributeField::Languages => Some(format_collection(change, "Languages", |i| {
            format!("Language {}", i)
        })),
        AttributeField::LanguageEntry(i) => {
            Some(format_sides(change, format!("Language {}", i), single))
        }
        AttributeField::Type => Some(format_sides(change, "Work Type", single)),
        AttributeField::BeginDate
        | AttributeField::EndDate
        | AttributeField::Gender
        | AttributeField::Ended
        | AttributeField::EditionGroup
        | AttributeField::Publishers
        | AttributeField::PublisherEntry(_)
        | AttributeField::ReleaseEvents
        | AttributeField::ReleaseEventEntry(_)
        | AttributeField::Width
        | AttributeField::Height
        | AttributeField::Depth
        | AttributeField::Weight
        | AttributeField::Pages
        | AttributeField::EditionFormat
        | AttributeField::EditionStatus => None,
    }
}

fn format_change(entity_type: EntityType, bbid: &Bbid, change: &Change) -> Rows {
    match FieldPath::parse(change.path())? {
        FieldPath::Common(field) => Some(format_common(bbid, field, change)),
        FieldPath::Attribute(field) => match entity_type {
            EntityType::Author => format_author(field, change),
            EntityType::Edition => format_edition(field, change),
            EntityType::EditionGroup => format_edition_group(field, change),
            EntityType::Publisher => format_publisher(field, change),
            EntityType::Work => format_work(field, change),
        },
    }
}

/// Format every change of one entity into rows sorted by label. Changes at
/// paths the entity type has no label for produce no rows.
pub fn format_changes(entity_type: EntityType, bbid: &Bbid, changes: &[Change]) -> Vec<DiffRow> {
    changes
        .iter()
        .flat_map(|change| {
            format_change(entity_type, bbid, change).unwrap_or_else(|| {
                log::debug!(
                    "Dropping unrecognised {} change at '{}'",
                    entity_type,
                    change.path().join(".")
                );
                Vec::new()
            })
        })
        .sorted_by(|a, b| a.label.cmp(&b.label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{generate_bbid, ArrayItem};
    use serde_json::json;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    fn row(kind: RowKind, label: &str, old: Option<&[&str]>, new: Option<&[&str]>) -> DiffRow {
        let values = |v: Option<&[&str]>| v.map(|v| v.iter().map(|s| s.to_string()).collect());
        DiffRow {
            kind,
            label: label.to_string(),
            old_values: values(old),
            new_values: values(new),
        }
    }

    #[test]
    fn test_alias_name_edit() {
        let changes = vec![Change::Edited {
            path: path(&["aliasSet", "aliases", "1", "name"]),
            lhs: json!("Old"),
            rhs: json!("New"),
        }];
        let rows = format_changes(EntityType::Author, &generate_bbid(), &changes);
        assert_eq!(
            rows,
            vec![row(RowKind::Edited, "Alias 1 -> Name", Some(&["Old"]), Some(&["New"]))]
        );
    }

    #[test]
    fn test_empty_and_unknown_changes_yield_no_rows() {
        let bbid = generate_bbid();
        assert!(format_changes(EntityType::Work, &bbid, &[]).is_empty());

        let unknown = vec![
            Change::New {
                path: path(&["somethingElse"]),
                rhs: json!(1),
            },
            Change::New {
                path: path(&["pages"]),
                rhs: json!(300),
            },
        ];
        assert!(format_changes(EntityType::Work, &bbid, &unknown).is_empty());
    }

    #[test]
    fn test_new_alias_set_reports_default_and_all_names() {
        let changes = vec![Change::New {
            path: path(&["aliasSet"]),
            rhs: json!({
                "defaultAlias": {"name": "B", "sortName": "B", "primary": true},
                "aliases": [
                    {"name": "A", "sortName": "A", "primary": false},
                    {"name": "B", "sortName": "B", "primary": true}
                ]
            }),
        }];
        let rows = format_changes(EntityType::Publisher, &generate_bbid(), &changes);
        assert_eq!(
            rows,
            vec![
                row(RowKind::New, "Aliases", None, Some(&["A", "B"])),
                row(RowKind::New, "Default Alias", None, Some(&["B"])),
            ]
        );
    }

    #[test]
    fn test_alias_added_to_set() {
        let changes = vec![Change::Array {
            path: path(&["aliasSet", "aliases"]),
            index: 2,
            item: ArrayItem::New {
                rhs: json!({"name": "Le Guin", "sortName": "Le Guin, U."}),
            },
        }];
        let rows = format_changes(EntityType::Author, &generate_bbid(), &changes);
        assert_eq!(
            rows,
            vec![row(RowKind::New, "Aliases", None, Some(&["Le Guin (Le Guin, U.)"]))]
        );
    }

    #[test]
    fn test_identifier_set_and_entries() {
        let bbid = generate_bbid();
        let changes = vec![
            Change::New {
                path: path(&["identifierSet"]),
                rhs: json!({"identifiers": [{"type": {"label": "ISBN"}, "value": "123"}]}),
            },
            Change::Array {
                path: path(&["identifierSet", "identifiers"]),
                index: 1,
                item: ArrayItem::Deleted {
                    lhs: json!({"type": {"label": "ISBN"}, "value": "456"}),
                },
            },
            Change::Edited {
                path: path(&["identifierSet", "identifiers", "0", "type", "label"]),
                lhs: json!("ISBN"),
                rhs: json!("ASIN"),
            },
        ];
        let rows = format_changes(EntityType::Edition, &bbid, &changes);
        assert_eq!(
            rows,
            vec![
                row(RowKind::Edited, "Identifier 0 -> Type", Some(&["ISBN"]), Some(&["ASIN"])),
                row(RowKind::Deleted, "Identifier 1", Some(&["ISBN: 456"]), None),
                row(RowKind::New, "Identifiers", None, Some(&["ISBN: 123"])),
            ]
        );
    }

    #[test]
    fn test_relationship_labels_depend_on_direction() {
        let own = generate_bbid();
        let other = generate_bbid();
        let changes = vec![
            Change::Array {
                path: path(&["relationshipSet", "relationships"]),
                index: 0,
                item: ArrayItem::New {
                    rhs: json!({"type": {"label": "Wrote"}, "sourceBbid": own, "targetBbid": other}),
                },
            },
            Change::Array {
                path: path(&["relationshipSet", "relationships"]),
                index: 1,
                item: ArrayItem::Deleted {
                    lhs: json!({"type": {"label": "Published"}, "sourceBbid": other, "targetBbid": own}),
                },
            },
        ];
        let rows = format_changes(EntityType::Author, &own, &changes);
        let own_text = own.to_string();
        assert_eq!(
            rows,
            vec![
                row(RowKind::New, "Relationship Source Entity", None, Some(&[own_text.as_str()])),
                row(RowKind::Deleted, "Relationship Target Entity", Some(&[own_text.as_str()]), None),
                row(RowKind::New, "Relationship Type", None, Some(&["Wrote"])),
                row(RowKind::Deleted, "Relationship Type", Some(&["Published"]), None),
            ]
        );
    }

    #[test]
    fn test_author_attributes() {
        let changes = vec![
            Change::Edited {
                path: path(&["ended"]),
                lhs: json!(false),
                rhs: json!(true),
            },
            Change::New {
                path: path(&["gender"]),
                rhs: json!({"name": "Female"}),
            },
            Change::Deleted {
                path: path(&["type"]),
                lhs: json!({"label": "Person"}),
            },
        ];
        let rows = format_changes(EntityType::Author, &generate_bbid(), &changes);
        assert_eq!(
            rows,
            vec![
                row(RowKind::Deleted, "Author Type", Some(&["Person"]), None),
                row(RowKind::Edited, "Ended", Some(&["No"]), Some(&["Yes"])),
                row(RowKind::New, "Gender", None, Some(&["Female"])),
            ]
        );
    }

    #[test]
    fn test_edition_collections() {
        let changes = vec![
            Change::New {
                path: path(&["languages"]),
                rhs: json!([{"name": "English"}, {"name": "French"}]),
            },
            Change::Array {
                path: path(&["publishers"]),
                index: 1,
                item: ArrayItem::New {
                    rhs: json!({"bbid": "p-2"}),
                },
            },
            Change::Edited {
                path: path(&["pages"]),
                lhs: json!(100),
                rhs: json!(120),
            },
        ];
        let rows = format_changes(EntityType::Edition, &generate_bbid(), &changes);
        assert_eq!(
            rows,
            vec![
                row(RowKind::New, "Language", None, Some(&["English", "French"])),
                row(RowKind::Edited, "Page Count", Some(&["100"]), Some(&["120"])),
                row(RowKind::New, "Publisher 1", None, Some(&["p-2"])),
            ]
        );
    }

    #[test]
    fn test_work_languages_use_plural_label() {
        let changes = vec![
            Change::New {
                path: path(&["languages"]),
                rhs: json!([{"name": "English"}]),
            },
            Change::Edited {
                path: path(&["languages", "0", "name"]),
                lhs: json!("English"),
                rhs: json!("German"),
            },
        ];
        let rows = format_changes(EntityType::Work, &generate_bbid(), &changes);
        assert_eq!(
            rows,
            vec![
                row(RowKind::Edited, "Language 0", Some(&["English"]), Some(&["German"])),
                row(RowKind::New, "Languages", None, Some(&["English"])),
            ]
        );
    }

    #[test]
    fn test_format_row_shaping() {
        assert_eq!(format_row(RowKind::Edited, "X", None, None), None);
        assert_eq!(
            format_row(RowKind::New, "X", Some(vec!["a".into()]), Some(vec!["b".into()])),
            Some(row(RowKind::New, "X", None, Some(&["b"])))
        );
        assert_eq!(
            format_row(RowKind::Edited, "X", Some(vec!["a".into()]), None),
            Some(row(RowKind::Deleted, "X", Some(&["a"]), None))
        );
        assert_eq!(
            format_row(RowKind::Deleted, "X", Some(vec!["a".into()]), Some(vec!["b".into()])),
            Some(row(RowKind::Deleted, "X", Some(&["a"]), None))
        );
    }

    #[test]
    fn test_sort_is_stable_for_equal_labels() {
        let changes = vec![
            Change::Array {
                path: path(&["releaseEvents"]),
                index: 0,
                item: ArrayItem::New {
                    rhs: json!({"date": "2001"}),
                },
            },
            Change::Array {
                path: path(&["releaseEvents"]),
                index: 1,
                item: ArrayItem::New {
                    rhs: json!({"date": "2002"}),
                },
            },
        ];
        let rows = format_changes(EntityType::Edition, &generate_bbid(), &changes);
        let values: Vec<_> = rows.into_iter().map(|r| r.new_values.unwrap()).collect();
        assert_eq!(values, vec![vec!["2001".to_string()], vec!["2002".to_string()]]);
    }
}
