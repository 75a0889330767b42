//! Securable entity kinds and listing rows

use crate::errors::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

/// Kind of securable object, carrying its wire code on the permissions endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Report,
    ReportFolder,
    ReportDefinition,
    ReportDefinitionFolder,
    Dashboard,
    DashboardFolder,
    DataSource,
    ValueList,
    Collection,
    SystemCollection,
}

impl EntityKind {
    pub const ALL: [Self; 10] = [
        Self::Report,
        Self::ReportFolder,
        Self::ReportDefinition,
        Self::ReportDefinitionFolder,
        Self::Dashboard,
        Self::DashboardFolder,
        Self::DataSource,
        Self::ValueList,
        Self::Collection,
        Self::SystemCollection,
    ];

    /// Integer sent as `entityType`
    pub const fn code(self) -> u8 {
        match self {
            Self::Report => 1,
            Self::ReportFolder => 2,
            Self::ReportDefinition => 3,
            Self::ReportDefinitionFolder => 4,
            Self::Dashboard => 5,
            Self::DashboardFolder => 6,
            Self::DataSource => 7,
            Self::ValueList => 8,
            Self::Collection => 9,
            Self::SystemCollection => 10,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or(Error::InvalidEntityCode(code))
    }

    /// Folder kind that holds entities of this kind, if the platform has one
    pub const fn container_kind(self) -> Option<Self> {
        match self {
            Self::Report => Some(Self::ReportFolder),
            Self::ReportDefinition => Some(Self::ReportDefinitionFolder),
            Self::Dashboard => Some(Self::DashboardFolder),
            _ => None,
        }
    }

    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::ReportFolder | Self::ReportDefinitionFolder | Self::DashboardFolder
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::ReportFolder => "report-folder",
            Self::ReportDefinition => "report-definition",
            Self::ReportDefinitionFolder => "report-definition-folder",
            Self::Dashboard => "dashboard",
            Self::DashboardFolder => "dashboard-folder",
            Self::DataSource => "data-source",
            Self::ValueList => "value-list",
            Self::Collection => "collection",
            Self::SystemCollection => "system-collection",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        if let Ok(code) = normalized.parse::<u8>() {
            return Self::from_code(code);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::UnknownEntityKind(s.to_string()))
    }
}

/// A leaf kind together with its fixed folder kind
///
/// The listing endpoint returns folders and leaves of one family in a single
/// flat collection; the `container` flag on each row decides which of the two
/// codes a write must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityFamily {
    Reports,
    ReportDefinitions,
    Dashboards,
}

impl EntityFamily {
    pub const fn leaf(self) -> EntityKind {
        match self {
            Self::Reports => EntityKind::Report,
            Self::ReportDefinitions => EntityKind::ReportDefinition,
            Self::Dashboards => EntityKind::Dashboard,
        }
    }

    pub const fn container(self) -> EntityKind {
        match self {
            Self::Reports => EntityKind::ReportFolder,
            Self::ReportDefinitions => EntityKind::ReportDefinitionFolder,
            Self::Dashboards => EntityKind::DashboardFolder,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reports => "reports",
            Self::ReportDefinitions => "report-definitions",
            Self::Dashboards => "dashboards",
        }
    }
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "reports" | "report" => Ok(Self::Reports),
            "report-definitions" | "report-definition" => Ok(Self::ReportDefinitions),
            "dashboards" | "dashboard" => Ok(Self::Dashboards),
            _ => Err(Error::UnknownEntityFamily(s.to_string())),
        }
    }
}

/// One row of a listing response
///
/// Attributes other than `id`, `name` and `container` are kept as returned.
/// Numeric ids and names are accepted and kept in their decimal text form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "deserialize_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    container: Option<JsonValue>,
    #[serde(flatten)]
    pub attributes: Map<String, JsonValue>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            container: None,
            attributes: Map::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark the row the way the platform marks folders
    #[must_use]
    pub fn with_container_flag(mut self) -> Self {
        self.container = Some(JsonValue::String("yes".to_string()));
        self
    }

    /// Only the literal string `"yes"` marks a folder
    pub fn is_container(&self) -> bool {
        matches!(&self.container, Some(JsonValue::String(flag)) if flag == "yes")
    }

    /// Kind a write against this row must use
    pub fn write_kind(&self, container_kind: EntityKind, leaf_kind: EntityKind) -> EntityKind {
        if self.is_container() {
            container_kind
        } else {
            leaf_kind
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(id) => Ok(id),
        JsonValue::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}

/// Any other name type is dropped rather than failing the row
fn deserialize_name<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::String(name)) => Some(name),
        Some(JsonValue::Number(name)) => Some(name.to_string()),
        _ => None,
    })
}

/// Normalized result of a listing call
///
/// `Unrecognized` carries the outer response unchanged when neither known
/// shape of `entityData` matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityListing {
    Entities(Vec<Entity>),
    Unrecognized(JsonValue),
}

impl EntityListing {
    pub fn entities(&self) -> Option<&[Entity]> {
        match self {
            Self::Entities(entities) => Some(entities),
            Self::Unrecognized(_) => None,
        }
    }

    pub fn into_entities(self) -> std::result::Result<Vec<Entity>, JsonValue> {
        match self {
            Self::Entities(entities) => Ok(entities),
            Self::Unrecognized(raw) => Err(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_codes_are_fixed() {
        let codes: Vec<u8> = EntityKind::ALL.iter().map(|k| k.code()).collect();
        assert_eq!(codes, (1..=10).collect::<Vec<u8>>());
        assert_eq!(EntityKind::from_code(6).unwrap(), EntityKind::DashboardFolder);
        assert_eq!(EntityKind::from_code(11), Err(Error::InvalidEntityCode(11)));
    }

    #[test]
    fn test_family_pairs() {
        assert_eq!(EntityFamily::Reports.container().code(), 2);
        assert_eq!(EntityFamily::Reports.leaf().code(), 1);
        assert_eq!(EntityFamily::ReportDefinitions.container().code(), 4);
        assert_eq!(EntityFamily::Dashboards.leaf().code(), 5);
        for family in [
            EntityFamily::Reports,
            EntityFamily::ReportDefinitions,
            EntityFamily::Dashboards,
        ] {
            assert_eq!(family.leaf().container_kind(), Some(family.container()));
            assert!(family.container().is_container());
        }
        assert_eq!(EntityKind::DataSource.container_kind(), None);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("report".parse::<EntityKind>().unwrap(), EntityKind::Report);
        assert_eq!(
            "Report_Definition_Folder".parse::<EntityKind>().unwrap(),
            EntityKind::ReportDefinitionFolder
        );
        assert_eq!("9".parse::<EntityKind>().unwrap(), EntityKind::Collection);
        assert!("folder".parse::<EntityKind>().is_err());
        assert_eq!(
            "dashboards".parse::<EntityFamily>().unwrap(),
            EntityFamily::Dashboards
        );
    }

    #[test]
    fn test_container_flag_must_be_literal_yes() {
        let rows: Vec<Entity> = serde_json::from_value(json!([
            {"id": "1", "container": "yes"},
            {"id": "2", "container": "no"},
            {"id": "3", "container": true},
            {"id": "4", "container": "YES"},
            {"id": "5"}
        ]))
        .unwrap();
        let flags: Vec<bool> = rows.iter().map(Entity::is_container).collect();
        assert_eq!(flags, vec![true, false, false, false, false]);

        assert_eq!(
            rows[0].write_kind(EntityKind::ReportFolder, EntityKind::Report),
            EntityKind::ReportFolder
        );
        assert_eq!(
            rows[1].write_kind(EntityKind::ReportFolder, EntityKind::Report),
            EntityKind::Report
        );
    }

    #[test]
    fn test_entity_keeps_extra_attributes() {
        let raw = json!({"id": "a", "name": "Agent", "owner": "admin", "container": "yes"});
        let entity: Entity = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entity.attributes["owner"], "admin");
        assert_eq!(serde_json::to_value(&entity).unwrap(), raw);

        let bare: Entity = serde_json::from_value(json!({"id": "a"})).unwrap();
        assert_eq!(serde_json::to_value(&bare).unwrap(), json!({"id": "a"}));
    }

    #[test]
    fn test_numeric_id_and_name_are_accepted() {
        let entity: Entity =
            serde_json::from_value(json!({"id": 42, "name": 7, "container": "yes"})).unwrap();
        assert_eq!(entity.id, "42");
        assert_eq!(entity.name.as_deref(), Some("7"));
        assert!(entity.is_container());

        let odd_name: Entity = serde_json::from_value(json!({"id": "a", "name": null})).unwrap();
        assert_eq!(odd_name.name, None);
    }

    #[test]
    fn test_row_without_usable_id_is_rejected() {
        assert!(serde_json::from_value::<Entity>(json!({"name": "orphan"})).is_err());
        assert!(serde_json::from_value::<Entity>(json!({"id": ["x"]})).is_err());
    }
}
