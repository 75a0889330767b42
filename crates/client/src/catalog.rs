//! Entity listings and the user/group directory

use crate::client::CuicClient;
use crate::error::ClientError;
use cuic_core::{Entity, EntityKind, EntityListing};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

const SECTION_START: &str = "var userGroupInfoJSONStr";
const SECTION_END: &str = "var allUsers";
const USERS_MARKER: &str = "potentialUserMembersJSONStr = '";
const GROUPS_MARKER: &str = "potentialGroupMembersJSONStr = '";
const VALUE_END: &str = "';";

/// Users and groups that can receive grants, as embedded in the security page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    pub users: Vec<JsonValue>,
    pub groups: Vec<JsonValue>,
}

impl CuicClient {
    /// List entities of `kind` from the security permissions endpoint
    pub async fn list_entities(
        &self,
        kind: EntityKind,
        include_system_collections: bool,
    ) -> Result<EntityListing, ClientError> {
        let form = [
            ("cmd", "LOAD_OBJECTS".to_string()),
            ("entityType", kind.code().to_string()),
            ("isSysCollections", include_system_collections.to_string()),
            ("isAjaxCall", "true".to_string()),
        ];
        let body = self.post_command(&form).await?;
        let response: JsonValue = serde_json::from_str(&body)
            .map_err(|e| ClientError::malformed(format!("listing is not JSON: {e}"), body.len()))?;

        let listing = normalize_listing(response);
        match &listing {
            EntityListing::Entities(entities) => {
                debug!(%kind, count = entities.len(), "Listed entities");
            }
            EntityListing::Unrecognized(_) => {
                warn!(%kind, "Listing response has an unrecognized shape");
            }
        }
        Ok(listing)
    }

    /// Report folders and reports
    pub async fn list_reports(&self) -> Result<EntityListing, ClientError> {
        self.list_entities(EntityKind::ReportFolder, false).await
    }

    /// Report definition folders and report definitions
    pub async fn list_report_definitions(&self) -> Result<EntityListing, ClientError> {
        self.list_entities(EntityKind::ReportDefinitionFolder, false)
            .await
    }

    /// Dashboard folders and dashboards
    pub async fn list_dashboards(&self) -> Result<EntityListing, ClientError> {
        self.list_entities(EntityKind::DashboardFolder, false).await
    }

    pub async fn list_data_sources(&self) -> Result<EntityListing, ClientError> {
        self.list_entities(EntityKind::DataSource, false).await
    }

    pub async fn list_value_lists(&self) -> Result<EntityListing, ClientError> {
        self.list_entities(EntityKind::ValueList, false).await
    }

    pub async fn list_collections(&self) -> Result<EntityListing, ClientError> {
        self.list_entities(EntityKind::Collection, false).await
    }

    pub async fn list_system_collections(&self) -> Result<EntityListing, ClientError> {
        self.list_entities(EntityKind::Collection, true).await
    }

    /// Extract the user and group directory from the security permissions page
    pub async fn list_users_and_groups(&self) -> Result<Directory, ClientError> {
        let html = self.get_security_page().await?;
        let directory = extract_directory(&html)?;
        debug!(
            users = directory.users.len(),
            groups = directory.groups.len(),
            "Extracted directory"
        );
        Ok(directory)
    }
}

/// Normalize the two shapes `entityData` is known to take
///
/// An array is returned as is. A string is parsed as JSON and its `items`
/// returned. Anything else yields the outer response unchanged. Rows without
/// a usable id are dropped with a warning; they never reclassify the listing.
pub fn normalize_listing(response: JsonValue) -> EntityListing {
    let rows = match response.get("entityData") {
        Some(JsonValue::Array(rows)) => Some(rows.clone()),
        Some(JsonValue::String(encoded)) => {
            debug!("entityData is string-encoded");
            serde_json::from_str::<JsonValue>(encoded)
                .ok()
                .and_then(|mut inner| match inner.get_mut("items").map(JsonValue::take) {
                    Some(JsonValue::Array(items)) => Some(items),
                    _ => None,
                })
        }
        _ => None,
    };

    match rows {
        Some(rows) => EntityListing::Entities(parse_rows(rows)),
        None => EntityListing::Unrecognized(response),
    }
}

fn parse_rows(rows: Vec<JsonValue>) -> Vec<Entity> {
    let total = rows.len();
    let entities: Vec<Entity> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| {
            serde_json::from_value::<Entity>(row)
                .map_err(|e| warn!(index, error = %e, "Skipping listing row"))
                .ok()
        })
        .collect();

    if entities.len() < total {
        warn!(
            skipped = total - entities.len(),
            total, "Listing contained rows without a usable id"
        );
    }
    entities
}

/// Pull the user and group arrays out of the security page
///
/// Markers are only searched between `var userGroupInfoJSONStr` and
/// `var allUsers`; a page without them (for instance a login page served
/// after a silent authentication failure) is rejected.
pub fn extract_directory(html: &str) -> Result<Directory, ClientError> {
    let section = scoped_section(html)
        .ok_or_else(|| ClientError::malformed("user/group section not found", html.len()))?;

    Ok(Directory {
        users: extract_script_array(section, USERS_MARKER, html.len())?,
        groups: extract_script_array(section, GROUPS_MARKER, html.len())?,
    })
}

fn scoped_section(html: &str) -> Option<&str> {
    let start = html.find(SECTION_START)? + SECTION_START.len();
    let end = html[start..].find(SECTION_END)? + start;
    Some(&html[start..end])
}

fn extract_script_array(
    section: &str,
    marker: &str,
    page_length: usize,
) -> Result<Vec<JsonValue>, ClientError> {
    let variable = marker.split_whitespace().next().unwrap_or(marker);
    let missing = || ClientError::malformed(format!("{variable} not found"), page_length);

    let start = section.find(marker).ok_or_else(missing)? + marker.len();
    let end = section[start..].find(VALUE_END).ok_or_else(missing)? + start;

    serde_json::from_str(&section[start..end]).map_err(|e| {
        ClientError::malformed(format!("{variable} is not a JSON array: {e}"), page_length)
    })
}
