//! Single-grant reads and writes

use crate::client::CuicClient;
use crate::error::ClientError;
use cuic_core::{
    EntityKind, GrantRequest, PermissionInput, PermissionLevel, Subject, SubjectKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

const GET_PERMISSIONS: &str = "GET_USER_OR_GROUP_PERMISSIONS";
const SAVE_USER_PERMISSIONS: &str = "SAVE_USER_PERMISSIONS";
const SAVE_GROUP_PERMISSIONS: &str = "SAVE_GROUP_PERMISSIONS";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionQuery<'a> {
    is_user: bool,
    obj_id: &'a str,
    entity_type: u8,
}

/// `id` is an array for user grants and a bare string for group grants
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SubjectIds<'a> {
    Users(&'a [String]),
    Group(&'a str),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionUpdate<'a> {
    id: SubjectIds<'a>,
    entity_type: u8,
    obj_id: &'a str,
    #[serde(rename = "type")]
    level: u8,
}

/// Common response wrapper of the permissions commands
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandResponse {
    #[serde(default)]
    return_code: Option<JsonValue>,
    #[serde(default)]
    return_msg: Option<String>,
    #[serde(default)]
    entity_data: Option<JsonValue>,
}

impl CommandResponse {
    fn parse(body: &str) -> Result<Self, ClientError> {
        serde_json::from_str(body).map_err(|e| {
            ClientError::malformed(format!("command response is not JSON: {e}"), body.len())
        })
    }

    /// Only the string `"0"` means success
    fn into_result(self) -> Result<Option<JsonValue>, ClientError> {
        match self.return_code {
            Some(JsonValue::String(code)) if code == "0" => Ok(self.entity_data),
            _ => Err(ClientError::ServerRejected(
                self.return_msg.unwrap_or_default(),
            )),
        }
    }
}

fn encode_permissions<T: Serialize>(
    cmd: &str,
    permissions: &T,
) -> Result<[(&'static str, String); 3], ClientError> {
    Ok([
        ("cmd", cmd.to_string()),
        ("permissions", serde_json::to_string(permissions)?),
        ("isAjaxCall", "true".to_string()),
    ])
}

impl CuicClient {
    /// Read the grants on one object for users or for groups
    pub async fn get_permission(
        &self,
        kind: EntityKind,
        object_id: &str,
        subject_kind: SubjectKind,
    ) -> Result<JsonValue, ClientError> {
        let query = PermissionQuery {
            is_user: subject_kind.is_user(),
            obj_id: object_id,
            entity_type: kind.code(),
        };
        let form = encode_permissions(GET_PERMISSIONS, &query)?;
        let body = self.post_command(&form).await?;

        let data = CommandResponse::parse(&body)?.into_result()?;
        debug!(%kind, object_id, ?subject_kind, "Read permissions");
        Ok(data.unwrap_or(JsonValue::Null))
    }

    /// Write one grant
    pub async fn set_permission(&self, grant: &GrantRequest) -> Result<(), ClientError> {
        let (cmd, id) = match &grant.subject {
            Subject::Users(ids) => (SAVE_USER_PERMISSIONS, SubjectIds::Users(ids)),
            Subject::Group(id) => (SAVE_GROUP_PERMISSIONS, SubjectIds::Group(id)),
        };
        let update = PermissionUpdate {
            id,
            entity_type: grant.entity_kind.code(),
            obj_id: &grant.object_id,
            level: grant.level.code(),
        };
        let form = encode_permissions(cmd, &update)?;
        let body = self.post_command(&form).await?;

        CommandResponse::parse(&body)?.into_result()?;
        info!(
            kind = %grant.entity_kind,
            object_id = %grant.object_id,
            subject = %grant.subject,
            level = %grant.level,
            "Saved permission"
        );
        Ok(())
    }

    /// Write one grant from a loosely-typed level
    pub async fn set_permission_with(
        &self,
        subject: Subject,
        kind: EntityKind,
        object_id: &str,
        level: impl Into<PermissionInput>,
    ) -> Result<(), ClientError> {
        let level: PermissionLevel = level.into().resolve()?;
        self.set_permission(&GrantRequest::new(subject, kind, object_id, level))
            .await
    }
}
