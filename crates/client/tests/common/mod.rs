//! Shared wiremock fixtures for the client integration tests

#![allow(dead_code)]

use cuic_client::CuicClient;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{basic_auth, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const PROBE_PATH: &str = "/cuic/rest/crossdomain";
pub const SECURITY_PATH: &str = "/cuic/security/SecurityPermissions.htmx";
pub const SESSION_TOKEN: &str = "JSESSIONID=A1B2;JSESSIONIDSSO=C3D4;XSRF-TOKEN=e5f6;";

pub fn probe_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .append_header("set-cookie", "JSESSIONID=A1B2; Path=/cuic; Secure; HttpOnly")
        .append_header("set-cookie", "JSESSIONIDSSO=C3D4; Path=/; Secure")
        .append_header("set-cookie", "XSRF-TOKEN=e5f6; Path=/")
        .set_body_string("<cross-domain-policy/>")
}

/// Probe that accepts `CUIC\admin` / `secret`, expected to be hit `times` times
pub async fn mount_probe(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path(PROBE_PATH))
        .and(basic_auth("CUIC\\admin", "secret"))
        .respond_with(probe_response())
        .expect(times)
        .mount(server)
        .await;
}

pub fn client_for(server: &MockServer) -> CuicClient {
    CuicClient::builder()
        .host("127.0.0.1")
        .username("admin")
        .password("secret")
        .base_url(server.uri())
        .throttle(Duration::ZERO)
        .build()
        .unwrap()
}

pub fn command_ok(entity_data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "returnCode": "0",
        "returnMsg": "",
        "entityData": entity_data
    }))
}

pub fn command_rejected(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "returnCode": "1",
        "returnMsg": message
    }))
}

pub fn form_fields(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

type GrantKey = (bool, u64, String);

/// In-memory stand-in for the permissions endpoint
///
/// Stores saved grants per (is_user, entityType, objId) and serves them back
/// from `GET_USER_OR_GROUP_PERMISSIONS`. Object ids listed in `locked` are
/// rejected on save.
#[derive(Default)]
pub struct FakeSecurityPermissions {
    grants: Mutex<HashMap<GrantKey, HashMap<String, u64>>>,
    entities: Vec<Value>,
    locked: Vec<String>,
}

impl FakeSecurityPermissions {
    pub fn with_entities(entities: Vec<Value>) -> Self {
        Self {
            entities,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn lock(mut self, object_id: &str) -> Self {
        self.locked.push(object_id.to_string());
        self
    }

    fn save(&self, is_user: bool, permissions: &Value) -> ResponseTemplate {
        let object_id = permissions["objId"].as_str().unwrap_or_default().to_string();
        if self.locked.contains(&object_id) {
            return command_rejected(&format!("Object {object_id} is locked"));
        }

        let ids: Vec<String> = match (&permissions["id"], is_user) {
            (Value::Array(ids), true) => ids
                .iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect(),
            (Value::String(id), false) => vec![id.clone()],
            _ => return command_rejected("Invalid id for command"),
        };
        let entity_type = permissions["entityType"].as_u64().unwrap_or_default();
        let level = permissions["type"].as_u64().unwrap_or_default();

        let mut grants = self.grants.lock().unwrap();
        let slot = grants.entry((is_user, entity_type, object_id)).or_default();
        for id in ids {
            slot.insert(id, level);
        }
        command_ok(Value::Null)
    }

    fn read(&self, permissions: &Value) -> ResponseTemplate {
        let key = (
            permissions["isUser"].as_bool().unwrap_or_default(),
            permissions["entityType"].as_u64().unwrap_or_default(),
            permissions["objId"].as_str().unwrap_or_default().to_string(),
        );
        let grants = self.grants.lock().unwrap();
        let mut rows: Vec<Value> = grants
            .get(&key)
            .into_iter()
            .flatten()
            .map(|(id, level)| json!({"id": id, "permission": level}))
            .collect();
        rows.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        command_ok(json!({"objId": key.2, "permissions": rows}))
    }
}

impl Respond for FakeSecurityPermissions {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let form = form_fields(request);
        let permissions: Value = form
            .get("permissions")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null);

        match form.get("cmd").map(String::as_str) {
            Some("LOAD_OBJECTS") => command_ok(Value::Array(self.entities.clone())),
            Some("SAVE_USER_PERMISSIONS") => self.save(true, &permissions),
            Some("SAVE_GROUP_PERMISSIONS") => self.save(false, &permissions),
            Some("GET_USER_OR_GROUP_PERMISSIONS") => self.read(&permissions),
            _ => ResponseTemplate::new(400),
        }
    }
}
