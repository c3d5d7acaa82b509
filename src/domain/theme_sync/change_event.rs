//! Change Event
//! One notification per tenant mutation, as delivered by the change feed

use std::fmt;

use getset::Getters;
use serde::Deserialize;
use serde_json::Value;

use super::custom_errors::EventDecodeError;

/// Identifies a tenant (shop account). Also names the tenant's output directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Accepts only ids that are safe to use as a single directory name
    pub fn parse(id: &str) -> Result<Self, EventDecodeError> {
        let usable = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(|c: char| c == '/' || c == '\\' || c == '\0');
        if !usable {
            return Err(EventDecodeError::InvalidTenant(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct ChangeEvent {
    tenant_id: TenantId,
    actor_name: String,
    resource_id: String,
    origin_host: String,
}

impl ChangeEvent {
    pub fn new(
        tenant_id: TenantId,
        actor_name: impl Into<String>,
        resource_id: impl Into<String>,
        origin_host: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            actor_name: actor_name.into(),
            resource_id: resource_id.into(),
            origin_host: origin_host.into(),
        }
    }

    /// Decodes a JSON feed frame.
    /// Returns `Ok(None)` for frames published under a topic other than `topic_prefix`.
    pub fn from_frame(frame: &str, topic_prefix: &str) -> Result<Option<Self>, EventDecodeError> {
        let frame: FeedFrame = serde_json::from_str(frame)?;

        if let Some(topic) = frame.topic.as_ref().or(frame.kind.as_ref()) {
            if !topic.starts_with(topic_prefix) {
                return Ok(None);
            }
        }

        let data = frame.data.ok_or(EventDecodeError::MissingField("data"))?;
        let account = data
            .account
            .ok_or(EventDecodeError::MissingField("account"))?;
        let tenant_id = TenantId::parse(&account)?;
        let resource_id = data
            .shop_id
            .as_ref()
            .and_then(scalar_to_string)
            .ok_or(EventDecodeError::MissingField("shop_id"))?;

        Ok(Some(Self {
            tenant_id,
            actor_name: data.user.unwrap_or_default(),
            resource_id,
            origin_host: data.system.and_then(|s| s.host).unwrap_or_default(),
        }))
    }
}

// shop ids show up both as strings and as numbers
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct FeedFrame {
    #[serde(default)]
    topic: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Option<FeedData>,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    shop_id: Option<Value>,
    #[serde(default)]
    system: Option<FeedSystem>,
}

#[derive(Debug, Deserialize)]
struct FeedSystem {
    #[serde(default)]
    host: Option<String>,
}
