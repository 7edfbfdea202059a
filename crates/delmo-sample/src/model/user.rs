use crate::server::ID_FIELD;
use delmo::{identity, step, Config, Instance, Model, ModelError, Realtime, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_USERNAME: usize = 32;

/// Typed view of a user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_instance(instance: &Instance) -> Result<Self> {
        Ok(serde_json::from_value(instance.data().clone())?)
    }
}

/// Rejects documents without a usable username.
pub fn validate(data: Value) -> Result<Value> {
    let username = data
        .get("username")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if username.is_empty() {
        return Err(ModelError::custom("username is required"));
    }
    if username.chars().count() > MAX_USERNAME {
        return Err(ModelError::custom(format!(
            "username is longer than {MAX_USERNAME} characters"
        )));
    }
    Ok(data)
}

/// Trims the username before it goes over the wire.
pub fn serialize(mut data: Value) -> Result<Value> {
    if let Some(username) = data.get("username").and_then(Value::as_str) {
        let trimmed = username.trim().to_string();
        data["username"] = Value::String(trimmed);
    }
    Ok(data)
}

/// The `User` model configuration: store ids, validation, every push event.
///
/// Transport and push channel are supplied by the caller.
pub fn config() -> Config {
    Config::new()
        .id(identity::field(ID_FIELD))
        .validate(step::from_fn(validate))
        .serialize(step::from_fn(serialize))
        .realtime(Realtime::all())
}

pub fn define(config: Config) -> Model {
    Model::new("User", config.or(&self::config()))
}
