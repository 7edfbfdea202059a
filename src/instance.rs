//! # Instances
//!
//! An [`Instance`] is a document produced by a model. With `bind` on (the
//! default) it remembers the model that made it, so the pipelines can be called
//! on the instance itself:
//!
//! ```rust,no_run
//! # use delmo::{Model, Config};
//! # use serde_json::json;
//! # async fn demo(user: Model) -> delmo::Result<()> {
//! let mut taro = user.by_id(json!(12)).await?;
//! taro["username"] = json!("taro");
//! taro.save().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Converting an instance into a [`Value`] drops the binding, which is all the
//! default `demodelize` has to do.

use crate::error::{ModelError, Result};
use crate::model::Model;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::ops::{Deref, DerefMut};

#[derive(Clone)]
pub struct Instance {
    data: Value,
    model: Option<Model>,
}

impl Instance {
    /// A free-standing instance bound to no model.
    pub fn new(data: Value) -> Self {
        Self { data, model: None }
    }

    pub(crate) fn bound(model: Model, data: Value) -> Self {
        Self {
            data,
            model: Some(model),
        }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.model.is_some()
    }

    fn bound_model(&self) -> Result<&Model> {
        self.model.as_ref().ok_or(ModelError::Unbound)
    }

    pub async fn insert(&self) -> Result<Value> {
        self.bound_model()?.insert(self.data.clone()).await
    }

    pub async fn update(&self) -> Result<Value> {
        self.bound_model()?.update(self.data.clone()).await
    }

    pub async fn save(&self) -> Result<Value> {
        self.bound_model()?.save(self.data.clone()).await
    }

    pub async fn delete_by_id(&self) -> Result<Value> {
        self.bound_model()?.delete_by_id(self.data.clone()).await
    }

    /// Fetches the remote copy of this instance.
    pub async fn by_id(&self) -> Result<Instance> {
        self.bound_model()?.by_id(self.data.clone()).await
    }
}

impl Deref for Instance {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.data
    }
}

impl DerefMut for Instance {
    fn deref_mut(&mut self) -> &mut Value {
        &mut self.data
    }
}

/// Instances compare by data only.
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl PartialEq<Value> for Instance {
    fn eq(&self, other: &Value) -> bool {
        &self.data == other
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("model", &self.model.as_ref().map(Model::name))
            .field("data", &self.data)
            .finish()
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Value {
        instance.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unbound_instance_refuses_operations() {
        let instance = Instance::new(json!({"id": 1}));
        assert!(!instance.is_bound());
        assert!(matches!(instance.save().await, Err(ModelError::Unbound)));
        assert!(matches!(instance.by_id().await, Err(ModelError::Unbound)));
    }

    #[test]
    fn test_instance_behaves_like_its_data() {
        let mut instance = Instance::new(json!({"username": "taro"}));
        instance["age"] = json!(20);

        assert_eq!(instance["username"], "taro");
        assert_eq!(instance, json!({"username": "taro", "age": 20}));
        assert_eq!(serde_json::to_value(&instance).unwrap(), json!({"username": "taro", "age": 20}));
        assert_eq!(Value::from(instance), json!({"username": "taro", "age": 20}));
    }
}
