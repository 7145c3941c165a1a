//! Conversation state model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::Result;

/// Per-user conversation state: the current step and its scratch data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: i64,
    pub step: Option<String>,
    pub data: StateData,
    /// Incremented by every write, used to order cache refreshes
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Raw `fsm_context` row as returned by the database
#[derive(Debug, Clone, FromRow)]
pub struct ConversationStateRow {
    pub user_id: i64,
    pub step: Option<String>,
    pub data: Value,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ConversationStateRow> for ConversationState {
    type Error = crate::utils::errors::TaskBuddyError;

    fn try_from(row: ConversationStateRow) -> Result<Self> {
        Ok(Self {
            user_id: row.user_id,
            step: row.step,
            data: StateData::from_value(row.data)?,
            version: row.version,
            updated_at: row.updated_at,
        })
    }
}

impl ConversationState {
    /// A fresh state as created on the first write for a user
    pub fn new(user_id: i64, step: Option<String>, data: StateData) -> Self {
        Self {
            user_id,
            step,
            data,
            version: 1,
            updated_at: Utc::now(),
        }
    }
}

/// String-keyed bag of auxiliary values scoped to the current flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateData(Map<String, Value>);

impl StateData {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build from a JSON value; anything but an object is rejected
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Set a value, replacing any previous one under the same key
    pub fn insert<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)?;
        self.0.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Builder-style insert for values that always serialize
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Get a typed value
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        match self.0.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(Value::as_str).map(str::to_string)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Get a list of integers, skipping entries that are not integers
    pub fn get_i64_list(&self, key: &str) -> Vec<i64> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for StateData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_operations() {
        let mut data = StateData::new();
        data.insert("login_name", "alice").unwrap();
        data.insert("owner_telegram_id", 42_i64).unwrap();
        data.insert("list_messages_delete_ids", vec![1, 2, 3]).unwrap();

        assert_eq!(data.get_string("login_name"), Some("alice".to_string()));
        assert_eq!(data.get_i64("owner_telegram_id"), Some(42));
        assert_eq!(data.get_i64_list("list_messages_delete_ids"), vec![1, 2, 3]);
        assert_eq!(data.get::<Vec<i32>>("list_messages_delete_ids").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(data.get_string("missing"), None);
        assert!(data.get_i64_list("missing").is_empty());
        assert_eq!(data.len(), 3);

        data.remove("login_name");
        assert!(!data.contains_key("login_name"));
    }

    #[test]
    fn test_from_value() {
        let data = StateData::from_value(json!({"k": "v", "n": 1})).unwrap();
        assert_eq!(data.get_string("k"), Some("v".to_string()));
        assert_eq!(serde_json::to_value(&data).unwrap(), json!({"k": "v", "n": 1}));

        assert!(StateData::from_value(json!([1, 2])).is_err());
        assert!(StateData::from_value(json!("text")).is_err());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let data = StateData::new().with("k", "v");
        assert_eq!(serde_json::to_string(&data).unwrap(), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_row_conversion() {
        let row = ConversationStateRow {
            user_id: 7,
            step: Some("main_menu".to_string()),
            data: json!({"owner_telegram_id": 7}),
            version: 3,
            updated_at: Utc::now(),
        };
        let state = ConversationState::try_from(row).unwrap();
        assert_eq!(state.step.as_deref(), Some("main_menu"));
        assert_eq!(state.data.get_i64("owner_telegram_id"), Some(7));
        assert_eq!(state.version, 3);
    }
}
