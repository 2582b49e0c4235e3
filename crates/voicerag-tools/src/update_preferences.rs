// `update_preferences`: records the preferences the user mentioned and relays
// them to the client.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};
use voicerag_core::{Feature, Preferences, PreferencesUpdate};

use crate::registry::{Tool, ToolError};
use crate::result::ToolResult;

/// Preferences of the current conversation, shared by the tools that read
/// and write them.
#[derive(Debug, Clone, Default)]
pub struct PreferenceStore {
    inner: Arc<Mutex<Preferences>>,
}

impl PreferenceStore {
    /// Merge `update` and report whether anything changed.
    pub fn apply(&self, update: &PreferencesUpdate) -> bool {
        let mut prefs = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        prefs.apply(update).changed
    }

    pub fn snapshot(&self) -> Preferences {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Default)]
pub struct UpdatePreferencesTool {
    store: PreferenceStore,
}

impl UpdatePreferencesTool {
    pub fn new(store: PreferenceStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdatePreferencesTool {
    fn name(&self) -> &'static str {
        "update_preferences"
    }

    fn schema(&self) -> Value {
        let range = json!({
            "type": "object",
            "properties": {
                "min": { "type": "number" },
                "max": { "type": "number" }
            }
        });
        let features: serde_json::Map<String, Value> = Feature::ALL
            .iter()
            .map(|f| (f.id().to_string(), json!({ "type": "boolean" })))
            .collect();

        json!({
            "type": "function",
            "name": "update_preferences",
            "description": "Update the user's preferences for apartment search. \
                Only include fields that were specifically mentioned by the user.",
            "parameters": {
                "type": "object",
                "properties": {
                    "budget": range,
                    "size": range,
                    "rooms": {
                        "type": "number",
                        "description": "Desired number of rooms"
                    },
                    "location": {
                        "type": "string",
                        "description": "Preferred location/district in Vienna"
                    },
                    "features": {
                        "type": "object",
                        "properties": features,
                        "description": "Features with boolean values indicating if they \
                            are wanted (true) or not wanted (false)"
                    }
                },
                "required": [],
                "additionalProperties": false
            }
        })
    }

    /// Record the update, then echo the arguments to the client. A call that
    /// does not fit the update shape fails here and leaves the store alone.
    async fn invoke(&self, args: Value) -> Result<ToolResult, ToolError> {
        let update = serde_json::from_value::<PreferencesUpdate>(args.clone()).map_err(|e| {
            ToolError::InvalidArguments {
                tool: self.name().to_string(),
                message: e.to_string(),
            }
        })?;

        if self.store.apply(&update) {
            info!("Preferences updated: {:?}", self.store.snapshot());
        } else {
            debug!("Preference update changed nothing");
        }

        Ok(ToolResult::to_client(json!({
            "action": "update_preferences",
            "preferences": args,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ToolResultDirection;
    use voicerag_core::ToolAction;

    #[tokio::test]
    async fn wraps_arguments_for_the_client() {
        let args = json!({"rooms": 3, "features": {"balcony": true}});
        let result = UpdatePreferencesTool::default()
            .invoke(args.clone())
            .await
            .unwrap();

        assert_eq!(result.direction, ToolResultDirection::ToClient);
        assert_eq!(result.payload["action"], "update_preferences");
        assert_eq!(result.payload["preferences"], args);

        let ToolAction::UpdatePreferences(update) = ToolAction::parse(&result.to_text()).unwrap()
        else {
            panic!("expected UpdatePreferences");
        };
        assert_eq!(update.rooms, Some(3));
        assert_eq!(update.features.get("balcony"), Some(&true));
    }

    #[tokio::test]
    async fn rejects_wrongly_typed_arguments() {
        let store = PreferenceStore::default();
        let err = UpdatePreferencesTool::new(store.clone())
            .invoke(json!({"rooms": "three"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert_eq!(store.snapshot(), Preferences::default());
    }

    #[tokio::test]
    async fn updates_accumulate_in_the_shared_store() {
        let store = PreferenceStore::default();
        let tool = UpdatePreferencesTool::new(store.clone());

        tool.invoke(json!({"location": "Wieden", "budget": {"max": 1200}}))
            .await
            .unwrap();
        tool.invoke(json!({"rooms": 2, "features": {"pets": true}}))
            .await
            .unwrap();

        let prefs = store.snapshot();
        assert_eq!(prefs.location.as_deref(), Some("Wieden"));
        assert_eq!(prefs.budget.and_then(|b| b.max), Some(1200.0));
        assert_eq!(prefs.rooms, Some(2));
        assert!(prefs.feature_enabled(Feature::Pets));
    }

    #[test]
    fn store_survives_a_panicked_writer() {
        let store = PreferenceStore::default();
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("writer died");
        })
        .join();

        assert!(store.apply(&PreferencesUpdate {
            rooms: Some(4),
            ..Default::default()
        }));
        assert_eq!(store.snapshot().rooms, Some(4));
    }

    #[test]
    fn schema_lists_every_feature() {
        let schema = UpdatePreferencesTool::default().schema();
        let props = &schema["parameters"]["properties"]["features"]["properties"];
        for feature in Feature::ALL {
            assert_eq!(props[feature.id()]["type"], "boolean");
        }
    }
}
