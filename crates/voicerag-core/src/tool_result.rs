// Decoding of middle-tier tool results into a closed set of actions.
//
// The backend delivers `tool_result` as a JSON-encoded string whose shape
// identifies the action: an explicit `action` discriminator, or one of a few
// well-known keys. Shapes are checked in a fixed order and anything else is
// an error rather than a silent no-op.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::listing::Listing;
use crate::preferences::PreferencesUpdate;
use crate::state::Page;

#[derive(Debug, Error)]
pub enum ToolResultError {
    #[error("tool result is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("tool result is not a JSON object")]
    NotAnObject,

    #[error("unknown tool action `{0}`")]
    UnknownAction(String),

    #[error("tool action `{action}` is missing field `{field}`")]
    MissingField { action: String, field: &'static str },

    #[error("invalid `{field}` in tool result: {source}")]
    InvalidField {
        field: &'static str,
        source: serde_json::Error,
    },

    #[error("`{field}` must be a string or number")]
    NotAnIdentifier { field: &'static str },

    #[error("unknown page `{0}`")]
    UnknownPage(String),

    #[error("unrecognized tool result (keys: {})", .keys.join(", "))]
    Unrecognized { keys: Vec<String> },
}

/// A contact message the assistant drafted for a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub listing_id: String,
    #[serde(default)]
    pub contact: Option<String>,
    pub message: String,
}

/// A UI-relevant side effect requested by a backend tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    /// `{"action":"update_preferences","preferences":{...}}`
    UpdatePreferences(PreferencesUpdate),
    /// `{"listings":[...]}`
    ShowListings(Vec<Listing>),
    /// `{"action":"send_message","listing_id":..,"contact":..,"message":..}`
    SendMessage(OutgoingMessage),
    /// `{"id":..}`
    Highlight { listing_id: String },
    /// `{"favorite_id":..}`
    ToggleFavorite { listing_id: String },
    /// `{"navigate_to":..}`
    Navigate { page: Page },
}

impl ToolAction {
    /// Decode a `tool_result` string.
    pub fn parse(tool_result: &str) -> Result<ToolAction, ToolResultError> {
        let value: Value = serde_json::from_str(tool_result)?;
        let Value::Object(mut obj) = value else {
            return Err(ToolResultError::NotAnObject);
        };

        if let Some(action) = obj.remove("action") {
            return parse_explicit_action(action, obj);
        }

        if let Some(listings) = obj.remove("listings") {
            let listings = serde_json::from_value(listings).map_err(|source| {
                ToolResultError::InvalidField {
                    field: "listings",
                    source,
                }
            })?;
            return Ok(ToolAction::ShowListings(listings));
        }

        if let Some(id) = obj.remove("favorite_id") {
            return Ok(ToolAction::ToggleFavorite {
                listing_id: identifier(id, "favorite_id")?,
            });
        }

        if let Some(target) = obj.remove("navigate_to") {
            let target = identifier(target, "navigate_to")?;
            return match Page::from_id(&target) {
                Some(page) => Ok(ToolAction::Navigate { page }),
                None => Err(ToolResultError::UnknownPage(target)),
            };
        }

        if let Some(id) = obj.remove("id") {
            return Ok(ToolAction::Highlight {
                listing_id: identifier(id, "id")?,
            });
        }

        Err(ToolResultError::Unrecognized {
            keys: obj.keys().cloned().collect(),
        })
    }
}

fn parse_explicit_action(
    action: Value,
    mut obj: Map<String, Value>,
) -> Result<ToolAction, ToolResultError> {
    let action = match action {
        Value::String(s) => s,
        other => return Err(ToolResultError::UnknownAction(other.to_string())),
    };

    match action.as_str() {
        "update_preferences" => {
            let preferences =
                obj.remove("preferences")
                    .ok_or_else(|| ToolResultError::MissingField {
                        action: action.clone(),
                        field: "preferences",
                    })?;
            let update = serde_json::from_value(preferences).map_err(|source| {
                ToolResultError::InvalidField {
                    field: "preferences",
                    source,
                }
            })?;
            Ok(ToolAction::UpdatePreferences(update))
        }
        "send_message" => {
            for field in ["listing_id", "message"] {
                if !obj.contains_key(field) {
                    return Err(ToolResultError::MissingField {
                        action: action.clone(),
                        field,
                    });
                }
            }
            if let Some(id) = obj.remove("listing_id") {
                obj.insert(
                    "listing_id".into(),
                    Value::String(identifier(id, "listing_id")?),
                );
            }
            let message = serde_json::from_value(Value::Object(obj)).map_err(|source| {
                ToolResultError::InvalidField {
                    field: "send_message",
                    source,
                }
            })?;
            Ok(ToolAction::SendMessage(message))
        }
        _ => Err(ToolResultError::UnknownAction(action.clone())),
    }
}

/// Listing ids arrive as strings, but numeric ids are accepted too.
fn identifier(value: Value, field: &'static str) -> Result<String, ToolResultError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ToolResultError::NotAnIdentifier { field }),
    }
}
