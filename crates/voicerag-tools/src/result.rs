// Tool result envelope.

use serde_json::Value;
use voicerag_core::ServerMessage;

/// Where a tool result is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolResultDirection {
    /// Fed back to the model as the function call output.
    ToServer,
    /// Forwarded to the client as `extension.middle_tier_tool.response`.
    ToClient,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub payload: Value,
    pub direction: ToolResultDirection,
}

impl ToolResult {
    pub fn to_client(payload: Value) -> Self {
        ToolResult {
            payload,
            direction: ToolResultDirection::ToClient,
        }
    }

    pub fn to_server(payload: Value) -> Self {
        ToolResult {
            payload,
            direction: ToolResultDirection::ToServer,
        }
    }

    /// Text form of the payload. String payloads are passed through as-is,
    /// anything else is JSON-encoded; `null` becomes the empty string.
    pub fn to_text(&self) -> String {
        match &self.payload {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// The client-bound event carrying this result, or `None` when the
    /// result is meant for the model only.
    pub fn to_client_message(
        &self,
        previous_item_id: &str,
        tool_name: &str,
    ) -> Option<ServerMessage> {
        if self.direction != ToolResultDirection::ToClient {
            return None;
        }
        Some(ServerMessage::ExtensionMiddleTierToolResponse {
            previous_item_id: previous_item_id.to_string(),
            tool_name: tool_name.to_string(),
            tool_result: self.to_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voicerag_core::ToolAction;

    #[test]
    fn client_result_becomes_tool_response_event() {
        let result = ToolResult::to_client(json!({"favorite_id": "L1"}));
        let msg = result.to_client_message("item_4", "favorite").unwrap();

        let ServerMessage::ExtensionMiddleTierToolResponse {
            previous_item_id,
            tool_name,
            tool_result,
        } = msg
        else {
            panic!("expected tool response");
        };
        assert_eq!(previous_item_id, "item_4");
        assert_eq!(tool_name, "favorite");
        assert_eq!(
            ToolAction::parse(&tool_result).unwrap(),
            ToolAction::ToggleFavorite {
                listing_id: "L1".into()
            }
        );
    }

    #[test]
    fn server_result_is_not_forwarded() {
        let result = ToolResult::to_server(json!({"sources": []}));
        assert!(result.to_client_message("item_1", "search").is_none());
    }

    #[test]
    fn text_form() {
        assert_eq!(ToolResult::to_server(Value::Null).to_text(), "");
        assert_eq!(ToolResult::to_server(json!("plain")).to_text(), "plain");
        assert_eq!(ToolResult::to_server(json!({"a": 1})).to_text(), r#"{"a":1}"#);
    }
}
