// Wire protocol spoken with the realtime backend.
//
// Every frame is a JSON object tagged by its `type` field. Client messages
// configure the session and stream microphone audio; server messages carry
// synthesized audio, transcripts, and middle-tier tool results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed server message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("failed to encode client message: {0}")]
    Encode(serde_json::Error),
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Configure turn-taking and transcription for the session.
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },
    /// Stream one microphone chunk (base64 PCM16).
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
    /// Discard any input audio the server has buffered.
    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear,
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,
}

impl SessionConfig {
    /// Session settings with whisper transcription enabled.
    pub fn new(turn_detection: TurnDetectionKind, voice: Option<Voice>) -> Self {
        SessionConfig {
            turn_detection: Some(TurnDetection {
                kind: turn_detection,
            }),
            input_audio_transcription: Some(InputAudioTranscription {
                model: TranscriptionModel::Whisper1,
            }),
            voice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: TurnDetectionKind,
}

/// Who decides when a user utterance is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDetectionKind {
    /// The server segments speech with voice-activity detection.
    #[serde(rename = "server_vad")]
    ServerVad,
    /// No automatic segmentation.
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    pub model: TranscriptionModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptionModel {
    #[serde(rename = "whisper-1")]
    Whisper1,
}

/// Synthesized voice used for spoken responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Incremental synthesized speech (base64 PCM16).
    #[serde(rename = "response.audio.delta")]
    ResponseAudioDelta { delta: String },

    /// Incremental transcript of the spoken response.
    #[serde(rename = "response.audio_transcript.delta")]
    ResponseAudioTranscriptDelta { delta: String },

    /// Finalized transcription of what the user said.
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputAudioTranscriptionCompleted {
        #[serde(default)]
        event_id: String,
        item_id: String,
        #[serde(default)]
        content_index: u32,
        transcript: String,
    },

    /// End of a response turn.
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        event_id: String,
        response: ResponseBody,
    },

    /// Result of a backend tool invocation; `tool_result` is a JSON string.
    #[serde(rename = "extension.middle_tier_tool.response")]
    ExtensionMiddleTierToolResponse {
        previous_item_id: String,
        tool_name: String,
        tool_result: String,
    },

    /// The server's voice-activity detector heard the user start speaking.
    #[serde(rename = "input_audio_buffer.speech_started")]
    InputAudioBufferSpeechStarted {
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: ServerError,
    },

    /// Any event type this client does not act on.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<ServerMessage, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub id: String,
    #[serde(default)]
    pub output: Vec<ResponseOutput>,
}

impl ResponseBody {
    /// Every transcript carried by the response's output content, in order.
    pub fn transcripts(&self) -> impl Iterator<Item = &str> {
        self.output
            .iter()
            .flat_map(|o| o.content.iter())
            .filter_map(|c| c.transcript.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseOutput {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn to_value(msg: &ClientMessage) -> Value {
        serde_json::from_str(&msg.to_json().unwrap()).unwrap()
    }

    #[test]
    fn session_update_wire_shape() {
        let msg = ClientMessage::SessionUpdate {
            session: SessionConfig::new(TurnDetectionKind::ServerVad, None),
        };
        assert_eq!(
            to_value(&msg),
            json!({
                "type": "session.update",
                "session": {
                    "turn_detection": { "type": "server_vad" },
                    "input_audio_transcription": { "model": "whisper-1" }
                }
            })
        );
    }

    #[test]
    fn session_update_with_voice_and_no_vad() {
        let msg = ClientMessage::SessionUpdate {
            session: SessionConfig::new(TurnDetectionKind::Disabled, Some(Voice::Coral)),
        };
        let v = to_value(&msg);
        assert_eq!(v["session"]["turn_detection"]["type"], "none");
        assert_eq!(v["session"]["voice"], "coral");
    }

    #[test]
    fn audio_buffer_messages_wire_shape() {
        let append = ClientMessage::InputAudioBufferAppend {
            audio: "AAAA".into(),
        };
        assert_eq!(
            to_value(&append),
            json!({ "type": "input_audio_buffer.append", "audio": "AAAA" })
        );
        assert_eq!(
            to_value(&ClientMessage::InputAudioBufferClear),
            json!({ "type": "input_audio_buffer.clear" })
        );
    }

    #[test]
    fn parses_audio_and_transcript_deltas() {
        assert_eq!(
            ServerMessage::parse(r#"{"type":"response.audio.delta","delta":"AQI="}"#).unwrap(),
            ServerMessage::ResponseAudioDelta {
                delta: "AQI=".into()
            }
        );
        assert_eq!(
            ServerMessage::parse(r#"{"type":"response.audio_transcript.delta","delta":"Hal"}"#)
                .unwrap(),
            ServerMessage::ResponseAudioTranscriptDelta {
                delta: "Hal".into()
            }
        );
    }

    #[test]
    fn parses_completed_transcription() {
        let msg = ServerMessage::parse(
            r#"{
                "type": "conversation.item.input_audio_transcription.completed",
                "event_id": "ev_1",
                "item_id": "item_7",
                "content_index": 0,
                "transcript": "Three rooms in Neubau please"
            }"#,
        )
        .unwrap();
        match msg {
            ServerMessage::InputAudioTranscriptionCompleted {
                item_id,
                transcript,
                ..
            } => {
                assert_eq!(item_id, "item_7");
                assert_eq!(transcript, "Three rooms in Neubau please");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn response_done_collects_transcripts() {
        let msg = ServerMessage::parse(
            r#"{
                "type": "response.done",
                "event_id": "ev_2",
                "response": {
                    "id": "resp_1",
                    "output": [
                        { "id": "o1", "content": [
                            { "type": "audio", "transcript": "I found two flats." },
                            { "type": "text" }
                        ]},
                        { "id": "o2" },
                        { "id": "o3", "content": [
                            { "type": "audio", "transcript": "Shall I save one?" }
                        ]}
                    ]
                }
            }"#,
        )
        .unwrap();
        let ServerMessage::ResponseDone { response, .. } = msg else {
            panic!("expected response.done");
        };
        let transcripts: Vec<&str> = response.transcripts().collect();
        assert_eq!(transcripts, vec!["I found two flats.", "Shall I save one?"]);
    }

    #[test]
    fn parses_tool_response() {
        let msg = ServerMessage::parse(
            r#"{
                "type": "extension.middle_tier_tool.response",
                "previous_item_id": "item_3",
                "tool_name": "update_preferences",
                "tool_result": "{\"action\":\"update_preferences\",\"preferences\":{\"rooms\":3}}"
            }"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::ExtensionMiddleTierToolResponse {
                previous_item_id: "item_3".into(),
                tool_name: "update_preferences".into(),
                tool_result: r#"{"action":"update_preferences","preferences":{"rooms":3}}"#
                    .into(),
            }
        );
    }

    #[test]
    fn speech_started_ignores_extra_fields() {
        let msg = ServerMessage::parse(
            r#"{"type":"input_audio_buffer.speech_started","event_id":"e","audio_start_ms":120,"item_id":"i1"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::InputAudioBufferSpeechStarted {
                item_id: Some("i1".into())
            }
        );
    }

    #[test]
    fn parses_error_event() {
        let msg = ServerMessage::parse(
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad audio"}}"#,
        )
        .unwrap();
        let ServerMessage::Error { error } = msg else {
            panic!("expected error");
        };
        assert_eq!(error.kind.as_deref(), Some("invalid_request_error"));
        assert_eq!(error.message, "bad audio");
    }

    #[test]
    fn unknown_type_is_not_a_failure() {
        let msg =
            ServerMessage::parse(r#"{"type":"rate_limits.updated","rate_limits":[]}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn missing_type_is_malformed() {
        assert!(matches!(
            ServerMessage::parse(r#"{"delta":"x"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(ServerMessage::parse("not json").is_err());
    }
}
