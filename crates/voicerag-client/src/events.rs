// Messages between the app event loop and the front-end.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use voicerag_core::{AssistantState, Listing, OutgoingMessage, Page, Preferences};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Who spoke a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    User,
    Assistant,
}

impl TranscriptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptRole::User => "user",
            TranscriptRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<TranscriptRole> {
        match s {
            "user" => Some(TranscriptRole::User),
            "assistant" => Some(TranscriptRole::Assistant),
            _ => None,
        }
    }
}

/// Commands from the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    ToggleRecording,
    ToggleFavorite(String),
    Highlight(String),
    Navigate(Page),
    ShowPreferences,
    Quit,
}

/// What the listing view should currently show.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingsView {
    pub page: Page,
    pub listings: Vec<Listing>,
    pub highlighted: Option<String>,
    pub favorites: BTreeSet<String>,
}

impl ListingsView {
    pub fn from_state(state: &AssistantState) -> Self {
        ListingsView {
            page: state.page(),
            listings: state.visible_listings().into_iter().cloned().collect(),
            highlighted: state.highlighted().map(|l| l.id.clone()),
            favorites: state.favorites().clone(),
        }
    }
}

/// Updates pushed to the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    ConnectionStatus(ConnectionStatus),
    Recording(bool),
    /// Partial transcript of the response being spoken.
    AssistantDelta(String),
    Transcript { role: TranscriptRole, text: String },
    Listings(ListingsView),
    Preferences(Preferences),
    MessageDrafted(OutgoingMessage),
    Error(String),
}
