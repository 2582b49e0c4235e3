// Application state and the central event loop.
//
// Coordinates realtime events from the backend, captured audio from the
// recorder, and commands from the front-end. Owns the assistant state and
// pushes UI updates to the console.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use voicerag_core::{AssistantState, ServerMessage, StateChange, ToolAction};

use crate::db::Database;
use crate::events::{ConnectionStatus, ListingsView, TranscriptRole, UiUpdate, UserCommand};
use crate::realtime::RealtimeEvent;
use crate::session::SessionController;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub assistant: AssistantState,
    pub session: SessionController,
    pub db: Database,
    pub connection_status: ConnectionStatus,
    /// Transcript of the response currently being spoken.
    pub response_text: String,
}

impl AppState {
    pub fn new(session: SessionController, db: Database) -> Self {
        Self {
            assistant: AssistantState::new(),
            session,
            db,
            connection_status: ConnectionStatus::Disconnected,
            response_text: String::new(),
        }
    }

    /// Apply an action and translate the resulting changes into UI updates,
    /// persisting whatever is stored across sessions.
    pub fn apply_action(&mut self, action: ToolAction) -> Vec<UiUpdate> {
        let changes = self.assistant.apply(action);
        self.persist(&changes);

        let mut updates = Vec::new();
        let mut listings_dirty = false;
        for change in &changes {
            match change {
                StateChange::PreferencesChanged => {
                    updates.push(UiUpdate::Preferences(self.assistant.preferences().clone()));
                }
                StateChange::ListingsReplaced
                | StateChange::HighlightChanged
                | StateChange::FavoritesChanged
                | StateChange::PageChanged => listings_dirty = true,
                StateChange::MessageDrafted => {
                    if let Some(message) = self.assistant.outbox().last() {
                        updates.push(UiUpdate::MessageDrafted(message.clone()));
                    }
                }
            }
        }
        if listings_dirty {
            updates.push(UiUpdate::Listings(ListingsView::from_state(&self.assistant)));
        }
        updates
    }

    fn persist(&self, changes: &[StateChange]) {
        if changes.contains(&StateChange::PreferencesChanged) {
            if let Err(e) = self.db.save_preferences(self.assistant.preferences()) {
                warn!("Failed to persist preferences: {e:#}");
            }
        }
        if changes.contains(&StateChange::FavoritesChanged) {
            if let Err(e) = self.db.save_favorites(self.assistant.favorites()) {
                warn!("Failed to persist favorites: {e:#}");
            }
        }
    }

    /// Log a finished transcript line and return its UI update.
    fn record_transcript(&self, role: TranscriptRole, text: &str) -> UiUpdate {
        info!("{}: {}", role.as_str(), text);
        if let Err(e) = self.db.append_transcript(role, text) {
            warn!("Failed to store transcript: {e:#}");
        }
        UiUpdate::Transcript {
            role,
            text: text.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run until the user quits or the command channel closes.
///
/// The realtime and audio channels may close earlier (connection dropped,
/// input exhausted); the loop keeps serving commands without them.
pub async fn run(
    mut rt_rx: mpsc::Receiver<RealtimeEvent>,
    mut audio_rx: mpsc::Receiver<Vec<i16>>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let _ = ui_tx
        .send(UiUpdate::Listings(ListingsView::from_state(&state.assistant)))
        .await;

    let mut rt_open = true;
    let mut audio_open = true;

    loop {
        tokio::select! {
            event = rt_rx.recv(), if rt_open => {
                match event {
                    Some(event) => handle_realtime_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Realtime channel closed");
                        rt_open = false;
                    }
                }
            }

            chunk = audio_rx.recv(), if audio_open => {
                match chunk {
                    Some(samples) => {
                        if let Err(e) = state.session.forward_audio(&samples).await {
                            warn!("Failed to send captured audio: {e}");
                            let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
                        }
                    }
                    None => {
                        debug!("Audio channel closed");
                        audio_open = false;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    if state.session.is_recording() {
        if let Err(e) = state.session.toggle().await {
            debug!("Stopping recording on exit: {e}");
        }
    }
    info!("Application event loop exiting");
    Ok(())
}

async fn send_all(ui_tx: &mpsc::Sender<UiUpdate>, updates: Vec<UiUpdate>) {
    for update in updates {
        let _ = ui_tx.send(update).await;
    }
}

async fn handle_realtime_event(
    state: &mut AppState,
    event: RealtimeEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        RealtimeEvent::Open => {
            info!("Realtime connection open");
            state.connection_status = ConnectionStatus::Connected;
            let _ = ui_tx
                .send(UiUpdate::ConnectionStatus(ConnectionStatus::Connected))
                .await;
        }
        RealtimeEvent::Closed => {
            info!("Realtime connection closed");
            state.connection_status = ConnectionStatus::Disconnected;
            let was_recording = state.session.abandon().await;
            let _ = ui_tx
                .send(UiUpdate::ConnectionStatus(ConnectionStatus::Disconnected))
                .await;
            if was_recording {
                let _ = ui_tx.send(UiUpdate::Recording(false)).await;
            }
        }
        RealtimeEvent::TransportError(message) => {
            warn!("Realtime transport error: {message}");
            let _ = ui_tx.send(UiUpdate::Error(message)).await;
        }
        RealtimeEvent::Message(msg) => handle_server_message(state, msg, ui_tx).await,
    }
}

async fn handle_server_message(
    state: &mut AppState,
    msg: ServerMessage,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match msg {
        ServerMessage::ResponseAudioDelta { delta } => {
            if let Err(e) = state.session.on_audio_delta(&delta) {
                warn!("Dropping response audio: {e}");
            }
        }
        ServerMessage::ResponseAudioTranscriptDelta { delta } => {
            state.response_text.push_str(&delta);
            let _ = ui_tx.send(UiUpdate::AssistantDelta(delta)).await;
        }
        ServerMessage::InputAudioTranscriptionCompleted { transcript, .. } => {
            let update = state.record_transcript(TranscriptRole::User, &transcript);
            let _ = ui_tx.send(update).await;
        }
        ServerMessage::ResponseDone { response, .. } => {
            let mut updates = Vec::new();
            for transcript in response.transcripts() {
                updates.push(state.record_transcript(TranscriptRole::Assistant, transcript));
            }
            state.response_text.clear();
            send_all(ui_tx, updates).await;
        }
        ServerMessage::ExtensionMiddleTierToolResponse {
            tool_name,
            tool_result,
            ..
        } => match ToolAction::parse(&tool_result) {
            Ok(action) => {
                debug!("Tool {} produced {:?}", tool_name, action);
                let updates = state.apply_action(action);
                send_all(ui_tx, updates).await;
            }
            Err(e) => {
                warn!("Ignoring result of tool {}: {}", tool_name, e);
                let _ = ui_tx
                    .send(UiUpdate::Error(format!("tool {tool_name}: {e}")))
                    .await;
            }
        },
        ServerMessage::InputAudioBufferSpeechStarted { .. } => {
            state.session.on_speech_started();
        }
        ServerMessage::Error { error } => {
            warn!(
                "Server error ({}): {}",
                error.kind.as_deref().unwrap_or("unknown"),
                error.message
            );
            let _ = ui_tx.send(UiUpdate::Error(error.message)).await;
        }
        ServerMessage::Unknown => {
            debug!("Ignoring unhandled server event");
        }
    }
}

async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let updates = match cmd {
        UserCommand::ToggleRecording
            if !state.session.is_recording()
                && state.connection_status == ConnectionStatus::Disconnected =>
        {
            warn!("Refusing to start recording while disconnected");
            vec![UiUpdate::Error(
                "cannot record: not connected to the assistant".into(),
            )]
        }
        UserCommand::ToggleRecording => match state.session.toggle().await {
            Ok(recording) => vec![UiUpdate::Recording(recording)],
            Err(e) => {
                warn!("Failed to toggle recording: {e}");
                vec![UiUpdate::Error(e.to_string())]
            }
        },
        UserCommand::ToggleFavorite(listing_id) => {
            state.apply_action(ToolAction::ToggleFavorite { listing_id })
        }
        UserCommand::Highlight(listing_id) => {
            let updates = state.apply_action(ToolAction::Highlight {
                listing_id: listing_id.clone(),
            });
            if updates.is_empty() && state.assistant.highlighted().map(|l| &l.id) != Some(&listing_id)
            {
                vec![UiUpdate::Error(format!("no listing {listing_id} is shown"))]
            } else {
                updates
            }
        }
        UserCommand::Navigate(page) => state.apply_action(ToolAction::Navigate { page }),
        UserCommand::ShowPreferences => {
            vec![UiUpdate::Preferences(state.assistant.preferences().clone())]
        }
        UserCommand::Quit => Vec::new(),
    };
    send_all(ui_tx, updates).await;
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

/// Restore preferences and favorites saved by a previous run. Returns
/// whether anything was restored.
pub fn recover_from_db(state: &mut AppState) -> anyhow::Result<bool> {
    let preferences = state.db.load_preferences()?;
    let favorites = state.db.load_favorites()?;

    if preferences.is_none() && favorites.is_empty() {
        info!("No saved session state, starting fresh");
        return Ok(false);
    }

    info!(
        "Restoring saved preferences and {} favorites",
        favorites.len()
    );
    state
        .assistant
        .restore(preferences.unwrap_or_default(), favorites);
    Ok(true)
}
