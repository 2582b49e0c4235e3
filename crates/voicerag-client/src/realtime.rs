// WebSocket client for the realtime middle tier.
//
// `connect` splits the socket into a writer task fed by `RealtimeHandle` and
// a reader task that turns frames into `RealtimeEvent`s.

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use voicerag_core::protocol::ProtocolError;
use voicerag_core::{ClientMessage, ServerMessage, SessionConfig};

use crate::audio::encode_pcm16;
use crate::session::ControlChannel;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        source: tungstenite::Error,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("realtime connection is closed")]
    Closed,
}

/// Lifecycle and payload events from the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    Open,
    Closed,
    TransportError(String),
    Message(ServerMessage),
}

/// Sending half of the connection. Cheap to clone; the writer task ends once
/// every handle is dropped or the reader has finished, after which sends fail
/// with `RealtimeError::Closed`.
#[derive(Debug, Clone)]
pub struct RealtimeHandle {
    tx: mpsc::Sender<ClientMessage>,
}

impl RealtimeHandle {
    pub fn new(tx: mpsc::Sender<ClientMessage>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, msg: ClientMessage) -> Result<(), RealtimeError> {
        self.tx.send(msg).await.map_err(|_| RealtimeError::Closed)
    }

    pub async fn start_session(&self, session: &SessionConfig) -> Result<(), RealtimeError> {
        self.send(ClientMessage::SessionUpdate {
            session: session.clone(),
        })
        .await
    }

    /// Append PCM16 samples to the server's input buffer.
    pub async fn add_user_audio(&self, samples: &[i16]) -> Result<(), RealtimeError> {
        self.send(ClientMessage::InputAudioBufferAppend {
            audio: encode_pcm16(samples),
        })
        .await
    }

    pub async fn input_audio_buffer_clear(&self) -> Result<(), RealtimeError> {
        self.send(ClientMessage::InputAudioBufferClear).await
    }
}

#[async_trait]
impl ControlChannel for RealtimeHandle {
    async fn start_session(&self, session: &SessionConfig) -> Result<(), RealtimeError> {
        RealtimeHandle::start_session(self, session).await
    }

    async fn add_user_audio(&self, samples: &[i16]) -> Result<(), RealtimeError> {
        RealtimeHandle::add_user_audio(self, samples).await
    }

    async fn input_audio_buffer_clear(&self) -> Result<(), RealtimeError> {
        RealtimeHandle::input_audio_buffer_clear(self).await
    }
}

/// Open the WebSocket at `url` and spawn its reader and writer tasks.
///
/// `RealtimeEvent::Open` is the first event delivered; `Closed` is the last.
pub async fn connect(
    url: &str,
) -> Result<(RealtimeHandle, mpsc::Receiver<RealtimeEvent>), RealtimeError> {
    let (ws, _response) =
        tokio_tungstenite::connect_async(url)
            .await
            .map_err(|source| RealtimeError::Connect {
                url: url.to_string(),
                source,
            })?;
    info!("Connected to realtime endpoint {url}");

    let (mut sink, stream) = ws.split();
    let (msg_tx, msg_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (reader_done_tx, reader_done_rx) = oneshot::channel();

    // Buffered, so this cannot block before the reader starts.
    let _ = event_tx.send(RealtimeEvent::Open).await;

    tokio::spawn(async move {
        write_loop(&mut sink, msg_rx, reader_done_rx).await;
    });

    tokio::spawn(async move {
        let result = process_message_stream(stream, &event_tx).await;
        let _ = reader_done_tx.send(());
        if result.is_ok() {
            let _ = event_tx.send(RealtimeEvent::Closed).await;
        }
        info!("Realtime reader finished");
    });

    Ok((RealtimeHandle::new(msg_tx), event_rx))
}

/// Serialize queued client messages onto `sink` as text frames until every
/// sender is dropped, the sink fails, or `reader_done` fires, then close it.
/// Dropping `rx` on exit makes later sends fail.
pub async fn write_loop<S>(
    sink: &mut S,
    mut rx: mpsc::Receiver<ClientMessage>,
    mut reader_done: oneshot::Receiver<()>,
) where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    loop {
        let msg = tokio::select! {
            msg = rx.recv() => msg,
            _ = &mut reader_done => {
                info!("Realtime reader gone, stopping writer");
                None
            }
        };
        let Some(msg) = msg else {
            break;
        };
        let json = match msg.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Dropping client message: {e}");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(json.into())).await {
            warn!("Realtime write failed: {e}");
            break;
        }
    }
    if let Err(e) = sink.close().await {
        debug!("Closing realtime sink: {e}");
    }
}

/// Forward parsed server messages from `stream` through `tx`.
///
/// Unparseable text frames are logged and skipped. A close frame ends the
/// stream; a transport error is reported as `TransportError` and ends it.
/// Returns `Err(())` once the receiver is gone.
pub async fn process_message_stream<St>(
    mut stream: St,
    tx: &mpsc::Sender<RealtimeEvent>,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match ServerMessage::parse(text.as_str()) {
                Ok(msg) => {
                    if tx.send(RealtimeEvent::Message(msg)).await.is_err() {
                        return Err(());
                    }
                }
                Err(e) => warn!("Skipping frame: {e}"),
            },
            Ok(Message::Close(frame)) => {
                info!("Server closed the connection: {:?}", frame);
                break;
            }
            Err(e) => {
                warn!("Realtime transport error: {e}");
                if tx
                    .send(RealtimeEvent::TransportError(e.to_string()))
                    .await
                    .is_err()
                {
                    return Err(());
                }
                break;
            }
            _ => {}
        }
    }
    Ok(())
}
