// Line-oriented console front-end.
//
// Reads commands from stdin and prints UI updates to stdout. Everything else
// goes to the log file, so the terminal only carries the conversation.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};
use voicerag_core::preferences::Range;
use voicerag_core::{Page, Preferences};

use crate::events::{ConnectionStatus, ListingsView, TranscriptRole, UiUpdate, UserCommand};

pub const HELP: &str = "\
commands:
  r          start/stop recording
  h <id>     highlight a listing
  f <id>     toggle a favorite
  l          show listings
  fav        show favorites
  p          show preferences
  q          quit";

/// Parse one input line. Blank lines yield `Ok(None)`; anything unknown is
/// an error carrying the message to show.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    let cmd = match (word, arg) {
        ("r" | "record", None) => UserCommand::ToggleRecording,
        ("h" | "highlight", Some(id)) => UserCommand::Highlight(id.to_string()),
        ("f" | "favorite", Some(id)) => UserCommand::ToggleFavorite(id.to_string()),
        ("l" | "listings", None) => UserCommand::Navigate(Page::Listings),
        ("fav" | "favorites", None) => UserCommand::Navigate(Page::Favorites),
        ("p" | "prefs", None) => UserCommand::ShowPreferences,
        ("q" | "quit" | "exit", None) => UserCommand::Quit,
        ("h" | "highlight" | "f" | "favorite", None) => {
            return Err(format!("`{word}` needs a listing id"));
        }
        _ => return Err(format!("unknown command `{}`", line.trim())),
    };
    if parts.next().is_some() {
        return Err(format!("too many arguments to `{word}`"));
    }
    Ok(Some(cmd))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render_update(update: &UiUpdate) -> String {
    match update {
        UiUpdate::ConnectionStatus(ConnectionStatus::Connected) => "[connected]".into(),
        UiUpdate::ConnectionStatus(ConnectionStatus::Disconnected) => "[disconnected]".into(),
        UiUpdate::Recording(true) => "[recording]".into(),
        UiUpdate::Recording(false) => "[stopped]".into(),
        UiUpdate::AssistantDelta(delta) => format!("~ {delta}"),
        UiUpdate::Transcript { role, text } => match role {
            TranscriptRole::User => format!("you: {text}"),
            TranscriptRole::Assistant => format!("assistant: {text}"),
        },
        UiUpdate::Listings(view) => render_listings(view),
        UiUpdate::Preferences(prefs) => render_preferences(prefs),
        UiUpdate::MessageDrafted(msg) => {
            let to = msg.contact.as_deref().unwrap_or("landlord");
            format!("draft to {} about {}:\n  {}", to, msg.listing_id, msg.message)
        }
        UiUpdate::Error(message) => format!("error: {message}"),
    }
}

fn render_listings(view: &ListingsView) -> String {
    let mut out = format!("== {} ({}) ==", view.page.id(), view.listings.len());
    if view.listings.is_empty() {
        out.push_str("\n  (none)");
    }
    for listing in &view.listings {
        let marker = if view.highlighted.as_deref() == Some(listing.id.as_str()) {
            '>'
        } else {
            ' '
        };
        let star = if view.favorites.contains(&listing.id) {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!(
            "\n{marker}{star} {}  {}  {}  {:.0}/mo  {} rooms  {:.0} m2",
            listing.id, listing.title, listing.location, listing.price, listing.rooms, listing.size
        ));
    }
    out
}

fn render_range(range: &Range) -> String {
    match (range.min, range.max) {
        (Some(min), Some(max)) => format!("{min}-{max}"),
        (Some(min), None) => format!(">= {min}"),
        (None, Some(max)) => format!("<= {max}"),
        (None, None) => "any".into(),
    }
}

fn render_preferences(prefs: &Preferences) -> String {
    let mut out = String::from("== preferences ==");
    if prefs.is_empty() {
        out.push_str("\n  (none yet)");
        return out;
    }
    if let Some(budget) = &prefs.budget {
        out.push_str(&format!("\n  budget: {}", render_range(budget)));
    }
    if let Some(size) = &prefs.size {
        out.push_str(&format!("\n  size: {}", render_range(size)));
    }
    if let Some(rooms) = prefs.rooms {
        out.push_str(&format!("\n  rooms: {rooms}"));
    }
    if let Some(location) = &prefs.location {
        out.push_str(&format!("\n  location: {location}"));
    }
    let features: Vec<&str> = prefs.enabled_features().map(|f| f.label()).collect();
    if !features.is_empty() {
        out.push_str(&format!("\n  features: {}", features.join(", ")));
    }
    out
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Run the console on stdin/stdout until the user quits.
pub async fn run(
    ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    run_with(stdin, stdout, ui_rx, cmd_tx).await
}

/// Console loop over arbitrary I/O. Ends on `q`, on end of input, or when
/// the app stops sending updates.
pub async fn run_with<R, W>(
    reader: R,
    mut writer: W,
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    writer.write_all(format!("{HELP}\n").as_bytes()).await?;
    writer.flush().await?;

    let mut input_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    debug!("Console input closed");
                    input_open = false;
                    let _ = cmd_tx.send(UserCommand::Quit).await;
                    continue;
                };
                match parse_command(&line) {
                    Ok(Some(cmd)) => {
                        let quit = cmd == UserCommand::Quit;
                        if cmd_tx.send(cmd).await.is_err() || quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => {
                        writer
                            .write_all(format!("{message}\n{HELP}\n").as_bytes())
                            .await?;
                        writer.flush().await?;
                    }
                }
            }

            update = ui_rx.recv() => {
                let Some(update) = update else {
                    break;
                };
                writer
                    .write_all(format!("{}\n", render_update(&update)).as_bytes())
                    .await?;
                writer.flush().await?;
            }
        }
    }

    info!("Console closed");
    Ok(())
}
