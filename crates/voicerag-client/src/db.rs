// SQLite persistence for preferences, favorites, and the transcript log.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::warn;
use voicerag_core::Preferences;

use crate::events::TranscriptRole;

const PREFERENCES_KEY: &str = "preferences";
const FAVORITES_KEY: &str = "favorites";

/// One stored transcript line.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path`. `":memory:"` gives an
    /// ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS session_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transcripts (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                role       TEXT NOT NULL,
                text       TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // -----------------------------------------------------------------------
    // Key-value state
    // -----------------------------------------------------------------------

    /// Store `value` under `key`, replacing any previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(value).context("failed to serialize state value")?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
                params![key, json],
            )
            .context("failed to save state")?;
        Ok(())
    }

    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM session_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;
        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query session state")?;

        match rows.next() {
            Some(row) => {
                let json = row.context("failed to read state row")?;
                let value =
                    serde_json::from_str(&json).context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        let value = serde_json::to_value(prefs).context("failed to serialize preferences")?;
        self.save_state(PREFERENCES_KEY, &value)
    }

    pub fn load_preferences(&self) -> Result<Option<Preferences>> {
        self.load_state(PREFERENCES_KEY)?
            .map(|v| serde_json::from_value(v).context("stored preferences are malformed"))
            .transpose()
    }

    pub fn save_favorites(&self, favorites: &BTreeSet<String>) -> Result<()> {
        let value = serde_json::to_value(favorites).context("failed to serialize favorites")?;
        self.save_state(FAVORITES_KEY, &value)
    }

    pub fn load_favorites(&self) -> Result<BTreeSet<String>> {
        match self.load_state(FAVORITES_KEY)? {
            Some(v) => serde_json::from_value(v).context("stored favorites are malformed"),
            None => Ok(BTreeSet::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Transcripts
    // -----------------------------------------------------------------------

    pub fn append_transcript(&self, role: TranscriptRole, text: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO transcripts (role, text, created_at) VALUES (?1, ?2, ?3)",
                params![role.as_str(), text, Utc::now().to_rfc3339()],
            )
            .context("failed to append transcript")?;
        Ok(())
    }

    /// The most recent `limit` transcript lines, oldest first. Rows with an
    /// unknown role or timestamp are skipped.
    pub fn recent_transcripts(&self, limit: usize) -> Result<Vec<TranscriptEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT role, text, created_at FROM transcripts
                 ORDER BY id DESC LIMIT ?1",
            )
            .context("failed to prepare transcript query")?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("failed to query transcripts")?;

        let mut entries = Vec::new();
        for row in rows {
            let (role, text, created_at) = row.context("failed to read transcript row")?;
            let Some(role) = TranscriptRole::parse(&role) else {
                warn!("Skipping transcript with unknown role {role:?}");
                continue;
            };
            let at = match DateTime::parse_from_rfc3339(&created_at) {
                Ok(at) => at.with_timezone(&Utc),
                Err(e) => {
                    warn!("Skipping transcript with bad timestamp {created_at:?}: {e}");
                    continue;
                }
            };
            entries.push(TranscriptEntry { role, text, at });
        }
        entries.reverse();
        Ok(entries)
    }

    pub fn clear_transcripts(&self) -> Result<()> {
        self.conn()
            .execute("DELETE FROM transcripts", [])
            .context("failed to clear transcripts")?;
        Ok(())
    }
}
