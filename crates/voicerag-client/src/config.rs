// Configuration loading (config/voicerag.toml).

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use voicerag_core::protocol::{
    InputAudioTranscription, SessionConfig, TranscriptionModel, TurnDetection, TurnDetectionKind,
    Voice,
};

const CONFIG_FILE: &str = "voicerag.toml";
const DB_FILE: &str = "voicerag.db";

/// The settings shipped with the client, installed on first run.
pub const DEFAULT_CONFIG: &str = include_str!("../defaults/voicerag.toml");

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config at {}", .path.display())]
    Missing { path: PathBuf },

    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not valid voicerag config: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("`{field}` {message}")]
    Invalid { field: &'static str, message: String },

    #[error("cannot install default config at {}: {source}", .path.display())]
    Install {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub realtime: RealtimeConfig,
    pub audio: AudioConfig,
    pub db_path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    realtime: RealtimeConfig,
    audio: AudioConfig,
    #[serde(default)]
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint of the realtime middle tier.
    pub url: String,
    pub turn_detection: TurnDetectionKind,
    pub transcription_model: TranscriptionModel,
    #[serde(default)]
    pub voice: Option<Voice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Length of each microphone chunk sent upstream.
    pub chunk_ms: u32,
    /// WAV file played as microphone input. Without one, recording sends
    /// nothing.
    #[serde(default)]
    pub input_wav: Option<PathBuf>,
    /// Where synthesized speech is written.
    pub output_wav: PathBuf,
}

impl AudioConfig {
    /// Samples per microphone chunk.
    pub fn chunk_samples(&self) -> usize {
        (self.sample_rate as u64 * self.chunk_ms as u64 / 1000) as usize
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: Option<String>,
}

impl Config {
    /// The `session.update` payload sent when recording starts.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            turn_detection: Some(TurnDetection {
                kind: self.realtime.turn_detection,
            }),
            input_audio_transcription: Some(InputAudioTranscription {
                model: self.realtime.transcription_model,
            }),
            voice: self.realtime.voice,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Path of the client config under `base_dir`.
pub fn config_path(base_dir: &Path) -> PathBuf {
    base_dir.join("config").join(CONFIG_FILE)
}

/// Load and validate `config/voicerag.toml` under `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = config_path(base_dir);
    let text = std::fs::read_to_string(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::Missing { path: path.clone() }
        } else {
            ConfigError::Unreadable {
                path: path.clone(),
                source,
            }
        }
    })?;
    let file: ConfigFile = toml::from_str(&text).map_err(|source| ConfigError::Malformed {
        path: path.clone(),
        source,
    })?;

    let db_path = match file.database.path {
        Some(p) => p,
        None => default_db_path()?,
    };

    let config = Config {
        realtime: file.realtime,
        audio: file.audio,
        db_path,
    };
    validate(&config)?;
    Ok(config)
}

/// Write the shipped settings to `config/voicerag.toml` unless the user
/// already has a config there. Returns the path when it was written.
pub fn install_default_config(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let path = config_path(base_dir);
    let install_error = |source| ConfigError::Install {
        path: path.clone(),
        source,
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(install_error)?;
    }
    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(install_error(e)),
    };
    file.write_all(DEFAULT_CONFIG.as_bytes())
        .map_err(install_error)?;
    info!("Installed default config at {}", path.display());
    Ok(Some(path))
}

/// Install the default config if needed, then load it.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    install_default_config(base_dir)?;
    load_config_from(base_dir)
}

/// `voicerag.db` in the per-user data directory, which is created if needed.
fn default_db_path() -> Result<String, ConfigError> {
    let dirs = directories::ProjectDirs::from("", "", "voicerag").ok_or_else(|| {
        ConfigError::invalid(
            "database.path",
            "is not set and there is no home directory to derive one from",
        )
    })?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| {
        ConfigError::invalid(
            "database.path",
            format!("default {} cannot be created: {e}", data_dir.display()),
        )
    })?;
    Ok(data_dir.join(DB_FILE).to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = &config.realtime.url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(ConfigError::invalid(
            "realtime.url",
            format!("must be a ws:// or wss:// URL, got {url:?}"),
        ));
    }
    if config.audio.sample_rate == 0 {
        return Err(ConfigError::invalid("audio.sample_rate", "must be above 0"));
    }
    let chunk_ms = config.audio.chunk_ms;
    if !(10..=1000).contains(&chunk_ms) {
        return Err(ConfigError::invalid(
            "audio.chunk_ms",
            format!("must be within 10..=1000 ms, got {chunk_ms}"),
        ));
    }
    if config.audio.output_wav.as_os_str().is_empty() {
        return Err(ConfigError::invalid("audio.output_wav", "must name a file"));
    }
    if config.db_path.is_empty() {
        return Err(ConfigError::invalid("database.path", "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Fresh scratch dir with `config/voicerag.toml` holding `toml`.
    fn scratch_with_config(name: &str, toml: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), toml).unwrap();
        tmp
    }

    const VALID: &str = r#"
[realtime]
url = "wss://assistant.example.com/realtime"
turn_detection = "none"
transcription_model = "whisper-1"
voice = "sage"

[audio]
sample_rate = 16000
chunk_ms = 50
input_wav = "in.wav"
output_wav = "out.wav"

[database]
path = ":memory:"
"#;

    #[test]
    fn shipped_defaults_load() {
        // Pin the database so the test does not touch the user data dir.
        let text = DEFAULT_CONFIG.replace("# path = \"voicerag.db\"", "path = \"voicerag.db\"");
        let tmp = scratch_with_config("voicerag_config_defaults", &text);

        let config = load_config_from(&tmp).expect("defaults should be valid");
        assert_eq!(config.realtime.url, "ws://localhost:8765/realtime");
        assert_eq!(config.realtime.turn_detection, TurnDetectionKind::ServerVad);
        assert!(config.realtime.voice.is_none());
        assert_eq!(config.audio.sample_rate, 24000);
        assert_eq!(config.audio.chunk_samples(), 2400);
        assert!(config.audio.input_wav.is_none());
        assert_eq!(config.db_path, "voicerag.db");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_values_are_read() {
        let tmp = scratch_with_config("voicerag_config_explicit", VALID);
        let config = load_config_from(&tmp).unwrap();

        assert_eq!(config.realtime.voice, Some(Voice::Sage));
        assert_eq!(config.audio.input_wav, Some(PathBuf::from("in.wav")));
        assert_eq!(config.audio.chunk_samples(), 800);
        assert_eq!(config.db_path, ":memory:");

        let session = config.session_config();
        assert_eq!(
            session.turn_detection.map(|t| t.kind),
            Some(TurnDetectionKind::Disabled)
        );
        assert_eq!(session.voice, Some(Voice::Sage));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_is_reported() {
        let tmp = std::env::temp_dir().join("voicerag_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::Missing { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unknown_voice_is_a_parse_error() {
        let tmp = scratch_with_config(
            "voicerag_config_bad_voice",
            &VALID.replace("\"sage\"", "\"robot\""),
        );
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::Malformed { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    fn validation_field(name: &str, toml: &str) -> &'static str {
        let tmp = scratch_with_config(name, toml);
        let err = load_config_from(&tmp).unwrap_err();
        let _ = fs::remove_dir_all(&tmp);
        match err {
            ConfigError::Invalid { field, .. } => field,
            other => panic!("expected Invalid, got: {other:?}"),
        }
    }

    #[test]
    fn rejects_http_url() {
        let toml = VALID.replace("wss://", "https://");
        assert_eq!(validation_field("voicerag_config_http", &toml), "realtime.url");
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let toml = VALID.replace("sample_rate = 16000", "sample_rate = 0");
        assert_eq!(
            validation_field("voicerag_config_rate", &toml),
            "audio.sample_rate"
        );
    }

    #[test]
    fn rejects_chunk_out_of_range() {
        let toml = VALID.replace("chunk_ms = 50", "chunk_ms = 5000");
        assert_eq!(validation_field("voicerag_config_chunk", &toml), "audio.chunk_ms");
    }

    #[test]
    fn first_run_installs_shipped_config() {
        let tmp = std::env::temp_dir().join("voicerag_config_install");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let installed = install_default_config(&tmp).unwrap();

        assert_eq!(installed, Some(config_path(&tmp)));
        assert_eq!(
            fs::read_to_string(config_path(&tmp)).unwrap(),
            DEFAULT_CONFIG
        );
        assert_eq!(install_default_config(&tmp).unwrap(), None);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn existing_config_is_left_alone() {
        let tmp = scratch_with_config("voicerag_config_keep", VALID);

        let config = load_config(&tmp).unwrap();

        assert_eq!(config.realtime.url, "wss://assistant.example.com/realtime");
        assert_eq!(fs::read_to_string(config_path(&tmp)).unwrap(), VALID);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn config_path_blocked_by_a_file_fails_to_install() {
        let tmp = std::env::temp_dir().join("voicerag_config_blocked");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        fs::write(tmp.join("config"), "not a directory").unwrap();

        assert!(matches!(
            install_default_config(&tmp),
            Err(ConfigError::Install { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }
}
