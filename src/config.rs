use std::env;
use std::path::PathBuf;

/// How source rows are parsed and how responses are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// All 12 positions must be present and convertible. The source file may
    /// contain several JSON documents concatenated with no separator.
    /// Responses use the `datatable` envelope.
    Strict,
    /// Missing or null positions become nulls; the source is one JSON
    /// document per file, or a directory of such files. Responses are a
    /// bare array of records.
    Lenient,
}

impl IngestMode {
    fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Self::Lenient,
            _ => Self::Strict,
        }
    }
}

/// Server configuration derived from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Secret compared against the `api_key` query parameter.
    pub api_key: String,
    /// Source file (strict) or file/directory (lenient).
    pub data_path: PathBuf,
    pub ingest_mode: IngestMode,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_str(name, default))
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind: env_str("TDS_BIND", "127.0.0.1"),
            port: env_u16("TDS_PORT", 8080),
            api_key: env::var("TDS_API_KEY").unwrap_or_default(),
            data_path: env_path("TDS_DATA_PATH", "data/trades.json"),
            ingest_mode: IngestMode::parse(&env_str("TDS_INGEST_MODE", "strict")),
        }
    }
}
