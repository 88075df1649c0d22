use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_CODE_FILE: &str = "main.py";
const DEFAULT_SCRATCH_FILE: &str = "scratch.py";
/// Largest frame the relay will accept from either side (16 MiB).
const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_server_command() -> Vec<String> {
    vec!["pylsp".to_string()]
}

fn default_interpreter() -> Vec<String> {
    vec!["python3".to_string()]
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{workspace_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Listener port for the HTTP + WebSocket server (default: 3001).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Name of the editable code file inside the workspace (default: "main.py").
    code_file: Option<String>,
    /// Name of the file created by POST /createFile (default: "scratch.py").
    scratch_file: Option<String>,
    /// Language server executable + args, e.g. ["pylsp"] or
    /// ["typescript-language-server", "--stdio"].
    server_command: Option<Vec<String>>,
    /// Interpreter used by PUT /code to execute the saved file (default: ["python3"]).
    interpreter: Option<Vec<String>>,
    /// Maximum accepted frame payload size in bytes (default: 16 MiB).
    max_frame_bytes: Option<usize>,
    /// CORS origin allowlist. Empty or absent = allow any origin.
    allowed_origins: Option<Vec<String>>,
    /// Log level filter string, e.g. "debug", "info,lspad=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default) | "json".
    log_format: Option<String>,
}

fn load_toml(workspace_dir: &Path) -> Option<TomlConfig> {
    let path = workspace_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── ServerConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Bind address for the listener (LSPAD_BIND env var, default: "127.0.0.1").
    pub bind_address: String,
    /// Directory holding the editable files and config.toml.
    pub workspace_dir: PathBuf,
    /// File served and overwritten by the /code endpoints.
    pub code_file: String,
    /// File created by POST /createFile.
    pub scratch_file: String,
    /// Command line for the language server spawned per WebSocket connection.
    pub server_command: Vec<String>,
    /// Command the PUT /code endpoint uses to run the saved file.
    pub interpreter: Vec<String>,
    /// Hard cap on a single frame payload; larger declared lengths are rejected.
    pub max_frame_bytes: usize,
    /// CORS allowlist; empty = any origin (the original behavior).
    pub allowed_origins: Vec<String>,
    pub log: String,
    /// "pretty" (default) | "json" (structured for log aggregators).
    pub log_format: String,
}

impl ServerConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{workspace_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        workspace_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let workspace_dir = workspace_dir.unwrap_or_else(|| PathBuf::from("workspace"));

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&workspace_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("LSPAD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let code_file = toml
            .code_file
            .unwrap_or_else(|| DEFAULT_CODE_FILE.to_string());
        let scratch_file = toml
            .scratch_file
            .unwrap_or_else(|| DEFAULT_SCRATCH_FILE.to_string());

        let server_command = toml
            .server_command
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_server_command);
        let interpreter = toml
            .interpreter
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_interpreter);

        let max_frame_bytes = toml.max_frame_bytes.unwrap_or(DEFAULT_MAX_FRAME_BYTES);
        let allowed_origins = toml.allowed_origins.unwrap_or_default();

        let log_format = std::env::var("LSPAD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        Self {
            port,
            bind_address,
            workspace_dir,
            code_file,
            scratch_file,
            server_command,
            interpreter,
            max_frame_bytes,
            allowed_origins,
            log,
            log_format,
        }
    }

    /// Absolute-or-relative path of the editable code file.
    pub fn code_path(&self) -> PathBuf {
        self.workspace_dir.join(&self.code_file)
    }

    /// Path of the scratch file created by POST /createFile.
    pub fn scratch_path(&self) -> PathBuf {
        self.workspace_dir.join(&self.scratch_file)
    }
}
