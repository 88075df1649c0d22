pub mod config;
pub mod files;
pub mod lsp;
pub mod web;

use std::sync::Arc;

use config::ServerConfig;
use files::FileStore;

/// Shared application state passed to every route handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub files: Arc<FileStore>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Self {
        let config = Arc::new(config);
        let files = Arc::new(FileStore::new(&config));
        Self {
            config,
            files,
            started_at: std::time::Instant::now(),
        }
    }
}
