//! Workspace file store backing the /code and /createFile endpoints.
//!
//! One editable code file plus one scratch file, both living under the
//! configured workspace directory. Paths come from [`ServerConfig`] — nothing
//! here is hardcoded.

use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ServerConfig;

/// Failure modes of the auxiliary file endpoints.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("file already exists: {0}")]
    AlreadyExists(String),
    #[error("file operation failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to run interpreter {0:?}: {1}")]
    Exec(String, #[source] std::io::Error),
}

pub struct FileStore {
    code_path: PathBuf,
    scratch_path: PathBuf,
    interpreter: Vec<String>,
}

impl FileStore {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            code_path: config.code_path(),
            scratch_path: config.scratch_path(),
            interpreter: config.interpreter.clone(),
        }
    }

    /// Full contents of the code file.
    pub async fn read_code(&self) -> Result<String, FileError> {
        Ok(tokio::fs::read_to_string(&self.code_path).await?)
    }

    /// Overwrite the code file with `text`.
    pub async fn save_code(&self, text: &str) -> Result<(), FileError> {
        tokio::fs::write(&self.code_path, text).await?;
        debug!(path = %self.code_path.display(), bytes = text.len(), "code saved");
        Ok(())
    }

    /// Overwrite the code file, then execute it with the configured
    /// interpreter and return captured stdout + stderr.
    ///
    /// No sandboxing — the uploaded text runs with the server's privileges.
    pub async fn run_code(&self, text: &str) -> Result<String, FileError> {
        self.save_code(text).await?;

        let (program, args) = self
            .interpreter
            .split_first()
            .ok_or_else(|| FileError::Io(std::io::Error::other("empty interpreter command")))?;

        let output = Command::new(program)
            .args(args)
            .arg(&self.code_path)
            .output()
            .await
            .map_err(|e| FileError::Exec(program.clone(), e))?;

        if !output.status.success() {
            warn!(status = %output.status, "interpreter exited with failure");
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    /// Create the scratch file if absent. Never truncates an existing file.
    pub async fn create_scratch(&self) -> Result<(), FileError> {
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.scratch_path)
            .await
        {
            Ok(_) => {
                debug!(path = %self.scratch_path.display(), "scratch file created");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(
                FileError::AlreadyExists(self.scratch_path.display().to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }
}
