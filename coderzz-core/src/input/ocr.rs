//! Text extraction from images via the tesseract CLI

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::InputError;

pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";

/// Image types accepted for OCR.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Runs `tesseract <image> stdout` and returns what it printed
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new(DEFAULT_TESSERACT_CMD)
    }
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Resolved path of the tesseract binary, if installed.
    pub fn locate(&self) -> Option<PathBuf> {
        which::which(&self.command).ok()
    }

    /// Extract text from an image file.
    pub async fn extract_from_path(&self, path: &Path) -> Result<String, InputError> {
        if !is_image_path(path) {
            return Err(InputError::UnsupportedFormat(format!(
                "{}: expected one of {}",
                path.display(),
                IMAGE_EXTENSIONS.join(", ")
            )));
        }

        debug!(command = %self.command, image = %path.display(), "Running OCR");
        let output = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Self::collect(output)
    }

    /// Extract text from image bytes, piping them to `tesseract stdin stdout`.
    ///
    /// Dropping the future kills the child.
    pub async fn extract_from_bytes(&self, bytes: &[u8]) -> Result<String, InputError> {
        debug!(command = %self.command, len = bytes.len(), "Running OCR on upload");
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping stdin closes the pipe. A process that exits early closes
        // its end first; its exit status is reported below instead.
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(bytes).await
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(e.into());
        }

        let output = child.wait_with_output().await?;
        Self::collect(output)
    }

    fn spawn_error(&self, err: std::io::Error) -> InputError {
        if err.kind() == std::io::ErrorKind::NotFound {
            InputError::Ocr(format!(
                "'{}' not found; install tesseract or set ocr.tesseract_cmd",
                self.command
            ))
        } else {
            InputError::Ocr(format!("failed to run '{}': {}", self.command, err))
        }
    }

    fn collect(output: std::process::Output) -> Result<String, InputError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InputError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
