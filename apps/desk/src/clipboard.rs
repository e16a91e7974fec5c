//! Clipboard seam. The terminal build writes through OSC 52 so the copy lands
//! in the user's local clipboard even over SSH.

use std::io::Write;

use async_trait::async_trait;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Copies via the OSC 52 escape sequence on stdout.
/// Works in Ghostty, iTerm2, kitty, WezTerm, and most modern terminals.
pub struct Osc52Clipboard;

#[async_trait]
impl Clipboard for Osc52Clipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let sequence = osc52_sequence(text);
        tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(sequence.as_bytes())?;
            stdout.flush()
        })
        .await
        .map_err(|e| ClipboardError::Unavailable(e.to_string()))??;
        Ok(())
    }
}

fn osc52_sequence(text: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x07")
}
