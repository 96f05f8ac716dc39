use reqwest::Url;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// How long the "link copied" confirmation stays visible.
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareError {
    #[error("share sheet failed: {0}")]
    ShareSheet(String),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

/// Host capabilities for handing a room link to the user.
pub trait SharePlatform {
    fn supports_native_share(&self) -> bool;
    fn native_share(&self, title: &str, url: &Url) -> Result<(), ShareError>;
    fn copy_to_clipboard(&self, text: &str) -> Result<(), ShareError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Copied,
}

/// Prefer the native share sheet; otherwise, or if it fails, copy the link.
pub fn share_room_link(
    platform: &dyn SharePlatform,
    title: &str,
    url: &Url,
) -> Result<ShareOutcome, ShareError> {
    if platform.supports_native_share() {
        match platform.native_share(title, url) {
            Ok(()) => return Ok(ShareOutcome::Shared),
            Err(e) => warn!("Native share failed, copying link instead: {}", e),
        }
    }

    platform.copy_to_clipboard(url.as_str())?;
    Ok(ShareOutcome::Copied)
}

/// Transient "copied" indicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyFeedback {
    copied_at: Option<Instant>,
}

impl CopyFeedback {
    pub fn mark(&mut self, now: Instant) {
        self.copied_at = Some(now);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.copied_at
            .map(|at| now.saturating_duration_since(at) < COPY_FEEDBACK)
            .unwrap_or(false)
    }
}
