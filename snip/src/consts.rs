//! Shared constants for the snip crate.

use std::time::Duration;

// ── Attachments ────────────────────────────────────────────────

/// How long a replaced or consumed display locator stays valid before release.
pub const RELEASE_GRACE: Duration = Duration::from_millis(1500);

/// File name sent with captured regions.
pub const CAPTURE_FILE_NAME: &str = "snip.png";

/// MIME type of encoded captures.
pub const CAPTURE_MIME: &str = "image/png";
