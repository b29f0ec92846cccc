//! Key layout for the client-local store.
//!
//! Each entry is independent: a write to one never touches the others.
//!
//! ```text
//! voiceid:profiles         → JSON Vec<VoiceProfile> (this session's copy)
//! voiceid:settings         → JSON VoiceSettings
//! voiceid:last_sync        → unix-millisecond string
//! voiceid:browser_session  → browser session id (written once)
//! voiceid:unlock           → JSON UnlockState
//! ```

/// Cached profile list for this browser session.
pub const PROFILES: &str = "voiceid:profiles";

/// Cached identification settings.
pub const SETTINGS: &str = "voiceid:settings";

/// Last successful push, unix milliseconds.
pub const LAST_SYNC: &str = "voiceid:last_sync";

/// Client-generated partition key. Never regenerated except on wipe.
pub const BROWSER_SESSION: &str = "voiceid:browser_session";

/// TTL-bounded unlocked-identity record.
pub const UNLOCK: &str = "voiceid:unlock";

/// Every key, in wipe order.
pub const ALL: &[&str] = &[PROFILES, SETTINGS, LAST_SYNC, BROWSER_SESSION, UNLOCK];
