//! Typed records at the transport and engine boundaries
//!
//! Server responses are converted into these explicit types once, when
//! received from the transport. The run log is an append-only collector
//! passed by reference through the sync stages.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Mailbox/folder descriptor
///
/// Produced from the server's LIST response. The name is the opaque
/// identifier used for every subsequent protocol call; no mapping or
/// renaming occurs between source and destination.
#[derive(Debug, Clone, Serialize)]
pub struct FolderInfo {
    /// Folder name (may contain path separators like `/` or `.`)
    pub name: String,
    /// Hierarchy delimiter if supported by server (e.g., `/`, `.`)
    pub delimiter: Option<String>,
    /// Server-reported name attributes (e.g., `\Noselect`, `\HasChildren`)
    pub attributes: Vec<String>,
}

/// Per-folder statistics from the inventory pass
///
/// Derived, read-only values; recomputed each run, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct FolderStats {
    /// Folder name as reported by the server
    pub folder: String,
    /// Number of messages found by an unfiltered search
    pub messages: usize,
    /// Sum of raw RFC822 byte lengths across all messages
    pub total_bytes: u64,
}

/// Statistics for one whole mailbox, folder order as the server reports it
#[derive(Debug, Clone, Default, Serialize)]
pub struct MailboxReport {
    /// Per-folder statistics; empty when folder listing failed
    pub folders: Vec<FolderStats>,
}

impl MailboxReport {
    /// Total message count across all folders
    pub fn total_messages(&self) -> usize {
        self.folders.iter().map(|f| f.messages).sum()
    }

    /// Total raw byte size across all folders
    pub fn total_bytes(&self) -> u64 {
        self.folders.iter().map(|f| f.total_bytes).sum()
    }
}

/// One entry in the run log
///
/// Entries are appended in chronological order of occurrence and never
/// deduplicated or reordered.
#[derive(Debug, Clone, Serialize)]
pub enum SyncEvent {
    /// A folder's transfer started; `total` is fixed at this point
    FolderStarted { folder: String, total: usize },
    /// One message copied source → destination
    Transferred { folder: String, uid: u32 },
    /// One message failed to copy; the folder's transfer continued
    MessageFailed {
        folder: String,
        uid: u32,
        reason: String,
    },
    /// A folder's transfer aborted during setup (select or search)
    FolderFailed { folder: String, reason: String },
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FolderStarted { folder, total } => {
                write!(f, "Syncing folder {folder} with {total} messages")
            }
            Self::Transferred { folder, uid } => {
                write!(f, "Synced message UID {uid} in {folder}")
            }
            Self::MessageFailed {
                folder,
                uid,
                reason,
            } => write!(f, "Failed to sync message UID {uid} in {folder}: {reason}"),
            Self::FolderFailed { folder, reason } => {
                write!(f, "Failed to sync folder {folder}: {reason}")
            }
        }
    }
}

/// Terminal state of one run
///
/// `Completed` is reached even when individual folders or messages failed;
/// failures live in the log, not in a distinct exit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// Operator declined the confirmation gate; zero mutations performed
    Cancelled,
    /// All folders were attempted; see the log for per-item outcomes
    Completed,
}

/// Append-only run log
///
/// Collects every sync event for the final summary and the optional JSON
/// report. Passed by mutable reference into each stage rather than held as
/// ambient global state.
#[derive(Debug, Clone, Serialize)]
pub struct SyncLog {
    /// Run start in RFC 3339 format with milliseconds
    pub started_at: String,
    /// Ordered event sequence
    pub events: Vec<SyncEvent>,
}

impl SyncLog {
    /// Create an empty log stamped with the current UTC time
    pub fn new() -> Self {
        Self {
            started_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            events: Vec::new(),
        }
    }

    /// Append one event
    pub fn push(&mut self, event: SyncEvent) {
        self.events.push(event);
    }

    /// Count of successfully transferred messages
    pub fn transferred(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SyncEvent::Transferred { .. }))
            .count()
    }

    /// Count of recorded failures, message-level and folder-level
    pub fn failed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SyncEvent::MessageFailed { .. } | SyncEvent::FolderFailed { .. }
                )
            })
            .count()
    }
}

impl Default for SyncLog {
    fn default() -> Self {
        Self::new()
    }
}
