//! Folder inventory: per-folder message counts and byte sizes
//!
//! A read-only reporting pass over one mailbox, run on both accounts before
//! the operator confirms the sync. Inventory is advisory; it never gates the
//! correctness of the transfer itself, so every failure in here degrades to
//! a zero-valued statistic rather than aborting the run.
//!
//! Sizing fetches the full raw content of every message to sum real byte
//! lengths. That doubles the data read from the source for reporting alone;
//! the trade is accepted to make the pre-confirmation totals exact.

use tracing::warn;

use crate::errors::AppResult;
use crate::models::{FolderStats, MailboxReport};
use crate::store::MailStore;

/// Compute statistics for every folder of one mailbox
///
/// Folder order is the server's; it is not re-sorted. A folder-listing
/// failure yields an empty report (recoverable, reportable).
pub async fn mailbox_report<S: MailStore>(store: &mut S) -> MailboxReport {
    let folders = match store.list_folders().await {
        Ok(folders) => folders,
        Err(e) => {
            warn!(error = %e, "failed to list folders for inventory");
            return MailboxReport::default();
        }
    };

    let mut report = MailboxReport::default();
    for folder in &folders {
        report.folders.push(folder_stats(store, &folder.name).await);
    }
    report
}

/// Compute statistics for one folder, degrading to `(0, 0)` on failure
pub async fn folder_stats<S: MailStore>(store: &mut S, folder: &str) -> FolderStats {
    match try_folder_stats(store, folder).await {
        Ok((messages, total_bytes)) => FolderStats {
            folder: folder.to_owned(),
            messages,
            total_bytes,
        },
        Err(e) => {
            warn!(folder, error = %e, "failed to compute folder statistics");
            FolderStats {
                folder: folder.to_owned(),
                messages: 0,
                total_bytes: 0,
            }
        }
    }
}

/// Select read-only, enumerate all UIDs, and sum raw message sizes
async fn try_folder_stats<S: MailStore>(store: &mut S, folder: &str) -> AppResult<(usize, u64)> {
    store.select_folder_readonly(folder).await?;
    let uids = store.search_all().await?;
    let mut total_bytes = 0u64;
    for uid in &uids {
        total_bytes += store.fetch_raw(*uid).await?.len() as u64;
    }
    Ok((uids.len(), total_bytes))
}

#[cfg(test)]
mod tests {
    use super::mailbox_report;
    use crate::store::mock::MockStore;

    #[tokio::test]
    async fn reports_counts_and_byte_totals_across_folders() {
        let mut store = MockStore::new()
            .with_folder("INBOX", &[&[0u8; 300], &[0u8; 300], &[0u8; 300]])
            .with_folder("Sent", &[]);

        let report = mailbox_report(&mut store).await;

        assert_eq!(report.folders.len(), 2);
        assert_eq!(report.folders[0].messages, 3);
        assert_eq!(report.folders[0].total_bytes, 900);
        assert_eq!(report.folders[1].messages, 0);
        assert_eq!(report.folders[1].total_bytes, 0);
        assert_eq!(report.total_messages(), 3);
        assert_eq!(report.total_bytes(), 900);
    }

    #[tokio::test]
    async fn folder_failure_degrades_to_zero_statistics() {
        let mut store = MockStore::new()
            .with_folder("INBOX", &[b"hello"])
            .with_folder("Broken", &[b"unreachable"]);
        store.fail_select.insert("Broken".to_owned());

        let report = mailbox_report(&mut store).await;

        assert_eq!(report.folders.len(), 2);
        assert_eq!(report.folders[0].messages, 1);
        assert_eq!(report.folders[1].messages, 0);
        assert_eq!(report.folders[1].total_bytes, 0);
    }

    #[tokio::test]
    async fn listing_failure_yields_empty_report() {
        let mut store = MockStore::new().with_folder("INBOX", &[b"hello"]);
        store.fail_list = true;

        let report = mailbox_report(&mut store).await;

        assert!(report.folders.is_empty());
        assert_eq!(report.total_messages(), 0);
    }
}
