//! Folder provisioning, the per-folder transfer engine, and run orchestration
//!
//! Transfer copies raw messages source → destination, folder by folder,
//! message by message, strictly sequentially. Failure isolation follows one
//! rule: an error is handled at the narrowest scope that can contain it. A
//! message failure is recorded and the folder continues; a folder setup
//! failure is recorded and the run continues; only session setup failures
//! abort the run. Re-running against a destination that already received a
//! prior run's messages creates duplicates; there is no deduplication or
//! resume.

use indicatif::ProgressBar;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::errors::AppResult;
use crate::imap;
use crate::inventory;
use crate::models::{MailboxReport, RunState, SyncEvent, SyncLog};
use crate::store::{ImapStore, MailStore};
use crate::ui;

/// Ensure a folder of this exact name exists on the destination
///
/// Lists destination folders and compares names case-sensitively; creates
/// only when absent, so a second call with the same name is a no-op. Both
/// listing and creation failures are logged and swallowed: if the folder
/// truly does not exist, the subsequent read-write select surfaces the real
/// failure.
pub async fn ensure_folder<S: MailStore>(dest: &mut S, folder: &str) {
    let existing = match dest.list_folders().await {
        Ok(folders) => folders,
        Err(e) => {
            warn!(folder, error = %e, "cannot list destination folders");
            return;
        }
    };
    if existing.iter().any(|f| f.name == folder) {
        return;
    }
    match dest.create_folder(folder).await {
        Ok(()) => info!(folder, "created destination folder"),
        Err(e) => warn!(folder, error = %e, "failed to create destination folder"),
    }
}

/// Copy one message source → destination as an opaque byte sequence
async fn transfer_one<S: MailStore, D: MailStore>(
    source: &mut S,
    dest: &mut D,
    folder: &str,
    uid: u32,
) -> AppResult<()> {
    let raw = source.fetch_raw(uid).await?;
    dest.append(folder, &raw).await?;
    Ok(())
}

/// Copy every message in one source folder to the same-named destination folder
///
/// The folder's message total is fixed by a single unfiltered search when
/// the folder's transfer starts; the source is not re-queried mid-transfer.
/// No message failure aborts the folder: each UID's outcome is recorded
/// independently and the loop continues. A setup failure (either select, or
/// the search) aborts only this folder and is recorded once.
pub async fn sync_folder<S: MailStore, D: MailStore>(
    source: &mut S,
    dest: &mut D,
    folder: &str,
    log: &mut SyncLog,
    bar: &ProgressBar,
) {
    if let Err(e) = source.select_folder_readonly(folder).await {
        error!(folder, error = %e, "cannot open source folder");
        log.push(SyncEvent::FolderFailed {
            folder: folder.to_owned(),
            reason: e.to_string(),
        });
        return;
    }

    ensure_folder(dest, folder).await;

    if let Err(e) = dest.select_folder_readwrite(folder).await {
        error!(folder, error = %e, "cannot open destination folder");
        log.push(SyncEvent::FolderFailed {
            folder: folder.to_owned(),
            reason: e.to_string(),
        });
        return;
    }

    let uids = match source.search_all().await {
        Ok(uids) => uids,
        Err(e) => {
            error!(folder, error = %e, "cannot enumerate source folder");
            log.push(SyncEvent::FolderFailed {
                folder: folder.to_owned(),
                reason: e.to_string(),
            });
            return;
        }
    };

    let total = uids.len();
    info!(folder, total, "syncing folder");
    log.push(SyncEvent::FolderStarted {
        folder: folder.to_owned(),
        total,
    });
    bar.set_length(total as u64);

    // An empty folder is a trivial success, not an error.
    if total == 0 {
        return;
    }

    for uid in uids {
        match transfer_one(source, dest, folder, uid).await {
            Ok(()) => {
                bar.inc(1);
                log.push(SyncEvent::Transferred {
                    folder: folder.to_owned(),
                    uid,
                });
            }
            Err(e) => {
                error!(folder, uid, error = %e, "failed to sync message");
                log.push(SyncEvent::MessageFailed {
                    folder: folder.to_owned(),
                    uid,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Run the full sync across two already-acquired mailbox stores
///
/// Computes inventory for both sides, hands the reports to the confirmation
/// gate, and on approval transfers every source folder sequentially in
/// server order. One folder's failure never prevents the next from being
/// attempted, so the run always ends `Completed` once the gate is passed;
/// individual failures live in the log.
pub async fn execute<S: MailStore, D: MailStore>(
    source: &mut S,
    dest: &mut D,
    confirm: impl FnOnce(&MailboxReport, &MailboxReport) -> bool,
    log: &mut SyncLog,
) -> RunState {
    let source_report = inventory::mailbox_report(source).await;
    let dest_report = inventory::mailbox_report(dest).await;

    if !confirm(&source_report, &dest_report) {
        info!("sync declined by operator; no mutations performed");
        return RunState::Cancelled;
    }

    let folders = match source.list_folders().await {
        Ok(folders) => folders,
        Err(e) => {
            warn!(error = %e, "cannot enumerate source folders for transfer");
            Vec::new()
        }
    };

    for folder in &folders {
        let bar = ui::folder_progress(&folder.name);
        sync_folder(source, dest, &folder.name, log, &bar).await;
        bar.finish();
    }

    RunState::Completed
}

/// Acquire both sessions, run the sync, and release the sessions
///
/// Session acquisition failure on either side aborts the run with no
/// mutations performed; a source session already acquired when the
/// destination fails is logged out before the abort. Both sessions are
/// released exactly once at run end.
pub async fn run(config: &SyncConfig, assume_yes: bool) -> AppResult<(RunState, SyncLog)> {
    info!(host = %config.source.host, user = %config.source.user, "connecting to source");
    let source_session = imap::connect_authenticated(config, &config.source).await?;

    info!(host = %config.destination.host, user = %config.destination.user, "connecting to destination");
    let dest_session = match imap::connect_authenticated(config, &config.destination).await {
        Ok(session) => session,
        Err(e) => {
            // the already-acquired source session is released before aborting
            let mut source = ImapStore::new(config.clone(), source_session);
            if let Err(logout_err) = source.logout().await {
                warn!(error = %logout_err, "source logout failed after setup failure");
            }
            return Err(e);
        }
    };

    let mut source = ImapStore::new(config.clone(), source_session);
    let mut dest = ImapStore::new(config.clone(), dest_session);
    let mut log = SyncLog::new();

    let state = execute(
        &mut source,
        &mut dest,
        |source_report, dest_report| {
            ui::render_mailbox_report("Source mailbox statistics", source_report);
            ui::render_mailbox_report("Destination mailbox statistics", dest_report);
            assume_yes || ui::confirm("Do you want to proceed with syncing?").unwrap_or(false)
        },
        &mut log,
    )
    .await;

    for (account, store) in [("source", &mut source), ("destination", &mut dest)] {
        if let Err(e) = store.logout().await {
            warn!(account, error = %e, "logout failed");
        }
    }

    Ok((state, log))
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressBar;

    use super::{ensure_folder, execute, sync_folder};
    use crate::models::{RunState, SyncEvent, SyncLog};
    use crate::store::mock::MockStore;

    fn transferred_uids(log: &SyncLog) -> Vec<u32> {
        log.events
            .iter()
            .filter_map(|e| match e {
                SyncEvent::Transferred { uid, .. } => Some(*uid),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn copies_every_message_byte_for_byte() {
        let mut source =
            MockStore::new().with_folder("INBOX", &[b"From: a\r\n\r\none", b"From: b\r\n\r\ntwo"]);
        let mut dest = MockStore::new().with_folder("INBOX", &[]);
        let mut log = SyncLog::new();
        let bar = ProgressBar::hidden();

        sync_folder(&mut source, &mut dest, "INBOX", &mut log, &bar).await;

        assert_eq!(dest.bodies("INBOX"), source.bodies("INBOX"));
        assert_eq!(log.transferred(), 2);
        assert_eq!(log.failed(), 0);
        assert_eq!(bar.position(), 2);
        assert_eq!(bar.length(), Some(2));
    }

    #[tokio::test]
    async fn empty_folder_is_a_trivial_success() {
        let mut source = MockStore::new().with_folder("Sent", &[]);
        let mut dest = MockStore::new();
        let mut log = SyncLog::new();
        let bar = ProgressBar::hidden();

        sync_folder(&mut source, &mut dest, "Sent", &mut log, &bar).await;

        assert_eq!(log.failed(), 0);
        assert_eq!(log.transferred(), 0);
        assert_eq!(bar.position(), 0);
        assert!(
            log.events
                .iter()
                .any(|e| matches!(e, SyncEvent::FolderStarted { total: 0, .. }))
        );
        assert!(dest.bodies("Sent").is_empty());
    }

    #[tokio::test]
    async fn creation_failure_is_harmless_when_folder_already_exists() {
        let mut source = MockStore::new().with_folder("INBOX", &[b"hello"]);
        let mut dest = MockStore::new();
        // exists server-side but missing from LIST, so creation is attempted and fails
        dest.hidden_folders.insert("INBOX".to_owned());
        dest.fail_create = true;
        let mut log = SyncLog::new();
        let bar = ProgressBar::hidden();

        sync_folder(&mut source, &mut dest, "INBOX", &mut log, &bar).await;

        assert_eq!(dest.create_calls, 1);
        assert_eq!(log.transferred(), 1);
        assert_eq!(log.failed(), 0);
        assert_eq!(dest.bodies("INBOX"), vec![b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn one_fetch_failure_does_not_abort_the_folder() {
        let mut source = MockStore::new().with_folder("INBOX", &[b"one", b"two", b"three"]);
        source.fail_fetch.insert(2);
        let mut dest = MockStore::new().with_folder("INBOX", &[]);
        let mut log = SyncLog::new();
        let bar = ProgressBar::hidden();

        sync_folder(&mut source, &mut dest, "INBOX", &mut log, &bar).await;

        assert_eq!(log.transferred(), 2);
        assert_eq!(log.failed(), 1);
        // the failure point does not stop later UIDs, and order is preserved
        assert_eq!(transferred_uids(&log), vec![1, 3]);
        assert_eq!(dest.bodies("INBOX"), vec![b"one".to_vec(), b"three".to_vec()]);
    }

    #[tokio::test]
    async fn select_failure_aborts_only_that_folder() {
        let mut source = MockStore::new()
            .with_folder("Broken", &[b"unreachable"])
            .with_folder("INBOX", &[b"hello"]);
        source.fail_select.insert("Broken".to_owned());
        let mut dest = MockStore::new();
        let mut log = SyncLog::new();

        let state = execute(&mut source, &mut dest, |_, _| true, &mut log).await;

        assert_eq!(state, RunState::Completed);
        assert_eq!(log.transferred(), 1);
        assert_eq!(
            log.events
                .iter()
                .filter(|e| matches!(e, SyncEvent::FolderFailed { folder, .. } if folder == "Broken"))
                .count(),
            1
        );
        assert_eq!(dest.bodies("INBOX"), vec![b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn declined_gate_performs_zero_mutations() {
        let mut source = MockStore::new().with_folder("INBOX", &[b"hello"]);
        let mut dest = MockStore::new();
        let mut log = SyncLog::new();

        let state = execute(&mut source, &mut dest, |_, _| false, &mut log).await;

        assert_eq!(state, RunState::Cancelled);
        assert_eq!(dest.append_calls, 0);
        assert_eq!(dest.create_calls, 0);
        assert!(log.events.is_empty());
    }

    #[tokio::test]
    async fn full_run_mirrors_both_folders_and_logs_every_transfer() {
        let mut source = MockStore::new()
            .with_folder("INBOX", &[&[b'a'; 100], &[b'b'; 200]])
            .with_folder("Archive", &[&[b'c'; 50]]);
        let mut dest = MockStore::new();
        let mut log = SyncLog::new();

        let state = execute(&mut source, &mut dest, |_, _| true, &mut log).await;

        assert_eq!(state, RunState::Completed);
        assert_eq!(dest.bodies("INBOX"), source.bodies("INBOX"));
        assert_eq!(dest.bodies("Archive"), source.bodies("Archive"));
        assert_eq!(log.transferred(), 3);
        assert_eq!(log.failed(), 0);
        assert_eq!(
            log.events
                .iter()
                .filter(|e| matches!(e, SyncEvent::FolderStarted { .. }))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn ensure_folder_creates_once_and_is_idempotent() {
        let mut dest = MockStore::new();
        dest.folders.push("Existing".to_owned());

        ensure_folder(&mut dest, "Existing").await;
        assert_eq!(dest.create_calls, 0);

        ensure_folder(&mut dest, "Fresh").await;
        ensure_folder(&mut dest, "Fresh").await;
        assert_eq!(dest.create_calls, 1);
    }
}
