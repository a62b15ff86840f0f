//! Mailbox session abstraction
//!
//! `MailStore` is the seam between the sync engine and the IMAP transport:
//! the engine only needs folder listing, selection, unfiltered search, raw
//! fetch, append, create, and logout. The production implementation wraps an
//! authenticated session and delegates to the timeout-bounded wrappers in
//! [`crate::imap`]; tests substitute an in-memory store with per-operation
//! failure injection.

use async_trait::async_trait;
use tracing::debug;

use crate::config::SyncConfig;
use crate::errors::AppResult;
use crate::imap::{self, ImapSession};
use crate::models::FolderInfo;

/// Operations the sync engine requires from one mailbox account
///
/// One store is used by exactly one logical actor at a time; all methods
/// take `&mut self` because IMAP sessions are stateful (folder selection).
#[async_trait]
pub trait MailStore {
    /// List all folders, in the order the server reports them
    async fn list_folders(&mut self) -> AppResult<Vec<FolderInfo>>;

    /// Select a folder without mutating it (EXAMINE)
    async fn select_folder_readonly(&mut self, folder: &str) -> AppResult<()>;

    /// Select a folder for writing (SELECT)
    async fn select_folder_readwrite(&mut self, folder: &str) -> AppResult<()>;

    /// All message UIDs in the selected folder, ascending
    async fn search_all(&mut self) -> AppResult<Vec<u32>>;

    /// Full raw RFC822 bytes of one message in the selected folder
    async fn fetch_raw(&mut self, uid: u32) -> AppResult<Vec<u8>>;

    /// Append a raw message to the named folder
    async fn append(&mut self, folder: &str, content: &[u8]) -> AppResult<()>;

    /// Create the named folder
    async fn create_folder(&mut self, folder: &str) -> AppResult<()>;

    /// Log out and release the session
    async fn logout(&mut self) -> AppResult<()>;
}

/// Production store over an authenticated TLS IMAP session
pub struct ImapStore {
    config: SyncConfig,
    session: ImapSession,
}

impl ImapStore {
    /// Wrap an authenticated session
    pub fn new(config: SyncConfig, session: ImapSession) -> Self {
        Self { config, session }
    }
}

#[async_trait]
impl MailStore for ImapStore {
    async fn list_folders(&mut self) -> AppResult<Vec<FolderInfo>> {
        let items = imap::list_all_mailboxes(&self.config, &mut self.session).await?;
        let folders = items
            .into_iter()
            .map(|item| FolderInfo {
                name: item.name().to_owned(),
                delimiter: item.delimiter().map(|d| d.to_string()),
                attributes: item
                    .attributes()
                    .iter()
                    .map(|attr| format!("{attr:?}"))
                    .collect(),
            })
            .collect::<Vec<_>>();
        debug!(count = folders.len(), "listed folders");
        Ok(folders)
    }

    async fn select_folder_readonly(&mut self, folder: &str) -> AppResult<()> {
        let mailbox =
            imap::select_mailbox_readonly(&self.config, &mut self.session, folder).await?;
        debug!(folder, exists = mailbox.exists, "examined folder");
        Ok(())
    }

    async fn select_folder_readwrite(&mut self, folder: &str) -> AppResult<()> {
        let mailbox =
            imap::select_mailbox_readwrite(&self.config, &mut self.session, folder).await?;
        debug!(folder, exists = mailbox.exists, "selected folder");
        Ok(())
    }

    async fn search_all(&mut self) -> AppResult<Vec<u32>> {
        imap::uid_search_all(&self.config, &mut self.session).await
    }

    async fn fetch_raw(&mut self, uid: u32) -> AppResult<Vec<u8>> {
        imap::fetch_raw_message(&self.config, &mut self.session, uid).await
    }

    async fn append(&mut self, folder: &str, content: &[u8]) -> AppResult<()> {
        imap::append(&self.config, &mut self.session, folder, content).await
    }

    async fn create_folder(&mut self, folder: &str) -> AppResult<()> {
        imap::create_mailbox(&self.config, &mut self.session, folder).await
    }

    async fn logout(&mut self) -> AppResult<()> {
        imap::logout(&self.config, &mut self.session).await
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory store with per-operation failure injection

    use std::collections::{BTreeMap, HashSet};

    use async_trait::async_trait;

    use crate::errors::{AppError, AppResult};
    use crate::models::FolderInfo;

    use super::MailStore;

    /// Configurable in-memory mailbox for engine tests
    ///
    /// Folder order is preserved as inserted. `hidden_folders` models folders
    /// that exist server-side (selectable, appendable) but are missing from
    /// the LIST response, which is how a creation failure against an
    /// already-existing folder is exercised.
    #[derive(Debug, Default)]
    pub struct MockStore {
        pub folders: Vec<String>,
        pub hidden_folders: HashSet<String>,
        pub messages: BTreeMap<String, Vec<(u32, Vec<u8>)>>,
        selected: Option<String>,
        pub fail_list: bool,
        pub fail_select: HashSet<String>,
        pub fail_fetch: HashSet<u32>,
        pub fail_append: bool,
        pub fail_create: bool,
        pub append_calls: usize,
        pub create_calls: usize,
        pub logged_out: bool,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a folder preloaded with messages, UIDs assigned 1..=N
        pub fn with_folder(mut self, name: &str, bodies: &[&[u8]]) -> Self {
            self.folders.push(name.to_owned());
            let entries = bodies
                .iter()
                .enumerate()
                .map(|(i, body)| (i as u32 + 1, body.to_vec()))
                .collect();
            self.messages.insert(name.to_owned(), entries);
            self
        }

        /// Raw message bodies currently held in a folder
        pub fn bodies(&self, folder: &str) -> Vec<Vec<u8>> {
            self.messages
                .get(folder)
                .map(|entries| entries.iter().map(|(_, body)| body.clone()).collect())
                .unwrap_or_default()
        }

        fn exists(&self, folder: &str) -> bool {
            self.folders.iter().any(|f| f == folder) || self.hidden_folders.contains(folder)
        }
    }

    #[async_trait]
    impl MailStore for MockStore {
        async fn list_folders(&mut self) -> AppResult<Vec<FolderInfo>> {
            if self.fail_list {
                return Err(AppError::Internal("LIST failed".to_owned()));
            }
            Ok(self
                .folders
                .iter()
                .map(|name| FolderInfo {
                    name: name.clone(),
                    delimiter: Some("/".to_owned()),
                    attributes: Vec::new(),
                })
                .collect())
        }

        async fn select_folder_readonly(&mut self, folder: &str) -> AppResult<()> {
            self.select_folder_readwrite(folder).await
        }

        async fn select_folder_readwrite(&mut self, folder: &str) -> AppResult<()> {
            if self.fail_select.contains(folder) || !self.exists(folder) {
                return Err(AppError::NotFound(format!(
                    "cannot select mailbox '{folder}'"
                )));
            }
            self.selected = Some(folder.to_owned());
            Ok(())
        }

        async fn search_all(&mut self) -> AppResult<Vec<u32>> {
            let folder = self
                .selected
                .as_ref()
                .ok_or_else(|| AppError::Internal("no folder selected".to_owned()))?;
            Ok(self
                .messages
                .get(folder)
                .map(|entries| entries.iter().map(|(uid, _)| *uid).collect())
                .unwrap_or_default())
        }

        async fn fetch_raw(&mut self, uid: u32) -> AppResult<Vec<u8>> {
            if self.fail_fetch.contains(&uid) {
                return Err(AppError::Internal(format!("injected fetch failure for uid {uid}")));
            }
            let folder = self
                .selected
                .as_ref()
                .ok_or_else(|| AppError::Internal("no folder selected".to_owned()))?;
            self.messages
                .get(folder)
                .and_then(|entries| entries.iter().find(|(u, _)| *u == uid))
                .map(|(_, body)| body.clone())
                .ok_or_else(|| AppError::NotFound(format!("message uid {uid} not found")))
        }

        async fn append(&mut self, folder: &str, content: &[u8]) -> AppResult<()> {
            self.append_calls += 1;
            if self.fail_append {
                return Err(AppError::Internal("injected append failure".to_owned()));
            }
            if !self.exists(folder) {
                return Err(AppError::NotFound(format!("no such mailbox '{folder}'")));
            }
            let entries = self.messages.entry(folder.to_owned()).or_default();
            let uid = entries.len() as u32 + 1;
            entries.push((uid, content.to_vec()));
            Ok(())
        }

        async fn create_folder(&mut self, folder: &str) -> AppResult<()> {
            self.create_calls += 1;
            if self.fail_create {
                return Err(AppError::Internal("injected create failure".to_owned()));
            }
            self.folders.push(folder.to_owned());
            self.messages.entry(folder.to_owned()).or_default();
            Ok(())
        }

        async fn logout(&mut self) -> AppResult<()> {
            self.logged_out = true;
            Ok(())
        }
    }
}
