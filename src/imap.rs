//! IMAP transport and session operations
//!
//! Provides timeout-bounded wrappers around `async-imap` operations. All network
//! calls are enforced to use TLS, and timeouts are derived from the run config.

use std::sync::Arc;
use std::time::Duration;

use async_imap::types::{Fetch, Mailbox};
use async_imap::{Client, Session};
use futures::TryStreamExt;
use rustls::ClientConfig;
use rustls::RootCertStore;
use rustls_pki_types::ServerName;
use secrecy::ExposeSecret;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use crate::config::{AccountConfig, SyncConfig};
use crate::errors::{AppError, AppResult};

/// Type alias for authenticated IMAP session over TLS
///
/// Wraps the TLS stream type to simplify signatures throughout the codebase.
pub type ImapSession = Session<tokio_rustls::client::TlsStream<TcpStream>>;

/// Get socket timeout duration from run config
///
/// Helper to avoid repeatedly accessing the config field.
fn socket_timeout(config: &SyncConfig) -> Duration {
    Duration::from_millis(config.socket_timeout_ms)
}

/// Connect to IMAP server and authenticate
///
/// Performs full connection sequence with timeouts:
/// 1. TCP connect
/// 2. TLS handshake with system root certificates
/// 3. Read IMAP greeting
/// 4. LOGIN authentication
///
/// # Security
///
/// Rejects insecure connections (`secure: false`) to prevent password exposure.
///
/// # Timeouts
///
/// - TCP connect: `connect_timeout_ms`
/// - TLS handshake: `greeting_timeout_ms`
/// - Greeting read: `greeting_timeout_ms`
/// - LOGIN: `greeting_timeout_ms`
///
/// # Errors
///
/// - `InvalidInput` if `secure` is false or hostname is invalid for TLS SNI
/// - `Timeout` if any connection phase times out
/// - `AuthFailed` if authentication fails
/// - `Internal` for TCP, TLS, or greeting failures
pub async fn connect_authenticated(
    config: &SyncConfig,
    account: &AccountConfig,
) -> AppResult<ImapSession> {
    if !account.secure {
        return Err(AppError::InvalidInput(format!(
            "insecure IMAP is not supported; set MAIL_SYNC_{}_SECURE=true",
            if account.role == "source" { "SOURCE" } else { "DEST" }
        )));
    }

    let connect_duration = Duration::from_millis(config.connect_timeout_ms);
    let greeting_duration = Duration::from_millis(config.greeting_timeout_ms);

    let tcp = timeout(
        connect_duration,
        TcpStream::connect((account.host.as_str(), account.port)),
    )
    .await
    .map_err(|_| AppError::Timeout(format!("tcp connect timeout to {}", account.host)))
    .and_then(|r| r.map_err(|e| AppError::Internal(format!("tcp connect failed: {e}"))))?;

    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(tls_config));

    let server_name = ServerName::try_from(account.host.clone())
        .map_err(|_| AppError::InvalidInput("invalid IMAP host for TLS SNI".to_owned()))?;
    let tls_stream = timeout(greeting_duration, connector.connect(server_name, tcp))
        .await
        .map_err(|_| AppError::Timeout("TLS handshake timeout".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("TLS handshake failed: {e}"))))?;

    let mut client = Client::new(tls_stream);
    let greeting = timeout(greeting_duration, client.read_response())
        .await
        .map_err(|_| AppError::Timeout("IMAP greeting timeout".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("IMAP greeting failed: {e}"))))?;

    if greeting.is_none() {
        return Err(AppError::Internal(
            "IMAP server closed connection before greeting".to_owned(),
        ));
    }

    let pass = account.pass.expose_secret();
    let session = timeout(greeting_duration, client.login(account.user.as_str(), pass))
        .await
        .map_err(|_| AppError::Timeout("IMAP login timeout".to_owned()))
        .and_then(|r| {
            r.map_err(|(e, _)| {
                let msg = e.to_string();
                if msg.to_ascii_lowercase().contains("auth") || msg.contains("LOGIN") {
                    AppError::AuthFailed(msg)
                } else {
                    AppError::Internal(msg)
                }
            })
        })?;

    Ok(session)
}

/// List all visible mailboxes/folders
///
/// Returns the server's full mailbox list in the order the server reports it.
pub async fn list_all_mailboxes(
    config: &SyncConfig,
    session: &mut ImapSession,
) -> AppResult<Vec<async_imap::types::Name>> {
    let stream = timeout(socket_timeout(config), session.list(None, Some("*")))
        .await
        .map_err(|_| AppError::Timeout("LIST timed out".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("LIST failed: {e}"))))?;

    timeout(socket_timeout(config), stream.try_collect::<Vec<_>>())
        .await
        .map_err(|_| AppError::Timeout("LIST stream timed out".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("LIST stream failed: {e}"))))
}

/// Select mailbox in read-only mode
///
/// Uses `EXAMINE` command to fetch mailbox state without marking messages
/// as read or otherwise mutating the folder.
pub async fn select_mailbox_readonly(
    config: &SyncConfig,
    session: &mut ImapSession,
    mailbox: &str,
) -> AppResult<Mailbox> {
    timeout(socket_timeout(config), session.examine(mailbox))
        .await
        .map_err(|_| AppError::Timeout(format!("EXAMINE timed out for mailbox '{mailbox}'")))
        .and_then(|r| {
            r.map_err(|e| AppError::NotFound(format!("cannot examine mailbox '{mailbox}': {e}")))
        })
}

/// Select mailbox in read-write mode
///
/// Uses `SELECT` command to enable write operations (APPEND).
pub async fn select_mailbox_readwrite(
    config: &SyncConfig,
    session: &mut ImapSession,
    mailbox: &str,
) -> AppResult<Mailbox> {
    timeout(socket_timeout(config), session.select(mailbox))
        .await
        .map_err(|_| AppError::Timeout(format!("SELECT timed out for mailbox '{mailbox}'")))
        .and_then(|r| {
            r.map_err(|e| AppError::NotFound(format!("cannot select mailbox '{mailbox}': {e}")))
        })
}

/// Fetch a single message with custom query
///
/// Runs a `UID FETCH` for a specific UID and returns the first result.
///
/// # Errors
///
/// - `NotFound` if UID does not exist in mailbox
/// - `Timeout` or `Internal` for network/protocol errors
async fn fetch_one(
    config: &SyncConfig,
    session: &mut ImapSession,
    uid: u32,
    query: &str,
) -> AppResult<Fetch> {
    let stream = timeout(
        socket_timeout(config),
        session.uid_fetch(uid.to_string(), query),
    )
    .await
    .map_err(|_| AppError::Timeout("UID FETCH timed out".to_owned()))
    .and_then(|r| r.map_err(|e| AppError::Internal(format!("uid fetch failed: {e}"))))?;
    let fetches: Vec<Fetch> = timeout(socket_timeout(config), stream.try_collect())
        .await
        .map_err(|_| AppError::Timeout("UID FETCH stream timed out".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("uid fetch stream failed: {e}"))))?;

    fetches
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("message uid {uid} not found")))
}

/// Fetch full RFC822 message source
///
/// Returns raw bytes of the entire message. The content is treated as an
/// opaque unit; it is never parsed or mutated.
pub async fn fetch_raw_message(
    config: &SyncConfig,
    session: &mut ImapSession,
    uid: u32,
) -> AppResult<Vec<u8>> {
    let fetch = fetch_one(config, session, uid, "UID RFC822").await?;
    let body = fetch
        .body()
        .ok_or_else(|| AppError::Internal("message has no RFC822 body".to_owned()))?;
    Ok(body.to_vec())
}

/// Search for all message UIDs in the selected mailbox
///
/// Runs an unfiltered `UID SEARCH ALL`. The protocol library returns the
/// result as an unordered set, so the UIDs are restored to ascending order,
/// the order servers conventionally assign them in.
pub async fn uid_search_all(
    config: &SyncConfig,
    session: &mut ImapSession,
) -> AppResult<Vec<u32>> {
    let set = timeout(socket_timeout(config), session.uid_search("ALL"))
        .await
        .map_err(|_| AppError::Timeout("UID SEARCH timed out".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("uid search failed: {e}"))))?;
    let mut uids: Vec<u32> = set.into_iter().collect();
    uids.sort_unstable();
    Ok(uids)
}

/// Append raw RFC822 message to mailbox
///
/// Used for cross-account copy operations. Does not return the new UID
/// directly (would require `UIDPLUS` capability).
pub async fn append(
    config: &SyncConfig,
    session: &mut ImapSession,
    mailbox: &str,
    content: &[u8],
) -> AppResult<()> {
    timeout(
        socket_timeout(config),
        session.append(mailbox, None, None, content),
    )
    .await
    .map_err(|_| AppError::Timeout("APPEND timed out".to_owned()))
    .and_then(|r| r.map_err(|e| AppError::Internal(format!("APPEND failed: {e}"))))
}

/// Create a mailbox
///
/// Runs `CREATE` with the exact folder name. Fails if the folder already
/// exists; callers check the folder list first.
pub async fn create_mailbox(
    config: &SyncConfig,
    session: &mut ImapSession,
    mailbox: &str,
) -> AppResult<()> {
    timeout(socket_timeout(config), session.create(mailbox))
        .await
        .map_err(|_| AppError::Timeout(format!("CREATE timed out for mailbox '{mailbox}'")))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("CREATE failed: {e}"))))
}

/// Log out and close the session
///
/// Runs `LOGOUT`. Each session is released exactly once, at run end or on
/// fatal setup failure.
pub async fn logout(config: &SyncConfig, session: &mut ImapSession) -> AppResult<()> {
    timeout(socket_timeout(config), session.logout())
        .await
        .map_err(|_| AppError::Timeout("LOGOUT timed out".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("LOGOUT failed: {e}"))))
}
