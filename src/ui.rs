//! Terminal rendering and the operator confirmation gate
//!
//! All interactive output goes to stderr, leaving stdout clean. Folder names
//! arrive in IMAP modified UTF-7 and are decoded for display only; protocol
//! calls always use the wire name.

use std::io::{self, BufRead, Write};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use utf7_imap::decode_utf7_imap;

use crate::models::{MailboxReport, SyncEvent, SyncLog};

/// Render one mailbox's folder statistics table
///
/// Per-folder sizes in KB, mailbox total in MB, matching the scale operators
/// expect for whole-account migrations.
pub fn render_mailbox_report(title: &str, report: &MailboxReport) {
    eprintln!("{}", style(title).cyan().bold());
    if report.folders.is_empty() {
        eprintln!("  {}", style("no folders found").red());
        return;
    }
    for stats in &report.folders {
        eprintln!(
            "  {}: {} emails, {:.2} KB",
            style(display_name(&stats.folder)).green(),
            stats.messages,
            stats.total_bytes as f64 / 1024.0
        );
    }
    eprintln!(
        "{} {} emails, {:.2} MB\n",
        style("Total:").bold(),
        report.total_messages(),
        report.total_bytes() as f64 / (1024.0 * 1024.0)
    );
}

/// Ask a yes/no question on stderr, reading the answer from stdin
///
/// Defaults to "no": an empty answer, an unrecognized answer, or a closed
/// stdin (non-interactive invocation) all decline.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    eprint!("{prompt} [y/N] ");
    io::stderr().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let input = input.trim().to_ascii_lowercase();
    Ok(input == "y" || input == "yes")
}

/// Build the per-folder transfer progress bar
///
/// Length is set by the transfer engine once the folder's message total is
/// known. The bar draws to stderr and is a no-op when stderr is not a
/// terminal.
pub fn folder_progress(folder: &str) -> ProgressBar {
    let bar_style = ProgressStyle::with_template(
        "{prefix:.bold} {bar:40.green} {pos}/{len} {eta}",
    )
    .unwrap()
    .progress_chars("=> ");
    let bar = ProgressBar::new(0);
    bar.set_style(bar_style);
    bar.set_prefix(format!("Syncing {}", display_name(folder)));
    bar
}

/// Print the accumulated run log in chronological order, then a summary line
pub fn render_run_log(log: &SyncLog) {
    if !log.events.is_empty() {
        eprintln!("\n{}", style("Run log").cyan().bold());
        for event in &log.events {
            match event {
                SyncEvent::MessageFailed { .. } | SyncEvent::FolderFailed { .. } => {
                    eprintln!("  {}", style(event).red());
                }
                _ => eprintln!("  {event}"),
            }
        }
    }
    eprintln!(
        "\n{} {} transferred, {} failed",
        style("Summary:").bold(),
        log.transferred(),
        log.failed()
    );
}

/// Final line for a completed run
pub fn render_completed() {
    eprintln!("{}", style("Sync process completed.").green().bold());
}

/// Final line for an operator-declined run
pub fn render_cancelled() {
    eprintln!("{}", style("Sync cancelled.").yellow());
}

/// Decode an IMAP modified UTF-7 folder name for display
fn display_name(folder: &str) -> String {
    decode_utf7_imap(folder.to_owned())
}
