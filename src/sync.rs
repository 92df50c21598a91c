use crate::db::Database;
use crate::decode;
use crate::error::{Error, Result};
use crate::imap::Mailbox;
use crate::models::{MessageId, NewRecord};
use tracing::{debug, info, warn};

/// A message that was listed but not stored.
#[derive(Debug)]
pub struct MessageFailure {
    pub id: MessageId,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub folder: String,
    pub listed: usize,
    /// Ids assigned by the store, in insertion order.
    pub stored: Vec<i64>,
    pub failures: Vec<MessageFailure>,
}

/// How a sync attempt ended from the caller's point of view.
#[derive(Debug)]
pub enum SyncOutcome {
    Completed(SyncSummary),
    /// The run never started or stopped early. Records stored before the stop stay.
    Abandoned(Error),
}

impl SyncOutcome {
    /// Connection and folder failures become `Abandoned` so the caller can
    /// still show the offline view. Store failures are returned as errors.
    pub fn settle(result: Result<SyncSummary>) -> Result<Self> {
        match result {
            Ok(summary) => Ok(SyncOutcome::Completed(summary)),
            Err(e @ Error::Store(_)) => Err(e),
            Err(e) => Ok(SyncOutcome::Abandoned(e)),
        }
    }

    /// Lines printed to the operator before the offline view.
    pub fn report(&self) -> Vec<String> {
        match self {
            SyncOutcome::Completed(summary) => {
                let mut lines = vec!["Emails fetched and stored successfully!".to_string()];
                if !summary.failures.is_empty() {
                    lines.push(format!(
                        "{} of {} messages in {} could not be stored.",
                        summary.failures.len(),
                        summary.listed,
                        summary.folder
                    ));
                    lines.extend(
                        summary
                            .failures
                            .iter()
                            .map(|f| format!("  message {}: {}", f.id, f.error)),
                    );
                }
                lines
            }
            SyncOutcome::Abandoned(e @ Error::Authentication(_)) => {
                vec![format!("Error connecting to the mailbox: {}", e)]
            }
            SyncOutcome::Abandoned(e) => vec![format!("Sync stopped: {}", e)],
        }
    }
}

pub struct Syncer<'a> {
    db: &'a Database,
    folder: String,
}

impl<'a> Syncer<'a> {
    pub fn new(db: &'a Database, folder: impl Into<String>) -> Self {
        Self {
            db,
            folder: folder.into(),
        }
    }

    /// Copies every message in the folder into the store.
    ///
    /// Takes ownership of an open mailbox and closes it before returning,
    /// whether the run finished or stopped on a fatal error. A message that
    /// cannot be fetched or decoded is recorded in the summary and skipped.
    /// Listing and store failures end the run.
    pub async fn run<M: Mailbox>(&self, mut mailbox: M) -> Result<SyncSummary> {
        let outcome = self.copy_all(&mut mailbox).await;

        if let Err(e) = mailbox.close().await {
            warn!("closing the mailbox failed: {}", e);
        }

        let summary = outcome?;
        info!(
            folder = %summary.folder,
            listed = summary.listed,
            stored = summary.stored.len(),
            failed = summary.failures.len(),
            "sync finished"
        );
        Ok(summary)
    }

    async fn copy_all<M: Mailbox>(&self, mailbox: &mut M) -> Result<SyncSummary> {
        let ids = mailbox.list_all(&self.folder).await?;
        info!("{} messages in {}", ids.len(), self.folder);

        let mut summary = SyncSummary {
            folder: self.folder.clone(),
            listed: ids.len(),
            ..Default::default()
        };

        for id in ids {
            match Self::fetch_one(mailbox, id).await {
                Ok(record) => {
                    let row_id = self.db.insert(&record).await?;
                    debug!("message {} stored as row {}", id, row_id);
                    summary.stored.push(row_id);
                }
                Err(error) => {
                    warn!("skipping message {}: {}", id, error);
                    summary.failures.push(MessageFailure { id, error });
                }
            }
        }

        Ok(summary)
    }

    async fn fetch_one<M: Mailbox>(mailbox: &mut M, id: MessageId) -> Result<NewRecord> {
        let raw = mailbox.fetch_raw(id).await?;
        decode::decode(&raw)
    }
}
