//! # Sync Services
//!
//! Pull-based intake. Each [`MessageSource`] is asked for everything after
//! a resume position, and every payload it returns goes through the same
//! [`MessagePipeline`] as live intake. Content hashing makes overlap between
//! sources, and between sync and live intake, harmless.
//!
//! ## Resume positions
//!
//! A source answers each fetch with a [`SourceBatch`] whose `cursor` is a
//! position on the source's own clock. That cursor is kept per source and
//! handed back on the next pass. Until a source has returned one (the first
//! pass after start), the fallback is the local receive time of the newest
//! stored message from that source. Local receive time is never earlier than
//! the remote send time of anything already stored, so under clock skew the
//! fallback can skip remote messages sent just before it; sources that need
//! exact resumption must return a cursor.
//!
//! A failing source is logged and skipped; the others still run. Its cursor
//! is left untouched.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use vera_core::Timestamp;

use crate::error::MessageError;
use crate::events::MessageEvent;
use crate::message::{MessageMeta, RawMessage};
use crate::pipeline::{IngestOutcome, MessagePipeline};
use crate::store::SourceTimestamp;

/// A remote place messages can be fetched from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Transport kind recorded in provenance.
    fn source_type(&self) -> &str;

    /// Transport origin recorded in provenance.
    fn source_id(&self) -> &str;

    /// Connect or warm up. Called once by [`SyncServices::start`].
    async fn start(&self) -> Result<(), MessageError> {
        Ok(())
    }

    /// Raw payloads after `since`, or everything when `None`.
    ///
    /// `since` is the cursor this source returned last time, or the local
    /// fallback described in the module docs.
    async fn fetch_since(&self, since: Option<Timestamp>) -> Result<SourceBatch, MessageError>;
}

/// One answer from a [`MessageSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBatch {
    /// Raw payloads, in any order.
    pub payloads: Vec<String>,
    /// Where the next fetch should resume, on the source's clock. `None`
    /// keeps the previous position.
    pub cursor: Option<Timestamp>,
}

impl SourceBatch {
    /// Payloads without a cursor.
    pub fn new(payloads: Vec<String>) -> Self {
        Self {
            payloads,
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Timestamp) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

/// Tally of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Payloads fetched across all sources.
    pub fetched: usize,
    /// Newly validated.
    pub validated: usize,
    /// Already known.
    pub duplicates: usize,
    /// Refused by validation.
    pub rejected: usize,
    /// Sources or messages that could not be processed.
    pub failed: usize,
}

/// Runs every registered [`MessageSource`] through the pipeline.
pub struct SyncServices {
    sources: Vec<Arc<dyn MessageSource>>,
    pipeline: Arc<MessagePipeline>,
    cursors: Mutex<HashMap<String, Timestamp>>,
}

impl SyncServices {
    /// No sources yet.
    pub fn new(pipeline: Arc<MessagePipeline>) -> Self {
        Self {
            sources: Vec::new(),
            pipeline,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// Add a source.
    pub fn with_source(mut self, source: Arc<dyn MessageSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether there are no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Start every source. Stops at the first failure.
    pub async fn start(&self) -> Result<(), MessageError> {
        for source in &self.sources {
            source.start().await.map_err(|e| MessageError::Source {
                name: label(source.as_ref()),
                reason: e.to_string(),
            })?;
            tracing::info!(source = %label(source.as_ref()), "message source started");
        }
        Ok(())
    }

    /// Cursor last returned by the source labelled `type:id`.
    pub fn cursor(&self, source: &str) -> Option<Timestamp> {
        self.cursors.lock().get(source).copied()
    }

    /// One pass over every source.
    ///
    /// Each source resumes from its own cursor; `latest` (local receive
    /// times) is consulted only for sources that have not returned one yet.
    pub async fn sync(&self, latest: &[SourceTimestamp]) -> SyncReport {
        let mut report = SyncReport::default();
        for source in &self.sources {
            let name = label(source.as_ref());
            let since = self.cursor(&name).or_else(|| {
                latest
                    .iter()
                    .find(|l| {
                        l.source_type == source.source_type()
                            && l.source_id.as_deref() == Some(source.source_id())
                    })
                    .map(|l| l.timestamp)
            });

            let SourceBatch { payloads, cursor } = match source.fetch_since(since).await {
                Ok(batch) => batch,
                Err(error) => {
                    tracing::warn!(source = %name, %error, "message source fetch failed");
                    report.failed += 1;
                    continue;
                }
            };

            let fetched = payloads.len();
            report.fetched += fetched;
            for raw in payloads {
                let meta = MessageMeta::new(source.source_type(), source.source_id());
                match self.pipeline.process(RawMessage::new(raw, meta)).await {
                    IngestOutcome::Validated { dispatch, .. } => {
                        let outcome = dispatch.wait().await;
                        if outcome.is_success() {
                            report.validated += 1;
                        } else {
                            report.failed += 1;
                        }
                    }
                    IngestOutcome::Duplicate { .. } => report.duplicates += 1,
                    IngestOutcome::Rejected { .. } => report.rejected += 1,
                    IngestOutcome::Failed { .. } => report.failed += 1,
                }
            }

            if let Some(cursor) = cursor {
                self.cursors.lock().insert(name.clone(), cursor);
            }
            tracing::info!(source = %name, fetched, since = ?since.map(|t| t.unix()), "source synced");
            self.pipeline
                .bus()
                .emit(MessageEvent::SyncCompleted { source: name, fetched });
        }
        report
    }

    /// Read fallback positions from the pipeline's store, then [`sync`](Self::sync).
    pub async fn sync_from_store(&self) -> Result<SyncReport, MessageError> {
        let latest = self.pipeline.store().latest_message_timestamps().await?;
        Ok(self.sync(&latest).await)
    }
}

impl std::fmt::Debug for SyncServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.sources.iter().map(|s| label(s.as_ref())).collect();
        f.debug_struct("SyncServices").field("sources", &names).finish()
    }
}

fn label(source: &dyn MessageSource) -> String {
    format!("{}:{}", source.source_type(), source.source_id())
}
