//! Promotes scheduled posts to SUCCESS once their platform reports them live.
//!
//! A sweep looks only at SCHEDULED history rows. Every row is handled on
//! its own: a failing probe or write is logged and the sweep moves on.

use crate::core::content::{HistoryEntry, HistoryStatus, Platform, PostType, Records};
use crate::core::publishing::{PublishError, PublisherDirectory};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

/// One platform query that can confirm a post is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Video node `published == true`.
    PublishedFlag,
    /// A `permalink_url` is present.
    Permalink,
    /// Object-level `is_published == true`.
    IsPublished,
    /// `is_hidden == false`.
    NotHidden,
    /// YouTube `status.privacyStatus == "public"`.
    PublicPrivacy,
}

impl ProbeKind {
    pub fn fields(&self) -> &'static str {
        match self {
            ProbeKind::PublishedFlag => "published",
            ProbeKind::Permalink => "permalink_url",
            ProbeKind::IsPublished => "is_published",
            ProbeKind::NotHidden => "is_hidden",
            ProbeKind::PublicPrivacy => "status",
        }
    }

    pub fn confirms(&self, reply: &Value) -> bool {
        match self {
            ProbeKind::PublishedFlag => reply.get("published") == Some(&Value::Bool(true)),
            ProbeKind::Permalink => reply
                .get("permalink_url")
                .and_then(Value::as_str)
                .is_some_and(|link| !link.trim().is_empty()),
            ProbeKind::IsPublished => reply.get("is_published") == Some(&Value::Bool(true)),
            ProbeKind::NotHidden => reply.get("is_hidden") == Some(&Value::Bool(false)),
            ProbeKind::PublicPrivacy => {
                let video = reply
                    .get("items")
                    .and_then(|items| items.get(0))
                    .unwrap_or(reply);
                video
                    .get("status")
                    .and_then(|status| status.get("privacyStatus"))
                    .and_then(Value::as_str)
                    == Some("public")
            }
        }
    }
}

/// Probe order per platform and content type. The first confirming probe wins.
pub fn probes_for(platform: Platform, post_type: Option<PostType>) -> &'static [ProbeKind] {
    match (platform, post_type) {
        (Platform::Youtube, _) => &[ProbeKind::PublicPrivacy],
        (Platform::Facebook, Some(PostType::Video)) => {
            &[ProbeKind::PublishedFlag, ProbeKind::IsPublished]
        }
        (Platform::Facebook, Some(PostType::Reels)) => {
            &[ProbeKind::Permalink, ProbeKind::IsPublished]
        }
        (Platform::Facebook, _) => &[ProbeKind::IsPublished, ProbeKind::NotHidden],
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// True when another sweep was running and this one did nothing.
    pub skipped: bool,
    pub inspected: usize,
    pub promoted: usize,
    pub pending: usize,
    pub failed: usize,
}

enum Verdict {
    Live,
    NotYet,
    Unreachable(String),
}

pub struct StatusReconciler {
    records: Records,
    publishers: PublisherDirectory,
    sweep_lock: Mutex<()>,
}

impl StatusReconciler {
    pub fn new(records: Records, publishers: PublisherDirectory) -> Self {
        Self {
            records,
            publishers,
            sweep_lock: Mutex::new(()),
        }
    }

    /// Runs one sweep. Returns immediately (with `skipped`) if a sweep is
    /// already in progress.
    pub async fn reconcile_once(&self) -> SweepReport {
        let Ok(_guard) = self.sweep_lock.try_lock() else {
            tracing::debug!("Reconciliation sweep already running, skipping");
            return SweepReport {
                skipped: true,
                ..Default::default()
            };
        };

        let mut report = SweepReport::default();
        let history = match self.records.history().await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("Reconciliation could not read history: {}", e);
                report.failed += 1;
                return report;
            }
        };

        for (index, entry) in history.into_iter().enumerate() {
            if !entry.is_scheduled() {
                continue;
            }
            report.inspected += 1;

            match self.check(&entry).await {
                Ok(Verdict::Live) => {
                    let post_id = entry.post_id().unwrap_or_default().to_string();
                    let mut promoted = entry;
                    promoted.status = HistoryStatus::Success;
                    match self.records.update_history(index, promoted).await {
                        Ok(()) => {
                            tracing::info!(row = index, post_id = %post_id, "Scheduled post is live");
                            report.promoted += 1;
                        }
                        Err(e) => {
                            tracing::warn!(row = index, post_id = %post_id, "Could not promote post: {}", e);
                            report.failed += 1;
                        }
                    }
                }
                Ok(Verdict::NotYet) => report.pending += 1,
                Ok(Verdict::Unreachable(reason)) => {
                    tracing::warn!(row = index, "Every status probe failed: {}", reason);
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(row = index, "Skipping history row: {}", e);
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(
            inspected = report.inspected,
            promoted = report.promoted,
            failed = report.failed,
            "Reconciliation sweep finished"
        );
        report
    }

    async fn check(&self, entry: &HistoryEntry) -> Result<Verdict, PublishError> {
        let (publisher, post_id) = self.publishers.for_history(entry).await?;
        let probes = probes_for(publisher.platform(), entry.post_type());

        let mut errors = Vec::new();
        for probe in probes {
            match publisher.probe(&post_id, probe.fields()).await {
                Ok(reply) if probe.confirms(&reply) => return Ok(Verdict::Live),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(post_id = %post_id, probe = ?probe, "Probe failed: {}", e);
                    errors.push(e.to_string());
                }
            }
        }

        if errors.len() == probes.len() {
            Ok(Verdict::Unreachable(errors.join("; ")))
        } else {
            Ok(Verdict::NotYet)
        }
    }
}
