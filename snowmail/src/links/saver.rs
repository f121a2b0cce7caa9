//! Sequential link saving with per-link failure reporting.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::clients::BookmarkStore;
use crate::types::LinkCandidate;

/// One link the bookmark service refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveFailure {
    pub url: String,
    pub error: String,
}

/// Result of a batch save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: Vec<SaveFailure>,
}

#[derive(Clone)]
pub struct LinkSaver {
    store: Arc<dyn BookmarkStore>,
}

impl LinkSaver {
    pub fn new(store: Arc<dyn BookmarkStore>) -> Self {
        Self { store }
    }

    /// Save every link, one at a time. A failure is recorded and the batch continues.
    pub async fn save_all(&self, links: &[LinkCandidate]) -> SaveReport {
        let mut report = SaveReport::default();

        for link in links {
            match self.store.add(link).await {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    warn!(url = %link.url, error = %e, "link_save_failed");
                    report.failed.push(SaveFailure {
                        url: link.url.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            requested = links.len(),
            saved = report.saved,
            failed = report.failed.len(),
            "link_save_complete"
        );

        report
    }
}
