use std::collections::VecDeque;
use std::fmt;

use crate::domain::FolderKey;
use crate::opml::Outline;
use crate::store::Store;
use crate::sync::SyncEngine;

/// Counts from an OPML import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub folders: usize,
    pub added: usize,
    pub duplicated: usize,
    /// Feeds that could not be fetched, decoded or stored.
    pub failed: usize,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} already subscribed, {} failed, {} folders created",
            self.added, self.duplicated, self.failed, self.folders
        )
    }
}

impl<S: Store> SyncEngine<S> {
    /// Recreate an outline tree under `target`, subscribing every feed in it.
    ///
    /// A feed that fails is counted and skipped. A folder that cannot be
    /// created takes its whole subtree with it.
    pub async fn import_outlines(
        &self,
        owner: &str,
        outlines: Vec<Outline>,
        target: FolderKey,
    ) -> ImportReport {
        let mut report = ImportReport::default();
        let mut pending: VecDeque<(FolderKey, Outline)> =
            outlines.into_iter().map(|o| (target, o)).collect();

        while let Some((parent, outline)) = pending.pop_front() {
            match outline {
                Outline::Folder { title, children } => {
                    match self.registry().register_folder(owner, &title, false, Some(parent)) {
                        Ok(key) => {
                            report.folders += 1;
                            pending.extend(children.into_iter().map(|c| (key, c)));
                        }
                        Err(e) => {
                            tracing::warn!(%parent, title = %title, error = %e, "failed to create folder");
                            report.failed += count_feeds(&children);
                        }
                    }
                }
                Outline::Feed {
                    title,
                    xml_url,
                    html_url,
                } => {
                    let result = self
                        .subscribe_with(
                            owner,
                            &xml_url,
                            parent,
                            Some(title.as_str()).filter(|t| !t.is_empty()),
                            html_url.as_deref(),
                        )
                        .await;
                    match result {
                        Ok(Some(reg)) if reg.duplicated => report.duplicated += 1,
                        Ok(Some(_)) => report.added += 1,
                        Ok(None) => {
                            tracing::warn!(url = %xml_url, "not a feed, skipped");
                            report.failed += 1;
                        }
                        Err(e) => {
                            tracing::warn!(url = %xml_url, error = %e, "failed to import feed");
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        tracing::info!(
            owner,
            added = report.added,
            duplicated = report.duplicated,
            failed = report.failed,
            "import finished"
        );
        report
    }
}

fn count_feeds(outlines: &[Outline]) -> usize {
    let mut count = 0;
    let mut pending: Vec<&Outline> = outlines.iter().collect();
    while let Some(outline) = pending.pop() {
        match outline {
            Outline::Feed { .. } => count += 1,
            Outline::Folder { children, .. } => pending.extend(children.iter()),
        }
    }
    count
}
