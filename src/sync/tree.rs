use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::Semaphore;

use crate::app::{CanopyError, Result};
use crate::domain::{ChildKey, FolderKey};
use crate::store::Store;
use crate::sync::SyncEngine;

pub const DEFAULT_WORKERS: usize = 10;

/// Outcome of [`TreeSynchronizer::update_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub roots: usize,
    /// Roots whose folder could not be read at all.
    pub failed_roots: usize,
    /// Direct children of the roots that synced successfully.
    pub children: usize,
    /// Entries held under all roots after the update.
    pub entries: usize,
}

impl fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} roots ({} failed), {} children synced, {} entries",
            self.roots, self.failed_roots, self.children, self.entries
        )
    }
}

/// Concurrent synchronization of whole folder trees.
///
/// Every child of a folder gets its own task and the folder waits for all of
/// them. Only feed syncs take a permit, so nested folders never hold one
/// while waiting on their children.
pub struct TreeSynchronizer<S> {
    engine: Arc<SyncEngine<S>>,
    semaphore: Arc<Semaphore>,
}

impl<S> Clone for TreeSynchronizer<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            semaphore: self.semaphore.clone(),
        }
    }
}

impl<S: Store + Send + Sync + 'static> TreeSynchronizer<S> {
    pub fn new(engine: Arc<SyncEngine<S>>) -> Self {
        Self::with_workers(engine, DEFAULT_WORKERS)
    }

    pub fn with_workers(engine: Arc<SyncEngine<S>>, workers: usize) -> Self {
        Self {
            engine,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine<S>> {
        &self.engine
    }

    /// Sync every child of `key` and report an entry count per child.
    ///
    /// A feed child maps to its entry count after the sync, a folder child to
    /// the entry count of its subtree. Children that fail are logged and left
    /// out of the map.
    pub fn update_folder(
        &self,
        key: FolderKey,
    ) -> BoxFuture<'static, Result<HashMap<ChildKey, usize>>> {
        let this = self.clone();
        async move {
            let children = this.engine.registry().folder(key)?.children;
            tracing::debug!(%key, children = children.len(), "updating folder");

            let mut handles = Vec::with_capacity(children.len());
            for child in children {
                let this = this.clone();
                let handle = tokio::spawn(async move { this.update_child(child).await });
                handles.push((child, handle));
            }

            let mut counts = HashMap::new();
            for (child, handle) in handles {
                match handle.await {
                    Ok(Ok(count)) => {
                        counts.insert(child, count);
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(folder = %key, %child, error = %e, "child update failed");
                    }
                    Err(e) => {
                        tracing::error!(folder = %key, %child, "Task join error: {}", e);
                    }
                }
            }

            Ok(counts)
        }
        .boxed()
    }

    async fn update_child(&self, child: ChildKey) -> Result<usize> {
        match child {
            ChildKey::Feed(key) => {
                let permit = self
                    .semaphore
                    .acquire()
                    .await
                    .map_err(|e| CanopyError::Other(e.to_string()))?;
                let result = self.engine.update_feed(key).await;
                drop(permit);

                result?;
                Ok(self.engine.registry().feed(key)?.entries.len())
            }
            ChildKey::Folder(key) => {
                self.update_folder(key).await?;
                self.engine.registry().entry_count(key)
            }
        }
    }

    /// Update the tree of every owner, one root after another.
    pub async fn update_all(&self) -> UpdateSummary {
        let mut summary = UpdateSummary::default();

        let roots = match self.engine.registry().root_folders() {
            Ok(roots) => roots,
            Err(e) => {
                tracing::error!(error = %e, "failed to list root folders");
                return summary;
            }
        };

        for root in roots {
            summary.roots += 1;
            match self.update_folder(root).await {
                Ok(counts) => {
                    summary.children += counts.len();
                    match self.engine.registry().entry_count(root) {
                        Ok(count) => summary.entries += count,
                        Err(e) => tracing::warn!(%root, error = %e, "failed to count entries"),
                    }
                }
                Err(e) => {
                    summary.failed_roots += 1;
                    tracing::warn!(%root, error = %e, "root update failed");
                }
            }
        }

        tracing::info!(
            roots = summary.roots,
            failed = summary.failed_roots,
            entries = summary.entries,
            "update finished"
        );
        summary
    }
}
