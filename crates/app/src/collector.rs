//! Concurrent, deadline-bound reading collection.
//!
//! Every source is fetched on its own task. Whatever has arrived when the
//! deadline passes is what the cycle fuses; sources still running are
//! aborted and, like sources that failed, count as missing for the cycle.
//! There is no retry within a cycle.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use weatherhub_domain::reading::Reading;

use crate::ports::ReadingSource;

/// Readings gathered in one cycle.
#[derive(Debug, Default)]
pub struct Collection {
    pub readings: Vec<Reading>,
    /// Sources that failed or missed the deadline.
    pub missing: BTreeSet<String>,
}

pub struct ReadingCollector<S> {
    sources: Vec<Arc<S>>,
    deadline: Duration,
}

impl<S> ReadingCollector<S>
where
    S: ReadingSource + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(sources: Vec<S>, deadline: Duration) -> Self {
        Self {
            sources: sources.into_iter().map(Arc::new).collect(),
            deadline,
        }
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.source_id())
    }

    /// Fetch every source concurrently until the deadline.
    pub async fn collect(&self) -> Collection {
        let deadline = Instant::now() + self.deadline;
        let mut pending: BTreeSet<String> = self.source_ids().map(str::to_owned).collect();
        let mut collection = Collection::default();

        let mut tasks = JoinSet::new();
        for source in &self.sources {
            let source = Arc::clone(source);
            tasks.spawn(async move {
                let id = source.source_id().to_owned();
                let result = source.fetch().await;
                (id, result)
            });
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((id, Ok(readings))))) => {
                    pending.remove(&id);
                    let before = collection.readings.len();
                    collection.readings.extend(readings.into_iter().filter(|r| {
                        r.validate()
                            .inspect_err(|err| {
                                tracing::warn!(source_id = %id, error = ?err, "invalid reading dropped");
                            })
                            .is_ok()
                    }));
                    tracing::debug!(
                        source_id = %id,
                        count = collection.readings.len() - before,
                        "source collected"
                    );
                }
                Ok(Some(Ok((id, Err(err))))) => {
                    pending.remove(&id);
                    tracing::warn!(source_id = %id, error = ?err, "source failed");
                    collection.missing.insert(id);
                }
                Ok(Some(Err(err))) => {
                    // the task id is lost with the panic; the source stays pending
                    tracing::warn!(error = %err, "source task aborted");
                }
                Ok(None) => break,
                Err(_elapsed) => {
                    tracing::warn!(
                        sources = ?pending,
                        deadline = ?self.deadline,
                        "sources missed the cycle deadline"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        collection.missing.extend(pending);
        collection
    }
}
