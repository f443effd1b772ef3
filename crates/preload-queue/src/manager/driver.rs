//! Per-dispatch driver task.
//!
//! One task per dispatched item. The task runs the item's loader, bounds it
//! with the queue timeout, bridges the loader's watch channel into queue
//! progress, and hands the result back to the manager. It never touches
//! queue state directly.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use preload_core::{LoadError, LoadOutput, LoadResult};

use crate::queue::Dispatch;
use crate::transport::{LoadJob, ProgressUpdate, Strategy};

use super::QueueInner;

/// Run one dispatched load to completion.
pub(super) async fn drive(inner: Arc<QueueInner>, dispatch: Dispatch, cancel: CancellationToken) {
    let Dispatch {
        lease,
        item,
        strategy,
    } = dispatch;

    let loader = match strategy {
        Strategy::Network => Arc::clone(&inner.network),
        Strategy::HostElement => Arc::clone(&inner.host),
    };
    let (progress_tx, mut progress_rx) = watch::channel(ProgressUpdate::default());
    let job = LoadJob::new(Arc::clone(&item), cancel.clone(), progress_tx);

    let timeout = inner.config.timeout;
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let sleep = tokio::time::sleep(timeout);
    tokio::pin!(sleep);

    let mut load = loader.load(job);
    let mut progress_open = true;
    let mut last_seq = 0;

    let result: LoadResult<LoadOutput> = loop {
        tokio::select! {
            biased;

            result = &mut load => break result,

            () = cancel.cancelled() => break Err(LoadError::Cancelled),

            () = &mut sleep => {
                tracing::warn!(
                    target: "preload.queue",
                    id = %item.id,
                    timeout_ms,
                    "load timed out"
                );
                cancel.cancel();
                break Err(LoadError::timeout(timeout_ms));
            }

            changed = progress_rx.changed(), if progress_open => {
                if changed.is_err() {
                    // Loader dropped its job; the result decides
                    progress_open = false;
                    continue;
                }
                let update = *progress_rx.borrow_and_update();
                last_seq = update.seq;
                inner.report_progress(lease, update).await;
            }
        }
    };
    drop(load);

    if result.is_ok() {
        // Progress sent between the last poll and completion
        let update = *progress_rx.borrow();
        if update.seq > last_seq {
            inner.report_progress(lease, update).await;
        }
    }

    QueueInner::finish(&inner, lease, item, result).await;
}
