//! Debouncing of document snapshots.
//!
//! Reconciliation is cheap per annotation but scans the whole document, so
//! it only runs once edits have gone quiet. The debouncer watches a channel
//! of snapshots and forwards the latest one after `delay` passes with no
//! newer value. A consumer that is still busy with the previous snapshot
//! simply receives the newest one when it next asks.

use std::time::Duration;

use tokio::sync::{mpsc, watch};

/// Forward settled values of `source` to the returned receiver.
///
/// When every sender of `source` is dropped the pending value (if any) is
/// flushed immediately and the returned channel closes.
pub fn debounce<T>(delay: Duration, mut source: watch::Receiver<T>) -> mpsc::Receiver<T>
where
  T: Clone + Send + Sync + 'static,
{
  let (tx, rx) = mpsc::channel(1);
  tokio::spawn(async move {
    while source.changed().await.is_ok() {
      let open = settle(delay, &mut source).await;
      let value = source.borrow_and_update().clone();
      if tx.send(value).await.is_err() || !open {
        break;
      }
    }
  });
  rx
}

/// Wait until `delay` elapses without a change. Returns `false` if the
/// source closed while waiting.
async fn settle<T>(delay: Duration, source: &mut watch::Receiver<T>) -> bool {
  loop {
    match tokio::time::timeout(delay, source.changed()).await {
      Ok(Ok(())) => continue,
      Ok(Err(_)) => return false,
      Err(_) => return true,
    }
  }
}
