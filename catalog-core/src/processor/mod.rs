//! Bounded-concurrency worker pool driving a single [`PriorityQueue`].
//!
//! Shaped after the `scan::orchestration::scheduler` / `dispatcher` pair:
//! an `Arc`-shared, `Mutex`-guarded scheduling state plus a
//! semaphore-bounded dispatch loop that re-arms itself after every
//! completed job. Unlike that weighted-fair multi-library scheduler,
//! there is exactly one lane here — ordering comes entirely from the
//! priority queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use catalog_model::{AssetId, Priority, Result};
use dashmap::DashSet;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::queue::{EnqueueOutcome, PriorityQueue};

/// Handle a running task body uses to release its own dedup marker.
///
/// The dedup rule (§4.3/§4.4) requires the active marker to be cleared
/// *before* a task fires its ready/error callback — otherwise a request
/// that arrives synchronously from inside that callback would dedup
/// against a job that has, for all external purposes, already finished.
/// [`QueueProcessor`] also clears the marker itself once the task future
/// resolves, so calling [`Self::mark_idle`] is optional but required for
/// correct dedup timing; it is idempotent either way.
#[derive(Clone)]
pub struct JobHandle {
    id: AssetId,
    active: Arc<DashSet<AssetId>>,
}

impl JobHandle {
    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn mark_idle(&self) {
        self.active.remove(&self.id);
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle").field("id", &self.id).finish()
    }
}

/// Per-item task body. Receives the id, its queued payload, and a handle
/// to release the dedup marker early. All fetch/decode/cache/callback
/// work, and all error reporting, happens inside this closure — the
/// processor only knows how to schedule it.
pub type RunFn<T> = Arc<
    dyn Fn(AssetId, T, JobHandle) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// What a caller should do after calling [`QueueProcessor::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    /// `id` is already queued or executing; its priority was updated (if
    /// still queued) and the caller should do nothing further.
    AlreadyActive,
    /// `id` is not active. The caller should probe its cache and, on a
    /// miss, call [`QueueProcessor::enqueue`].
    ProbeCache,
}

/// A single-lane, priority-ordered, bounded-concurrency worker pool.
pub struct QueueProcessor<T> {
    queue: Mutex<PriorityQueue<T>>,
    active: Arc<DashSet<AssetId>>,
    semaphore: Arc<Semaphore>,
    run: RunFn<T>,
}

impl<T> std::fmt::Debug for QueueProcessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueProcessor")
            .field("size", &self.queue.lock().size())
            .field("active", &self.active.len())
            .field("available_permits", &self.semaphore.available_permits())
            .finish()
    }
}

impl<T: Send + 'static> QueueProcessor<T> {
    pub fn new(capacity: usize, concurrency: usize, run: RunFn<T>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(PriorityQueue::new(capacity)),
            active: Arc::new(DashSet::new()),
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            run,
        })
    }

    pub fn is_active(&self, id: AssetId) -> bool {
        self.active.contains(&id)
    }

    pub fn size(&self) -> usize {
        self.queue.lock().size()
    }

    /// Decide whether a caller's request needs a fresh job.
    ///
    /// If `id` is already active, its priority is bumped in the queue
    /// (a no-op if it's past `dequeue` and already executing, since it's
    /// no longer heap-resident) and [`RequestDecision::AlreadyActive`] is
    /// returned. Otherwise [`RequestDecision::ProbeCache`] tells the
    /// caller to check the cache before calling [`Self::enqueue`].
    pub fn request(&self, id: AssetId, priority: Priority) -> RequestDecision {
        if self.active.contains(&id) {
            self.queue.lock().update_priority(id, priority);
            return RequestDecision::AlreadyActive;
        }
        RequestDecision::ProbeCache
    }

    /// Mark `id` active and insert its job, then try to dispatch
    /// immediately if a worker slot is free.
    pub fn enqueue(self: &Arc<Self>, id: AssetId, priority: Priority, payload: T) {
        self.active.insert(id);
        let outcome = self.queue.lock().enqueue(id, priority, payload);
        match outcome {
            EnqueueOutcome::InsertedWithEviction { evicted } => {
                self.active.remove(&evicted);
                debug!(%id, %evicted, "queue at capacity, evicted lower-priority job");
            }
            EnqueueOutcome::Rejected => {
                // Our own id was the one rejected; it never entered the
                // heap, so it isn't really active.
                self.active.remove(&id);
                debug!(%id, "queue at capacity, job rejected");
            }
            EnqueueOutcome::Inserted | EnqueueOutcome::Updated => {}
        }
        self.dispatch();
    }

    pub fn update_priority(&self, id: AssetId, priority: Priority) -> bool {
        self.queue.lock().update_priority(id, priority)
    }

    /// Remove `id` from the queue and its active marker. Does not abort
    /// an in-flight task for `id` — there is no cooperative cancellation
    /// path into the task body — but frees it to be requested again.
    pub fn cancel(&self, id: AssetId) -> bool {
        let was_queued = self.queue.lock().remove(id).is_some();
        self.active.remove(&id);
        was_queued
    }

    pub fn cancel_all(&self) {
        let mut queue = self.queue.lock();
        for item in queue.get_all() {
            self.active.remove(&item.asset_id);
        }
        queue.clear();
    }

    /// Remove all queued items at [`Priority::Background`]. Returns the
    /// count removed.
    pub fn cancel_background_requests(&self) -> usize {
        let removed = self
            .queue
            .lock()
            .remove_all_with_priority(Priority::Background);
        for id in &removed {
            self.active.remove(id);
        }
        removed.len()
    }

    /// Pull ready items off the queue while worker slots are free.
    fn dispatch(self: &Arc<Self>) {
        loop {
            let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let item = self.queue.lock().dequeue();
            let Some(item) = item else {
                // permit dropped here, releasing the slot immediately
                return;
            };

            let this = Arc::clone(self);
            tokio::spawn(async move {
                let id = item.asset_id;
                let handle = JobHandle {
                    id,
                    active: Arc::clone(&this.active),
                };
                if let Err(err) = (this.run)(id, item.payload, handle).await {
                    warn!(%id, error = %err, "queue processor task failed");
                }
                // Backstop: correct code clears its own marker via
                // `JobHandle::mark_idle` before firing a ready/error
                // callback; this is idempotent cleanup in case it didn't.
                this.active.remove(&id);
                drop(permit);
                this.dispatch();
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_run(counter: Arc<AtomicUsize>) -> RunFn<u32> {
        Arc::new(move |_id, payload: u32, _handle: JobHandle| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(payload as u64)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn runs_every_enqueued_job() {
        let counter = Arc::new(AtomicUsize::new(0));
        let processor = QueueProcessor::new(10, 4, counting_run(Arc::clone(&counter)));

        for _ in 0..5 {
            processor.enqueue(AssetId::new(), Priority::Visible, 1);
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn request_dedupes_active_ids() {
        let counter = Arc::new(AtomicUsize::new(0));
        let processor = QueueProcessor::new(10, 1, counting_run(Arc::clone(&counter)));

        let id = AssetId::new();
        assert_eq!(
            processor.request(id, Priority::Background),
            RequestDecision::ProbeCache
        );
        processor.enqueue(id, Priority::Background, 50);

        assert_eq!(
            processor.request(id, Priority::Visible),
            RequestDecision::AlreadyActive
        );
        assert!(processor.is_active(id));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // job completed, so the id is free again
        assert_eq!(
            processor.request(id, Priority::Visible),
            RequestDecision::ProbeCache
        );
    }

    #[tokio::test]
    async fn job_handle_can_release_the_marker_before_completion() {
        let processor: Arc<QueueProcessor<()>> = QueueProcessor::new(
            10,
            1,
            Arc::new(|_id, _payload, handle: JobHandle| {
                Box::pin(async move {
                    handle.mark_idle();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(())
                })
            }),
        );
        let id = AssetId::new();
        processor.enqueue(id, Priority::Visible, ());

        tokio::time::sleep(Duration::from_millis(5)).await;
        // task body already released the marker, though it's still running
        assert!(!processor.is_active(id));
    }

    #[tokio::test]
    async fn cancel_background_requests_counts_and_removes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let processor = QueueProcessor::new(10, 1, counting_run(Arc::clone(&counter)));
        let busy = AssetId::new();
        processor.enqueue(busy, Priority::Visible, 200);

        for _ in 0..3 {
            processor.enqueue(AssetId::new(), Priority::Background, 10);
        }
        assert_eq!(processor.size(), 3);

        let removed = processor.cancel_background_requests();
        assert_eq!(removed, 3);
        assert_eq!(processor.size(), 0);
    }

    #[tokio::test]
    async fn cancel_all_clears_queue_without_aborting_inflight() {
        let counter = Arc::new(AtomicUsize::new(0));
        let processor = QueueProcessor::new(10, 1, counting_run(Arc::clone(&counter)));
        let inflight = AssetId::new();
        processor.enqueue(inflight, Priority::Visible, 100);

        for _ in 0..3 {
            processor.enqueue(AssetId::new(), Priority::Preload, 5);
        }
        processor.cancel_all();
        assert_eq!(processor.size(), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        // the in-flight job still ran to completion
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
