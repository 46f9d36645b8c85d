//! Sequential call queue with tag-based merging.
//!
//! A [`CallQueue`] runs the operations it is given one at a time, in
//! submission order. Callers that enqueue with a tag while an earlier call with
//! the same tag is still pending are merged onto that call: the operation runs
//! once and every merged caller observes its result.
//!
//! # State Machine
//!
//! The queue is either idle or draining. The first enqueue on an idle queue
//! spawns a drain task on the current Tokio runtime; the drain task pops tasks
//! until the list is empty and then returns the queue to idle.
//!
//! # Tag Lifetime
//!
//! A tag maps to its call from enqueue until that call's operation settles
//! (success, failure or panic). Only the task that created a mapping may remove
//! it, so a task that was already running across a [`CallQueue::clear`] cannot
//! evict a newer mapping for the same tag.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use naxios_core::{NaxiosError, QueueError};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// Handle to a queued call. Cloneable; every clone resolves to the same result.
pub type QueuedCall<T, E = NaxiosError> = Shared<BoxFuture<'static, Result<T, E>>>;

type Operation<T, E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>;

struct QueueTask<T, E> {
    id: u64,
    tag: Option<String>,
    operation: Operation<T, E>,
    reply: oneshot::Sender<Result<T, E>>,
}

struct PendingTag<T, E> {
    task_id: u64,
    handle: QueuedCall<T, E>,
}

struct QueueState<T, E> {
    tasks: VecDeque<QueueTask<T, E>>,
    pending_tags: HashMap<String, PendingTag<T, E>>,
    processing: bool,
    next_id: u64,
}

impl<T, E> Default for QueueState<T, E> {
    fn default() -> Self {
        Self {
            tasks: VecDeque::new(),
            pending_tags: HashMap::new(),
            processing: false,
            next_id: 0,
        }
    }
}

/// Sequential, tag-merging call queue.
///
/// Cloning a `CallQueue` yields another handle to the same queue.
///
/// # Example
///
/// ```ignore
/// use naxios_sync::CallQueue;
///
/// let queue: CallQueue<u64> = CallQueue::new();
/// let a = queue.enqueue(|| async { Ok(1) }, Some("balance"));
/// let b = queue.enqueue(|| async { Ok(2) }, Some("balance")); // merged onto `a`
/// assert_eq!(a.await?, 1);
/// assert_eq!(b.await?, 1);
/// ```
pub struct CallQueue<T, E = NaxiosError> {
    state: Arc<Mutex<QueueState<T, E>>>,
}

impl<T, E> Clone for CallQueue<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> Default for CallQueue<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<QueueError> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T, E>(state: &Mutex<QueueState<T, E>>) -> MutexGuard<'_, QueueState<T, E>> {
    // The state is only mutated in short non-panicking sections.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T, E> CallQueue<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<QueueError> + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
        }
    }

    /// Queue `operation`, or merge onto the pending call that holds `tag`.
    ///
    /// The returned handle settles exactly when the operation settles. The task
    /// is queued (and the drain loop started) immediately, whether or not the
    /// handle is ever awaited.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime when the queue is idle.
    pub fn enqueue<F, Fut>(&self, operation: F, tag: Option<&str>) -> QueuedCall<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut state = lock(&self.state);

        if let Some(tag) = tag {
            if let Some(pending) = state.pending_tags.get(tag) {
                debug!(tag = %tag, "Merging call onto pending task");
                return pending.handle.clone();
            }
        }

        let id = state.next_id;
        state.next_id += 1;

        let tag = tag.map(str::to_string);
        let (reply, receiver) = oneshot::channel();
        let cancelled_tag = tag.clone();
        let handle: QueuedCall<T, E> = async move {
            match receiver.await {
                Ok(result) => result,
                Err(_) => Err(E::from(QueueError::Cancelled { tag: cancelled_tag })),
            }
        }
        .boxed()
        .shared();

        if let Some(tag) = &tag {
            state.pending_tags.insert(
                tag.clone(),
                PendingTag {
                    task_id: id,
                    handle: handle.clone(),
                },
            );
        }

        state.tasks.push_back(QueueTask {
            id,
            tag,
            operation: Box::new(move || operation().boxed()),
            reply,
        });
        trace!(task_id = id, queued = state.tasks.len(), "Task queued");

        if !state.processing {
            state.processing = true;
            tokio::spawn(Self::drain(Arc::clone(&self.state)));
        }

        handle
    }

    async fn drain(state: Arc<Mutex<QueueState<T, E>>>) {
        loop {
            let task = {
                let mut guard = lock(&state);
                match guard.tasks.pop_front() {
                    Some(task) => task,
                    None => {
                        guard.processing = false;
                        return;
                    }
                }
            };

            let QueueTask {
                id,
                tag,
                operation,
                reply,
            } = task;

            let run = async move { operation().await };
            let result = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    warn!(task_id = id, tag = ?tag, "Queued operation panicked");
                    Err(E::from(QueueError::OperationPanicked { tag: tag.clone() }))
                }
            };

            if let Some(tag) = &tag {
                let mut guard = lock(&state);
                let owns_mapping = guard
                    .pending_tags
                    .get(tag)
                    .map(|pending| pending.task_id == id)
                    .unwrap_or(false);
                if owns_mapping {
                    guard.pending_tags.remove(tag);
                }
            }

            trace!(task_id = id, ok = result.is_ok(), "Task settled");
            // The caller may have dropped every handle.
            let _ = reply.send(result);
        }
    }

    /// Number of tasks waiting to start.
    pub fn len(&self) -> usize {
        lock(&self.state).tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct tags with a pending call.
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending_tags.len()
    }

    /// Whether the drain loop is active.
    pub fn is_processing(&self) -> bool {
        lock(&self.state).processing
    }

    pub fn has_pending_tag(&self, tag: &str) -> bool {
        lock(&self.state).pending_tags.contains_key(tag)
    }

    /// Discard every task that has not started yet, along with all tag mappings.
    ///
    /// Callers of discarded tasks receive [`QueueError::Cancelled`]. A task that
    /// is already running completes normally. Returns the number of discarded tasks.
    pub fn clear(&self) -> usize {
        let discarded: Vec<QueueTask<T, E>> = {
            let mut state = lock(&self.state);
            state.pending_tags.clear();
            state.tasks.drain(..).collect()
        };

        if !discarded.is_empty() {
            debug!(discarded = discarded.len(), "Cleared call queue");
        }
        // Dropping each reply sender settles its callers with `Cancelled`.
        discarded.len()
    }
}
