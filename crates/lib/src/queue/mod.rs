//! Request queue: the single-writer serializer in front of the storage engine.
//!
//! Every unit of work is submitted as either an *Operation* (read-only) or a
//! *Transaction*. The queue admits exactly one unit at a time; further units
//! wait in strict FIFO order. A Transaction is wrapped in a storage
//! transaction: `begin` is awaited before its body runs, and when the body
//! finishes the queue commits on success or rolls back on failure before the
//! completion is delivered and the next unit is admitted.
//!
//! Submitting never blocks. Each admitted unit runs as its own task on the
//! current tokio runtime, so dropping the returned [`Submission`] does not
//! cancel it.
//!
//! A unit's body may itself call `submit_*` on the same queue. Such nested
//! submissions do not queue (that would deadlock behind the running unit);
//! they run inline against the active [`Request`], inside the outer
//! transaction if there is one.
//!
//! ```
//! # use std::sync::Arc;
//! # use idcache::{Directory, InMemory, RequestQueue, SystemClock, Entry, dn};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> idcache::Result<()> {
//! let queue = RequestQueue::new(
//!     Directory::new(Arc::new(InMemory::new())),
//!     Arc::new(SystemClock),
//! );
//!
//! queue
//!     .submit_transaction(|req| async move { req.add(Entry::new(dn::sysdb_dn())).await })
//!     .await?;
//!
//! let found = queue
//!     .submit_operation(|req| async move { req.get(&dn::sysdb_dn(), &[]).await })
//!     .await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use handle_trait::Handle;
use tokio::sync::{Notify, oneshot};
use tokio::time::Instant;
use tracing::{Instrument, debug, info_span, trace, warn};

use crate::Result;
use crate::backend::Directory;
use crate::clock::Clock;

pub mod errors;
mod request;

pub use errors::QueueError;
pub use request::{Request, RequestId, RequestKind};

tokio::task_local! {
    /// The request whose body is currently running on this task.
    static CURRENT_REQUEST: Request;
}

/// Lifecycle of a submitted unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    Pending,
    Active,
    /// Finished, failed, or withdrawn.
    Completed,
}

struct PendingUnit {
    id: RequestId,
    kind: RequestKind,
    queued_at: Instant,
    admit: oneshot::Sender<()>,
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    active: Option<RequestId>,
    pending: VecDeque<PendingUnit>,
}

impl QueueState {
    fn allocate(&mut self) -> RequestId {
        self.next_id += 1;
        RequestId(self.next_id)
    }
}

pub(crate) struct QueueInner {
    state: Mutex<QueueState>,
    directory: Directory,
    clock: Arc<dyn Clock>,
    idle: Notify,
}

impl QueueInner {
    // Never held across an await.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_active(&self, id: RequestId) -> bool {
        self.lock().active == Some(id)
    }
}

/// Cheap-to-clone handle to a request queue.
#[derive(Clone, Handle)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

impl RequestQueue {
    pub fn new(directory: Directory, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                directory,
                clock,
                idle: Notify::new(),
            }),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock()
    }

    /// Submit a read-only unit.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit_operation<F, Fut, T>(&self, body: F) -> Submission<T>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(RequestKind::Operation, body)
    }

    /// Submit a unit that runs inside a storage transaction.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit_transaction<F, Fut, T>(&self, body: F) -> Submission<T>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(RequestKind::Transaction, body)
    }

    fn submit<F, Fut, T>(&self, kind: RequestKind, body: F) -> Submission<T>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        if let Some(current) = self.current_request() {
            trace!(id = %current.id(), ?kind, "Running nested submission inline");
            return Submission {
                id: current.id(),
                inner: SubmissionInner::Inline(Box::pin(body(current))),
            };
        }

        let (admit_tx, admit_rx) = oneshot::channel();
        let id = {
            let mut state = self.lock();
            let id = state.allocate();
            if state.active.is_none() {
                state.active = Some(id);
                // The receiver is alive until the task below starts.
                let _ = admit_tx.send(());
            } else {
                state.pending.push_back(PendingUnit {
                    id,
                    kind,
                    queued_at: Instant::now(),
                    admit: admit_tx,
                });
                debug!(%id, ?kind, pending = state.pending.len(), "Request queued");
            }
            id
        };

        let (done_tx, done_rx) = oneshot::channel();
        let queue = self.handle();
        let span = info_span!("request", %id, ?kind);
        tokio::spawn(
            async move {
                if admit_rx.await.is_err() {
                    let _ = done_tx.send(Err(QueueError::Withdrawn { id }.into()));
                    return;
                }
                let result = queue.run(id, kind, body).await;
                if done_tx.send(result).is_err() {
                    trace!("Submission dropped before completion");
                }
            }
            .instrument(span),
        );

        Submission {
            id,
            inner: SubmissionInner::Queued(done_rx),
        }
    }

    /// The active request of this queue, if the caller is running inside it.
    fn current_request(&self) -> Option<Request> {
        CURRENT_REQUEST
            .try_with(|request| request.belongs_to(&self.inner).then(|| request.handle()))
            .ok()
            .flatten()
    }

    async fn run<F, Fut, T>(&self, id: RequestId, kind: RequestKind, body: F) -> Result<T>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let request = Request::new(
            id,
            kind,
            self.inner.directory.handle(),
            self.inner.clock.clone(),
            Arc::downgrade(&self.inner),
        );
        let mut guard = ActiveGuard {
            queue: self.handle(),
            id,
            kind,
            armed: true,
        };
        debug!("Request admitted");

        if kind == RequestKind::Transaction
            && let Err(err) = self.inner.directory.begin_transaction().await
        {
            warn!(error = %err, "Failed to begin transaction");
            guard.armed = false;
            self.advance(id);
            return Err(err);
        }

        let status = CURRENT_REQUEST
            .scope(request.handle(), body(request.handle()))
            .await;
        guard.armed = false;
        self.done(&request, status).await
    }

    /// Resolve the active unit and admit the next one.
    ///
    /// For a Transaction a successful `status` is committed; a failed one, or
    /// a failed commit, is rolled back. The returned result is what the
    /// submitter sees.
    pub(crate) async fn done<T>(&self, request: &Request, status: Result<T>) -> Result<T> {
        let id = request.id();
        let result = match request.kind() {
            RequestKind::Operation => status,
            RequestKind::Transaction => self.resolve_transaction(id, status).await,
        };
        self.advance(id);
        result
    }

    async fn resolve_transaction<T>(&self, id: RequestId, status: Result<T>) -> Result<T> {
        let directory = &self.inner.directory;
        let trigger = match status {
            Ok(value) => match directory.commit_transaction().await {
                Ok(()) => {
                    debug!("Transaction committed");
                    return Ok(value);
                }
                Err(err) => {
                    warn!(error = %err, "Commit failed, rolling back");
                    QueueError::CommitFailed {
                        id,
                        source: Box::new(err),
                    }
                    .into()
                }
            },
            Err(err) => {
                debug!(error = %err, "Transaction body failed, rolling back");
                err
            }
        };

        match directory.rollback_transaction().await {
            Ok(()) => Err(trigger),
            Err(err) => {
                warn!(error = %err, "Rollback failed");
                Err(QueueError::RollbackFailed {
                    id,
                    source: Box::new(err),
                    trigger: Box::new(trigger),
                }
                .into())
            }
        }
    }

    /// Mark `finished` completed and admit the next pending unit.
    fn advance(&self, finished: RequestId) {
        let mut state = self.lock();
        if state.active != Some(finished) {
            warn!(%finished, active = ?state.active, "Completion for a request that is not active");
            return;
        }
        state.active = None;
        while let Some(next) = state.pending.pop_front() {
            if next.admit.send(()).is_ok() {
                debug!(
                    id = %next.id,
                    kind = ?next.kind,
                    waited_ms = next.queued_at.elapsed().as_millis() as u64,
                    "Admitting next request"
                );
                state.active = Some(next.id);
                break;
            }
        }
        if state.active.is_none() {
            self.inner.idle.notify_waiters();
        }
    }

    /// Remove a unit that has not been admitted yet.
    ///
    /// Its submission resolves with [`QueueError::Withdrawn`].
    pub fn withdraw(&self, id: RequestId) -> Result<()> {
        let mut state = self.lock();
        match state.pending.iter().position(|unit| unit.id == id) {
            Some(pos) => {
                state.pending.remove(pos);
                debug!(%id, "Request withdrawn");
                Ok(())
            }
            None => Err(QueueError::NotPending { id }.into()),
        }
    }

    /// Lifecycle state of `id`, `None` if it was never issued by this queue.
    pub fn state(&self, id: RequestId) -> Option<RequestState> {
        let state = self.lock();
        if id.0 == 0 || id.0 > state.next_id {
            return None;
        }
        if state.active == Some(id) {
            Some(RequestState::Active)
        } else if state.pending.iter().any(|unit| unit.id == id) {
            Some(RequestState::Pending)
        } else {
            Some(RequestState::Completed)
        }
    }

    /// The currently admitted unit.
    pub fn active(&self) -> Option<RequestId> {
        self.lock().active
    }

    /// Number of units waiting for admission.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.active.is_none() && state.pending.is_empty()
    }

    /// Wait until no unit is active or pending.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("RequestQueue")
            .field("active", &state.active)
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// Keeps the queue moving if a unit's task unwinds before reaching `done`.
struct ActiveGuard {
    queue: RequestQueue,
    id: RequestId,
    kind: RequestKind,
    armed: bool,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(id = %self.id, "Request ended without completing");
        let queue = self.queue.handle();
        let id = self.id;
        if self.kind == RequestKind::Operation {
            queue.advance(id);
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(err) = queue.inner.directory.rollback_transaction().await {
                        warn!(%id, error = %err, "Rollback after abandoned request failed");
                    }
                    queue.advance(id);
                });
            }
            Err(_) => queue.advance(id),
        }
    }
}

type BoxedResult<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

enum SubmissionInner<T> {
    Queued(oneshot::Receiver<Result<T>>),
    Inline(BoxedResult<T>),
}

/// Completion of a submitted unit.
///
/// Await it (or call [`Submission::wait`]) for the unit's result. For a
/// Transaction the result is delivered only after commit or rollback.
#[must_use = "a submission does nothing to the caller unless awaited"]
pub struct Submission<T> {
    id: RequestId,
    inner: SubmissionInner<T>,
}

impl<T: Send + 'static> Submission<T> {
    /// The id of the unit; for a nested submission, the id of the enclosing unit.
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub async fn wait(self) -> Result<T> {
        match self.inner {
            SubmissionInner::Queued(rx) => match rx.await {
                Ok(result) => result,
                Err(_) => Err(QueueError::Abandoned { id: self.id }.into()),
            },
            SubmissionInner::Inline(fut) => fut.await,
        }
    }
}

impl<T: Send + 'static> IntoFuture for Submission<T> {
    type Output = Result<T>;
    type IntoFuture = BoxedResult<T>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

impl<T> std::fmt::Debug for Submission<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inline = matches!(self.inner, SubmissionInner::Inline(_));
        f.debug_struct("Submission")
            .field("id", &self.id)
            .field("inline", &inline)
            .finish()
    }
}
