//! Tenant Context Propagation
//!
//! The current tenant is held in a per-task stack of frames. Storage is
//! picked per call, first match wins:
//!
//! 1. a tokio task-local installed by [`TenantContext::scope`] (travels with
//!    the future across suspension points and worker threads)
//! 2. a per-thread table keyed by [`tokio::task::Id`] when running inside a
//!    tokio task with no such scope, so tasks sharing a thread (`current_thread`
//!    runtime, `LocalSet`) never see each other's frames
//! 3. a plain thread-local stack for code outside any tokio task
//!
//! The stack is never exposed directly: callers push with
//! [`TenantContext::enter_scope`] (popped when the returned handle drops) or run
//! a body inside [`TenantContext::scope`] / [`TenantContext::sync_scope`].
//!
//! ```text
//!   task A (acme)          task B (globex)        worker thread
//!   ┌──────────────┐       ┌──────────────┐       ┌──────────────┐
//!   │ [acme, ops]  │       │ [globex]     │       │ []           │
//!   └──────────────┘       └──────────────┘       └──────────────┘
//!     ▲ task-local or        ▲ task-local or        ▲ thread-local
//!       task-id keyed          task-id keyed
//! ```

use crate::error::{TenancyError, TenancyResult};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task;

static NEXT_FRAME: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct Frame {
    token: u64,
    tenant_id: Arc<str>,
}

/// Stack of tenant identifiers for one logical task
#[derive(Debug, Default)]
struct ScopeStack {
    frames: Mutex<Vec<Frame>>,
}

impl ScopeStack {
    fn seeded(tenant_id: Option<Arc<str>>) -> Arc<Self> {
        let stack = Self::default();
        if let Some(tenant_id) = tenant_id {
            stack.push(tenant_id);
        }
        Arc::new(stack)
    }

    fn top(&self) -> Option<Arc<str>> {
        self.frames.lock().last().map(|frame| Arc::clone(&frame.tenant_id))
    }

    /// Returns the depth and token identifying the new frame
    fn push(&self, tenant_id: Arc<str>) -> (usize, u64) {
        let token = NEXT_FRAME.fetch_add(1, Ordering::Relaxed);
        let mut frames = self.frames.lock();
        let depth = frames.len();
        frames.push(Frame { token, tenant_id });
        (depth, token)
    }

    /// Pop the frame at `depth` and everything above it, but only if that
    /// frame is still the one identified by `token`
    fn unwind_to(&self, depth: usize, token: u64) {
        let mut frames = self.frames.lock();
        if frames.get(depth).map(|frame| frame.token) == Some(token) {
            frames.truncate(depth);
        }
    }

    fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

tokio::task_local! {
    static TASK_SCOPES: Arc<ScopeStack>;
}

thread_local! {
    static TASK_ID_SCOPES: RefCell<HashMap<task::Id, Arc<ScopeStack>>> = RefCell::new(HashMap::new());
    static THREAD_SCOPES: Arc<ScopeStack> = Arc::new(ScopeStack::default());
}

/// Stack visible to the caller, `None` for a tokio task that never entered a scope
fn visible_stack() -> Option<Arc<ScopeStack>> {
    if let Ok(stack) = TASK_SCOPES.try_with(Arc::clone) {
        return Some(stack);
    }
    match task::try_id() {
        Some(id) => TASK_ID_SCOPES.with(|scopes| scopes.borrow().get(&id).cloned()),
        None => Some(THREAD_SCOPES.with(Arc::clone)),
    }
}

/// Stack a new frame goes onto, plus the task id when it is a keyed entry
fn entry_stack() -> (Arc<ScopeStack>, Option<task::Id>) {
    if let Ok(stack) = TASK_SCOPES.try_with(Arc::clone) {
        return (stack, None);
    }
    match task::try_id() {
        Some(id) => {
            let stack = TASK_ID_SCOPES
                .with(|scopes| Arc::clone(scopes.borrow_mut().entry(id).or_default()));
            (stack, Some(id))
        }
        None => (THREAD_SCOPES.with(Arc::clone), None),
    }
}

fn current_frame() -> Option<Arc<str>> {
    visible_stack().and_then(|stack| stack.top())
}

/// Handle for a scope entered with [`TenantContext::enter_scope`].
///
/// Dropping it restores the identifier that was current when the scope was
/// entered, and also closes any inner scope still open on the same stack.
/// Frames belong to the task (or, outside tokio, the thread) that entered
/// them; other tasks polled on the same thread do not see them. The handle is
/// `!Send`, so it stays on the thread whose table it was registered in.
#[must_use = "the tenant scope ends when this handle is dropped"]
#[derive(Debug)]
pub struct ScopeHandle {
    stack: Arc<ScopeStack>,
    depth: usize,
    token: u64,
    task: Option<task::Id>,
    tenant_id: Arc<str>,
    _not_send: PhantomData<*const ()>,
}

impl ScopeHandle {
    /// Identifier bound by this scope
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl Drop for ScopeHandle {
    fn drop(&mut self) {
        self.stack.unwind_to(self.depth, self.token);
        if let Some(id) = self.task {
            if self.stack.is_empty() {
                // thread may be tearing down; the table goes with it
                let _ = TASK_ID_SCOPES.try_with(|scopes| {
                    let mut scopes = scopes.borrow_mut();
                    if scopes.get(&id).is_some_and(|stack| Arc::ptr_eq(stack, &self.stack)) {
                        scopes.remove(&id);
                    }
                });
            }
        }
        tracing::debug!(tenant = %self.tenant_id, depth = self.depth, "tenant scope exited");
    }
}

/// Access to the current tenant of the calling task
pub struct TenantContext;

impl TenantContext {
    /// Identifier of the innermost active scope, `None` outside any scope
    pub fn current() -> Option<String> {
        current_frame().map(|id| id.to_string())
    }

    /// Whether any scope is active, including one bound to an empty identifier
    pub fn is_scoped() -> bool {
        current_frame().is_some()
    }

    /// Current identifier, failing when no scope is active or the active
    /// identifier is empty
    pub fn require() -> TenancyResult<String> {
        match current_frame() {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            Some(_) => {
                tracing::warn!("tenant required but active scope has an empty identifier");
                Err(TenancyError::NoTenantContext)
            }
            None => {
                tracing::warn!("tenant required outside any tenant scope");
                Err(TenancyError::NoTenantContext)
            }
        }
    }

    /// Push `tenant_id` for the calling task until the handle drops
    pub fn enter_scope(tenant_id: impl Into<Arc<str>>) -> ScopeHandle {
        let tenant_id = tenant_id.into();
        let (stack, task) = entry_stack();
        let (depth, token) = stack.push(Arc::clone(&tenant_id));
        tracing::debug!(tenant = %tenant_id, depth, "tenant scope entered");
        ScopeHandle {
            stack,
            depth,
            token,
            task,
            tenant_id,
            _not_send: PhantomData,
        }
    }

    /// Run `future` with `tenant_id` as its current tenant.
    ///
    /// The scope travels with the future across suspension points and worker
    /// threads. Dropping the returned future before completion discards the
    /// scope with it.
    pub fn scope<F>(tenant_id: impl Into<Arc<str>>, future: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        TASK_SCOPES.scope(ScopeStack::seeded(Some(tenant_id.into())), future)
    }

    /// Run `body` synchronously with `tenant_id` as the current tenant
    pub fn sync_scope<R>(tenant_id: impl Into<Arc<str>>, body: impl FnOnce() -> R) -> R {
        TASK_SCOPES.sync_scope(ScopeStack::seeded(Some(tenant_id.into())), body)
    }

    /// Bind `future` to the caller's current tenant.
    ///
    /// Spawned tasks start unscoped; wrap the future with this before
    /// `tokio::spawn` to carry the scope over. When the caller has no scope the
    /// future still gets its own empty stack.
    pub fn inherit<F>(future: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        TASK_SCOPES.scope(ScopeStack::seeded(current_frame()), future)
    }
}
