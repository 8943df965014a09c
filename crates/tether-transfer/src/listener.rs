//! Progress listeners and the handler builder that collects them.

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::context::TransferContext;

/// Default number of bytes between two progress notifications.
pub const DEFAULT_PROGRESS_REPORT_INTERVAL: u64 = 65_536;

/// Observer of one transfer.
///
/// Every transfer calls [`on_start`](Self::on_start) once, then
/// [`on_progress`](Self::on_progress) any number of times, then exactly one
/// of [`on_complete`](Self::on_complete), [`on_terminate`](Self::on_terminate)
/// or [`on_error`](Self::on_error).
pub trait TransferProgressListener: Send + Sync {
    fn on_start(&self, _ctx: &TransferContext) {}

    /// `total` is the announced content length, if any.
    fn on_progress(&self, _ctx: &TransferContext, _transferred: u64, _total: Option<u64>) {}

    fn on_complete(&self, _ctx: &TransferContext, _transferred: u64) {}

    /// The transfer was stopped through its termination flag.
    fn on_terminate(&self, _ctx: &TransferContext, _transferred: u64) {}

    fn on_error(&self, _ctx: &TransferContext, _error: &io::Error) {}

    /// Bytes between progress notifications; `0` disables them.
    fn progress_report_interval(&self) -> u64 {
        DEFAULT_PROGRESS_REPORT_INTERVAL
    }
}

/// Shared listener handle.
pub type SharedListener = Arc<dyn TransferProgressListener>;

/// Key returned by [`TransferProgressHandlers::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

type StartFn = Box<dyn Fn(&TransferContext) + Send + Sync>;
type ProgressFn = Box<dyn Fn(&TransferContext, u64, Option<u64>) + Send + Sync>;
type DoneFn = Box<dyn Fn(&TransferContext, bool) + Send + Sync>;

struct OnStart(StartFn);

impl TransferProgressListener for OnStart {
    fn on_start(&self, ctx: &TransferContext) {
        (self.0)(ctx);
    }
}

struct OnProgress {
    handler: ProgressFn,
    interval: u64,
}

impl TransferProgressListener for OnProgress {
    fn on_progress(&self, ctx: &TransferContext, transferred: u64, total: Option<u64>) {
        (self.handler)(ctx, transferred, total);
    }

    fn progress_report_interval(&self) -> u64 {
        self.interval
    }
}

/// Reports `true` on completion and `false` on error. Termination is not a
/// completion and is not reported.
struct OnDone(DoneFn);

impl TransferProgressListener for OnDone {
    fn on_complete(&self, ctx: &TransferContext, _transferred: u64) {
        (self.0)(ctx, true);
    }

    fn on_error(&self, ctx: &TransferContext, _error: &io::Error) {
        (self.0)(ctx, false);
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Ordered listener list with closure shortcuts.
///
/// ```
/// use tether_transfer::TransferProgressHandlers;
///
/// let handlers = TransferProgressHandlers::new()
///     .when_start(|| println!("started"))
///     .on_progress(|transferred, _total| println!("{transferred} bytes"))
///     .when_complete(|ok| println!("done: {ok}"));
/// assert_eq!(handlers.len(), 3);
/// ```
#[derive(Default)]
pub struct TransferProgressHandlers {
    listeners: Vec<(ListenerKey, SharedListener)>,
    next_key: u64,
}

impl TransferProgressHandlers {
    /// An empty listener list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a full listener. Keep the key to remove it later.
    pub fn add_listener(
        &mut self,
        listener: impl TransferProgressListener + 'static,
    ) -> ListenerKey {
        self.push(Arc::new(listener))
    }

    /// Remove a listener; `false` when the key is unknown.
    pub fn remove_listener(&mut self, key: ListenerKey) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != key);
        self.listeners.len() != before
    }

    /// Run `handler` when the transfer starts.
    #[must_use]
    pub fn when_start(self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.when_start_with(move |_| handler())
    }

    /// Run `handler` with the context when the transfer starts.
    #[must_use]
    pub fn when_start_with(
        mut self,
        handler: impl Fn(&TransferContext) + Send + Sync + 'static,
    ) -> Self {
        self.push(Arc::new(OnStart(Box::new(handler))));
        self
    }

    /// Report `(transferred, total)` every
    /// [`DEFAULT_PROGRESS_REPORT_INTERVAL`] bytes.
    #[must_use]
    pub fn on_progress(self, handler: impl Fn(u64, Option<u64>) + Send + Sync + 'static) -> Self {
        self.on_progress_every(DEFAULT_PROGRESS_REPORT_INTERVAL, move |_, transferred, total| {
            handler(transferred, total);
        })
    }

    /// Report progress with the context every `interval` bytes.
    #[must_use]
    pub fn on_progress_every(
        mut self,
        interval: u64,
        handler: impl Fn(&TransferContext, u64, Option<u64>) + Send + Sync + 'static,
    ) -> Self {
        self.push(Arc::new(OnProgress {
            handler: Box::new(handler),
            interval,
        }));
        self
    }

    /// Run `handler` with `true` on completion or `false` on error.
    #[must_use]
    pub fn when_complete(self, handler: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.when_complete_with(move |_, ok| handler(ok))
    }

    /// Like [`when_complete`](Self::when_complete), with the context.
    #[must_use]
    pub fn when_complete_with(
        mut self,
        handler: impl Fn(&TransferContext, bool) + Send + Sync + 'static,
    ) -> Self {
        self.push(Arc::new(OnDone(Box::new(handler))));
        self
    }

    /// Listeners in registration order.
    #[must_use]
    pub fn listeners(&self) -> Vec<SharedListener> {
        self.listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect()
    }

    /// Notify every listener of a failure that happened outside
    /// [`transfer`](crate::transfer), e.g. while opening the source.
    pub fn notify_error(&self, ctx: &TransferContext, error: &io::Error) {
        for (_, listener) in &self.listeners {
            listener.on_error(ctx, error);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn push(&mut self, listener: SharedListener) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key += 1;
        self.listeners.push((key, listener));
        key
    }
}

impl fmt::Debug for TransferProgressHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferProgressHandlers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn completion_shortcut_reports_success_and_failure_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handlers =
            TransferProgressHandlers::new().when_complete(move |ok| sink.lock().unwrap().push(ok));
        let ctx = TransferContext::upload();
        for listener in handlers.listeners() {
            listener.on_complete(&ctx, 10);
            listener.on_terminate(&ctx, 5);
            listener.on_error(&ctx, &io::Error::other("broken pipe"));
        }
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn listeners_can_be_removed_by_key() {
        struct Quiet;
        impl TransferProgressListener for Quiet {}

        let mut handlers = TransferProgressHandlers::new();
        let first = handlers.add_listener(Quiet);
        let second = handlers.add_listener(Quiet);
        assert!(handlers.remove_listener(first));
        assert!(!handlers.remove_listener(first));
        assert_eq!(handlers.len(), 1);
        assert!(handlers.remove_listener(second));
        assert!(handlers.is_empty());
    }

    #[test]
    fn progress_shortcut_uses_default_interval() {
        let handlers = TransferProgressHandlers::new().on_progress(|_, _| {});
        let listeners = handlers.listeners();
        assert_eq!(listeners[0].progress_report_interval(), DEFAULT_PROGRESS_REPORT_INTERVAL);
    }
}
