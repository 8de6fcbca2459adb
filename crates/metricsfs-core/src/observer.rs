//! The "operation observed" event abstraction.
//!
//! The interceptor produces one event stream; aggregators subscribe to it by
//! implementing [`OperationObserver`]. The pull-model collector and the
//! push-model collector are two implementations of the same trait, and a
//! tuple of two observers fans every event out to both.

use crate::types::{Measurement, OpenMode, Operation};

/// Subscriber for intercepted operations.
///
/// Every method runs synchronously on the thread that made the intercepted
/// call, after the delegate has returned.
pub trait OperationObserver: Send + Sync {
    /// One completed operation.
    fn observe(&self, measurement: &Measurement<'_>);

    /// A handle was created.
    fn handle_opened(&self);

    /// A handle was closed or dropped.
    fn handle_closed(&self);

    /// Whether the interceptor should open a span around each call.
    fn traces(&self) -> bool {
        false
    }

    /// A file was opened (or creation attempted) with `mode`.
    ///
    /// Reported whether or not the open succeeded.
    fn file_opened(&self, _mode: OpenMode) {}

    /// A file creation was attempted.
    fn file_created(&self) {}

    /// A directory-level operation was attempted.
    fn dir_operation(&self, _op: Operation) {}
}

impl<A, B> OperationObserver for (A, B)
where
    A: OperationObserver,
    B: OperationObserver,
{
    fn observe(&self, measurement: &Measurement<'_>) {
        self.0.observe(measurement);
        self.1.observe(measurement);
    }

    fn handle_opened(&self) {
        self.0.handle_opened();
        self.1.handle_opened();
    }

    fn handle_closed(&self) {
        self.0.handle_closed();
        self.1.handle_closed();
    }

    fn traces(&self) -> bool {
        self.0.traces() || self.1.traces()
    }

    fn file_opened(&self, mode: OpenMode) {
        self.0.file_opened(mode);
        self.1.file_opened(mode);
    }

    fn file_created(&self) {
        self.0.file_created();
        self.1.file_created();
    }

    fn dir_operation(&self, op: Operation) {
        self.0.dir_operation(op);
        self.1.dir_operation(op);
    }
}

impl<O: OperationObserver + ?Sized> OperationObserver for std::sync::Arc<O> {
    fn observe(&self, measurement: &Measurement<'_>) {
        (**self).observe(measurement);
    }

    fn handle_opened(&self) {
        (**self).handle_opened();
    }

    fn handle_closed(&self) {
        (**self).handle_closed();
    }

    fn traces(&self) -> bool {
        (**self).traces()
    }

    fn file_opened(&self, mode: OpenMode) {
        (**self).file_opened(mode);
    }

    fn file_created(&self) {
        (**self).file_created();
    }

    fn dir_operation(&self, op: Operation) {
        (**self).dir_operation(op);
    }
}
