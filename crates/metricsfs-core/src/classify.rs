//! Error classification.
//!
//! Maps an outcome to one [`ErrorCategory`] by inspecting `io::ErrorKind`
//! along the error chain, never the message text. Wrapped errors (an
//! `io::Error` of kind `Other` carrying a `NotFound` error, or a custom error
//! whose `source()` is one) classify the same as the bare error.

use std::error::Error;
use std::io;

use crate::types::ErrorCategory;

/// Categories checked in priority order.
const PRIORITY: [(io::ErrorKind, ErrorCategory); 3] = [
    (io::ErrorKind::NotFound, ErrorCategory::NotFound),
    (io::ErrorKind::PermissionDenied, ErrorCategory::Permission),
    (io::ErrorKind::TimedOut, ErrorCategory::Timeout),
];

/// Classifies an operation outcome.
#[must_use]
pub fn classify(outcome: Option<&io::Error>) -> ErrorCategory {
    let Some(err) = outcome else {
        return ErrorCategory::None;
    };

    PRIORITY
        .iter()
        .find(|(kind, _)| chain_has_kind(err, *kind))
        .map_or(ErrorCategory::Unknown, |(_, category)| *category)
}

/// Returns true if any `io::Error` in the chain starting at `err` has `kind`.
fn chain_has_kind(err: &io::Error, kind: io::ErrorKind) -> bool {
    let mut current: Option<&(dyn Error + 'static)> = Some(err as &(dyn Error + 'static));
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == kind {
                return true;
            }
            // `io::Error::source` skips the payload of a custom error, so
            // step into the payload itself.
            current = match io_err.get_ref() {
                Some(inner) => Some(inner as &(dyn Error + 'static)),
                None => io_err.source(),
            };
        } else {
            current = e.source();
        }
    }
    false
}
