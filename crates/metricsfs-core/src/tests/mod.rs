//! Test infrastructure and falsification tests for the interceptor.
//!
//! Each test tries to refute one claim about the decorator. Tests are
//! grouped by category:
//!
//! | Category | ID Range | Description |
//! |----------|----------|-------------|
//! | A | F101-F120 | Transparency of delegated calls |
//! | B | F121-F140 | Handle lifecycle |
//! | C | F141-F150 | Optional capabilities |
//! | D | F151-F160 | Tracing spans |
//! | E | F161-F170 | Properties of the building blocks |


pub use mocks::{MockFile, MockFs, RecordingObserver};
