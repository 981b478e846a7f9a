//! Find the first item in an ordered sequence that passes an async predicate,
//! with a bounded number of predicate evaluations in flight.
//!
//! ```
//! # futures::executor::block_on(async {
//! let found = detect_async::detect([1, 2, 3, 4, 5], |&n, _| async move { Ok::<_, ()>(n == 3) }, None).await;
//! assert_eq!(found, Ok(Some(3)));
//! # });
//! ```

pub mod config;
pub mod detect;

pub use config::{CapturePolicy, ConfigError, DetectConfig};
pub use detect::{Detector, detect, detect_infallible};
