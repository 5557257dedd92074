//! Contract types shared by every layer
//!
//! - `timestamp`: millisecond STAMP times
//! - `latest`: the tagged result of version resolution
//!
//! ## Usage
//!
//! ```
//! use termstore_core::contract::{Latest, Timestamp};
//!
//! let nothing: Latest<u32> = Latest::Empty;
//! assert!(!nothing.is_present());
//! assert!(Timestamp::EPOCH < Timestamp::LATEST);
//! ```

pub mod latest;
pub mod timestamp;

// Re-exports
pub use latest::Latest;
pub use timestamp::Timestamp;
