//! Identity and stamp directories, and the identity log that makes nid
//! assignments durable

mod identity;
mod journal;
mod stamps;

pub use identity::IdentityDirectory;
pub use journal::{IdentityJournal, IdentityLog, IDENTITY_LOG_FILE_NAME};
pub use stamps::StampDirectory;
