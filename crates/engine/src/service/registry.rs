//! Process-wide registry of open services
//!
//! Ensures only one EntityService exists per data directory. Two services
//! appending to the same `entities.log` would interleave records, so a
//! second open of the same path returns the first instance. Entries are
//! weak and expire when the last handle is dropped.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Weak;

use super::EntityService;

/// Open services by canonical data directory
pub static OPEN_SERVICES: Lazy<Mutex<HashMap<PathBuf, Weak<EntityService>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
