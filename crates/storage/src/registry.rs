//! Provider registry and scored selection
//!
//! Controllers are registered by name. A caller picks one by scoring every
//! registered controller; the highest non-negative score wins, ties go to
//! the earliest registration.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = ProviderRegistry::with_defaults();
//! let controller = registry.select(score_by_name("log"))?;
//! let provider = controller.create(&ProviderOptions::persistent(dir))?;
//! provider.start()?;
//! ```

use crate::append_log::{LogProvider, LOG_PROVIDER};
use crate::memory::{MemoryProvider, MEMORY_PROVIDER};
use crate::provider::{ProviderOptions, StoreProvider};
use std::sync::Arc;
use termstore_core::{Error, Result};
use tracing::info;

/// Factory for one kind of provider
pub trait ProviderController: Send + Sync {
    /// Name used for selection
    fn name(&self) -> &'static str;

    /// Create a stopped provider
    ///
    /// # Errors
    ///
    /// `ProviderUnavailable` if `options` cannot support this provider.
    fn create(&self, options: &ProviderOptions) -> Result<Arc<dyn StoreProvider>>;
}

/// Controller for [`MemoryProvider`]
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryController;

impl ProviderController for MemoryController {
    fn name(&self) -> &'static str {
        MEMORY_PROVIDER
    }

    fn create(&self, _options: &ProviderOptions) -> Result<Arc<dyn StoreProvider>> {
        Ok(Arc::new(MemoryProvider::new()))
    }
}

/// Controller for [`LogProvider`]; requires a data directory
#[derive(Debug, Default, Clone, Copy)]
pub struct LogController;

impl ProviderController for LogController {
    fn name(&self) -> &'static str {
        LOG_PROVIDER
    }

    fn create(&self, options: &ProviderOptions) -> Result<Arc<dyn StoreProvider>> {
        let dir = options.data_dir.as_ref().ok_or_else(|| {
            Error::ProviderUnavailable(format!("{} provider needs a data directory", LOG_PROVIDER))
        })?;
        Ok(Arc::new(LogProvider::new(dir.clone(), options.sync_on_write)))
    }
}

/// Scoring function that prefers one provider by name
///
/// Scores 1 for `name` and -1 (ineligible) for everything else.
pub fn score_by_name(name: &str) -> impl Fn(&dyn ProviderController) -> i32 + '_ {
    move |controller: &dyn ProviderController| if controller.name() == name { 1 } else { -1 }
}

/// Registry of provider controllers, in registration order
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    controllers: Vec<Arc<dyn ProviderController>>,
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the memory and log controllers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MemoryController));
        registry.register(Arc::new(LogController));
        registry
    }

    /// Register a controller, replacing any with the same name
    pub fn register(&mut self, controller: Arc<dyn ProviderController>) {
        match self
            .controllers
            .iter()
            .position(|c| c.name() == controller.name())
        {
            Some(i) => self.controllers[i] = controller,
            None => self.controllers.push(controller),
        }
    }

    /// Controller by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ProviderController>> {
        self.controllers.iter().find(|c| c.name() == name).cloned()
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.controllers.iter().map(|c| c.name()).collect()
    }

    /// Number of registered controllers
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// The controller with the highest non-negative score
    ///
    /// # Errors
    ///
    /// `ProviderUnavailable` if every controller scores negative or none is registered.
    pub fn select<F>(&self, score: F) -> Result<Arc<dyn ProviderController>>
    where
        F: Fn(&dyn ProviderController) -> i32,
    {
        let mut best: Option<(i32, &Arc<dyn ProviderController>)> = None;
        for controller in &self.controllers {
            let s = score(controller.as_ref());
            if s < 0 {
                continue;
            }
            if best.map_or(true, |(top, _)| s > top) {
                best = Some((s, controller));
            }
        }
        match best {
            Some((s, controller)) => {
                info!(provider = controller.name(), score = s, "selected store provider");
                Ok(Arc::clone(controller))
            }
            None => Err(Error::ProviderUnavailable(format!(
                "no eligible provider among {:?}",
                self.names()
            ))),
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("controllers", &self.names())
            .finish()
    }
}
