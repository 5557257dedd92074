//! EntityService struct and open/start/stop logic
//!
//! The service orchestrates:
//! - Provider selection and lifecycle
//! - Identity and stamp directories
//! - The semantic index
//! - Recovery of all of the above on start: nid assignments from
//!   `identities.log`, then stamps and the index from stored chronologies
//! - Bootstrap of the well-known terms
//!
//! ## Writes
//!
//! Every write goes through the provider's per-nid read-modify-write: the
//! stored chronology is decoded, the version appended and the result
//! re-encoded while the nid is locked. Writers of different nids never
//! contend.
//!
//! ## Reads
//!
//! Reads decode a snapshot of the stored bytes and resolve visibility with
//! a `StampCalculator`. They take no service-level locks.

pub mod config;
mod registry;

pub use config::{StoreConfig, CONFIG_FILE_NAME};
pub use registry::OPEN_SERVICES;

use crate::index::SemanticIndex;
use crate::processor::EntityProcessor;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use termstore_coordinate::{LogicCoordinate, PremiseType, StampCalculator, StampCoordinate};
use termstore_core::terms::{
    ACTIVE_STATE, ALL_TERMS, DESCRIPTION_NOT_CASE_SENSITIVE, DESCRIPTION_PATTERN, ENGLISH_LANGUAGE,
    FULLY_QUALIFIED_NAME_TYPE, PRIMORDIAL_MODULE, PRIMORDIAL_PATH, USER,
};
use termstore_core::{
    Error, Latest, Nid, PublicId, Result, Stamp, StampSource, Term, TextLookup, Timestamp, Uuid,
    UuidSource,
};
use termstore_entity::{
    Description, Entity, EntityHeader, EntityKind, EntitySource, EntityVersion, LogicGraph,
    VersionData,
};
use termstore_storage::{
    score_by_name, IdentityDirectory, IdentityLog, MemoryController, ProviderController,
    ProviderRegistry, StampDirectory, StoreProvider, Traversal,
};
use tracing::{debug, info, warn};

/// Versioned entity store
///
/// Thread safety: every method takes `&self`; share the service as an
/// `Arc<EntityService>` across threads.
pub struct EntityService {
    /// Canonical data directory (None for ephemeral services)
    data_dir: Option<PathBuf>,
    config: StoreConfig,
    provider: Arc<dyn StoreProvider>,
    ids: IdentityDirectory,
    /// Durable nid assignments (None for ephemeral services)
    identity_log: Option<Arc<IdentityLog>>,
    stamps: StampDirectory,
    index: SemanticIndex,
    /// Exclusive lock on `<data_dir>/.lock`, held for the life of the service
    _lock_file: Option<std::fs::File>,
}

impl EntityService {
    /// Open a store at the given path
    ///
    /// Reads `termstore.toml` from the data directory, writing a default one
    /// first if none exists. Returns the already-open instance if this path
    /// is open in the process, restarting it if it was stopped.
    ///
    /// # Errors
    ///
    /// `Config` for an invalid config file; I/O, corruption and provider
    /// errors from starting.
    ///
    /// # Example
    ///
    /// ```text
    /// use termstore_engine::EntityService;
    ///
    /// let service = EntityService::open("/path/to/data")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        StoreConfig::write_default_if_missing(&config_path)?;
        let cfg = StoreConfig::from_file(&config_path)?;

        Self::open_with_registry(data_dir, cfg, &ProviderRegistry::with_defaults())
    }

    /// Open a store at the given path with an explicit configuration
    ///
    /// The configuration is written to `termstore.toml` so that a later
    /// [`open`](Self::open) picks up the same settings.
    pub fn open_with_config<P: AsRef<Path>>(path: P, cfg: StoreConfig) -> Result<Arc<Self>> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        cfg.validate()?;
        cfg.write_to_file(&data_dir.join(CONFIG_FILE_NAME))?;

        Self::open_with_registry(data_dir, cfg, &ProviderRegistry::with_defaults())
    }

    /// Open a store, selecting the configured provider from `registry`
    ///
    /// # Thread Safety
    ///
    /// Uses a global registry so the same path returns the same instance.
    pub fn open_with_registry<P: AsRef<Path>>(
        path: P,
        cfg: StoreConfig,
        registry: &ProviderRegistry,
    ) -> Result<Arc<Self>> {
        cfg.validate_with(registry)?;
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        let canonical_path = data_dir.canonicalize()?;

        // Held for the whole open so two threads cannot both create a service
        let mut open = OPEN_SERVICES.lock();

        if let Some(existing) = open.get(&canonical_path).and_then(|weak| weak.upgrade()) {
            info!(target: "termstore::service", path = ?canonical_path, "Returning existing entity service");
            if !existing.running() {
                existing.start()?;
            }
            return Ok(existing);
        }

        let lock_path = canonical_path.join(".lock");
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)?;
        fs2::FileExt::try_lock_exclusive(&lock_file).map_err(|_| {
            Error::ProviderUnavailable(format!(
                "store at '{}' is already in use by another process",
                canonical_path.display()
            ))
        })?;

        let controller = registry.select(score_by_name(&cfg.provider))?;
        let provider = controller.create(&cfg.provider_options(Some(&canonical_path)))?;
        let identity_log = IdentityLog::open(&canonical_path, cfg.sync_on_write)?;
        let service = Arc::new(Self::new(
            Some(canonical_path.clone()),
            cfg,
            provider,
            Some(Arc::new(identity_log)),
            Some(lock_file),
        ));
        service.start()?;

        open.insert(canonical_path, Arc::downgrade(&service));
        Ok(service)
    }

    /// Started in-memory service with no data directory
    ///
    /// Ephemeral services are independent instances and never registered.
    pub fn ephemeral() -> Result<Arc<Self>> {
        let cfg = StoreConfig::ephemeral();
        let provider = MemoryController.create(&cfg.provider_options(None))?;
        let service = Arc::new(Self::new(None, cfg, provider, None, None));
        service.start()?;
        Ok(service)
    }

    fn new(
        data_dir: Option<PathBuf>,
        config: StoreConfig,
        provider: Arc<dyn StoreProvider>,
        identity_log: Option<Arc<IdentityLog>>,
        lock_file: Option<std::fs::File>,
    ) -> Self {
        let ids = match &identity_log {
            Some(log) => IdentityDirectory::with_journal(log.clone()),
            None => IdentityDirectory::new(),
        };
        EntityService {
            data_dir,
            config,
            provider,
            ids,
            identity_log,
            stamps: StampDirectory::new(),
            index: SemanticIndex::new(),
            _lock_file: lock_file,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the provider, replay nid assignments, rebuild directories and
    /// index, bootstrap terms
    ///
    /// On failure the provider is stopped again.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if started; I/O and corruption errors from recovery.
    pub fn start(&self) -> Result<()> {
        let started = Instant::now();
        self.provider.start()?;
        let recovered = self
            .replay_identities()
            .and_then(|_| self.recover())
            .and_then(|_| self.bootstrap());
        if let Err(e) = recovered {
            warn!(target: "termstore::service", error = %e, "start failed, stopping provider");
            self.provider.stop()?;
            return Err(e);
        }
        info!(
            target: "termstore::service",
            provider = self.provider.name(),
            entities = self.provider.len(),
            nids = self.ids.len(),
            stamps = self.stamps.len(),
            semantics = self.index.semantic_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Entity service started"
        );
        Ok(())
    }

    /// Stop the provider
    ///
    /// # Errors
    ///
    /// `NotRunning` if already stopped.
    pub fn stop(&self) -> Result<()> {
        self.provider.stop()?;
        info!(target: "termstore::service", provider = self.provider.name(), "Entity service stopped");
        Ok(())
    }

    /// True while the provider is running
    pub fn running(&self) -> bool {
        self.provider.running()
    }

    /// Restore every logged nid assignment, written or not
    fn replay_identities(&self) -> Result<()> {
        let Some(log) = &self.identity_log else {
            return Ok(());
        };
        for (nid, public_id) in log.replay()? {
            self.ids.restore(nid, &public_id)?;
        }
        Ok(())
    }

    /// Restore identities, stamps and the semantic index from the provider
    fn recover(&self) -> Result<()> {
        self.index.clear();
        let failure: Mutex<Option<Error>> = Mutex::new(None);
        self.provider.for_each(Traversal::Sequential, &|nid, bytes| {
            if let Err(e) = self.restore_entity(nid, bytes) {
                warn!(target: "termstore::service", nid = %nid, error = %e, "Failed to restore chronology");
                failure.lock().get_or_insert(e);
            }
        })?;
        match failure.into_inner() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn restore_entity(&self, nid: Nid, bytes: &[u8]) -> Result<()> {
        let (header, _) = EntityHeader::read(bytes)?;
        if header.nid != nid {
            return Err(Error::Corruption(format!(
                "chronology {} stored under nid {}",
                header.nid, nid
            )));
        }
        self.ids.restore(nid, &header.public_id)?;
        match header.kind {
            EntityKind::Stamp => {
                let stamp = Entity::from_bytes(bytes)?.as_stamp().ok_or_else(|| {
                    Error::Corruption(format!("stamp chronology {} has no stamp version", nid))
                })?;
                self.stamps.restore(nid, stamp);
            }
            kind => {
                if let Some((component, pattern)) = kind.semantic_key() {
                    self.index.insert(component, pattern, nid);
                }
            }
        }
        Ok(())
    }

    /// Write a concept and its fully qualified name for every well-known
    /// term not yet stored
    fn bootstrap(&self) -> Result<()> {
        let terms = ALL_TERMS
            .iter()
            .map(|term| -> Result<(Term, Nid)> { Ok((*term, self.nid_for_term(*term)?)) })
            .collect::<Result<Vec<_>>>()?;
        let missing: Vec<&(Term, Nid)> = terms
            .iter()
            .filter(|(_, nid)| !self.provider.contains(*nid))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let stamp_nid = self.intern_stamp(Stamp::new(
            self.nid_for_term(ACTIVE_STATE)?,
            Timestamp::PREMUNDANE,
            self.nid_for_term(USER)?,
            self.nid_for_term(PRIMORDIAL_MODULE)?,
            self.nid_for_term(PRIMORDIAL_PATH)?,
        ))?;
        let language = self.nid_for_term(ENGLISH_LANGUAGE)?;
        let case_significance = self.nid_for_term(DESCRIPTION_NOT_CASE_SENSITIVE)?;
        let description_type = self.nid_for_term(FULLY_QUALIFIED_NAME_TYPE)?;

        for (term, nid) in &missing {
            self.create_concept(&term.public_id(), stamp_nid)?;
            let name_id = PublicId::from_uuid(Uuid::new_v5(&term.uuid(), b"fully qualified name"));
            self.add_description(
                &name_id,
                *nid,
                stamp_nid,
                Description {
                    language,
                    text: term.name().to_string(),
                    case_significance,
                    description_type,
                },
            )?;
        }
        info!(target: "termstore::service", terms = missing.len(), "Bootstrapped well-known terms");
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Canonical data directory (None for ephemeral services)
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Configuration in force
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Name of the running provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Number of stored chronologies (stamps included)
    pub fn entity_count(&self) -> usize {
        self.provider.len()
    }

    /// The nid <-> UUID directory
    pub fn identities(&self) -> &IdentityDirectory {
        &self.ids
    }

    /// Interned stamps
    pub fn stamps(&self) -> &StampDirectory {
        &self.stamps
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Nid for a component named by `uuids`, assigning one if needed
    pub fn nid_for_uuids(&self, uuids: &[Uuid]) -> Result<Nid> {
        self.ids.nid_for_uuids(uuids)
    }

    /// Nid for `public_id`, assigning one if needed
    pub fn nid_for_public_id(&self, public_id: &PublicId) -> Result<Nid> {
        self.ids.nid_for_public_id(public_id)
    }

    /// Nid of a well-known term
    pub fn nid_for_term(&self, term: Term) -> Result<Nid> {
        self.ids.nid_for_public_id(&term.public_id())
    }

    /// Add UUIDs to a component, updating its stored chronology if any
    ///
    /// # Errors
    ///
    /// `NidNotFound` if `nid` was never assigned; `InvalidOperation` if a
    /// UUID already names another component.
    pub fn merge_uuids(&self, nid: Nid, uuids: &[Uuid]) -> Result<PublicId> {
        let merged = self.ids.merge_uuids(nid, uuids)?;
        if self.provider.contains(nid) {
            self.provider.update(nid, &mut |current| {
                let bytes = current.ok_or(Error::NidNotFound(nid))?;
                let mut entity = Entity::from_bytes(bytes)?;
                entity.merge_public_id(&merged);
                entity.to_bytes()
            })?;
        }
        Ok(merged)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Intern a stamp and persist it as a stamp chronology if new
    ///
    /// Equal tuples always intern to the same nid.
    pub fn intern_stamp(&self, stamp: Stamp) -> Result<Nid> {
        let (nid, created) = self.stamps.intern(&self.ids, stamp)?;
        if created || !self.provider.contains(nid) {
            let public_id = self.ids.public_id(nid)?;
            self.provider.update(nid, &mut |current| match current {
                Some(bytes) => Ok(bytes.to_vec()),
                None => Entity::stamp(nid, public_id.clone(), stamp).to_bytes(),
            })?;
        }
        Ok(nid)
    }

    /// Append `version` to the chronology named by `public_id`
    ///
    /// Creates the chronology with `kind` on first write. Returns its nid.
    ///
    /// # Errors
    ///
    /// - `NidNotFound` if the version's stamp was never interned
    /// - `InvalidOperation` if `kind` is `Stamp` or differs from the stored kind
    /// - `IncompatibleVersion` if `kind` does not accept the version
    pub fn append_version(
        &self,
        public_id: &PublicId,
        kind: EntityKind,
        version: EntityVersion,
    ) -> Result<Nid> {
        if kind == EntityKind::Stamp {
            return Err(Error::InvalidOperation(
                "stamp chronologies are written by intern_stamp".to_string(),
            ));
        }
        if !self.stamps.contains(version.stamp_nid()) {
            return Err(Error::NidNotFound(version.stamp_nid()));
        }
        let nid = self.ids.nid_for_public_id(public_id)?;
        let known = self.ids.public_id(nid)?;

        self.provider.update(nid, &mut |current| {
            let mut entity = match current {
                Some(bytes) => Entity::from_bytes(bytes)?,
                None => Entity::new(nid, known.clone(), kind),
            };
            if *entity.kind() != kind {
                return Err(Error::InvalidOperation(format!(
                    "{} is a {} chronology, cannot write it as {}",
                    nid,
                    entity.kind().name(),
                    kind.name()
                )));
            }
            entity.merge_public_id(&known);
            entity.append_version(version.clone())?;
            entity.to_bytes()
        })?;

        if let Some((component, pattern)) = kind.semantic_key() {
            self.index.insert(component, pattern, nid);
        }
        Ok(nid)
    }

    /// Append a concept version
    pub fn create_concept(&self, public_id: &PublicId, stamp_nid: Nid) -> Result<Nid> {
        self.append_version(public_id, EntityKind::Concept, EntityVersion::concept(stamp_nid))
    }

    /// Append a version to a semantic of `pattern` about `component`
    pub fn add_semantic(
        &self,
        public_id: &PublicId,
        pattern: Nid,
        component: Nid,
        version: EntityVersion,
    ) -> Result<Nid> {
        let kind = EntityKind::semantic(pattern, component, version.kind())?;
        self.append_version(public_id, kind, version)
    }

    /// Append a description version for `concept`
    pub fn add_description(
        &self,
        public_id: &PublicId,
        concept: Nid,
        stamp_nid: Nid,
        description: Description,
    ) -> Result<Nid> {
        let pattern = self.nid_for_term(DESCRIPTION_PATTERN)?;
        let version = EntityVersion::new(stamp_nid, VersionData::Description(description));
        self.add_semantic(public_id, pattern, concept, version)
    }

    /// Append a definition graph for `concept` under the EL++ axioms pattern of `premise`
    pub fn add_axioms(
        &self,
        public_id: &PublicId,
        concept: Nid,
        premise: PremiseType,
        stamp_nid: Nid,
        graph: LogicGraph,
    ) -> Result<Nid> {
        let pattern = self.logic_coordinate()?.premise_pattern(premise);
        let version = EntityVersion::new(stamp_nid, VersionData::LogicGraph(graph));
        self.add_semantic(public_id, pattern, concept, version)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// The stored chronology of `nid`
    ///
    /// # Errors
    ///
    /// `NidNotFound` if nothing is stored; `NotRunning` if stopped; codec
    /// errors if the bytes do not decode.
    pub fn get_entity(&self, nid: Nid) -> Result<Entity> {
        Entity::from_bytes(&self.provider.get(nid)?)
    }

    /// The latest version(s) of `nid` visible from `coordinate`
    pub fn latest(&self, nid: Nid, coordinate: &StampCoordinate) -> Result<Latest<EntityVersion>> {
        let entity = self.get_entity(nid)?;
        let latest = StampCalculator::new(coordinate, &self.stamps).latest(&entity)?;
        Ok(latest.cloned())
    }

    /// Semantics of `pattern` whose referenced component is `component`
    pub fn semantic_nids_for_component_of_pattern(&self, component: Nid, pattern: Nid) -> Vec<Nid> {
        self.index.get(component, pattern)
    }

    /// The EL++ logic coordinate bound to this store's term nids
    pub fn logic_coordinate(&self) -> Result<LogicCoordinate> {
        LogicCoordinate::el_plus_plus(|term| self.nid_for_term(term))
    }

    /// Latest definition graph of `concept` under the EL++ logic coordinate
    pub fn axioms_version(
        &self,
        concept: Nid,
        premise: PremiseType,
        coordinate: &StampCoordinate,
    ) -> Result<Latest<EntityVersion>> {
        self.logic_coordinate()?
            .axioms_version(self, self, concept, premise, coordinate)
    }

    /// Human-readable form of an interned stamp
    pub fn describe_stamp(&self, stamp_nid: Nid) -> Result<String> {
        Ok(self.stamps.stamp(stamp_nid)?.describe(self))
    }

    /// Latest description text of `nid` by stamp time, from any path or module
    fn description_text(&self, nid: Nid) -> Option<String> {
        let pattern = self.ids.existing_nid(&DESCRIPTION_PATTERN.uuid()).ok()?;
        let semantics: Vec<Entity> = self
            .index
            .get(nid, pattern)
            .into_iter()
            .filter_map(|semantic| self.get_entity(semantic).ok())
            .collect();
        let mut best: Option<(Timestamp, &str)> = None;
        for semantic in &semantics {
            for version in semantic.versions() {
                let (description, stamp) = match (
                    version.as_description(),
                    self.stamps.stamp(version.stamp_nid()),
                ) {
                    (Some(d), Ok(s)) => (d, s),
                    _ => continue,
                };
                if best.map_or(true, |(time, _)| stamp.time > time) {
                    best = Some((stamp.time, description.text.as_str()));
                }
            }
        }
        best.map(|(_, text)| text.to_string())
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Hand every stored chronology to `processor`
    pub fn for_each(&self, traversal: Traversal, processor: &dyn EntityProcessor) -> Result<()> {
        let started = Instant::now();
        self.provider
            .for_each(traversal, &|nid, bytes| processor.process(nid, bytes))?;
        debug!(
            target: "termstore::service",
            traversal = traversal.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            report = %processor.report(),
            "Traversal complete"
        );
        Ok(())
    }

    /// [`for_each`](Self::for_each) with the configured traversal
    pub fn for_each_default(&self, processor: &dyn EntityProcessor) -> Result<()> {
        self.for_each(self.config.traversal_mode()?, processor)
    }
}

impl EntitySource for EntityService {
    fn entity(&self, nid: Nid) -> Result<Entity> {
        self.get_entity(nid)
    }

    fn semantic_nids_for_component_of_pattern(&self, component: Nid, pattern: Nid) -> Vec<Nid> {
        self.index.get(component, pattern)
    }
}

impl StampSource for EntityService {
    fn stamp(&self, stamp_nid: Nid) -> Result<Stamp> {
        self.stamps.stamp(stamp_nid)
    }
}

impl UuidSource for EntityService {
    fn public_id(&self, nid: Nid) -> Result<PublicId> {
        self.ids.public_id(nid)
    }
}

impl TextLookup for EntityService {
    fn text(&self, nid: Nid) -> String {
        self.description_text(nid)
            .unwrap_or_else(|| self.ids.text(nid))
    }
}

impl std::fmt::Debug for EntityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityService")
            .field("data_dir", &self.data_dir)
            .field("provider", &self.provider.name())
            .field("running", &self.provider.running())
            .field("nids", &self.ids.len())
            .finish()
    }
}

impl Drop for EntityService {
    fn drop(&mut self) {
        if self.provider.running() {
            if let Err(e) = self.provider.stop() {
                warn!(target: "termstore::service", error = %e, "Failed to stop provider on drop");
            }
        }
    }
}
