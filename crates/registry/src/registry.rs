//! Target observer registry
//!
//! Registrations live in a slab; two indexes map (category, name) and engine
//! observer handles back to slab keys. One mutex covers everything, including
//! the copy phase of a query.
//!
//! Registrations belong to one engine session. When the bridge's session
//! epoch moves on, every registration and database slot is dropped before the
//! next operation sees them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bridge::CallBridge;
use contracts::{
    BridgeBlueprint, ContractError, ObserverHandle, ObserverSpec, RawObservation,
    RegistrationState, TargetCategory, TargetName, TrackableRegistration, TrackingEngine,
    TrackingObservation,
};
use observability::metrics::{record_active_registrations, record_observations};
use slab::Slab;
use tracing::{debug, info, instrument, warn};

use crate::error::{RegistryError, Result};

#[derive(Debug)]
struct Entry {
    registration: TrackableRegistration,
    handle: Option<ObserverHandle>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// Single database slot per category
    databases: HashMap<TargetCategory, PathBuf>,
    entries: Slab<Entry>,
    names: HashMap<TargetCategory, HashMap<TargetName, usize>>,
    handles: HashMap<ObserverHandle, usize>,
    /// Bridge session epoch the contents belong to
    epoch: u64,
}

impl RegistryInner {
    /// Drop everything; returns how many registrations were discarded
    fn clear(&mut self) -> usize {
        let discarded = self.entries.len();
        self.databases.clear();
        self.entries.clear();
        self.names.clear();
        self.handles.clear();
        discarded
    }

    fn active_count(&self, category: TargetCategory) -> usize {
        self.names.get(&category).map_or(0, HashMap::len)
    }

    fn slot_of(&self, category: TargetCategory, name: &str) -> Option<usize> {
        self.names.get(&category)?.get(name).copied()
    }

    /// Observation belongs to an Active registration of this registry
    fn is_live(&self, observation: &RawObservation) -> bool {
        self.handles
            .get(&observation.observer)
            .and_then(|&key| self.entries.get(key))
            .is_some_and(|entry| {
                entry.registration.state == RegistrationState::Active
                    && entry.registration.category == observation.category
                    && entry.registration.name == observation.target_name
            })
    }
}

fn lock(mutex: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe registry of trackable targets
pub struct ObserverRegistry<E: TrackingEngine> {
    bridge: Arc<CallBridge<E>>,
    inner: Mutex<RegistryInner>,
}

impl<E: TrackingEngine> std::fmt::Debug for ObserverRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("ObserverRegistry")
            .field("databases", &inner.databases)
            .field("active", &inner.entries.len())
            .finish()
    }
}

impl<E: TrackingEngine> ObserverRegistry<E> {
    pub fn new(bridge: Arc<CallBridge<E>>) -> Self {
        Self {
            bridge,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    pub fn bridge(&self) -> &Arc<CallBridge<E>> {
        &self.bridge
    }

    /// Lock the registry, discarding state left over from an ended session
    fn session(&self) -> MutexGuard<'_, RegistryInner> {
        let mut inner = lock(&self.inner);
        let epoch = self.bridge.session_epoch();
        if inner.epoch != epoch {
            let discarded = inner.clear();
            inner.epoch = epoch;
            if discarded > 0 {
                for category in TargetCategory::ALL {
                    record_active_registrations(category, 0);
                }
            }
            info!(discarded, epoch, "engine session ended; registrations invalidated");
        }
        inner
    }

    /// Load a target database for a category.
    ///
    /// Loading the path already in the slot is a no-op. A different path
    /// replaces the slot for subsequent `create_observer` calls; existing
    /// observers keep running.
    #[instrument(
        name = "registry_load_database",
        skip(self, category, path),
        fields(category = %category, path = %path.display())
    )]
    pub fn load_database(&self, category: TargetCategory, path: &Path) -> Result<()> {
        let mut inner = self.session();
        if inner.databases.get(&category).map(PathBuf::as_path) == Some(path) {
            debug!("database already loaded");
            return Ok(());
        }

        let targets = self.bridge.load_database(category, path)?;
        if let Some(previous) = inner.databases.insert(category, path.to_path_buf()) {
            info!(previous = %previous.display(), "database slot replaced");
        }
        info!(targets, "database loaded");
        Ok(())
    }

    pub fn database_for(&self, category: TargetCategory) -> Option<PathBuf> {
        self.session().databases.get(&category).cloned()
    }

    /// Register a target and create its engine observer.
    ///
    /// `guide_view` applies to model targets only and is ignored otherwise.
    ///
    /// # Errors
    /// `InvalidName`, `DatabaseNotLoaded`, `DuplicateName`, or the engine's
    /// refusal as `EngineRejected`.
    #[instrument(
        name = "registry_create_observer",
        skip(self, category, guide_view),
        fields(category = %category)
    )]
    pub fn create_observer(
        &self,
        category: TargetCategory,
        name: &str,
        guide_view: Option<&str>,
    ) -> Result<ObserverHandle> {
        let target_name = TargetName::try_new(name).map_err(|e| match e {
            ContractError::InvalidTargetName { name, message } => {
                RegistryError::InvalidName { name, message }
            }
            other => RegistryError::invalid_name(name, other.to_string()),
        })?;

        let mut inner = self.session();
        let database_path = inner
            .databases
            .get(&category)
            .cloned()
            .ok_or(RegistryError::DatabaseNotLoaded { category })?;
        if inner.slot_of(category, name).is_some() {
            warn!(name, "duplicate target registration");
            return Err(RegistryError::duplicate(category, name));
        }

        let guide_view_name = match (category, guide_view) {
            (TargetCategory::Model, view) => view.map(str::to_owned),
            (TargetCategory::Planar, Some(view)) => {
                debug!(view, "guide view ignored for planar target");
                None
            }
            (TargetCategory::Planar, None) => None,
        };

        let key = inner.entries.insert(Entry {
            registration: TrackableRegistration {
                name: target_name.clone(),
                category,
                database_path: database_path.clone(),
                guide_view_name: guide_view_name.clone(),
                state: RegistrationState::Pending,
            },
            handle: None,
        });

        let spec = ObserverSpec {
            category,
            database_path,
            target_name: target_name.clone(),
            guide_view_name,
        };
        let handle = match self.bridge.create_observer(&spec) {
            Ok(handle) => handle,
            Err(e) => {
                inner.entries.remove(key);
                warn!(name, error = %e, "engine refused observer");
                return Err(e.into());
            }
        };

        let entry = &mut inner.entries[key];
        entry.registration.state = RegistrationState::Active;
        entry.handle = Some(handle);
        inner.names.entry(category).or_default().insert(target_name, key);
        inner.handles.insert(handle, key);

        let active = inner.active_count(category);
        record_active_registrations(category, active);
        info!(name, handle = handle.0, active, "target observer created");
        Ok(handle)
    }

    /// Destroy a target's observer. Unknown names are a no-op.
    ///
    /// Returns whether a registration was destroyed.
    #[instrument(
        name = "registry_destroy_observer",
        skip(self, category),
        fields(category = %category)
    )]
    pub fn destroy_observer(&self, category: TargetCategory, name: &str) -> bool {
        let mut inner = self.session();
        let Some(key) = inner
            .names
            .get_mut(&category)
            .and_then(|names| names.remove(name))
        else {
            debug!(name, "destroy ignored: target not registered");
            return false;
        };

        let mut entry = inner.entries.remove(key);
        if let Some(handle) = entry.handle {
            inner.handles.remove(&handle);
            if !self.bridge.destroy_observer(handle) {
                debug!(handle = handle.0, "engine observer already released");
            }
        }
        entry.registration.state = RegistrationState::Destroyed;

        record_active_registrations(category, inner.active_count(category));
        info!(name, state = ?entry.registration.state, "target observer destroyed");
        true
    }

    /// Destroy every registration; returns how many were destroyed
    #[instrument(name = "registry_destroy_all", skip(self))]
    pub fn destroy_all(&self) -> usize {
        let mut inner = self.session();
        let mut destroyed = 0;
        for entry in inner.entries.drain() {
            if let Some(handle) = entry.handle {
                self.bridge.destroy_observer(handle);
            }
            destroyed += 1;
        }
        inner.names.clear();
        inner.handles.clear();

        for category in TargetCategory::ALL {
            record_active_registrations(category, 0);
        }
        info!(destroyed, "all target observers destroyed");
        destroyed
    }

    /// Destroy every registration, then end the bridge's engine session.
    ///
    /// Database slots are dropped as well; the next session loads them again.
    /// Returns how many registrations were destroyed.
    #[instrument(name = "registry_shutdown", skip(self))]
    pub fn shutdown(&self) -> usize {
        let mut inner = self.session();
        for (_, entry) in &inner.entries {
            if let Some(handle) = entry.handle {
                self.bridge.destroy_observer(handle);
            }
        }
        let destroyed = inner.clear();
        self.bridge.shutdown();
        inner.epoch = self.bridge.session_epoch();

        for category in TargetCategory::ALL {
            record_active_registrations(category, 0);
        }
        info!(destroyed, "registry shut down");
        destroyed
    }

    /// Tracked observations of one category from the latest engine state.
    ///
    /// At most `max_results` entries in engine order. NotTracked
    /// observations are skipped, as are observations for names that are no
    /// longer Active here. The snapshot is released before returning.
    #[instrument(
        level = "debug",
        name = "registry_query_observations",
        skip(self, category),
        fields(category = %category)
    )]
    pub fn query_observations(
        &self,
        category: TargetCategory,
        max_results: usize,
    ) -> Result<Vec<TrackingObservation>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let inner = self.session();
        let state = self.bridge.acquire_latest_state()?;

        let mut suppressed = 0usize;
        let mut results = Vec::with_capacity(max_results.min(state.observations().len()));
        for observation in state.observations() {
            if results.len() == max_results {
                break;
            }
            if observation.category != category || !observation.status.is_tracking() {
                continue;
            }
            if !inner.is_live(observation) {
                suppressed += 1;
                continue;
            }
            results.push(TrackingObservation {
                target_name: observation.target_name.clone(),
                category,
                pose: observation.pose,
                status: observation.status,
            });
        }
        state.release();
        drop(inner);

        if suppressed > 0 {
            debug!(suppressed, "observations for inactive targets suppressed");
        }
        record_observations(category, results.len());
        Ok(results)
    }

    /// Active registrations of a category, in creation order
    pub fn registrations(&self, category: TargetCategory) -> Vec<TrackableRegistration> {
        let inner = self.session();
        let mut active: Vec<_> = inner
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry.registration.category == category
                    && entry.registration.state == RegistrationState::Active
            })
            .map(|(_, entry)| (entry.handle, entry.registration.clone()))
            .collect();
        active.sort_by_key(|(handle, _)| *handle);
        active.into_iter().map(|(_, registration)| registration).collect()
    }

    pub fn is_registered(&self, category: TargetCategory, name: &str) -> bool {
        self.session().slot_of(category, name).is_some()
    }

    /// Active registrations across both categories
    pub fn len(&self) -> usize {
        self.session().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the blueprint's databases and register its targets.
    ///
    /// Returns the number of observers created. Stops at the first error;
    /// observers created before it stay registered.
    #[instrument(
        name = "registry_apply_blueprint",
        skip(self, blueprint),
        fields(databases = blueprint.databases.len(), targets = blueprint.targets.len())
    )]
    pub fn apply_blueprint(&self, blueprint: &BridgeBlueprint) -> Result<usize> {
        for database in &blueprint.databases {
            self.load_database(database.category, &database.path)?;
        }
        let mut created = 0;
        for target in &blueprint.targets {
            self.create_observer(target.category, &target.name, target.guide_view.as_deref())?;
            created += 1;
        }
        Ok(created)
    }
}
