use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::extension::export::ModuleUnit;
use crate::kernel::component::HostComponent;
use crate::kernel::error::Result as KernelResult;
use crate::utils;

/// What a delivered module left behind when its code ran.
#[derive(Debug)]
pub struct RegistrationEntry {
    pub id: String,
    pub unit: Arc<ModuleUnit>,
    /// Table generation this registration produced.
    pub generation: u64,
    pub registered_at: Instant,
}

/// Process-wide table that delivered code registers itself into.
///
/// Registration is decoupled from delivery: the host triggers delivery, the
/// delivered code registers whenever it runs. Each registration bumps a
/// generation counter published on a watch channel, which is the signal the
/// loader waits on.
pub struct RuntimeRegistrationTable {
    entries: RwLock<HashMap<String, Arc<RegistrationEntry>>>,
    signal: watch::Sender<u64>,
}

impl RuntimeRegistrationTable {
    pub fn new() -> Self {
        let (signal, _receiver) = watch::channel(0);
        Self {
            entries: RwLock::new(HashMap::new()),
            signal,
        }
    }

    /// Register (or re-register) a module. Last write wins.
    pub fn register(&self, id: impl Into<String>, unit: ModuleUnit) -> u64 {
        let id = id.into();
        let mut entries = utils::write(&self.entries);
        let generation = *self.signal.borrow() + 1;
        let entry = Arc::new(RegistrationEntry {
            id: id.clone(),
            unit: Arc::new(unit),
            generation,
            registered_at: Instant::now(),
        });
        let previous = entries.insert(id.clone(), entry);
        // Signal under the write lock so generations stay in registration order.
        self.signal.send_replace(generation);
        drop(entries);

        if previous.is_some() {
            log::warn!("Module '{}' registered again, replacing previous registration", id);
        } else {
            log::info!("Module '{}' registered (generation {})", id, generation);
        }
        generation
    }

    pub fn get(&self, id: &str) -> Option<Arc<RegistrationEntry>> {
        utils::read(&self.entries).get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        utils::read(&self.entries).contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn registered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = utils::read(&self.entries).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop the registration of a disabled module.
    pub fn unregister(&self, id: &str) -> Option<Arc<RegistrationEntry>> {
        let removed = utils::write(&self.entries).remove(id);
        if removed.is_some() {
            log::info!("Module '{}' unregistered", id);
        }
        removed
    }

    /// Remove every registration. Used at host teardown.
    pub fn clear(&self) {
        let mut entries = utils::write(&self.entries);
        log::debug!("Clearing {} runtime registration(s)", entries.len());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        utils::read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        utils::read(&self.entries).is_empty()
    }

    /// Current generation; grows with every registration.
    pub fn generation(&self) -> u64 {
        *self.signal.borrow()
    }

    /// Receiver notified after each registration.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.signal.subscribe()
    }
}

impl Default for RuntimeRegistrationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuntimeRegistrationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeRegistrationTable")
            .field("registered", &self.registered_ids())
            .field("generation", &self.generation())
            .finish()
    }
}

#[async_trait]
impl HostComponent for RuntimeRegistrationTable {
    fn name(&self) -> &'static str {
        "RuntimeRegistrationTable"
    }

    async fn stop(&self) -> KernelResult<()> {
        self.clear();
        Ok(())
    }
}

/// The registration entry point handed to delivered code.
#[derive(Debug, Clone)]
pub struct Registrar {
    table: Arc<RuntimeRegistrationTable>,
}

impl Registrar {
    pub fn new(table: Arc<RuntimeRegistrationTable>) -> Self {
        Self { table }
    }

    pub fn register(&self, id: impl Into<String>, unit: ModuleUnit) {
        self.table.register(id, unit);
    }
}
