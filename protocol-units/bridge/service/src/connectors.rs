//! Registry of connected networks, keyed by network name.

use bridge_util::{Connector, Network};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct Connectors<C> {
	inner: RwLock<HashMap<String, Arc<C>>>,
}

impl<C> Default for Connectors<C> {
	fn default() -> Self {
		Connectors { inner: RwLock::new(HashMap::new()) }
	}
}

impl<C: Connector> Connectors<C> {
	pub fn new() -> Self {
		Self::default()
	}

	fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<C>>> {
		self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<C>>> {
		self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Registers `connector` under its network name. Returns `false`, leaving the
	/// registry untouched, when the name is taken.
	pub fn insert(&self, connector: Arc<C>) -> bool {
		let name = connector.network().name;
		let mut connectors = self.write();
		if connectors.contains_key(&name) {
			return false;
		}
		connectors.insert(name, connector);
		true
	}

	pub fn remove(&self, name: &str) -> Option<Arc<C>> {
		self.write().remove(name)
	}

	pub fn get(&self, name: &str) -> Option<Arc<C>> {
		self.read().get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.read().contains_key(name)
	}

	/// Connected networks ordered by id.
	pub fn networks(&self) -> Vec<Network> {
		let mut networks: Vec<Network> = self.read().values().map(|c| c.network()).collect();
		networks.sort_by_key(|network| network.id);
		networks
	}

	pub fn len(&self) -> usize {
		self.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.read().is_empty()
	}
}
