//! Name-to-descriptor registry shared by the runtime and code generators.
//!
//! The registry has two phases. During registration, types and collection
//! references are added; [`TypeRegistry::freeze`] ends that phase and any
//! later registration fails with [`RegistryError::Frozen`]. Reads work in both
//! phases.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ObjectConfig;
use crate::descriptor::{ObjectTypeDescriptor, SmrtObject};
use crate::error::RegistryError;
use crate::fields::FieldTable;
use crate::naming;

/// Opaque handle to a type's collection, downcast by whoever registered it.
pub type CollectionRef = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    types: BTreeMap<String, Arc<ObjectTypeDescriptor>>,
    collections: BTreeMap<String, CollectionRef>,
    frozen: bool,
}

/// Thread-safe store of registered object types.
#[derive(Default)]
pub struct TypeRegistry {
    state: RwLock<RegistryState>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a descriptor.
    ///
    /// Returns `Ok(false)` without replacing anything if the name is already
    /// registered.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Frozen`] after [`freeze`](Self::freeze), and
    /// [`RegistryError::InvalidTypeName`] for names or table names that are not
    /// valid identifiers.
    pub fn register(&self, descriptor: ObjectTypeDescriptor) -> Result<bool, RegistryError> {
        if !naming::is_valid_identifier(&descriptor.name) {
            return Err(RegistryError::InvalidTypeName(descriptor.name));
        }
        if !naming::is_valid_identifier(&descriptor.table_name) {
            return Err(RegistryError::InvalidTypeName(descriptor.table_name));
        }

        let mut state = self.write();
        if state.frozen {
            return Err(RegistryError::Frozen(descriptor.name));
        }
        if state.types.contains_key(&descriptor.name) {
            tracing::debug!(type_name = %descriptor.name, "type already registered, skipping");
            return Ok(false);
        }

        tracing::info!(
            type_name = %descriptor.name,
            table = %descriptor.table_name,
            fields = descriptor.fields.len(),
            "registered object type"
        );
        state
            .types
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(true)
    }

    /// Extracts and registers a declared type in one step.
    pub fn register_type<T: SmrtObject>(&self) -> Result<bool, RegistryError> {
        self.register(ObjectTypeDescriptor::of::<T>())
    }

    /// Records the collection handle for `name`, replacing any previous one.
    pub fn register_collection(
        &self,
        name: &str,
        collection: CollectionRef,
    ) -> Result<(), RegistryError> {
        let mut state = self.write();
        if state.frozen {
            return Err(RegistryError::Frozen(name.to_string()));
        }
        state.collections.insert(name.to_string(), collection);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<ObjectTypeDescriptor>> {
        self.read().types.get(name).cloned()
    }

    /// Field table of `name`, or an empty table for unknown names.
    pub fn get_fields(&self, name: &str) -> FieldTable {
        self.read()
            .types
            .get(name)
            .map(|d| d.fields.clone())
            .unwrap_or_default()
    }

    /// Config of `name`, or the default config for unknown names.
    pub fn get_config(&self, name: &str) -> ObjectConfig {
        self.read()
            .types
            .get(name)
            .map(|d| d.config.clone())
            .unwrap_or_default()
    }

    /// All descriptors, ordered by name.
    pub fn get_all(&self) -> Vec<Arc<ObjectTypeDescriptor>> {
        self.read().types.values().cloned().collect()
    }

    pub fn get_collection(&self, name: &str) -> Option<CollectionRef> {
        self.read().collections.get(name).cloned()
    }

    /// Collection handle of `name` downcast to `C`.
    pub fn get_collection_as<C: Any + Send + Sync>(&self, name: &str) -> Option<Arc<C>> {
        self.get_collection(name)
            .and_then(|c| Arc::downcast::<C>(c).ok())
    }

    pub fn names(&self) -> Vec<String> {
        self.read().types.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().types.is_empty()
    }

    /// Ends the registration phase.
    pub fn freeze(&self) {
        let mut state = self.write();
        if !state.frozen {
            tracing::info!(types = state.types.len(), "registry frozen");
        }
        state.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.read().frozen
    }

    /// Removes every type and collection and reopens registration.
    pub fn clear(&self) {
        let mut state = self.write();
        state.types.clear();
        state.collections.clear();
        state.frozen = false;
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("TypeRegistry")
            .field("types", &state.types.keys().collect::<Vec<_>>())
            .field("collections", &state.collections.keys().collect::<Vec<_>>())
            .field("frozen", &state.frozen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::text;

    fn descriptor(name: &str) -> ObjectTypeDescriptor {
        ObjectTypeDescriptor::new(name, [text("name")].into_iter().collect())
    }

    #[test]
    fn test_register_and_read() {
        let registry = TypeRegistry::new();
        assert!(registry.register(descriptor("Product")).unwrap());
        assert!(registry.contains("Product"));
        assert!(!registry.contains("product"));
        assert_eq!(registry.get("Product").unwrap().table_name, "products");
        assert_eq!(registry.get_fields("Product").len(), 1);
        assert_eq!(registry.names(), vec!["Product"]);
    }

    #[test]
    fn test_duplicate_registration_is_skipped() {
        let registry = TypeRegistry::new();
        registry.register(descriptor("Product")).unwrap();
        let replacement = ObjectTypeDescriptor::new("Product", FieldTable::new());
        assert!(!registry.register(replacement).unwrap());
        assert_eq!(registry.get_fields("Product").len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_names_read_as_defaults() {
        let registry = TypeRegistry::new();
        assert!(registry.get("Ghost").is_none());
        assert!(registry.get_fields("Ghost").is_empty());
        assert_eq!(registry.get_config("Ghost"), ObjectConfig::default());
    }

    #[test]
    fn test_freeze_blocks_registration() {
        let registry = TypeRegistry::new();
        registry.register(descriptor("Product")).unwrap();
        registry.freeze();
        assert!(registry.is_frozen());
        assert_eq!(
            registry.register(descriptor("Order")),
            Err(RegistryError::Frozen("Order".to_string()))
        );
        assert!(registry.register_collection("Product", Arc::new(1u8)).is_err());
        assert!(registry.get("Product").is_some());
    }

    #[test]
    fn test_clear_empties_and_unfreezes() {
        let registry = TypeRegistry::new();
        registry.register(descriptor("Product")).unwrap();
        registry.register_collection("Product", Arc::new(7u32)).unwrap();
        registry.freeze();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get_fields("Product").is_empty());
        assert!(registry.get_collection("Product").is_none());
        assert!(!registry.is_frozen());
        assert!(registry.register(descriptor("Product")).unwrap());
    }

    #[test]
    fn test_collection_downcast() {
        let registry = TypeRegistry::new();
        registry
            .register_collection("Product", Arc::new(String::from("handle")))
            .unwrap();
        let handle = registry.get_collection_as::<String>("Product").unwrap();
        assert_eq!(handle.as_str(), "handle");
        assert!(registry.get_collection_as::<u32>("Product").is_none());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.register(descriptor("Bad Name")),
            Err(RegistryError::InvalidTypeName(_))
        ));
        let evil = descriptor("Evil").with_table_name("evil; DROP TABLE x");
        assert!(registry.register(evil).is_err());
    }
}
