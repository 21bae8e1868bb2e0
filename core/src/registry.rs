//! # Plugin Registry
//!
//! Process-wide catalog mapping `(kind, name)` to a plugin factory.
//!
//! Registration happens once, in an explicit bootstrap called from
//! `main`, before any dispatch; afterwards the registry is read-only
//! behind an `Arc` and lookups need no locking. Duplicate registration
//! is a fatal configuration error, never a silent override: masking a
//! name collision would hide a real integration bug.

use std::collections::BTreeMap;

use sixkit_common::config::{ParamSpec, PluginConfig};
use sixkit_common::error::{KitError, KitResult};
use sixkit_common::model::{Descriptor, PluginKind};

use crate::capability::PluginInstance;

/// Builds a fresh plugin instance from validated configuration.
pub type Factory = fn(&PluginConfig) -> KitResult<PluginInstance>;

/// Everything the registry knows about one plugin type.
#[derive(Debug)]
pub struct PluginSpec {
    pub descriptor: Descriptor,
    pub params: &'static [ParamSpec],
    pub factory: Factory,
}

#[derive(Default)]
pub struct Registry {
    specs: BTreeMap<(PluginKind, String), PluginSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: PluginSpec) -> KitResult<()> {
        let kind = spec.descriptor.kind;
        let name = spec.descriptor.name.clone();

        if name.is_empty() {
            return Err(KitError::ConfigValidation(format!(
                "refusing to register a {kind} plugin with an empty name"
            )));
        }
        if spec.descriptor.version.is_empty() {
            return Err(KitError::ConfigValidation(format!(
                "plugin {kind}/{name} declares an empty version"
            )));
        }

        if self.specs.contains_key(&(kind, name.clone())) {
            return Err(KitError::DuplicateRegistration { kind, name });
        }

        self.specs.insert((kind, name), spec);
        Ok(())
    }

    pub fn lookup(&self, kind: PluginKind, name: &str) -> KitResult<&PluginSpec> {
        self.specs
            .get(&(kind, name.to_string()))
            .ok_or_else(|| KitError::UnknownPlugin {
                kind,
                name: name.to_string(),
            })
    }

    /// Registered names of one kind, in sorted order.
    pub fn list(&self, kind: PluginKind) -> Vec<&str> {
        self.specs
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, name), _)| name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Dataset, PluginInstance};
    use crate::plugin::{LifecycleState, Plugin, PluginContext};
    use async_trait::async_trait;
    use sixkit_common::model::AddressSet;

    struct NullDataset {
        descriptor: Descriptor,
    }

    #[async_trait]
    impl Plugin for NullDataset {
        fn descriptor(&self) -> &Descriptor {
            &self.descriptor
        }

        fn state(&self) -> LifecycleState {
            LifecycleState::EnvironmentReady
        }

        async fn setup(&mut self, _ctx: &PluginContext) -> KitResult<()> {
            Ok(())
        }

        async fn clean(&mut self, _ctx: &PluginContext) -> KitResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Dataset for NullDataset {
        async fn download(&mut self, _ctx: &PluginContext) -> KitResult<AddressSet> {
            Ok(AddressSet::new("empty", Vec::new()))
        }
    }

    fn null_factory(_config: &PluginConfig) -> KitResult<PluginInstance> {
        Ok(PluginInstance::Dataset(Box::new(NullDataset {
            descriptor: Descriptor::new(PluginKind::Dataset, "null", "0.1.0", "test fixture"),
        })))
    }

    fn spec(name: &str) -> PluginSpec {
        PluginSpec {
            descriptor: Descriptor::new(PluginKind::Dataset, name, "0.1.0", "test fixture"),
            params: &[],
            factory: null_factory,
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = Registry::new();
        registry.register(spec("null")).unwrap();

        let err = registry.register(spec("null")).unwrap_err();
        assert!(matches!(err, KitError::DuplicateRegistration { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_is_stable_and_unknown_names_fail() {
        let mut registry = Registry::new();
        registry.register(spec("null")).unwrap();

        let first = registry.lookup(PluginKind::Dataset, "null").unwrap().factory;
        let second = registry.lookup(PluginKind::Dataset, "null").unwrap().factory;
        assert!(std::ptr::fn_addr_eq(first, second));

        let err = registry.lookup(PluginKind::Scan, "null").unwrap_err();
        assert!(matches!(err, KitError::UnknownPlugin { .. }));
    }

    #[test]
    fn list_is_sorted_per_kind() {
        let mut registry = Registry::new();
        registry.register(spec("zeta")).unwrap();
        registry.register(spec("alpha")).unwrap();

        assert_eq!(registry.list(PluginKind::Dataset), vec!["alpha", "zeta"]);
        assert!(registry.list(PluginKind::Analyze).is_empty());
    }
}
