//! Name-indexed collector registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use dns_inventory_core::CollectorKind;

use crate::error::{CollectorError, Result};
use crate::traits::Collector;

/// Thread-safe set of registered collectors, keyed by [`Collector::name`].
///
/// Registrations happen during startup; lookups during steady state.
pub struct CollectorRegistry {
    collectors: RwLock<HashMap<String, Arc<dyn Collector>>>,
}

impl CollectorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collectors: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a collector.
    ///
    /// # Errors
    /// Returns [`CollectorError::AlreadyRegistered`] on a name collision, or
    /// the collector's own error if `validate()` fails.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let mut collectors = self
            .collectors
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let name = collector.name();
        if collectors.contains_key(name) {
            return Err(CollectorError::AlreadyRegistered(name.to_string()));
        }

        collector.validate()?;

        collectors.insert(name.to_string(), collector);
        Ok(())
    }

    /// Looks up a collector by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Collector>> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// All collectors of the given kind.
    #[must_use]
    pub fn by_kind(&self, kind: CollectorKind) -> Vec<Arc<dyn Collector>> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|c| c.kind() == kind)
            .cloned()
            .collect()
    }

    /// All collectors for the given provider label.
    #[must_use]
    pub fn by_source(&self, source: &str) -> Vec<Arc<dyn Collector>> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|c| c.source() == source)
            .cloned()
            .collect()
    }

    /// All registered collectors.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<dyn Collector>> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Names of all registered collectors.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use dns_inventory_core::CollectionResult;
    use tokio_util::sync::CancellationToken;

    use super::*;

    struct StubCollector {
        name: &'static str,
        kind: CollectorKind,
        source: &'static str,
        valid: bool,
    }

    #[async_trait]
    impl Collector for StubCollector {
        fn name(&self) -> &'static str {
            self.name
        }

        fn kind(&self) -> CollectorKind {
            self.kind
        }

        fn source(&self) -> &'static str {
            self.source
        }

        fn validate(&self) -> Result<()> {
            if self.valid {
                Ok(())
            } else {
                Err(CollectorError::MissingConfig("STUB_TOKEN"))
            }
        }

        async fn collect(&self, _cancel: &CancellationToken) -> Result<CollectionResult> {
            Ok(CollectionResult::begin())
        }
    }

    fn stub(name: &'static str, kind: CollectorKind, source: &'static str) -> Arc<dyn Collector> {
        Arc::new(StubCollector {
            name,
            kind,
            source,
            valid: true,
        })
    }

    #[test]
    fn register_and_get() {
        let registry = CollectorRegistry::new();
        registry
            .register(stub("a_dns", CollectorKind::DnsRecords, "A"))
            .unwrap();

        assert!(registry.get("a_dns").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = CollectorRegistry::new();
        registry
            .register(stub("a_dns", CollectorKind::DnsRecords, "A"))
            .unwrap();

        let err = registry
            .register(stub("a_dns", CollectorKind::Domains, "B"))
            .unwrap_err();
        assert!(matches!(err, CollectorError::AlreadyRegistered(name) if name == "a_dns"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn failed_validation_is_not_registered() {
        let registry = CollectorRegistry::new();
        let err = registry
            .register(Arc::new(StubCollector {
                name: "broken",
                kind: CollectorKind::DnsRecords,
                source: "X",
                valid: false,
            }))
            .unwrap_err();

        assert!(matches!(err, CollectorError::MissingConfig("STUB_TOKEN")));
        assert!(registry.is_empty());
    }

    #[test]
    fn lookup_by_kind_and_source() {
        let registry = CollectorRegistry::new();
        registry
            .register(stub("a_dns", CollectorKind::DnsRecords, "A"))
            .unwrap();
        registry
            .register(stub("a_domains", CollectorKind::Domains, "A"))
            .unwrap();
        registry
            .register(stub("b_dns", CollectorKind::DnsRecords, "B"))
            .unwrap();

        assert_eq!(registry.by_kind(CollectorKind::DnsRecords).len(), 2);
        assert_eq!(registry.by_kind(CollectorKind::Domains).len(), 1);
        assert_eq!(registry.by_source("A").len(), 2);
        assert_eq!(registry.by_source("C").len(), 0);
        assert_eq!(registry.all().len(), 3);

        let mut names = registry.names();
        names.sort();
        assert_eq!(names, ["a_dns", "a_domains", "b_dns"]);
    }
}
