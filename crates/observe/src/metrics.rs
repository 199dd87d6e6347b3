use {
    prometheus::Encoder,
    std::{collections::HashMap, sync::OnceLock},
};

/// Global metrics registry used by all components.
static REGISTRY: OnceLock<prometheus_metric_storage::StorageRegistry> = OnceLock::new();

/// Configure the global metrics registry.
///
/// This function allows specifying a common prefix that will be added
/// to all metric names, as well as common labels. It should be called
/// before any call to [`get_registry`]. Can be called multiple times in a
/// row, later calls are ignored, so tests can call it without coordinating.
///
/// # Panics
///
/// This function panics if registry configuration is invalid.
pub fn setup_registry_reentrant(prefix: Option<String>, labels: Option<HashMap<String, String>>) {
    let registry = prometheus::Registry::new_custom(prefix, labels).unwrap();
    let storage_registry = prometheus_metric_storage::StorageRegistry::new(registry);
    REGISTRY.set(storage_registry).ok();
}

/// Get the global instance of the metrics registry.
pub fn get_registry() -> &'static prometheus::Registry {
    get_storage_registry().registry()
}

/// Get the global instance of the metric storage registry.
///
/// # Implementation notice
///
/// If the global metrics registry was not configured with
/// [`setup_registry_reentrant`], it will be initialized using a default
/// value. We could've panicked instead, but panicking creates troubles for
/// unit tests. There is no way to set up a hook that will call
/// [`setup_registry_reentrant`] before each test, so we'd have to
/// initialize it manually before every test, which is tedious to say the
/// least.
pub fn get_storage_registry() -> &'static prometheus_metric_storage::StorageRegistry {
    REGISTRY.get_or_init(prometheus_metric_storage::StorageRegistry::default)
}

pub fn encode(registry: &prometheus::Registry) -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
