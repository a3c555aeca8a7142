//! Strategy discovery
//!
//! Strategies are registered explicitly into a [`StrategyRegistry`]. The
//! process-wide registry returned by [`StrategyRegistry::global`] loads the
//! built-in set exactly once; implementations registered afterwards (plugins)
//! are visible to the next [`get_all`] or [`find`] call.

use super::{Bound, DynStrategy, Strategy};
use crate::error::{Result, StrategyError};
use crate::observability::{StrategyLogger, StrategyMetrics};
use crate::settings::{RawSettings, Settings, SettingsTypeInfo};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Builds a strategy instance from raw settings
pub type StrategyFactory = fn(&str, &RawSettings) -> Result<Box<dyn DynStrategy>>;

/// Global registry (built-ins loaded once)
static GLOBAL_REGISTRY: OnceLock<StrategyRegistry> = OnceLock::new();

/// Registration record of one strategy implementation
#[derive(Clone)]
pub struct StrategyDescriptor {
    name: String,
    settings_type: Option<SettingsTypeInfo>,
    factory: StrategyFactory,
}

fn build_bound<S: Strategy>(name: &str, raw: &RawSettings) -> Result<Box<dyn DynStrategy>> {
    let settings = S::Settings::from_raw(raw)?;
    Ok(Box::new(Bound::<S>::new(name, settings)))
}

impl StrategyDescriptor {
    /// Descriptor for a concrete strategy type
    pub fn of<S: Strategy>() -> Self {
        Self {
            name: S::NAME.trim().to_lowercase(),
            settings_type: Some(SettingsTypeInfo::of::<S::Settings>()),
            factory: build_bound::<S>,
        }
    }

    /// Hand-built descriptor, e.g. from a plugin loader
    pub fn from_parts(
        name: impl Into<String>,
        settings_type: Option<SettingsTypeInfo>,
        factory: StrategyFactory,
    ) -> Self {
        Self {
            name: name.into().trim().to_lowercase(),
            settings_type,
            factory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> String {
        super::title_case(&self.name)
    }

    /// Validate raw settings and construct the strategy
    pub fn build(&self, raw: &RawSettings) -> Result<Box<dyn DynStrategy>> {
        (self.factory)(&self.name, raw)
    }
}

impl fmt::Debug for StrategyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyDescriptor")
            .field("name", &self.name)
            .field(
                "settings_type",
                &self.settings_type.as_ref().map(SettingsTypeInfo::type_name),
            )
            .finish()
    }
}

/// Settings type a strategy was declared with
///
/// A descriptor without one is a defect in the implementation and is
/// reported as `MalformedDefinition`.
pub fn get_settings_type(descriptor: &StrategyDescriptor) -> Result<&SettingsTypeInfo> {
    descriptor.settings_type.as_ref().ok_or_else(|| {
        StrategyError::malformed(
            descriptor.name.clone(),
            "strategy does not declare a settings type",
        )
    })
}

/// Maps lower-cased strategy names to their descriptors
pub struct StrategyRegistry {
    entries: RwLock<BTreeMap<String, StrategyDescriptor>>,
}

impl StrategyRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry preloaded with the built-in strategies
    pub fn with_builtins() -> Result<Self> {
        let registry = Self::new();
        crate::strategies::register_builtins(&registry)?;
        Ok(registry)
    }

    /// Process-wide registry
    ///
    /// Panics on first use if a built-in strategy is malformed.
    pub fn global() -> &'static StrategyRegistry {
        GLOBAL_REGISTRY.get_or_init(|| {
            Self::with_builtins().expect("Failed to register built-in strategies")
        })
    }

    /// Register a concrete strategy type
    pub fn register_strategy<S: Strategy>(&self) -> Result<()> {
        self.register(StrategyDescriptor::of::<S>())
    }

    /// Register a descriptor, failing fast on defects and name collisions
    pub fn register(&self, descriptor: StrategyDescriptor) -> Result<()> {
        if descriptor.name.trim().is_empty() {
            let declared_by = descriptor
                .settings_type
                .as_ref()
                .map(SettingsTypeInfo::type_name)
                .unwrap_or("<unnamed>");
            return Err(StrategyError::malformed(declared_by, "strategy name is empty"));
        }
        let settings_type = get_settings_type(&descriptor)?.type_name();

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&descriptor.name) {
            return Err(StrategyError::NameCollision {
                name: descriptor.name,
            });
        }

        StrategyLogger::log_registered(&descriptor.name, settings_type);
        entries.insert(descriptor.name.clone(), descriptor);
        StrategyMetrics::new().set_strategies_registered(entries.len() as i64);
        Ok(())
    }

    /// Snapshot of every registered strategy keyed by lower-cased name
    pub fn get_all(&self) -> BTreeMap<String, StrategyDescriptor> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.get_all().into_keys().collect()
    }

    /// Case-insensitive lookup
    pub fn find(&self, name: &str) -> Result<StrategyDescriptor> {
        let mut strategies = self.get_all();
        match strategies.remove(&name.trim().to_lowercase()) {
            Some(descriptor) => {
                StrategyLogger::log_resolved(name, &descriptor.name);
                Ok(descriptor)
            }
            None => {
                let available: Vec<String> = strategies.into_keys().collect();
                StrategyLogger::log_unknown(name, &available);
                Err(StrategyError::UnknownStrategy {
                    name: name.to_string(),
                    available,
                })
            }
        }
    }

    /// Settings type of the strategy registered under `name`
    pub fn get_settings_type(&self, name: &str) -> Result<SettingsTypeInfo> {
        let descriptor = self.find(name)?;
        get_settings_type(&descriptor).cloned()
    }

    /// Resolve a name and construct the strategy from raw settings
    pub fn build(&self, name: &str, raw: &RawSettings) -> Result<Box<dyn DynStrategy>> {
        self.find(name)?.build(raw)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// All strategies in the global registry
pub fn get_all() -> BTreeMap<String, StrategyDescriptor> {
    StrategyRegistry::global().get_all()
}

/// Resolve a strategy name in the global registry
pub fn find(name: &str) -> Result<StrategyDescriptor> {
    StrategyRegistry::global().find(name)
}

/// Add an implementation to the global registry
pub fn register(descriptor: StrategyDescriptor) -> Result<()> {
    StrategyRegistry::global().register(descriptor)
}

/// Resolve and construct a strategy from the global registry
pub fn build(name: &str, raw: &RawSettings) -> Result<Box<dyn DynStrategy>> {
    StrategyRegistry::global().build(name, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryData, K8sObjectData, ResourceRecommendation, ResourceType, RunResult};
    use crate::settings::StrategySettings;

    struct ConstantStrategy {
        settings: StrategySettings,
    }

    impl Strategy for ConstantStrategy {
        const NAME: &'static str = "Constant";
        type Settings = StrategySettings;

        fn new(settings: StrategySettings) -> Self {
            Self { settings }
        }

        fn settings(&self) -> &StrategySettings {
            &self.settings
        }

        fn run(&self, history_data: &HistoryData, _object_data: &K8sObjectData) -> Result<RunResult> {
            Ok(history_data
                .keys()
                .map(|resource| (*resource, ResourceRecommendation::undefined()))
                .collect())
        }
    }

    fn reject_everything(name: &str, _raw: &RawSettings) -> Result<Box<dyn DynStrategy>> {
        Err(StrategyError::malformed(name, "not buildable"))
    }

    #[test]
    fn test_register_and_find_case_insensitive() {
        let registry = StrategyRegistry::new();
        registry.register_strategy::<ConstantStrategy>().unwrap();

        assert_eq!(registry.names(), vec!["constant".to_string()]);
        assert_eq!(registry.find("Constant").unwrap().name(), "constant");
        assert_eq!(registry.find(" CONSTANT ").unwrap().display_name(), "Constant");
    }

    #[test]
    fn test_unknown_name_lists_available() {
        let registry = StrategyRegistry::new();
        registry.register_strategy::<ConstantStrategy>().unwrap();

        let err = registry.find("does-not-exist").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown strategy name: does-not-exist. Available strategies: constant"
        );
    }

    #[test]
    fn test_name_collision_rejected() {
        let registry = StrategyRegistry::new();
        registry.register_strategy::<ConstantStrategy>().unwrap();

        let err = registry
            .register(StrategyDescriptor::from_parts(
                "CONSTANT",
                Some(SettingsTypeInfo::of::<StrategySettings>()),
                reject_everything,
            ))
            .unwrap_err();
        assert_eq!(
            err,
            StrategyError::NameCollision {
                name: "constant".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_settings_type_is_malformed() {
        let registry = StrategyRegistry::new();
        let descriptor = StrategyDescriptor::from_parts("broken", None, reject_everything);

        assert!(matches!(
            get_settings_type(&descriptor),
            Err(StrategyError::MalformedDefinition { .. })
        ));
        assert!(matches!(
            registry.register(descriptor),
            Err(StrategyError::MalformedDefinition { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_settings_type_by_name() {
        let registry = StrategyRegistry::new();
        registry.register_strategy::<ConstantStrategy>().unwrap();

        let info = registry.get_settings_type("CONSTANT").unwrap();
        assert!(info.is::<StrategySettings>());
        assert_eq!(info.fields().len(), 2);
        assert!(matches!(
            registry.get_settings_type("missing"),
            Err(StrategyError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn test_empty_name_is_malformed() {
        let registry = StrategyRegistry::new();
        let descriptor = StrategyDescriptor::from_parts(
            "  ",
            Some(SettingsTypeInfo::of::<StrategySettings>()),
            reject_everything,
        );
        assert!(matches!(
            registry.register(descriptor),
            Err(StrategyError::MalformedDefinition { .. })
        ));
    }

    #[test]
    fn test_get_all_sees_late_registrations() {
        let registry = StrategyRegistry::new();
        assert!(registry.get_all().is_empty());

        registry.register_strategy::<ConstantStrategy>().unwrap();
        assert!(registry.get_all().contains_key("constant"));
    }

    #[test]
    fn test_build_validates_settings() {
        let registry = StrategyRegistry::new();
        registry.register_strategy::<ConstantStrategy>().unwrap();

        let mut raw = RawSettings::new();
        raw.insert("history_duration".to_string(), serde_json::json!(0));
        assert!(matches!(
            registry.build("constant", &raw),
            Err(StrategyError::SchemaViolation { .. })
        ));

        let strategy = registry.build("constant", &RawSettings::new()).unwrap();
        assert_eq!(strategy.to_string(), "Constant");
        assert_eq!(strategy.base_settings(), &StrategySettings::default());

        let mut history = HistoryData::new();
        history.insert(ResourceType::Cpu, Default::default());
        let object = K8sObjectData::new("default", "Deployment", "api", "server");
        let result = strategy.run(&history, &object).unwrap();
        assert!(result[&ResourceType::Cpu].is_undefined());
    }
}
