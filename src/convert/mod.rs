//! # Type Converter Registry
//!
//! Maps a declared parameter type to the converter that reads a platform
//! option value into a native value. Two tables: exact converters keyed by
//! type tag, and generic factories that cover families of tags and are
//! instantiated (then cached) on first use.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Most-specific generic selection
//! - 1.0.0: Exact table and built-in converters

pub mod builtin;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::debug;

use crate::core::InteractionError;
use crate::interaction::InteractionContext;
use crate::model::parameter::{ArgValue, ParamType, ParameterInfo};
use crate::payload::OptionType;

/// Reads one platform option value into a native [`ArgValue`].
#[async_trait]
pub trait TypeConverter: Send + Sync {
    /// The platform option type this converter publishes for its parameters.
    fn option_type(&self) -> OptionType;

    /// Whether this converter can also read values for `target`. Consulted
    /// when no exact converter is registered for `target`.
    fn can_convert_to(&self, _target: &ParamType) -> bool {
        false
    }

    /// Convert the raw option value. Bounds and choices come from the
    /// parameter metadata.
    async fn read(
        &self,
        ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError>;
}

/// Instantiates converters for a family of type tags.
pub trait GenericConverterFactory: Send + Sync {
    /// Whether this factory can produce a converter for `target`.
    fn covers(&self, target: &ParamType) -> bool;

    /// Produce a converter for `target`. Only called when `covers(target)`.
    fn make(&self, target: &ParamType) -> Arc<dyn TypeConverter>;
}

/// Canonical tags used to score factory specificity. A factory covering
/// fewer of these is more specific than one covering more.
fn probe_types() -> Vec<ParamType> {
    vec![
        ParamType::String,
        ParamType::Integer,
        ParamType::Number,
        ParamType::Boolean,
        ParamType::User,
        ParamType::Channel,
        ParamType::Role,
        ParamType::Mentionable,
        ParamType::Attachment,
        ParamType::Duration,
        ParamType::DateTime,
        ParamType::StringList,
        ParamType::Enum("probe".into()),
    ]
}

/// The two-table converter registry.
///
/// Reads are lock-free in the common case (an exact hit takes one shared
/// lock); registration is serialised by the framework-wide mutex at the
/// service layer.
pub struct TypeConverterRegistry {
    exact: RwLock<HashMap<ParamType, Arc<dyn TypeConverter>>>,
    generics: RwLock<Vec<Arc<dyn GenericConverterFactory>>>,
}

impl TypeConverterRegistry {
    /// An empty registry with no converters at all.
    pub fn empty() -> Self {
        TypeConverterRegistry {
            exact: RwLock::new(HashMap::new()),
            generics: RwLock::new(Vec::new()),
        }
    }

    /// A registry pre-loaded with the built-in converters and factories.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        builtin::install(&registry);
        registry
    }

    /// Register an exact converter, replacing any previous entry for the tag.
    pub fn add_converter(&self, target: ParamType, converter: Arc<dyn TypeConverter>) {
        self.exact.write().unwrap().insert(target, converter);
    }

    /// Remove the exact converter for a tag.
    pub fn remove_converter(&self, target: &ParamType) -> bool {
        self.exact.write().unwrap().remove(target).is_some()
    }

    /// Register a generic factory. Registration order is the tie-break when
    /// two factories are equally specific.
    pub fn add_factory(&self, factory: Arc<dyn GenericConverterFactory>) {
        self.generics.write().unwrap().push(factory);
    }

    /// Resolve the converter for a declared type.
    ///
    /// Order: exact hit, then any exact converter reporting
    /// `can_convert_to`, then the most specific qualifying generic factory
    /// (instantiated and cached), then `NoConverter`.
    pub fn resolve(&self, target: &ParamType) -> Result<Arc<dyn TypeConverter>, InteractionError> {
        {
            let exact = self.exact.read().unwrap();
            if let Some(converter) = exact.get(target) {
                return Ok(Arc::clone(converter));
            }
            for converter in exact.values() {
                if converter.can_convert_to(target) {
                    return Ok(Arc::clone(converter));
                }
            }
        }

        let chosen = {
            let generics = self.generics.read().unwrap();
            let probes = probe_types();
            let mut best: Option<(usize, Arc<dyn GenericConverterFactory>)> = None;
            for factory in generics.iter() {
                if !factory.covers(target) {
                    continue;
                }
                let breadth = probes.iter().filter(|p| factory.covers(p)).count();
                // Strict < keeps the earliest-registered factory on ties.
                if best.as_ref().map_or(true, |(b, _)| breadth < *b) {
                    best = Some((breadth, Arc::clone(factory)));
                }
            }
            best.map(|(_, factory)| factory)
        };

        if let Some(factory) = chosen {
            let converter = factory.make(target);
            debug!("instantiated generic converter for {target}");
            self.exact
                .write()
                .unwrap()
                .insert(target.clone(), Arc::clone(&converter));
            return Ok(converter);
        }

        Err(InteractionError::NoConverter {
            type_name: target.type_name(),
        })
    }
}

impl Default for TypeConverterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    struct FixedConverter(OptionType);

    #[async_trait]
    impl TypeConverter for FixedConverter {
        fn option_type(&self) -> OptionType {
            self.0
        }

        async fn read(
            &self,
            _ctx: &InteractionContext,
            _raw: &serde_json::Value,
            _param: &ParameterInfo,
        ) -> Result<ArgValue, InteractionError> {
            Ok(ArgValue::None)
        }
    }

    #[test]
    fn test_exact_hit() {
        let registry = TypeConverterRegistry::empty();
        registry.add_converter(ParamType::Duration, Arc::new(FixedConverter(OptionType::String)));
        assert!(registry.resolve(&ParamType::Duration).is_ok());
    }

    #[test]
    fn test_unresolvable_type_is_no_converter() {
        let registry = TypeConverterRegistry::empty();
        let err = registry.resolve(&ParamType::User).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NoConverter);
    }

    #[test]
    fn test_generic_instantiation_is_cached() {
        struct CountingFactory(std::sync::atomic::AtomicUsize);
        impl GenericConverterFactory for CountingFactory {
            fn covers(&self, target: &ParamType) -> bool {
                *target == ParamType::Boolean
            }
            fn make(&self, _target: &ParamType) -> Arc<dyn TypeConverter> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Arc::new(FixedConverter(OptionType::Boolean))
            }
        }

        let registry = TypeConverterRegistry::empty();
        let factory = Arc::new(CountingFactory(Default::default()));
        registry.add_factory(Arc::clone(&factory) as Arc<dyn GenericConverterFactory>);

        registry.resolve(&ParamType::Boolean).unwrap();
        registry.resolve(&ParamType::Boolean).unwrap();
        assert_eq!(factory.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_most_specific_factory_wins() {
        // User is covered by both the user factory and the broader
        // mentionable factory; the narrower one must win.
        let registry = TypeConverterRegistry::with_builtins();
        let converter = registry.resolve(&ParamType::User).unwrap();
        assert_eq!(converter.option_type(), OptionType::User);

        let converter = registry.resolve(&ParamType::Mentionable).unwrap();
        assert_eq!(converter.option_type(), OptionType::Mentionable);
    }

    #[test]
    fn test_can_convert_to_fallback() {
        struct Widening;

        #[async_trait]
        impl TypeConverter for Widening {
            fn option_type(&self) -> OptionType {
                OptionType::String
            }
            fn can_convert_to(&self, target: &ParamType) -> bool {
                *target == ParamType::Duration
            }
            async fn read(
                &self,
                _ctx: &InteractionContext,
                _raw: &serde_json::Value,
                _param: &ParameterInfo,
            ) -> Result<ArgValue, InteractionError> {
                Ok(ArgValue::None)
            }
        }

        let registry = TypeConverterRegistry::empty();
        registry.add_converter(ParamType::String, Arc::new(Widening));
        assert!(registry.resolve(&ParamType::Duration).is_ok());
    }
}
