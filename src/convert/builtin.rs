//! Built-in type converters and generic factories.
//!
//! Covers the convertible primitives, the entity id types, enums constrained
//! by declared choices, select-menu string lists, and a compact duration
//! syntax (`4d3h2m1s`).
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::convert::{GenericConverterFactory, TypeConverter, TypeConverterRegistry};
use crate::core::InteractionError;
use crate::interaction::InteractionContext;
use crate::model::parameter::{ArgValue, ChoiceValue, ParamType, ParameterInfo};
use crate::payload::OptionType;

/// Install every built-in converter and factory into a registry.
pub fn install(registry: &TypeConverterRegistry) {
    registry.add_factory(Arc::new(UserConverterFactory));
    registry.add_factory(Arc::new(RoleConverterFactory));
    registry.add_factory(Arc::new(ChannelConverterFactory));
    registry.add_factory(Arc::new(MentionableConverterFactory));
    registry.add_factory(Arc::new(PrimitiveConverterFactory));
    registry.add_factory(Arc::new(EnumConverterFactory));
    registry.add_converter(ParamType::Attachment, Arc::new(AttachmentConverter));
    registry.add_converter(ParamType::Duration, Arc::new(DurationConverter));
    registry.add_converter(ParamType::DateTime, Arc::new(DateTimeConverter));
    registry.add_converter(ParamType::StringList, Arc::new(StringListConverter));
}

fn convert_failed(param: &ParameterInfo, reason: impl Into<String>) -> InteractionError {
    InteractionError::ConvertFailed {
        name: param.name.clone(),
        reason: reason.into(),
    }
}

/// Read a snowflake id from a string or integer option value.
fn read_snowflake(raw: &serde_json::Value, param: &ParameterInfo) -> Result<u64, InteractionError> {
    match raw {
        serde_json::Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| convert_failed(param, format!("'{s}' is not a snowflake id"))),
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| convert_failed(param, format!("{n} is not a snowflake id"))),
        other => Err(convert_failed(param, format!("expected an id, got {other}"))),
    }
}

fn check_bounds(value: f64, param: &ParameterInfo) -> Result<(), InteractionError> {
    if let Some(min) = param.min_value {
        if value < min {
            return Err(convert_failed(param, format!("{value} is below the minimum {min}")));
        }
    }
    if let Some(max) = param.max_value {
        if value > max {
            return Err(convert_failed(param, format!("{value} is above the maximum {max}")));
        }
    }
    Ok(())
}

// ── Primitives ───────────────────────────────────────────────────────────────

pub struct StringConverter;

#[async_trait]
impl TypeConverter for StringConverter {
    fn option_type(&self) -> OptionType {
        OptionType::String
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        match raw {
            serde_json::Value::String(s) => Ok(ArgValue::String(s.clone())),
            other => Err(convert_failed(param, format!("expected a string, got {other}"))),
        }
    }
}

pub struct IntegerConverter;

#[async_trait]
impl TypeConverter for IntegerConverter {
    fn option_type(&self) -> OptionType {
        OptionType::Integer
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        let value = match raw {
            serde_json::Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| convert_failed(param, format!("{n} is not an integer")))?,
            serde_json::Value::String(s) => s
                .parse::<i64>()
                .map_err(|_| convert_failed(param, format!("'{s}' is not an integer")))?,
            other => return Err(convert_failed(param, format!("expected an integer, got {other}"))),
        };
        check_bounds(value as f64, param)?;
        Ok(ArgValue::Integer(value))
    }
}

pub struct NumberConverter;

#[async_trait]
impl TypeConverter for NumberConverter {
    fn option_type(&self) -> OptionType {
        OptionType::Number
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        let value = match raw {
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| convert_failed(param, format!("{n} is not a number")))?,
            serde_json::Value::String(s) => s
                .parse::<f64>()
                .map_err(|_| convert_failed(param, format!("'{s}' is not a number")))?,
            other => return Err(convert_failed(param, format!("expected a number, got {other}"))),
        };
        check_bounds(value, param)?;
        Ok(ArgValue::Number(value))
    }
}

pub struct BooleanConverter;

#[async_trait]
impl TypeConverter for BooleanConverter {
    fn option_type(&self) -> OptionType {
        OptionType::Boolean
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        match raw {
            serde_json::Value::Bool(b) => Ok(ArgValue::Boolean(*b)),
            serde_json::Value::String(s) => match s.as_str() {
                "true" => Ok(ArgValue::Boolean(true)),
                "false" => Ok(ArgValue::Boolean(false)),
                other => Err(convert_failed(param, format!("'{other}' is not a boolean"))),
            },
            other => Err(convert_failed(param, format!("expected a boolean, got {other}"))),
        }
    }
}

/// Factory for the convertible primitives.
pub struct PrimitiveConverterFactory;

impl GenericConverterFactory for PrimitiveConverterFactory {
    fn covers(&self, target: &ParamType) -> bool {
        matches!(
            target,
            ParamType::String | ParamType::Integer | ParamType::Number | ParamType::Boolean
        )
    }

    fn make(&self, target: &ParamType) -> Arc<dyn TypeConverter> {
        match target {
            ParamType::Integer => Arc::new(IntegerConverter),
            ParamType::Number => Arc::new(NumberConverter),
            ParamType::Boolean => Arc::new(BooleanConverter),
            _ => Arc::new(StringConverter),
        }
    }
}

// ── Entities ────────────────────────────────────────────────────────────────

macro_rules! entity_converter {
    ($converter:ident, $factory:ident, $variant:ident, $option_type:ident) => {
        pub struct $converter;

        #[async_trait]
        impl TypeConverter for $converter {
            fn option_type(&self) -> OptionType {
                OptionType::$option_type
            }

            async fn read(
                &self,
                _ctx: &InteractionContext,
                raw: &serde_json::Value,
                param: &ParameterInfo,
            ) -> Result<ArgValue, InteractionError> {
                Ok(ArgValue::$variant(read_snowflake(raw, param)?))
            }
        }

        pub struct $factory;

        impl GenericConverterFactory for $factory {
            fn covers(&self, target: &ParamType) -> bool {
                *target == ParamType::$variant
            }

            fn make(&self, _target: &ParamType) -> Arc<dyn TypeConverter> {
                Arc::new($converter)
            }
        }
    };
}

entity_converter!(UserConverter, UserConverterFactory, User, User);
entity_converter!(RoleConverter, RoleConverterFactory, Role, Role);
entity_converter!(ChannelConverter, ChannelConverterFactory, Channel, Channel);

pub struct MentionableConverter;

#[async_trait]
impl TypeConverter for MentionableConverter {
    fn option_type(&self) -> OptionType {
        OptionType::Mentionable
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        Ok(ArgValue::Mentionable(read_snowflake(raw, param)?))
    }
}

/// A user or role is mentionable, so this factory also covers those tags;
/// the narrower entity factories win the specificity contest for them.
pub struct MentionableConverterFactory;

impl GenericConverterFactory for MentionableConverterFactory {
    fn covers(&self, target: &ParamType) -> bool {
        matches!(
            target,
            ParamType::Mentionable | ParamType::User | ParamType::Role
        )
    }

    fn make(&self, _target: &ParamType) -> Arc<dyn TypeConverter> {
        Arc::new(MentionableConverter)
    }
}

// ── Attachments ─────────────────────────────────────────────────────────────

/// Passes an uploaded attachment through by its snowflake id; the resolved
/// file metadata stays with the host.
pub struct AttachmentConverter;

#[async_trait]
impl TypeConverter for AttachmentConverter {
    fn option_type(&self) -> OptionType {
        OptionType::Attachment
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        Ok(ArgValue::Attachment(read_snowflake(raw, param)?))
    }
}

// ── Enums ───────────────────────────────────────────────────────────────────

/// Matches the raw string against the parameter's declared choice values.
pub struct EnumConverter;

#[async_trait]
impl TypeConverter for EnumConverter {
    fn option_type(&self) -> OptionType {
        OptionType::String
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        let serde_json::Value::String(s) = raw else {
            return Err(convert_failed(param, format!("expected a string, got {raw}")));
        };
        if param.choices.is_empty() {
            return Err(convert_failed(param, "enum parameter has no declared choices"));
        }
        let matched = param.choices.iter().any(|choice| match &choice.value {
            ChoiceValue::String(v) => v == s,
            _ => false,
        });
        if matched {
            Ok(ArgValue::String(s.clone()))
        } else {
            Err(convert_failed(param, format!("'{s}' is not one of the declared values")))
        }
    }
}

pub struct EnumConverterFactory;

impl GenericConverterFactory for EnumConverterFactory {
    fn covers(&self, target: &ParamType) -> bool {
        matches!(target, ParamType::Enum(_))
    }

    fn make(&self, _target: &ParamType) -> Arc<dyn TypeConverter> {
        Arc::new(EnumConverter)
    }
}

// ── Select menus ────────────────────────────────────────────────────────────

pub struct StringListConverter;

#[async_trait]
impl TypeConverter for StringListConverter {
    fn option_type(&self) -> OptionType {
        OptionType::String
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        let serde_json::Value::Array(items) = raw else {
            return Err(convert_failed(param, format!("expected an array, got {raw}")));
        };
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match item {
                serde_json::Value::String(s) => values.push(s.clone()),
                other => {
                    return Err(convert_failed(param, format!("expected a string item, got {other}")))
                }
            }
        }
        Ok(ArgValue::StringList(values))
    }
}

// ── Durations ───────────────────────────────────────────────────────────────

/// Parse a compact duration such as `4d3h2m1s`. A bare number is seconds.
fn parse_duration(text: &str) -> Option<Duration> {
    if text.is_empty() {
        return None;
    }
    let mut total = 0u64;
    let mut digits = String::new();
    let mut any_unit = false;
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            let value: u64 = digits.parse().ok()?;
            digits.clear();
            let seconds = match c {
                'd' => value.checked_mul(86_400)?,
                'h' => value.checked_mul(3_600)?,
                'm' => value.checked_mul(60)?,
                's' => value,
                _ => return None,
            };
            any_unit = true;
            total = total.checked_add(seconds)?;
        }
    }
    if !digits.is_empty() {
        if any_unit {
            // Trailing digits without a unit, e.g. "1d30".
            return None;
        }
        total = digits.parse().ok()?;
    }
    Some(Duration::from_secs(total))
}

pub struct DurationConverter;

#[async_trait]
impl TypeConverter for DurationConverter {
    fn option_type(&self) -> OptionType {
        OptionType::String
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        let serde_json::Value::String(s) = raw else {
            return Err(convert_failed(param, format!("expected a duration string, got {raw}")));
        };
        parse_duration(s)
            .map(ArgValue::Duration)
            .ok_or_else(|| convert_failed(param, format!("'{s}' is not a duration")))
    }
}

// ── Timestamps ──────────────────────────────────────────────────────────────

/// Reads an RFC 3339 timestamp into a UTC datetime.
pub struct DateTimeConverter;

#[async_trait]
impl TypeConverter for DateTimeConverter {
    fn option_type(&self) -> OptionType {
        OptionType::String
    }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        raw: &serde_json::Value,
        param: &ParameterInfo,
    ) -> Result<ArgValue, InteractionError> {
        let serde_json::Value::String(s) = raw else {
            return Err(convert_failed(param, format!("expected a timestamp string, got {raw}")));
        };
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| ArgValue::DateTime(dt.with_timezone(&chrono::Utc)))
            .map_err(|e| convert_failed(param, format!("'{s}' is not an RFC 3339 timestamp: {e}")))
    }
}
