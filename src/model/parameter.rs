//! Parameter metadata: declared types, choices and converted values.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::convert::TypeConverter;
use crate::model::modal::ModalInstance;

/// Declared type of a command parameter.
///
/// The framework is tag-based: every parameter declares one of these tags and
/// the converter registry maps the tag to a [`TypeConverter`]. `Enum` carries
/// the declaring type's name; its allowed values come from the parameter's
/// choices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    /// An uploaded attachment, passed through by its snowflake id.
    Attachment,
    /// Compact duration text such as `4d3h2m1s`.
    Duration,
    /// An RFC 3339 timestamp.
    DateTime,
    /// The selected values of a select-menu component.
    StringList,
    /// A named enumeration constrained to the parameter's choices.
    Enum(String),
}

impl ParamType {
    pub fn type_name(&self) -> String {
        match self {
            ParamType::Enum(name) => format!("enum {name}"),
            other => format!("{other:?}"),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A value produced by a type converter and handed to a handler callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// Snowflake id of a user.
    User(u64),
    /// Snowflake id of a channel.
    Channel(u64),
    /// Snowflake id of a role.
    Role(u64),
    /// Snowflake id of a user or role.
    Mentionable(u64),
    /// Snowflake id of an uploaded attachment.
    Attachment(u64),
    /// Snowflake id of a message (context command target).
    Message(u64),
    Duration(Duration),
    DateTime(chrono::DateTime<chrono::Utc>),
    StringList(Vec<String>),
    Modal(ModalInstance),
    /// An optional parameter that was omitted and has no default.
    None,
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

/// Typed value of a parameter choice.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceValue {
    String(String),
    Integer(i64),
    Number(f64),
}

impl ChoiceValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ChoiceValue::String(s) => serde_json::Value::String(s.clone()),
            ChoiceValue::Integer(v) => serde_json::json!(v),
            ChoiceValue::Number(v) => serde_json::json!(v),
        }
    }
}

/// One pre-defined choice for a string, integer or number parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterChoice {
    pub name: String,
    pub value: ChoiceValue,
}

impl ParameterChoice {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        ParameterChoice {
            name: name.into(),
            value: ChoiceValue::String(value.into()),
        }
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        ParameterChoice {
            name: name.into(),
            value: ChoiceValue::Integer(value),
        }
    }

    pub fn number(name: impl Into<String>, value: f64) -> Self {
        ParameterChoice {
            name: name.into(),
            value: ChoiceValue::Number(value),
        }
    }
}

/// Channel kinds a channel parameter may be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Text = 0,
    Dm = 1,
    Voice = 2,
    GroupDm = 3,
    Category = 4,
    News = 5,
    NewsThread = 10,
    PublicThread = 11,
    PrivateThread = 12,
    StageVoice = 13,
}

impl ChannelType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ChannelType::Text),
            1 => Some(ChannelType::Dm),
            2 => Some(ChannelType::Voice),
            3 => Some(ChannelType::GroupDm),
            4 => Some(ChannelType::Category),
            5 => Some(ChannelType::News),
            10 => Some(ChannelType::NewsThread),
            11 => Some(ChannelType::PublicThread),
            12 => Some(ChannelType::PrivateThread),
            13 => Some(ChannelType::StageVoice),
            _ => None,
        }
    }
}

/// A built command parameter.
///
/// Produced by the module builder; complex descriptor parameters are flattened
/// into a list of these before the command is registered. The converter is
/// resolved once at build time.
pub struct ParameterInfo {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    pub default_value: Option<ArgValue>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub channel_types: Vec<ChannelType>,
    pub choices: Vec<ParameterChoice>,
    /// True when an autocomplete handler is bound to this parameter.
    pub autocomplete: bool,
    pub converter: Arc<dyn TypeConverter>,
}

impl fmt::Debug for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterInfo")
            .field("name", &self.name)
            .field("param_type", &self.param_type)
            .field("required", &self.required)
            .field("choices", &self.choices.len())
            .field("autocomplete", &self.autocomplete)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_type_name() {
        assert_eq!(ParamType::Integer.type_name(), "Integer");
        assert_eq!(ParamType::Enum("Color".into()).type_name(), "enum Color");
    }

    #[test]
    fn test_choice_value_json() {
        assert_eq!(
            ParameterChoice::string("Red", "red").value.to_json(),
            serde_json::json!("red")
        );
        assert_eq!(
            ParameterChoice::integer("One", 1).value.to_json(),
            serde_json::json!(1)
        );
    }

    #[test]
    fn test_channel_type_from_u8() {
        assert_eq!(ChannelType::from_u8(2), Some(ChannelType::Voice));
        assert_eq!(ChannelType::from_u8(99), None);
    }
}
