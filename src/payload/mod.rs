//! # Command Payloads
//!
//! Serde DTOs mirroring the platform's published application-command schema.
//! The sync engine produces these from the metadata tree; the registry client
//! ships them over the wire. `to_properties` parses a payload back into its
//! editable form so an existing registration can be re-emitted unchanged.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Application command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    ChatInput = 1,
    User = 2,
    Message = 3,
}

impl CommandType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(CommandType::ChatInput),
            2 => Some(CommandType::User),
            3 => Some(CommandType::Message),
            _ => None,
        }
    }
}

impl Serialize for CommandType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for CommandType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        CommandType::from_u8(value)
            .ok_or_else(|| D::Error::custom(format!("unknown command type {value}")))
    }
}

/// Option kind of a command parameter, subcommand or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
    Attachment = 11,
}

impl OptionType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(OptionType::SubCommand),
            2 => Some(OptionType::SubCommandGroup),
            3 => Some(OptionType::String),
            4 => Some(OptionType::Integer),
            5 => Some(OptionType::Boolean),
            6 => Some(OptionType::User),
            7 => Some(OptionType::Channel),
            8 => Some(OptionType::Role),
            9 => Some(OptionType::Mentionable),
            10 => Some(OptionType::Number),
            11 => Some(OptionType::Attachment),
            _ => None,
        }
    }
}

impl Serialize for OptionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for OptionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        OptionType::from_u8(value)
            .ok_or_else(|| D::Error::custom(format!("unknown option type {value}")))
    }
}

/// A pre-defined choice of a string, integer or number option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadChoice {
    pub name: String,
    pub value: serde_json::Value,
}

/// One option of a command payload: a parameter, subcommand or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadOption {
    #[serde(rename = "type")]
    pub kind: OptionType,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<PayloadChoice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PayloadOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_types: Vec<u8>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autocomplete: bool,
}

impl PayloadOption {
    /// A subcommand wrapping a leaf command's parameters.
    pub fn sub_command(name: impl Into<String>, description: impl Into<String>, options: Vec<PayloadOption>) -> Self {
        PayloadOption {
            kind: OptionType::SubCommand,
            name: name.into(),
            description: description.into(),
            required: false,
            choices: Vec::new(),
            options,
            min_value: None,
            max_value: None,
            channel_types: Vec::new(),
            autocomplete: false,
        }
    }

    /// A subcommand group wrapping nested subcommands.
    pub fn sub_command_group(name: impl Into<String>, description: impl Into<String>, options: Vec<PayloadOption>) -> Self {
        let mut option = Self::sub_command(name, description, options);
        option.kind = OptionType::SubCommandGroup;
        option
    }
}

/// A platform-facing command registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    /// Registration id assigned by the platform; absent on outbound creates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: CommandType,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PayloadOption>,
    pub default_permission: bool,
}

impl CommandPayload {
    /// Parse this payload back into its editable properties form.
    pub fn to_properties(&self) -> CommandProperties {
        CommandProperties {
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
            default_permission: self.default_permission,
        }
    }

    /// Re-emit a payload from a properties form. The platform id is not part
    /// of the properties and is left unset.
    pub fn from_properties(properties: &CommandProperties) -> Self {
        CommandPayload {
            id: None,
            kind: properties.kind,
            name: properties.name.clone(),
            description: properties.description.clone(),
            options: properties.options.clone(),
            default_permission: properties.default_permission,
        }
    }
}

/// Editable form of a command payload, without platform-assigned fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandProperties {
    pub kind: CommandType,
    pub name: String,
    pub description: String,
    pub options: Vec<PayloadOption>,
    pub default_permission: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kick_payload() -> CommandPayload {
        CommandPayload {
            id: None,
            kind: CommandType::ChatInput,
            name: "admin".into(),
            description: "Admin commands".into(),
            options: vec![PayloadOption::sub_command(
                "kick",
                "Kick a member",
                vec![PayloadOption {
                    kind: OptionType::User,
                    name: "user".into(),
                    description: "Member to kick".into(),
                    required: true,
                    choices: Vec::new(),
                    options: Vec::new(),
                    min_value: None,
                    max_value: None,
                    channel_types: Vec::new(),
                    autocomplete: false,
                }],
            )],
            default_permission: true,
        }
    }

    #[test]
    fn test_option_type_wire_format_is_integer() {
        let json = serde_json::to_value(OptionType::User).unwrap();
        assert_eq!(json, serde_json::json!(6));

        let parsed: OptionType = serde_json::from_value(serde_json::json!(6)).unwrap();
        assert_eq!(parsed, OptionType::User);
        assert!(serde_json::from_value::<OptionType>(serde_json::json!(99)).is_err());
    }

    #[test]
    fn test_payload_serialization_skips_empty_fields() {
        let payload = kick_payload();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], serde_json::json!(1));
        assert_eq!(json["options"][0]["type"], serde_json::json!(1));
        // Unset fields are omitted on the wire.
        assert!(json.get("id").is_none());
        assert!(json["options"][0].get("required").is_none());
        assert!(json["options"][0]["options"][0].get("choices").is_none());
    }

    #[test]
    fn test_payload_roundtrip_through_json() {
        let payload = kick_payload();
        let json = serde_json::to_string(&payload).unwrap();
        let parsed: CommandPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_properties_roundtrip_is_structural() {
        let payload = kick_payload();
        let reemitted = CommandPayload::from_properties(&payload.to_properties());
        assert_eq!(reemitted, payload);
    }
}
