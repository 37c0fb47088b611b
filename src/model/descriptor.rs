//! Module descriptors: the host-facing declaration of a command tree.
//!
//! Attribute-driven platforms discover commands by reflecting over annotated
//! types; here the host hands the framework already-shaped descriptor values
//! through a [`ModuleSource`]. Descriptors are cheap to clone (callbacks are
//! shared behind `Arc`) and carry no build-time validation of their own; the
//! module builder enforces every invariant when the tree is built.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Add complex parameter fields and converter overrides
//! - 1.1.0: Add component, modal and autocomplete descriptors
//! - 1.0.0: Initial module and slash command descriptors

use std::sync::Arc;

use crate::convert::TypeConverter;
use crate::model::command::{
    AutocompleteBinding, AutocompleteCallback, ContextCommandType, HandlerCallback, Precondition,
};
use crate::model::modal::ModalDescriptor;
use crate::model::module::ModuleLifecycle;
use crate::model::parameter::{ArgValue, ChannelType, ParamType, ParameterChoice};

/// An opaque key/value annotation accumulated onto modules and commands.
/// Inherited from parent modules by concatenation, parents first.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: serde_json::Value,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Attribute {
            name: name.into(),
            value,
        }
    }

    /// A bare marker attribute with no payload.
    pub fn marker(name: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            value: serde_json::Value::Null,
        }
    }
}

/// Source of module descriptors handed to
/// [`InteractionService::add_modules`](crate::service::InteractionService::add_modules).
pub trait ModuleSource: Send + Sync {
    fn modules(&self) -> Vec<ModuleDescriptor>;
}

impl ModuleSource for Vec<ModuleDescriptor> {
    fn modules(&self) -> Vec<ModuleDescriptor> {
        self.clone()
    }
}

impl ModuleSource for ModuleDescriptor {
    fn modules(&self) -> Vec<ModuleDescriptor> {
        vec![self.clone()]
    }
}

/// Declaration of one module and everything nested under it.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    pub group_name: Option<String>,
    pub description: Option<String>,
    /// Inherits from the parent module when unset; root default is `true`.
    pub default_permission: Option<bool>,
    /// Inherits from the parent module when unset; root default is `false`.
    pub dont_auto_register: Option<bool>,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub submodules: Vec<ModuleDescriptor>,
    pub slash_commands: Vec<SlashCommandDescriptor>,
    pub context_commands: Vec<ContextCommandDescriptor>,
    pub component_handlers: Vec<ComponentCommandDescriptor>,
    pub modal_handlers: Vec<ModalCommandDescriptor>,
    pub autocomplete_handlers: Vec<AutocompleteDescriptor>,
    pub lifecycle: ModuleLifecycle,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleDescriptor {
            name: name.into(),
            group_name: None,
            description: None,
            default_permission: None,
            dont_auto_register: None,
            attributes: Vec::new(),
            preconditions: Vec::new(),
            submodules: Vec::new(),
            slash_commands: Vec::new(),
            context_commands: Vec::new(),
            component_handlers: Vec::new(),
            modal_handlers: Vec::new(),
            autocomplete_handlers: Vec::new(),
            lifecycle: ModuleLifecycle::default(),
        }
    }

    /// Mark this module as a slash group published under `group_name`.
    pub fn slash_group(mut self, group_name: impl Into<String>, description: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self.description = Some(description.into());
        self
    }

    pub fn submodule(mut self, module: ModuleDescriptor) -> Self {
        self.submodules.push(module);
        self
    }

    pub fn slash_command(mut self, command: SlashCommandDescriptor) -> Self {
        self.slash_commands.push(command);
        self
    }

    pub fn context_command(mut self, command: ContextCommandDescriptor) -> Self {
        self.context_commands.push(command);
        self
    }

    pub fn component_handler(mut self, handler: ComponentCommandDescriptor) -> Self {
        self.component_handlers.push(handler);
        self
    }

    pub fn modal_handler(mut self, handler: ModalCommandDescriptor) -> Self {
        self.modal_handlers.push(handler);
        self
    }

    pub fn autocomplete_handler(mut self, handler: AutocompleteDescriptor) -> Self {
        self.autocomplete_handlers.push(handler);
        self
    }

    pub fn precondition(mut self, precondition: Arc<dyn Precondition>) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn lifecycle(mut self, lifecycle: ModuleLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn dont_auto_register(mut self) -> Self {
        self.dont_auto_register = Some(true);
        self
    }
}

/// Declaration of one slash command.
#[derive(Clone)]
pub struct SlashCommandDescriptor {
    pub name: String,
    pub description: String,
    pub default_permission: Option<bool>,
    /// Publish at the root even when declared inside a slash group.
    pub ignore_group_names: bool,
    pub parameters: Vec<ParameterDescriptor>,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub callback: HandlerCallback,
}

impl SlashCommandDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        callback: HandlerCallback,
    ) -> Self {
        SlashCommandDescriptor {
            name: name.into(),
            description: description.into(),
            default_permission: None,
            ignore_group_names: false,
            parameters: Vec::new(),
            attributes: Vec::new(),
            preconditions: Vec::new(),
            callback,
        }
    }

    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn precondition(mut self, precondition: Arc<dyn Precondition>) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn ignore_group_names(mut self) -> Self {
        self.ignore_group_names = true;
        self
    }
}

/// Declaration of one parameter, possibly complex.
///
/// A complex parameter is a struct whose public fields map to sub-parameters;
/// the builder flattens its `fields` into individual platform options and
/// detects cycles through `type_name`.
#[derive(Clone)]
pub struct ParameterDescriptor {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    pub default_value: Option<ArgValue>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub channel_types: Vec<ChannelType>,
    pub choices: Vec<ParameterChoice>,
    pub autocomplete: bool,
    pub is_complex: bool,
    /// Declaring type tag of a complex parameter, used for cycle detection.
    pub type_name: Option<String>,
    pub fields: Vec<ParameterDescriptor>,
    /// Bypass registry resolution with a specific converter.
    pub converter_override: Option<Arc<dyn TypeConverter>>,
}

impl ParameterDescriptor {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        ParameterDescriptor {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default_value: None,
            min_value: None,
            max_value: None,
            channel_types: Vec::new(),
            choices: Vec::new(),
            autocomplete: false,
            is_complex: false,
            type_name: None,
            fields: Vec::new(),
            converter_override: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
        default_value: Option<ArgValue>,
    ) -> Self {
        let mut parameter = Self::required(name, param_type, description);
        parameter.required = false;
        parameter.default_value = default_value;
        parameter
    }

    /// A complex parameter flattened from the fields of `type_name`.
    pub fn complex(
        name: impl Into<String>,
        type_name: impl Into<String>,
        fields: Vec<ParameterDescriptor>,
    ) -> Self {
        let mut parameter = Self::required(name, ParamType::String, "");
        parameter.is_complex = true;
        parameter.type_name = Some(type_name.into());
        parameter.fields = fields;
        parameter
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn choice(mut self, choice: ParameterChoice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn channel_types(mut self, types: Vec<ChannelType>) -> Self {
        self.channel_types = types;
        self
    }

    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }
}

/// Declaration of one context-menu command.
#[derive(Clone)]
pub struct ContextCommandDescriptor {
    pub name: String,
    pub command_type: ContextCommandType,
    pub default_permission: Option<bool>,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub callback: HandlerCallback,
}

impl ContextCommandDescriptor {
    pub fn new(
        name: impl Into<String>,
        command_type: ContextCommandType,
        callback: HandlerCallback,
    ) -> Self {
        ContextCommandDescriptor {
            name: name.into(),
            command_type,
            default_permission: None,
            attributes: Vec::new(),
            preconditions: Vec::new(),
            callback,
        }
    }
}

/// Declaration of one component handler. `name` is a pattern over the custom
/// id and may contain wildcards.
#[derive(Clone)]
pub struct ComponentCommandDescriptor {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub callback: HandlerCallback,
}

impl ComponentCommandDescriptor {
    pub fn new(name: impl Into<String>, callback: HandlerCallback) -> Self {
        ComponentCommandDescriptor {
            name: name.into(),
            parameters: Vec::new(),
            attributes: Vec::new(),
            preconditions: Vec::new(),
            callback,
        }
    }

    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Declaration of one modal handler.
#[derive(Clone)]
pub struct ModalCommandDescriptor {
    pub name: String,
    pub modal: ModalDescriptor,
    /// Parameters filled from wildcard captures.
    pub parameters: Vec<ParameterDescriptor>,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub callback: HandlerCallback,
}

impl ModalCommandDescriptor {
    pub fn new(
        name: impl Into<String>,
        modal: ModalDescriptor,
        callback: HandlerCallback,
    ) -> Self {
        ModalCommandDescriptor {
            name: name.into(),
            modal,
            parameters: Vec::new(),
            attributes: Vec::new(),
            preconditions: Vec::new(),
            callback,
        }
    }

    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Declaration of one autocomplete handler.
#[derive(Clone)]
pub struct AutocompleteDescriptor {
    pub binding: AutocompleteBinding,
    pub callback: AutocompleteCallback,
}

impl AutocompleteDescriptor {
    /// Bind to one parameter of one slash command.
    pub fn for_parameter(
        command_path: Vec<String>,
        parameter_name: impl Into<String>,
        callback: AutocompleteCallback,
    ) -> Self {
        AutocompleteDescriptor {
            binding: AutocompleteBinding::Parameter {
                command_path,
                parameter_name: parameter_name.into(),
            },
            callback,
        }
    }

    /// A free handler addressed by its own id.
    pub fn free(id: impl Into<String>, callback: AutocompleteCallback) -> Self {
        AutocompleteDescriptor {
            binding: AutocompleteBinding::Free { id: id.into() },
            callback,
        }
    }
}
