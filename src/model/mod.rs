//! # Command Metadata
//!
//! The in-memory command tree: module descriptors on the way in, immutable
//! module/command/parameter infos once built.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Add modal descriptors and lifecycle hooks
//! - 1.1.0: Add component and autocomplete metadata
//! - 1.0.0: Initial module, command and parameter types

pub mod command;
pub mod descriptor;
pub mod modal;
pub mod module;
pub mod parameter;

// Re-export commonly used items
pub use command::{
    autocomplete_handler, handler, AutocompleteBinding, AutocompleteCallback,
    AutocompleteCommandInfo, ComponentCommandInfo, ContextCommandInfo, ContextCommandType,
    HandlerCallback, ModalCommandInfo, Precondition, SlashCommandInfo, Suggestion,
};
pub use descriptor::{
    Attribute, AutocompleteDescriptor, ComponentCommandDescriptor, ContextCommandDescriptor,
    ModalCommandDescriptor, ModuleDescriptor, ModuleSource, ParameterDescriptor,
    SlashCommandDescriptor,
};
pub use modal::{ModalDescriptor, ModalFieldDescriptor, ModalInstance, TextInputStyle};
pub use module::{ModuleInfo, ModuleLifecycle};
pub use parameter::{
    ArgValue, ChannelType, ChoiceValue, ParamType, ParameterChoice, ParameterInfo,
};
