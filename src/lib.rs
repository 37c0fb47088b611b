// Core layer - configuration, errors, results, events
pub mod core;

// Metadata layer - descriptors in, immutable command tree out
pub mod builder;
pub mod model;

// Routing layer - concurrent path and custom-id tries
pub mod map;

// Conversion layer - declared types to native values
pub mod convert;

// Runtime layer - inbound interactions and the execution pipeline
pub mod interaction;
pub mod pipeline;

// Platform layer - payload DTOs, registry client contract, sync engine
pub mod client;
pub mod payload;
pub mod sync;

// Application layer
pub mod service;

pub(crate) type BoxFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

// Re-export the facade and the types hosts touch every day
pub use crate::core::{ErrorKind, ExecuteResult, InteractionConfig, InteractionError, SubscriptionId};
pub use interaction::{
    CancellationToken, EmptyServiceProvider, InteractionContext, InteractionKind,
    InteractionOption, InteractionResponder, InteractionUser, SelectedValues, ServiceMap,
    ServiceProvider, SubmittedField,
};
pub use model::{
    autocomplete_handler, handler, ArgValue, Attribute, AutocompleteDescriptor, ChannelType,
    ChoiceValue, ComponentCommandDescriptor, ContextCommandDescriptor, ContextCommandType,
    HandlerCallback, ModalCommandDescriptor, ModalDescriptor, ModalFieldDescriptor, ModalInstance,
    ModuleDescriptor, ModuleInfo, ModuleLifecycle, ModuleSource, ParamType, ParameterChoice,
    ParameterDescriptor, Precondition, SlashCommandDescriptor, Suggestion, TextInputStyle,
};
pub use client::CommandRegistryClient;
pub use payload::{CommandPayload, CommandProperties, CommandType, OptionType, PayloadChoice, PayloadOption};
pub use pipeline::{
    AutocompleteExecutedEvent, ComponentExecutedEvent, ContextExecutedEvent, EventRegistry,
    LogEvent, ModalExecutedEvent, SlashExecutedEvent,
};
pub use service::InteractionService;
pub use sync::SyncScope;
