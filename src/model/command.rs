//! Built command metadata: the leaves of the module tree.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Add autocomplete bindings and suggestion type
//! - 1.1.0: Add component and modal command infos
//! - 1.0.0: Slash and context command infos

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use anyhow::Result;

use crate::interaction::{InteractionContext, InteractionOption, ServiceProvider};
use crate::model::descriptor::Attribute;
use crate::model::modal::ModalDescriptor;
use crate::model::module::ModuleInfo;
use crate::model::parameter::{ArgValue, ChoiceValue, ParameterInfo};
use crate::BoxFuture;

/// Handler invoked with the synthesized arguments once the pipeline has
/// resolved, converted and precondition-checked an interaction.
pub type HandlerCallback = Arc<
    dyn Fn(Arc<InteractionContext>, Vec<ArgValue>, Arc<dyn ServiceProvider>) -> BoxFuture<'static, Result<()>>
        + Send
        + Sync,
>;

/// Handler producing autocomplete suggestions for one focused option.
pub type AutocompleteCallback = Arc<
    dyn Fn(Arc<InteractionContext>, InteractionOption, Arc<dyn ServiceProvider>) -> BoxFuture<'static, Result<Vec<Suggestion>>>
        + Send
        + Sync,
>;

/// Wrap an async closure into a [`HandlerCallback`].
pub fn handler<F, Fut>(f: F) -> HandlerCallback
where
    F: Fn(Arc<InteractionContext>, Vec<ArgValue>, Arc<dyn ServiceProvider>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx, args, services| Box::pin(f(ctx, args, services)))
}

/// Wrap an async closure into an [`AutocompleteCallback`].
pub fn autocomplete_handler<F, Fut>(f: F) -> AutocompleteCallback
where
    F: Fn(Arc<InteractionContext>, InteractionOption, Arc<dyn ServiceProvider>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Suggestion>>> + Send + 'static,
{
    Arc::new(move |ctx, focused, services| Box::pin(f(ctx, focused, services)))
}

/// Predicate evaluated before handler dispatch. The error string becomes the
/// `UnmetPrecondition` reason.
#[async_trait::async_trait]
pub trait Precondition: Send + Sync {
    async fn check(
        &self,
        ctx: &InteractionContext,
        services: &dyn ServiceProvider,
    ) -> std::result::Result<(), String>;
}

/// A built slash command, addressable by its full path.
pub struct SlashCommandInfo {
    pub name: String,
    pub description: String,
    /// Publish path: `["admin", "kick"]` for `/admin kick`. Commands with
    /// `ignore_group_names` keep a single-segment path.
    pub path: Vec<String>,
    pub default_permission: bool,
    pub ignore_group_names: bool,
    pub parameters: Vec<Arc<ParameterInfo>>,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub module: Weak<ModuleInfo>,
    pub callback: HandlerCallback,
}

impl SlashCommandInfo {
    pub fn path_string(&self) -> String {
        self.path.join(" ")
    }
}

impl fmt::Debug for SlashCommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlashCommandInfo")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Target of a context command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextCommandType {
    User,
    Message,
}

/// A built context-menu command. Carries exactly one implicit argument, the
/// target user or message.
pub struct ContextCommandInfo {
    pub name: String,
    pub command_type: ContextCommandType,
    pub default_permission: bool,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub module: Weak<ModuleInfo>,
    pub callback: HandlerCallback,
}

impl fmt::Debug for ContextCommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCommandInfo")
            .field("name", &self.name)
            .field("command_type", &self.command_type)
            .finish()
    }
}

/// A built message-component handler. The name is a pattern over the
/// interaction's custom id and may contain wildcards.
pub struct ComponentCommandInfo {
    /// The declared pattern, split into path segments.
    pub path: Vec<String>,
    pub parameters: Vec<Arc<ParameterInfo>>,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub module: Weak<ModuleInfo>,
    pub callback: HandlerCallback,
}

impl fmt::Debug for ComponentCommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCommandInfo")
            .field("path", &self.path)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// A built modal handler. The first handler argument is the materialised
/// modal; wildcard captures follow.
pub struct ModalCommandInfo {
    pub path: Vec<String>,
    pub modal: Arc<ModalDescriptor>,
    /// Parameters filled from wildcard captures, after the modal itself.
    pub parameters: Vec<Arc<ParameterInfo>>,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub module: Weak<ModuleInfo>,
    pub callback: HandlerCallback,
}

impl fmt::Debug for ModalCommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalCommandInfo")
            .field("path", &self.path)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// What an autocomplete handler is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutocompleteBinding {
    /// Bound to one parameter of one slash command.
    Parameter {
        command_path: Vec<String>,
        parameter_name: String,
    },
    /// Free handler addressed by its own id.
    Free { id: String },
}

impl AutocompleteBinding {
    /// Lookup path inside the autocomplete map.
    pub fn map_path(&self) -> Vec<String> {
        match self {
            AutocompleteBinding::Parameter {
                command_path,
                parameter_name,
            } => {
                let mut path = command_path.clone();
                path.push(parameter_name.clone());
                path
            }
            AutocompleteBinding::Free { id } => vec![id.clone()],
        }
    }
}

/// A built autocomplete handler.
pub struct AutocompleteCommandInfo {
    pub binding: AutocompleteBinding,
    pub module: Weak<ModuleInfo>,
    pub callback: AutocompleteCallback,
}

impl fmt::Debug for AutocompleteCommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutocompleteCommandInfo")
            .field("binding", &self.binding)
            .finish()
    }
}

/// One autocomplete suggestion; at most 25 are sent per query.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub name: String,
    pub value: ChoiceValue,
}

impl Suggestion {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Suggestion {
            name: name.into(),
            value: ChoiceValue::String(value.into()),
        }
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Suggestion {
            name: name.into(),
            value: ChoiceValue::Integer(value),
        }
    }

    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Suggestion {
            name: name.into(),
            value: ChoiceValue::Number(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autocomplete_binding_map_path() {
        let bound = AutocompleteBinding::Parameter {
            command_path: vec!["admin".into(), "kick".into()],
            parameter_name: "user".into(),
        };
        assert_eq!(bound.map_path(), vec!["admin", "kick", "user"]);

        let free = AutocompleteBinding::Free { id: "tags".into() };
        assert_eq!(free.map_path(), vec!["tags"]);
    }

    #[test]
    fn test_suggestion_constructors() {
        let s = Suggestion::string("Red", "red");
        assert_eq!(s.value, ChoiceValue::String("red".into()));
        let i = Suggestion::integer("One", 1);
        assert_eq!(i.value, ChoiceValue::Integer(1));
    }
}
