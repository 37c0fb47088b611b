//! Inbound interaction context and runtime DTOs.
//!
//! The wire transport is out of scope: the host gateway translates its
//! platform events into these types and feeds them to the service entry
//! points. Payload fragments the framework does not interpret (embeds,
//! resolved entities) stay as opaque JSON.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Add cancellation token and responder seam
//! - 1.1.0: Add submitted modal fields
//! - 1.0.0: Initial context and option types

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::command::Suggestion;

/// Kind of an inbound interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    SlashCommand,
    UserContextCommand,
    MessageContextCommand,
    Component,
    ModalSubmit,
    Autocomplete,
}

/// The invoking user, resolved by the host gateway.
#[derive(Debug, Clone)]
pub struct InteractionUser {
    pub id: u64,
    pub username: String,
    pub is_bot: bool,
}

/// Cooperative cancellation signal propagated into every pipeline suspension.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Host-supplied handle for responding to the interaction outside a handler:
/// deleting a stale acknowledgement or sending autocomplete suggestions.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Delete the original interaction acknowledgement.
    async fn delete_original_response(&self) -> Result<()>;

    /// Send autocomplete suggestions for the focused option.
    async fn send_suggestions(&self, suggestions: &[Suggestion]) -> Result<()>;
}

/// Resolver interface over the host's dependency-injection container.
///
/// Handlers receive the provider untouched; the framework never inspects the
/// resolved values.
pub trait ServiceProvider: Send + Sync {
    fn resolve(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// Provider with no services, for hosts that pass everything by closure.
pub struct EmptyServiceProvider;

impl ServiceProvider for EmptyServiceProvider {
    fn resolve(&self, _key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }
}

/// Simple map-backed provider.
#[derive(Default)]
pub struct ServiceMap {
    services: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, service: Arc<dyn Any + Send + Sync>) {
        self.services.insert(key.into(), service);
    }
}

impl ServiceProvider for ServiceMap {
    fn resolve(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.services.get(key).cloned()
    }
}

/// Everything the pipeline knows about one inbound interaction.
#[derive(Clone)]
pub struct InteractionContext {
    pub interaction_id: u64,
    pub application_id: u64,
    /// Continuation token for follow-up responses; opaque to the framework.
    pub token: String,
    pub kind: InteractionKind,
    pub guild_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub user: InteractionUser,
    pub cancellation: CancellationToken,
    pub responder: Option<Arc<dyn InteractionResponder>>,
}

impl InteractionContext {
    /// Minimal context for a given kind, used by hosts and tests.
    pub fn new(kind: InteractionKind, user: InteractionUser) -> Self {
        InteractionContext {
            interaction_id: 0,
            application_id: 0,
            token: String::new(),
            kind,
            guild_id: None,
            channel_id: None,
            user,
            cancellation: CancellationToken::new(),
            responder: None,
        }
    }
}

impl std::fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionContext")
            .field("interaction_id", &self.interaction_id)
            .field("kind", &self.kind)
            .field("guild_id", &self.guild_id)
            .field("user", &self.user.id)
            .finish()
    }
}

/// One option of an inbound application-command interaction.
///
/// Subcommand and group entries carry a null value and nested options.
#[derive(Debug, Clone)]
pub struct InteractionOption {
    pub name: String,
    pub value: serde_json::Value,
    pub options: Vec<InteractionOption>,
    /// True for the option the user is currently typing (autocomplete).
    pub focused: bool,
}

impl InteractionOption {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        InteractionOption {
            name: name.into(),
            value,
            options: Vec::new(),
            focused: false,
        }
    }

    /// A subcommand or group entry wrapping nested options.
    pub fn nested(name: impl Into<String>, options: Vec<InteractionOption>) -> Self {
        InteractionOption {
            name: name.into(),
            value: serde_json::Value::Null,
            options,
            focused: false,
        }
    }

    /// True when this entry is a subcommand or group marker rather than a
    /// concrete value.
    pub fn is_nested(&self) -> bool {
        self.value.is_null() && !self.options.is_empty()
    }
}

/// The values a user picked in a select-menu component, in selection order.
/// Fills the handler's trailing string-list parameter.
pub type SelectedValues = Vec<String>;

/// One submitted text-input of a modal, keyed by the field's custom id.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedField {
    pub custom_id: String,
    pub value: String,
}

impl SubmittedField {
    pub fn new(custom_id: impl Into<String>, value: impl Into<String>) -> Self {
        SubmittedField {
            custom_id: custom_id.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_nested_option_detection() {
        let leaf = InteractionOption::new("user", serde_json::json!("123"));
        assert!(!leaf.is_nested());

        let group = InteractionOption::nested("kick", vec![leaf]);
        assert!(group.is_nested());
    }

    #[test]
    fn test_service_map_resolve() {
        let mut services = ServiceMap::new();
        services.insert("counter", Arc::new(7_u32));
        let resolved = services.resolve("counter").unwrap();
        assert_eq!(*resolved.downcast::<u32>().unwrap(), 7);
        assert!(services.resolve("missing").is_none());
    }
}
