//! # Interaction Service
//!
//! The public facade: module registration, the four interaction entry
//! points, registry sync and event subscriptions. Registration writes go
//! through one framework-wide mutex and atomically swap an immutable module
//! snapshot; lookups and dispatch never take that lock.
//!
//! - **Version**: 1.4.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.4.0: Registry sync entry points
//! - 1.3.0: Modal and autocomplete routing
//! - 1.2.0: Component routing with custom id delimiters
//! - 1.1.0: Module removal with map cleanup
//! - 1.0.0: Module registration and slash dispatch

use std::sync::{Arc, RwLock, Weak};

use dashmap::DashMap;
use log::debug;

use crate::builder::{build_modules, BuildSettings};
use crate::client::CommandRegistryClient;
use crate::convert::{TypeConverter, TypeConverterRegistry};
use crate::core::{ExecuteResult, InteractionConfig, InteractionError, SubscriptionId};
use crate::interaction::{
    InteractionContext, InteractionOption, SelectedValues, ServiceProvider, SubmittedField,
};
use crate::map::wildcard::WildcardSyntax;
use crate::map::CommandMap;
use crate::model::command::{
    AutocompleteCommandInfo, ComponentCommandInfo, ContextCommandInfo, ContextCommandType,
    ModalCommandInfo, SlashCommandInfo,
};
use crate::model::descriptor::{ModuleDescriptor, ModuleSource};
use crate::model::module::ModuleInfo;
use crate::model::parameter::{ArgValue, ParamType};
use crate::payload::CommandPayload;
use crate::pipeline::{
    AutocompleteExecutedEvent, ComponentExecutedEvent, ContextExecutedEvent, EventRegistry,
    Executor, LogEvent, ModalExecutedEvent, SlashExecutedEvent,
};
use crate::sync::{self, SyncScope};

/// The framework facade.
///
/// One service owns one routing table; hosts running multiple shards share a
/// single service and feed it interactions from every shard.
pub struct InteractionService {
    config: InteractionConfig,
    converters: TypeConverterRegistry,
    registry_client: Option<Arc<dyn CommandRegistryClient>>,
    slash_map: CommandMap<Weak<SlashCommandInfo>>,
    component_map: CommandMap<Weak<ComponentCommandInfo>>,
    modal_map: CommandMap<Weak<ModalCommandInfo>>,
    autocomplete_map: CommandMap<Weak<AutocompleteCommandInfo>>,
    context_commands: DashMap<String, Weak<ContextCommandInfo>>,
    /// Immutable snapshot, swapped wholesale under the write lock.
    modules: RwLock<Arc<Vec<Arc<ModuleInfo>>>>,
    write_lock: tokio::sync::Mutex<()>,
    events: Arc<EventRegistry>,
    executor: Executor,
}

impl InteractionService {
    /// Create a service with the given configuration.
    pub fn new(config: InteractionConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let syntax = WildcardSyntax {
            open: config.wildcard_open,
            close: config.wildcard_close,
        };
        let events = Arc::new(EventRegistry::new());
        let executor = Executor::new(config.clone(), Arc::clone(&events));
        Ok(InteractionService {
            config,
            converters: TypeConverterRegistry::with_builtins(),
            registry_client: None,
            slash_map: CommandMap::new(syntax),
            component_map: CommandMap::new(syntax),
            modal_map: CommandMap::new(syntax),
            autocomplete_map: CommandMap::new(syntax),
            context_commands: DashMap::new(),
            modules: RwLock::new(Arc::new(Vec::new())),
            write_lock: tokio::sync::Mutex::new(()),
            events,
            executor,
        })
    }

    /// Attach the registry client used by the sync entry points.
    pub fn with_registry_client(mut self, client: Arc<dyn CommandRegistryClient>) -> Self {
        self.registry_client = Some(client);
        self
    }

    fn build_settings(&self) -> BuildSettings {
        BuildSettings {
            custom_id_delimiters: self.config.custom_id_delimiters.clone(),
            wildcard_syntax: WildcardSyntax {
                open: self.config.wildcard_open,
                close: self.config.wildcard_close,
            },
        }
    }

    // ── Registration ────────────────────────────────────────────────────────

    /// Build and register every module the source yields. On any failure
    /// nothing is registered.
    pub async fn add_modules(
        &self,
        source: &dyn ModuleSource,
    ) -> Result<Vec<Arc<ModuleInfo>>, InteractionError> {
        let _guard = self.write_lock.lock().await;
        let descriptors = source.modules();

        let current = self.snapshot();
        for descriptor in &descriptors {
            if current.iter().any(|m| m.name == descriptor.name) {
                return Err(InteractionError::DuplicateCommand {
                    path: descriptor.name.clone(),
                });
            }
        }

        let built = build_modules(&descriptors, &self.converters, &self.build_settings())?;

        let mut undo = Vec::new();
        for module in &built {
            if let Err(err) = self.insert_module(module, &mut undo) {
                self.apply_undo(undo);
                return Err(err);
            }
        }

        let mut next = current.as_ref().clone();
        next.extend(built.iter().cloned());
        *self.modules.write().unwrap() = Arc::new(next);

        debug!("registered {} modules", built.len());
        Ok(built)
    }

    /// Build and register a single module.
    pub async fn add_module(
        &self,
        descriptor: ModuleDescriptor,
    ) -> Result<Arc<ModuleInfo>, InteractionError> {
        let mut built = self.add_modules(&descriptor).await?;
        match built.pop() {
            Some(module) => Ok(module),
            None => Err(InteractionError::parse_failed("module source yielded no modules")),
        }
    }

    /// Remove a registered top-level module by its internal name, dropping
    /// all of its commands from the routing tables.
    pub async fn remove_module(&self, name: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let current = self.snapshot();
        let Some(index) = current.iter().position(|m| m.name == name) else {
            return false;
        };

        self.remove_module_entries(&current[index]);

        let mut next = current.as_ref().clone();
        next.remove(index);
        *self.modules.write().unwrap() = Arc::new(next);
        debug!("removed module '{name}'");
        true
    }

    /// The current immutable module snapshot.
    pub fn registered_modules(&self) -> Arc<Vec<Arc<ModuleInfo>>> {
        self.snapshot()
    }

    fn snapshot(&self) -> Arc<Vec<Arc<ModuleInfo>>> {
        Arc::clone(&self.modules.read().unwrap())
    }

    fn insert_module(
        &self,
        module: &Arc<ModuleInfo>,
        undo: &mut Vec<UndoOp>,
    ) -> Result<(), InteractionError> {
        for command in &module.slash_commands {
            self.slash_map
                .insert(&command.path, Arc::downgrade(command), false)?;
            undo.push(UndoOp::Slash(command.path.clone()));
        }
        for command in &module.context_commands {
            let key = context_key(command.command_type, &command.name);
            match self.context_commands.entry(key.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    return Err(InteractionError::DuplicateCommand {
                        path: command.name.clone(),
                    })
                }
                dashmap::mapref::entry::Entry::Vacant(vacant) => {
                    vacant.insert(Arc::downgrade(command));
                    undo.push(UndoOp::Context(key));
                }
            }
        }
        for command in &module.component_commands {
            self.component_map
                .insert(&command.path, Arc::downgrade(command), true)?;
            undo.push(UndoOp::Component(command.path.clone()));
        }
        for command in &module.modal_commands {
            self.modal_map
                .insert(&command.path, Arc::downgrade(command), true)?;
            undo.push(UndoOp::Modal(command.path.clone()));
        }
        for command in &module.autocomplete_commands {
            let path = command.binding.map_path();
            self.autocomplete_map
                .insert(&path, Arc::downgrade(command), false)?;
            undo.push(UndoOp::Autocomplete(path));
        }
        for submodule in &module.submodules {
            self.insert_module(submodule, undo)?;
        }
        Ok(())
    }

    fn apply_undo(&self, undo: Vec<UndoOp>) {
        for op in undo {
            match op {
                UndoOp::Slash(path) => {
                    self.slash_map.remove(&path, false);
                }
                UndoOp::Component(path) => {
                    self.component_map.remove(&path, true);
                }
                UndoOp::Modal(path) => {
                    self.modal_map.remove(&path, true);
                }
                UndoOp::Autocomplete(path) => {
                    self.autocomplete_map.remove(&path, false);
                }
                UndoOp::Context(key) => {
                    self.context_commands.remove(&key);
                }
            }
        }
    }

    fn remove_module_entries(&self, module: &Arc<ModuleInfo>) {
        for command in &module.slash_commands {
            self.slash_map.remove(&command.path, false);
        }
        for command in &module.context_commands {
            self.context_commands
                .remove(&context_key(command.command_type, &command.name));
        }
        for command in &module.component_commands {
            self.component_map.remove(&command.path, true);
        }
        for command in &module.modal_commands {
            self.modal_map.remove(&command.path, true);
        }
        for command in &module.autocomplete_commands {
            self.autocomplete_map.remove(&command.binding.map_path(), false);
        }
        for submodule in &module.submodules {
            self.remove_module_entries(submodule);
        }
    }

    // ── Converters ──────────────────────────────────────────────────────────

    /// Register a custom exact converter for a type tag.
    pub async fn add_type_converter(&self, target: ParamType, converter: Arc<dyn TypeConverter>) {
        let _guard = self.write_lock.lock().await;
        self.converters.add_converter(target, converter);
    }

    /// Remove the exact converter for a type tag.
    pub async fn remove_type_converter(&self, target: &ParamType) -> bool {
        let _guard = self.write_lock.lock().await;
        self.converters.remove_converter(target)
    }

    // ── Execution entry points ──────────────────────────────────────────────

    /// Route a slash-command interaction. When the given path resolves to a
    /// group prefix, the nested options are descended until a leaf command
    /// with concrete values is found.
    pub async fn execute_slash(
        &self,
        ctx: Arc<InteractionContext>,
        path: &[&str],
        options: Vec<InteractionOption>,
        services: Arc<dyn ServiceProvider>,
    ) -> anyhow::Result<ExecuteResult> {
        let mut segments: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        let mut options = options;

        let command = loop {
            let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
            match self.slash_map.lookup(&refs) {
                Ok(found) => break found.value.upgrade(),
                Err(_) => {
                    if options.len() == 1 && options[0].is_nested() {
                        let nested = options.remove(0);
                        segments.push(nested.name);
                        options = nested.options;
                    } else {
                        break None;
                    }
                }
            }
        };

        match command {
            Some(command) => self.executor.run_slash(command, ctx, options, services).await,
            None => Ok(self.executor.unknown_slash(ctx, segments.join(" ")).await),
        }
    }

    /// Route a context-menu interaction with its target user or message.
    pub async fn execute_context(
        &self,
        ctx: Arc<InteractionContext>,
        name: &str,
        target: ArgValue,
        services: Arc<dyn ServiceProvider>,
    ) -> anyhow::Result<ExecuteResult> {
        let command_type = match target {
            ArgValue::Message(_) => ContextCommandType::Message,
            _ => ContextCommandType::User,
        };
        let command = self
            .context_commands
            .get(&context_key(command_type, name))
            .and_then(|entry| entry.upgrade());

        match command {
            Some(command) => self.executor.run_context(command, ctx, target, services).await,
            None => Ok(self.executor.unknown_context(ctx, name.to_string()).await),
        }
    }

    /// Route a message-component interaction by its custom id. For select
    /// menus the selected values fill the handler's trailing string-list
    /// parameter.
    pub async fn execute_component(
        &self,
        ctx: Arc<InteractionContext>,
        custom_id: &str,
        select_values: Option<SelectedValues>,
        services: Arc<dyn ServiceProvider>,
    ) -> anyhow::Result<ExecuteResult> {
        let segments = self.config.split_custom_id(custom_id);
        match self.component_map.lookup(&segments) {
            Ok(found) => match found.value.upgrade() {
                Some(command) => {
                    self.executor
                        .run_component(command, ctx, found.captures, select_values, services)
                        .await
                }
                None => Ok(self.executor.unknown_component(ctx, custom_id.to_string()).await),
            },
            Err(_) => Ok(self.executor.unknown_component(ctx, custom_id.to_string()).await),
        }
    }

    /// Route a modal submission by its custom id.
    pub async fn execute_modal(
        &self,
        ctx: Arc<InteractionContext>,
        custom_id: &str,
        fields: &[SubmittedField],
        services: Arc<dyn ServiceProvider>,
    ) -> anyhow::Result<ExecuteResult> {
        let segments = self.config.split_custom_id(custom_id);
        match self.modal_map.lookup(&segments) {
            Ok(found) => match found.value.upgrade() {
                Some(command) => {
                    self.executor
                        .run_modal(command, ctx, found.captures, fields, services)
                        .await
                }
                None => Ok(self.executor.unknown_modal(ctx, custom_id.to_string()).await),
            },
            Err(_) => Ok(self.executor.unknown_modal(ctx, custom_id.to_string()).await),
        }
    }

    /// Route an autocomplete query for one focused option of an in-progress
    /// slash command.
    pub async fn execute_autocomplete(
        &self,
        ctx: Arc<InteractionContext>,
        path: &[&str],
        focused: InteractionOption,
        services: Arc<dyn ServiceProvider>,
    ) -> anyhow::Result<ExecuteResult> {
        let miss_path = format!("{} {}", path.join(" "), focused.name);

        // The command must exist and declare the focused parameter as
        // autocomplete-enabled.
        let command = self.find_slash_command(path);
        let parameter_ok = command.as_ref().is_some_and(|command| {
            command
                .parameters
                .iter()
                .any(|p| p.autocomplete && p.name.eq_ignore_ascii_case(&focused.name))
        });
        if !parameter_ok {
            return Ok(self.executor.unknown_autocomplete(ctx, miss_path).await);
        }

        let mut handler_path: Vec<&str> = path.to_vec();
        handler_path.push(&focused.name);
        let handler = match self.autocomplete_map.lookup(&handler_path) {
            Ok(found) => found.value.upgrade(),
            // Fall back to a free handler registered under the option name.
            Err(_) => match self.autocomplete_map.lookup(&[&focused.name]) {
                Ok(found) => found.value.upgrade(),
                Err(_) => None,
            },
        };

        match handler {
            Some(handler) => Ok(self
                .executor
                .run_autocomplete(handler, ctx, focused, services)
                .await),
            None => Ok(self.executor.unknown_autocomplete(ctx, miss_path).await),
        }
    }

    // ── Lookup helpers ──────────────────────────────────────────────────────

    /// Find a registered slash command by its full path.
    pub fn find_slash_command(&self, path: &[&str]) -> Option<Arc<SlashCommandInfo>> {
        self.slash_map.lookup(path).ok().and_then(|f| f.value.upgrade())
    }

    /// Find the component handler a custom id would route to.
    pub fn find_component_handler(&self, custom_id: &str) -> Option<Arc<ComponentCommandInfo>> {
        let segments = self.config.split_custom_id(custom_id);
        self.component_map
            .lookup(&segments)
            .ok()
            .and_then(|f| f.value.upgrade())
    }

    /// Find the modal handler a custom id would route to.
    pub fn find_modal_handler(&self, custom_id: &str) -> Option<Arc<ModalCommandInfo>> {
        let segments = self.config.split_custom_id(custom_id);
        self.modal_map
            .lookup(&segments)
            .ok()
            .and_then(|f| f.value.upgrade())
    }

    // ── Sync ────────────────────────────────────────────────────────────────

    fn client(&self) -> anyhow::Result<&Arc<dyn CommandRegistryClient>> {
        self.registry_client
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no registry client configured"))
    }

    /// Reconcile the registered module tree with the platform. `guild_id`
    /// selects the guild scope; `None` syncs globally.
    pub async fn sync_commands(
        &self,
        guild_id: Option<u64>,
        delete_missing: bool,
    ) -> anyhow::Result<Vec<CommandPayload>> {
        let client = self.client()?;
        let modules = self.snapshot();
        let scope = guild_id.map(SyncScope::Guild).unwrap_or(SyncScope::Global);
        sync::sync_all(client.as_ref(), &modules, scope, delete_missing).await
    }

    /// Create the given payloads in a guild without overwriting its set.
    pub async fn add_commands_to_guild(
        &self,
        guild_id: u64,
        commands: &[CommandPayload],
    ) -> anyhow::Result<Vec<CommandPayload>> {
        let client = self.client()?;
        sync::add_commands_to_guild(client.as_ref(), guild_id, commands).await
    }

    /// Create the payloads of the given modules in a guild, including
    /// modules flagged `dont_auto_register`.
    pub async fn add_modules_to_guild(
        &self,
        guild_id: u64,
        modules: &[Arc<ModuleInfo>],
    ) -> anyhow::Result<Vec<CommandPayload>> {
        let client = self.client()?;
        sync::add_modules_to_guild(client.as_ref(), guild_id, modules).await
    }

    // ── Events ──────────────────────────────────────────────────────────────

    pub fn on_log<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent) + Send + Sync + 'static,
    {
        self.events.log.subscribe(callback)
    }

    pub fn on_slash_executed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SlashExecutedEvent) + Send + Sync + 'static,
    {
        self.events.slash_executed.subscribe(callback)
    }

    pub fn on_context_executed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ContextExecutedEvent) + Send + Sync + 'static,
    {
        self.events.context_executed.subscribe(callback)
    }

    pub fn on_component_executed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ComponentExecutedEvent) + Send + Sync + 'static,
    {
        self.events.component_executed.subscribe(callback)
    }

    pub fn on_modal_executed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ModalExecutedEvent) + Send + Sync + 'static,
    {
        self.events.modal_executed.subscribe(callback)
    }

    pub fn on_autocomplete_executed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AutocompleteExecutedEvent) + Send + Sync + 'static,
    {
        self.events.autocomplete_executed.subscribe(callback)
    }

    /// Unsubscribe from the log event.
    pub fn off_log(&self, id: SubscriptionId) -> bool {
        self.events.log.unsubscribe(id)
    }

    /// Direct access to the event buses for advanced subscribers.
    pub fn event_bus(&self) -> &EventRegistry {
        &self.events
    }
}

fn context_key(command_type: ContextCommandType, name: &str) -> String {
    match command_type {
        ContextCommandType::User => format!("user:{name}"),
        ContextCommandType::Message => format!("message:{name}"),
    }
}

enum UndoOp {
    Slash(Vec<String>),
    Component(Vec<String>),
    Modal(Vec<String>),
    Autocomplete(Vec<String>),
    Context(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::interaction::{EmptyServiceProvider, InteractionKind, InteractionUser};
    use crate::model::command::{autocomplete_handler, handler, Suggestion};
    use crate::model::descriptor::{
        AutocompleteDescriptor, ComponentCommandDescriptor, ModalCommandDescriptor,
        ParameterDescriptor, SlashCommandDescriptor,
    };
    use crate::model::modal::{ModalDescriptor, ModalFieldDescriptor, TextInputStyle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn service() -> InteractionService {
        InteractionService::new(InteractionConfig::default()).unwrap()
    }

    fn ctx(kind: InteractionKind) -> Arc<InteractionContext> {
        Arc::new(InteractionContext::new(
            kind,
            InteractionUser {
                id: 7,
                username: "tester".into(),
                is_bot: false,
            },
        ))
    }

    fn services() -> Arc<dyn ServiceProvider> {
        Arc::new(EmptyServiceProvider)
    }

    fn noop() -> crate::model::command::HandlerCallback {
        handler(|_ctx, _args, _services| async { Ok(()) })
    }

    #[tokio::test]
    async fn test_simple_slash_end_to_end() {
        let service = service();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);

        let module = ModuleDescriptor::new("misc").slash_command(SlashCommandDescriptor::new(
            "ping",
            "pong latency",
            handler(move |_ctx, _args, _services| {
                let hits = Arc::clone(&hits_clone);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        ));
        service.add_modules(&module).await.unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        service.on_slash_executed(move |event| {
            assert!(event.result.is_success());
            assert_eq!(event.command.as_ref().unwrap().name, "ping");
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let result = service
            .execute_slash(ctx(InteractionKind::SlashCommand), &["ping"], Vec::new(), services())
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nested_group_with_default() {
        let service = service();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let module = ModuleDescriptor::new("admin_module")
            .slash_group("admin", "admin commands")
            .slash_command(
                SlashCommandDescriptor::new(
                    "kick",
                    "kick a member",
                    handler(move |_ctx, args, _services| {
                        let seen = Arc::clone(&seen_clone);
                        async move {
                            seen.lock().unwrap().extend(args);
                            Ok(())
                        }
                    }),
                )
                .parameter(ParameterDescriptor::required(
                    "user",
                    ParamType::User,
                    "member to kick",
                ))
                .parameter(ParameterDescriptor::optional(
                    "reason",
                    ParamType::String,
                    "why",
                    Some(ArgValue::String("none".into())),
                )),
            );
        service.add_modules(&module).await.unwrap();

        let options = vec![InteractionOption::new("user", serde_json::json!("123"))];
        let result = service
            .execute_slash(
                ctx(InteractionKind::SlashCommand),
                &["admin", "kick"],
                options,
                services(),
            )
            .await
            .unwrap();

        assert!(result.is_success());
        let args = seen.lock().unwrap().clone();
        assert_eq!(args, vec![ArgValue::User(123), ArgValue::String("none".into())]);
    }

    #[tokio::test]
    async fn test_group_prefix_descends_nested_options() {
        let service = service();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);

        let module = ModuleDescriptor::new("admin_module")
            .slash_group("admin", "admin commands")
            .slash_command(SlashCommandDescriptor::new(
                "kick",
                "kick a member",
                handler(move |_ctx, _args, _services| {
                    let hits = Arc::clone(&hits_clone);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            ));
        service.add_modules(&module).await.unwrap();

        // The host hands the group prefix and the leaf nested in options.
        let options = vec![InteractionOption::nested("kick", Vec::new())];
        let result = service
            .execute_slash(ctx(InteractionKind::SlashCommand), &["admin"], options, services())
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_slash_fires_event_with_unknown_command() {
        let service = service();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        service.on_slash_executed(move |event| {
            assert!(event.command.is_none());
            assert_eq!(event.result.error(), Some(ErrorKind::UnknownCommand));
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let result = service
            .execute_slash(ctx(InteractionKind::SlashCommand), &["nope"], Vec::new(), services())
            .await
            .unwrap();

        assert_eq!(result.error(), Some(ErrorKind::UnknownCommand));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_component_wildcard_routing() {
        let service = service();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let module = ModuleDescriptor::new("votes").component_handler(
            ComponentCommandDescriptor::new(
                "vote:{id:int}",
                handler(move |_ctx, args, _services| {
                    let seen = Arc::clone(&seen_clone);
                    async move {
                        seen.lock().unwrap().extend(args);
                        Ok(())
                    }
                }),
            )
            .parameter(ParameterDescriptor::required(
                "id",
                ParamType::Integer,
                "vote id",
            )),
        );
        service.add_modules(&module).await.unwrap();

        let result = service
            .execute_component(ctx(InteractionKind::Component), "vote:42", None, services())
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(*seen.lock().unwrap(), vec![ArgValue::Integer(42)]);
    }

    #[tokio::test]
    async fn test_duplicate_wildcard_registration_rolls_back() {
        let service = service();
        let module = ModuleDescriptor::new("votes")
            .component_handler(
                ComponentCommandDescriptor::new("a:{x}", noop()).parameter(
                    ParameterDescriptor::required("x", ParamType::String, "x"),
                ),
            )
            .component_handler(
                ComponentCommandDescriptor::new("a:{y}", noop()).parameter(
                    ParameterDescriptor::required("y", ParamType::String, "y"),
                ),
            );

        let err = service.add_modules(&module).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateCommand);

        // The partial insert was rolled back together with the snapshot.
        assert!(service.registered_modules().is_empty());
        assert!(service.find_component_handler("a:anything").is_none());
    }

    #[tokio::test]
    async fn test_modal_submission_routing() {
        let service = service();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let modal = ModalDescriptor {
            title: "Feedback".into(),
            fields: vec![ModalFieldDescriptor {
                name: "body".into(),
                custom_id: "feedback_body".into(),
                style: TextInputStyle::Paragraph,
                required: true,
            }],
        };
        let module = ModuleDescriptor::new("feedback").modal_handler(ModalCommandDescriptor::new(
            "feedback_modal",
            modal,
            handler(move |_ctx, args, _services| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    seen.lock().unwrap().extend(args);
                    Ok(())
                }
            }),
        ));
        service.add_modules(&module).await.unwrap();

        let fields = vec![SubmittedField::new("feedback_body", "this is great")];
        let result = service
            .execute_modal(ctx(InteractionKind::ModalSubmit), "feedback_modal", &fields, services())
            .await
            .unwrap();

        assert!(result.is_success());
        let args = seen.lock().unwrap().clone();
        match &args[0] {
            ArgValue::Modal(instance) => assert_eq!(instance.get("body"), Some("this is great")),
            other => panic!("expected a modal instance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_autocomplete_routing_and_truncation() {
        let service = service();

        let module = ModuleDescriptor::new("tags")
            .slash_command(
                SlashCommandDescriptor::new("tag", "find a tag", noop()).parameter(
                    ParameterDescriptor::required("name", ParamType::String, "tag name")
                        .autocomplete(),
                ),
            )
            .autocomplete_handler(AutocompleteDescriptor::for_parameter(
                vec!["tag".into()],
                "name",
                autocomplete_handler(|_ctx, _focused, _services| async {
                    // More than the platform maximum; the pipeline truncates.
                    Ok((0..40).map(|i| Suggestion::string(format!("t{i}"), format!("t{i}"))).collect())
                }),
            ));
        service.add_modules(&module).await.unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        service.on_autocomplete_executed(move |event| {
            assert!(event.result.is_success());
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let mut focused = InteractionOption::new("name", serde_json::json!("t"));
        focused.focused = true;
        let result = service
            .execute_autocomplete(ctx(InteractionKind::Autocomplete), &["tag"], focused, services())
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_context_command_routing() {
        let service = service();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let module = ModuleDescriptor::new("ctx").context_command(
            crate::model::descriptor::ContextCommandDescriptor::new(
                "report",
                ContextCommandType::Message,
                handler(move |_ctx, args, _services| {
                    let seen = Arc::clone(&seen_clone);
                    async move {
                        seen.lock().unwrap().extend(args);
                        Ok(())
                    }
                }),
            ),
        );
        service.add_modules(&module).await.unwrap();

        let result = service
            .execute_context(
                ctx(InteractionKind::MessageContextCommand),
                "report",
                ArgValue::Message(555),
                services(),
            )
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(*seen.lock().unwrap(), vec![ArgValue::Message(555)]);
    }

    #[tokio::test]
    async fn test_remove_module_clears_routing() {
        let service = service();
        let module = ModuleDescriptor::new("misc")
            .slash_command(SlashCommandDescriptor::new("ping", "pong latency", noop()));
        service.add_modules(&module).await.unwrap();
        assert!(service.find_slash_command(&["ping"]).is_some());

        assert!(service.remove_module("misc").await);
        assert!(!service.remove_module("misc").await);
        assert!(service.find_slash_command(&["ping"]).is_none());
        assert!(service.registered_modules().is_empty());

        // The path is free for re-registration.
        let module = ModuleDescriptor::new("misc")
            .slash_command(SlashCommandDescriptor::new("ping", "pong latency", noop()));
        service.add_modules(&module).await.unwrap();
        assert!(service.find_slash_command(&["ping"]).is_some());
    }

    #[tokio::test]
    async fn test_duplicate_module_name_refused() {
        let service = service();
        let module = ModuleDescriptor::new("misc")
            .slash_command(SlashCommandDescriptor::new("ping", "pong latency", noop()));
        service.add_modules(&module).await.unwrap();

        let again = ModuleDescriptor::new("misc")
            .slash_command(SlashCommandDescriptor::new("pong", "ping latency", noop()));
        let err = service.add_modules(&again).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateCommand);
    }

    #[tokio::test]
    async fn test_custom_id_delimiters_split_segments() {
        let config = InteractionConfig {
            custom_id_delimiters: vec![':'],
            ..Default::default()
        };
        let service = InteractionService::new(config).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);

        let module = ModuleDescriptor::new("menus").component_handler(
            ComponentCommandDescriptor::new(
                "menu:{page:int}",
                handler(move |_ctx, _args, _services| {
                    let hits = Arc::clone(&hits_clone);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .parameter(ParameterDescriptor::required(
                "page",
                ParamType::Integer,
                "page number",
            )),
        );
        service.add_modules(&module).await.unwrap();

        let result = service
            .execute_component(ctx(InteractionKind::Component), "menu:3", None, services())
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
