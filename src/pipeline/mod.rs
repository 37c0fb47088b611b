//! # Execution Pipeline
//!
//! Takes a resolved command and one inbound interaction through argument
//! synthesis, precondition evaluation, handler dispatch and result
//! reporting. Dispatch honours the configured run mode: synchronous on the
//! caller's task, or detached onto a fresh task with the outcome surfaced
//! through the executed-event when it completes. Detached panics are caught
//! and logged, never propagated.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.3.0: Lifecycle hooks around dispatch
//! - 1.2.0: Detached dispatch with panic capture
//! - 1.1.0: Component, modal and autocomplete execution
//! - 1.0.0: Slash execution

use std::sync::{Arc, Weak};

use log::{debug, Level};
use uuid::Uuid;

use crate::core::{EventBus, ExecuteResult, InteractionConfig, InteractionError};
use crate::interaction::{
    InteractionContext, InteractionOption, SelectedValues, ServiceProvider, SubmittedField,
};
use crate::model::command::{
    AutocompleteCommandInfo, ComponentCommandInfo, ContextCommandInfo, HandlerCallback,
    ModalCommandInfo, Precondition, SlashCommandInfo,
};
use crate::model::module::ModuleInfo;
use crate::model::parameter::{ArgValue, ParamType, ParameterInfo};

const MAX_SUGGESTIONS: usize = 25;

/// A log line mirrored onto the subscribable log event.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: Level,
    pub message: String,
}

/// Execution outcome of a slash command.
#[derive(Debug, Clone)]
pub struct SlashExecutedEvent {
    /// Absent when lookup missed.
    pub command: Option<Arc<SlashCommandInfo>>,
    pub context: Arc<InteractionContext>,
    pub result: ExecuteResult,
}

/// Execution outcome of a context-menu command.
#[derive(Debug, Clone)]
pub struct ContextExecutedEvent {
    pub command: Option<Arc<ContextCommandInfo>>,
    pub context: Arc<InteractionContext>,
    pub result: ExecuteResult,
}

/// Execution outcome of a component handler.
#[derive(Debug, Clone)]
pub struct ComponentExecutedEvent {
    pub command: Option<Arc<ComponentCommandInfo>>,
    pub context: Arc<InteractionContext>,
    pub result: ExecuteResult,
}

/// Execution outcome of a modal handler.
#[derive(Debug, Clone)]
pub struct ModalExecutedEvent {
    pub command: Option<Arc<ModalCommandInfo>>,
    pub context: Arc<InteractionContext>,
    pub result: ExecuteResult,
}

/// Execution outcome of an autocomplete handler.
#[derive(Debug, Clone)]
pub struct AutocompleteExecutedEvent {
    pub command: Option<Arc<AutocompleteCommandInfo>>,
    pub context: Arc<InteractionContext>,
    pub result: ExecuteResult,
}

/// Every event surface of the framework.
#[derive(Default)]
pub struct EventRegistry {
    pub log: EventBus<LogEvent>,
    pub slash_executed: EventBus<SlashExecutedEvent>,
    pub context_executed: EventBus<ContextExecutedEvent>,
    pub component_executed: EventBus<ComponentExecutedEvent>,
    pub modal_executed: EventBus<ModalExecutedEvent>,
    pub autocomplete_executed: EventBus<AutocompleteExecutedEvent>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The pipeline proper. Owned by the service; cheap to clone per dispatch.
#[derive(Clone)]
pub(crate) struct Executor {
    pub config: InteractionConfig,
    pub events: Arc<EventRegistry>,
}

impl Executor {
    pub fn new(config: InteractionConfig, events: Arc<EventRegistry>) -> Self {
        Executor { config, events }
    }

    /// Emit through the log facade and mirror onto the log event, honouring
    /// the configured minimum level.
    fn emit_log(&self, level: Level, message: String) {
        if level <= self.config.log_level {
            log::log!(level, "{message}");
            self.events.log.publish(&LogEvent { level, message });
        }
    }

    async fn delete_unknown_ack(&self, ctx: &InteractionContext) {
        if !self.config.delete_unknown_command_ack {
            return;
        }
        if let Some(responder) = &ctx.responder {
            if let Err(err) = responder.delete_original_response().await {
                self.emit_log(
                    Level::Debug,
                    format!("failed to delete unknown-command ack: {err:#}"),
                );
            }
        }
    }

    /// Report a lookup miss: optional ack cleanup, one event, a debug line.
    pub async fn unknown_slash(
        &self,
        ctx: Arc<InteractionContext>,
        path: String,
    ) -> ExecuteResult {
        let result = ExecuteResult::from_error(&InteractionError::UnknownCommand { path: path.clone() });
        self.emit_log(Level::Debug, format!("unknown slash command '{path}'"));
        self.delete_unknown_ack(&ctx).await;
        self.events.slash_executed.publish(&SlashExecutedEvent {
            command: None,
            context: ctx,
            result: result.clone(),
        });
        result
    }

    pub async fn unknown_context(
        &self,
        ctx: Arc<InteractionContext>,
        name: String,
    ) -> ExecuteResult {
        let result = ExecuteResult::from_error(&InteractionError::UnknownCommand { path: name.clone() });
        self.emit_log(Level::Debug, format!("unknown context command '{name}'"));
        self.delete_unknown_ack(&ctx).await;
        self.events.context_executed.publish(&ContextExecutedEvent {
            command: None,
            context: ctx,
            result: result.clone(),
        });
        result
    }

    pub async fn unknown_component(
        &self,
        ctx: Arc<InteractionContext>,
        custom_id: String,
    ) -> ExecuteResult {
        let result =
            ExecuteResult::from_error(&InteractionError::UnknownCommand { path: custom_id.clone() });
        self.emit_log(Level::Debug, format!("unknown component handler '{custom_id}'"));
        self.delete_unknown_ack(&ctx).await;
        self.events.component_executed.publish(&ComponentExecutedEvent {
            command: None,
            context: ctx,
            result: result.clone(),
        });
        result
    }

    pub async fn unknown_modal(
        &self,
        ctx: Arc<InteractionContext>,
        custom_id: String,
    ) -> ExecuteResult {
        let result =
            ExecuteResult::from_error(&InteractionError::UnknownCommand { path: custom_id.clone() });
        self.emit_log(Level::Debug, format!("unknown modal handler '{custom_id}'"));
        self.delete_unknown_ack(&ctx).await;
        self.events.modal_executed.publish(&ModalExecutedEvent {
            command: None,
            context: ctx,
            result: result.clone(),
        });
        result
    }

    pub async fn unknown_autocomplete(
        &self,
        ctx: Arc<InteractionContext>,
        path: String,
    ) -> ExecuteResult {
        let result = ExecuteResult::from_error(&InteractionError::UnknownCommand { path: path.clone() });
        self.emit_log(Level::Debug, format!("unknown autocomplete handler '{path}'"));
        self.events
            .autocomplete_executed
            .publish(&AutocompleteExecutedEvent {
                command: None,
                context: ctx,
                result: result.clone(),
            });
        result
    }

    /// Execute a resolved slash command.
    pub async fn run_slash(
        &self,
        command: Arc<SlashCommandInfo>,
        ctx: Arc<InteractionContext>,
        options: Vec<InteractionOption>,
        services: Arc<dyn ServiceProvider>,
    ) -> anyhow::Result<ExecuteResult> {
        let request_id = Uuid::new_v4();
        debug!("[{request_id}] executing /{}", command.path_string());

        let events = Arc::clone(&self.events);
        let publish_command = Arc::clone(&command);
        let publish_ctx = Arc::clone(&ctx);
        let publisher: Publisher = Arc::new(move |result: ExecuteResult| {
            events.slash_executed.publish(&SlashExecutedEvent {
                command: Some(Arc::clone(&publish_command)),
                context: Arc::clone(&publish_ctx),
                result,
            });
        });

        let args = match self
            .synthesize_named_args(&command.parameters, &options, &ctx)
            .await
        {
            Ok(args) => args,
            Err(err) => return Ok(self.fail(err, &publisher)),
        };
        if let Err(err) = self
            .check_preconditions(&command.module, &command.preconditions, &ctx, &services)
            .await
        {
            return Ok(self.fail(err, &publisher));
        }

        self.dispatch(
            command.module.clone(),
            Arc::clone(&command.callback),
            ctx,
            args,
            services,
            publisher,
            request_id,
        )
        .await
    }

    /// Execute a resolved context-menu command with its single implicit
    /// argument, the target user or message.
    pub async fn run_context(
        &self,
        command: Arc<ContextCommandInfo>,
        ctx: Arc<InteractionContext>,
        target: ArgValue,
        services: Arc<dyn ServiceProvider>,
    ) -> anyhow::Result<ExecuteResult> {
        let request_id = Uuid::new_v4();
        debug!("[{request_id}] executing context command '{}'", command.name);

        let events = Arc::clone(&self.events);
        let publish_command = Arc::clone(&command);
        let publish_ctx = Arc::clone(&ctx);
        let publisher: Publisher = Arc::new(move |result: ExecuteResult| {
            events.context_executed.publish(&ContextExecutedEvent {
                command: Some(Arc::clone(&publish_command)),
                context: Arc::clone(&publish_ctx),
                result,
            });
        });

        if let Err(err) = self
            .check_preconditions(&command.module, &command.preconditions, &ctx, &services)
            .await
        {
            return Ok(self.fail(err, &publisher));
        }

        self.dispatch(
            command.module.clone(),
            Arc::clone(&command.callback),
            ctx,
            vec![target],
            services,
            publisher,
            request_id,
        )
        .await
    }

    /// Execute a resolved component handler: wildcard captures first, then
    /// the selected values for select-menu interactions.
    pub async fn run_component(
        &self,
        command: Arc<ComponentCommandInfo>,
        ctx: Arc<InteractionContext>,
        captures: Vec<(String, String)>,
        select_values: Option<SelectedValues>,
        services: Arc<dyn ServiceProvider>,
    ) -> anyhow::Result<ExecuteResult> {
        let request_id = Uuid::new_v4();
        debug!("[{request_id}] executing component handler '{}'", command.path.join(" "));

        let events = Arc::clone(&self.events);
        let publish_command = Arc::clone(&command);
        let publish_ctx = Arc::clone(&ctx);
        let publisher: Publisher = Arc::new(move |result: ExecuteResult| {
            events.component_executed.publish(&ComponentExecutedEvent {
                command: Some(Arc::clone(&publish_command)),
                context: Arc::clone(&publish_ctx),
                result,
            });
        });

        let args = match self
            .synthesize_capture_args(&command.parameters, captures, select_values, &ctx)
            .await
        {
            Ok(args) => args,
            Err(err) => return Ok(self.fail(err, &publisher)),
        };
        if let Err(err) = self
            .check_preconditions(&command.module, &command.preconditions, &ctx, &services)
            .await
        {
            return Ok(self.fail(err, &publisher));
        }

        self.dispatch(
            command.module.clone(),
            Arc::clone(&command.callback),
            ctx,
            args,
            services,
            publisher,
            request_id,
        )
        .await
    }

    /// Execute a resolved modal handler: the materialised modal first, then
    /// the wildcard captures.
    pub async fn run_modal(
        &self,
        command: Arc<ModalCommandInfo>,
        ctx: Arc<InteractionContext>,
        captures: Vec<(String, String)>,
        fields: &[SubmittedField],
        services: Arc<dyn ServiceProvider>,
    ) -> anyhow::Result<ExecuteResult> {
        let request_id = Uuid::new_v4();
        debug!("[{request_id}] executing modal handler '{}'", command.path.join(" "));

        let events = Arc::clone(&self.events);
        let publish_command = Arc::clone(&command);
        let publish_ctx = Arc::clone(&ctx);
        let publisher: Publisher = Arc::new(move |result: ExecuteResult| {
            events.modal_executed.publish(&ModalExecutedEvent {
                command: Some(Arc::clone(&publish_command)),
                context: Arc::clone(&publish_ctx),
                result,
            });
        });

        let instance = match command.modal.materialize(fields) {
            Ok(instance) => instance,
            Err(err) => return Ok(self.fail(err, &publisher)),
        };
        let mut args = vec![ArgValue::Modal(instance)];
        match self
            .synthesize_capture_args(&command.parameters, captures, None, &ctx)
            .await
        {
            Ok(rest) => args.extend(rest),
            Err(err) => return Ok(self.fail(err, &publisher)),
        }
        if let Err(err) = self
            .check_preconditions(&command.module, &command.preconditions, &ctx, &services)
            .await
        {
            return Ok(self.fail(err, &publisher));
        }

        self.dispatch(
            command.module.clone(),
            Arc::clone(&command.callback),
            ctx,
            args,
            services,
            publisher,
            request_id,
        )
        .await
    }

    /// Execute a resolved autocomplete handler and push its suggestions
    /// through the context responder. Always runs on the caller's task.
    pub async fn run_autocomplete(
        &self,
        command: Arc<AutocompleteCommandInfo>,
        ctx: Arc<InteractionContext>,
        focused: InteractionOption,
        services: Arc<dyn ServiceProvider>,
    ) -> ExecuteResult {
        let request_id = Uuid::new_v4();
        debug!("[{request_id}] executing autocomplete for '{}'", focused.name);

        let result = match (command.callback)(Arc::clone(&ctx), focused, services).await {
            Ok(mut suggestions) => {
                suggestions.truncate(MAX_SUGGESTIONS);
                match &ctx.responder {
                    Some(responder) => match responder.send_suggestions(&suggestions).await {
                        Ok(()) => ExecuteResult::success(),
                        Err(err) => {
                            self.emit_log(
                                Level::Error,
                                format!("[{request_id}] failed to send suggestions: {err:#}"),
                            );
                            ExecuteResult::from_exception(err)
                        }
                    },
                    None => ExecuteResult::success(),
                }
            }
            Err(err) => {
                self.emit_log(
                    Level::Error,
                    format!("[{request_id}] autocomplete handler failed: {err:#}"),
                );
                ExecuteResult::from_exception(err)
            }
        };

        self.events
            .autocomplete_executed
            .publish(&AutocompleteExecutedEvent {
                command: Some(command),
                context: ctx,
                result: result.clone(),
            });
        result
    }

    /// Wrap a pre-dispatch failure: log at debug, publish once, return.
    fn fail(&self, err: InteractionError, publisher: &Publisher) -> ExecuteResult {
        self.emit_log(Level::Debug, err.to_string());
        let result = ExecuteResult::from_error(&err);
        publisher(result.clone());
        result
    }

    /// Argument synthesis for slash commands: match options to parameters by
    /// case-insensitive name, apply defaults, convert, and refuse leftovers.
    async fn synthesize_named_args(
        &self,
        parameters: &[Arc<ParameterInfo>],
        options: &[InteractionOption],
        ctx: &InteractionContext,
    ) -> Result<Vec<ArgValue>, InteractionError> {
        let mut consumed = vec![false; options.len()];
        let mut args = Vec::with_capacity(parameters.len());

        for param in parameters {
            let found = options
                .iter()
                .enumerate()
                .find(|(i, option)| !consumed[*i] && option.name.eq_ignore_ascii_case(&param.name));
            match found {
                None if param.required => {
                    return Err(InteractionError::bad_args("too few parameters"))
                }
                None => args.push(param.default_value.clone().unwrap_or(ArgValue::None)),
                Some((i, option)) => {
                    consumed[i] = true;
                    if ctx.cancellation.is_cancelled() {
                        return Err(cancelled());
                    }
                    args.push(param.converter.read(ctx, &option.value, param).await?);
                }
            }
        }

        if consumed.iter().any(|used| !used) {
            return Err(InteractionError::bad_args("too many parameters"));
        }
        Ok(args)
    }

    /// Argument synthesis for component and modal handlers: wildcard captures
    /// fill the parameters in order; a trailing string-list parameter takes
    /// the select-menu values.
    async fn synthesize_capture_args(
        &self,
        parameters: &[Arc<ParameterInfo>],
        captures: Vec<(String, String)>,
        select_values: Option<SelectedValues>,
        ctx: &InteractionContext,
    ) -> Result<Vec<ArgValue>, InteractionError> {
        let mut captures = captures.into_iter();
        let mut args = Vec::with_capacity(parameters.len());

        for (index, param) in parameters.iter().enumerate() {
            let is_last = index + 1 == parameters.len();
            if is_last && param.param_type == ParamType::StringList {
                args.push(ArgValue::StringList(select_values.clone().unwrap_or_default()));
                continue;
            }
            let Some((_, raw)) = captures.next() else {
                return Err(InteractionError::bad_args("too few parameters"));
            };
            if ctx.cancellation.is_cancelled() {
                return Err(cancelled());
            }
            let raw = serde_json::Value::String(raw);
            args.push(param.converter.read(ctx, &raw, param).await?);
        }

        if captures.next().is_some() {
            return Err(InteractionError::bad_args("too many parameters"));
        }
        Ok(args)
    }

    /// Module-level preconditions root-first, then command-level, first
    /// failure wins.
    async fn check_preconditions(
        &self,
        module: &Weak<ModuleInfo>,
        command_preconditions: &[Arc<dyn Precondition>],
        ctx: &InteractionContext,
        services: &Arc<dyn ServiceProvider>,
    ) -> Result<(), InteractionError> {
        if let Some(module) = module.upgrade() {
            for ancestor in module.module_chain() {
                for precondition in &ancestor.preconditions {
                    if ctx.cancellation.is_cancelled() {
                        return Err(cancelled());
                    }
                    if let Err(reason) = precondition.check(ctx, services.as_ref()).await {
                        return Err(InteractionError::UnmetPrecondition { reason });
                    }
                }
            }
        }
        for precondition in command_preconditions {
            if ctx.cancellation.is_cancelled() {
                return Err(cancelled());
            }
            if let Err(reason) = precondition.check(ctx, services.as_ref()).await {
                return Err(InteractionError::UnmetPrecondition { reason });
            }
        }
        Ok(())
    }

    /// Dispatch the handler under the configured run mode.
    ///
    /// Synchronous: await on the caller's task, publish once, optionally
    /// rethrow. Detached: return success immediately; the spawned task
    /// publishes the eventual outcome, with panics downgraded to results.
    #[allow(clippy::too_many_arguments)]
    async fn dispatch(
        &self,
        module: Weak<ModuleInfo>,
        callback: HandlerCallback,
        ctx: Arc<InteractionContext>,
        args: Vec<ArgValue>,
        services: Arc<dyn ServiceProvider>,
        publisher: Publisher,
        request_id: Uuid,
    ) -> anyhow::Result<ExecuteResult> {
        if ctx.cancellation.is_cancelled() {
            return Ok(self.fail(cancelled(), &publisher));
        }

        let lifecycle = module.upgrade().map(|m| m.lifecycle.clone());
        let executor = self.clone();

        if self.config.run_async {
            let inner = tokio::spawn(run_handler(
                executor.clone(),
                lifecycle,
                callback,
                ctx,
                args,
                services,
                request_id,
            ));
            tokio::spawn(async move {
                let result = match inner.await {
                    Ok(result) => result,
                    Err(join_error) => {
                        let reason = if join_error.is_panic() {
                            "handler panicked".to_string()
                        } else {
                            "handler task was cancelled".to_string()
                        };
                        executor.emit_log(
                            Level::Error,
                            format!("[{request_id}] detached handler failed: {reason}"),
                        );
                        ExecuteResult::from_error(&InteractionError::Exception { reason })
                    }
                };
                publisher(result);
            });
            return Ok(ExecuteResult::success());
        }

        let result = run_handler(
            executor,
            lifecycle,
            callback,
            ctx,
            args,
            services,
            request_id,
        )
        .await;
        publisher(result.clone());

        if !result.is_success() && self.config.throw_on_error {
            if let Some(source) = result.source() {
                return Err(anyhow::Error::msg(Arc::clone(source)));
            }
        }
        Ok(result)
    }
}

type Publisher = Arc<dyn Fn(ExecuteResult) + Send + Sync>;

fn cancelled() -> InteractionError {
    InteractionError::Exception {
        reason: "cancelled".to_string(),
    }
}

/// Run before-execute, the handler, then after-execute, folding errors into
/// an [`ExecuteResult`]. Handler errors are unwrapped to their root cause and
/// logged at error level.
async fn run_handler(
    executor: Executor,
    lifecycle: Option<crate::model::module::ModuleLifecycle>,
    callback: HandlerCallback,
    ctx: Arc<InteractionContext>,
    args: Vec<ArgValue>,
    services: Arc<dyn ServiceProvider>,
    request_id: Uuid,
) -> ExecuteResult {
    if let Some(before) = lifecycle.as_ref().and_then(|l| l.before_execute.clone()) {
        if let Err(err) = before(Arc::clone(&ctx)).await {
            executor.emit_log(
                Level::Error,
                format!("[{request_id}] before-execute hook failed: {:#}", err.root_cause()),
            );
            return ExecuteResult::from_exception(err);
        }
    }

    let result = match callback(Arc::clone(&ctx), args, services).await {
        Ok(()) => ExecuteResult::success(),
        Err(err) => {
            executor.emit_log(
                Level::Error,
                format!("[{request_id}] handler failed: {:#}", err.root_cause()),
            );
            ExecuteResult::from_exception(err)
        }
    };

    if let Some(after) = lifecycle.as_ref().and_then(|l| l.after_execute.clone()) {
        if let Err(err) = after(Arc::clone(&ctx)).await {
            // The handler outcome stands; the hook failure is only logged.
            executor.emit_log(
                Level::Error,
                format!("[{request_id}] after-execute hook failed: {:#}", err.root_cause()),
            );
        }
    }

    result
}
