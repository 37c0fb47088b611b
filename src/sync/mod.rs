//! # Sync Engine
//!
//! Produces platform-facing payloads from the metadata tree and reconciles
//! them with the globally- or guild-registered command set. Sync is
//! stateless: every call fully reconciles its scope through the registry
//! client's bulk overwrite, so the submitted list is the authoritative new
//! set. Callers serialise syncs to the same scope.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.4.0
//!
//! ## Changelog
//! - 1.1.0: Preserve-or-delete reconciliation for unmanaged commands
//! - 1.0.0: Payload production and bulk overwrite

use std::collections::HashMap;

use anyhow::Result;
use log::info;

use crate::client::CommandRegistryClient;
use crate::model::command::ContextCommandType;
use crate::model::module::ModuleInfo;
use crate::model::parameter::ParameterInfo;
use crate::payload::{CommandPayload, CommandType, PayloadChoice, PayloadOption};

/// Scope of a sync: the global set or one guild's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    Global,
    Guild(u64),
}

/// Produce the platform payloads for a set of top-level modules.
///
/// Context commands become individual payloads. Non-group modules emit their
/// slash commands individually and recurse. Slash groups fold their commands
/// into one payload as subcommands and subcommand groups, except commands
/// that escape the group with `ignore_group_names`. When `skip_unregistered`
/// is set, modules flagged `dont_auto_register` are left out.
pub fn build_payloads(modules: &[std::sync::Arc<ModuleInfo>], skip_unregistered: bool) -> Vec<CommandPayload> {
    let mut payloads = Vec::new();
    for module in modules {
        if skip_unregistered && module.dont_auto_register {
            continue;
        }
        emit_module(module, &mut payloads);
    }
    payloads
}

fn emit_module(module: &ModuleInfo, payloads: &mut Vec<CommandPayload>) {
    for context in &module.context_commands {
        payloads.push(CommandPayload {
            id: None,
            kind: match context.command_type {
                ContextCommandType::User => CommandType::User,
                ContextCommandType::Message => CommandType::Message,
            },
            name: context.name.clone(),
            description: String::new(),
            options: Vec::new(),
            default_permission: context.default_permission,
        });
    }

    if let Some(group_name) = &module.group_name {
        let mut options = Vec::new();
        collect_group_options(module, &mut options, payloads);
        payloads.push(CommandPayload {
            id: None,
            kind: CommandType::ChatInput,
            name: group_name.to_lowercase(),
            description: module.description.clone().unwrap_or_default(),
            options,
            default_permission: module.default_permission,
        });
    } else {
        for command in &module.slash_commands {
            payloads.push(CommandPayload {
                id: None,
                kind: CommandType::ChatInput,
                name: command.name.clone(),
                description: command.description.clone(),
                options: command.parameters.iter().map(|p| parameter_option(p)).collect(),
                default_permission: command.default_permission,
            });
        }
        for submodule in &module.submodules {
            emit_module(submodule, payloads);
        }
    }
}

/// Fold a group module's commands into subcommand options. Commands escaping
/// with `ignore_group_names` are emitted as top-level payloads instead.
fn collect_group_options(
    module: &ModuleInfo,
    options: &mut Vec<PayloadOption>,
    payloads: &mut Vec<CommandPayload>,
) {
    for command in &module.slash_commands {
        let parameter_options = command.parameters.iter().map(|p| parameter_option(p)).collect();
        if command.ignore_group_names {
            payloads.push(CommandPayload {
                id: None,
                kind: CommandType::ChatInput,
                name: command.name.clone(),
                description: command.description.clone(),
                options: parameter_options,
                default_permission: command.default_permission,
            });
        } else {
            options.push(PayloadOption::sub_command(
                command.name.clone(),
                command.description.clone(),
                parameter_options,
            ));
        }
    }

    for submodule in &module.submodules {
        if let Some(group_name) = &submodule.group_name {
            let mut nested = Vec::new();
            collect_group_options(submodule, &mut nested, payloads);
            options.push(PayloadOption::sub_command_group(
                group_name.to_lowercase(),
                submodule.description.clone().unwrap_or_default(),
                nested,
            ));
        } else {
            // A plain submodule inside a group contributes at the same level.
            collect_group_options(submodule, options, payloads);
        }
    }
}

fn parameter_option(parameter: &ParameterInfo) -> PayloadOption {
    PayloadOption {
        kind: parameter.converter.option_type(),
        name: parameter.name.clone(),
        description: parameter.description.clone(),
        required: parameter.required,
        choices: parameter
            .choices
            .iter()
            .map(|choice| PayloadChoice {
                name: choice.name.clone(),
                value: choice.value.to_json(),
            })
            .collect(),
        options: Vec::new(),
        min_value: parameter.min_value,
        max_value: parameter.max_value,
        channel_types: parameter.channel_types.iter().map(|t| *t as u8).collect(),
        autocomplete: parameter.autocomplete,
    }
}

fn payload_key(payload: &CommandPayload) -> (u8, String) {
    (payload.kind as u8, payload.name.clone())
}

/// Reconcile the declared tree with a scope's registered command set.
///
/// Existing commands with a declared counterpart are substituted; the rest
/// are preserved verbatim unless `delete_missing` is set, in which case they
/// are omitted. Newly declared commands are appended. The merged list is
/// submitted as one bulk overwrite.
pub async fn sync_all(
    client: &dyn CommandRegistryClient,
    modules: &[std::sync::Arc<ModuleInfo>],
    scope: SyncScope,
    delete_missing: bool,
) -> Result<Vec<CommandPayload>> {
    let declared = build_payloads(modules, true);
    let existing = match scope {
        SyncScope::Global => client.get_global().await?,
        SyncScope::Guild(id) => client.get_guild(id).await?,
    };

    let mut pending: HashMap<(u8, String), usize> = declared
        .iter()
        .enumerate()
        .map(|(index, payload)| (payload_key(payload), index))
        .collect();
    let mut taken = vec![false; declared.len()];

    let mut merged = Vec::with_capacity(existing.len() + declared.len());
    for payload in &existing {
        if let Some(index) = pending.remove(&payload_key(payload)) {
            taken[index] = true;
            merged.push(declared[index].clone());
        } else if !delete_missing {
            merged.push(payload.clone());
        }
    }
    for (index, payload) in declared.iter().enumerate() {
        if !taken[index] {
            merged.push(payload.clone());
        }
    }

    info!(
        "syncing {} commands to {scope:?} ({} declared, {} existing)",
        merged.len(),
        declared.len(),
        existing.len()
    );

    match scope {
        SyncScope::Global => client.bulk_overwrite_global(&merged).await,
        SyncScope::Guild(id) => client.bulk_overwrite_guild(id, &merged).await,
    }
}

/// Create the given commands in a guild, one by one, without overwriting the
/// rest of the set.
pub async fn add_commands_to_guild(
    client: &dyn CommandRegistryClient,
    guild_id: u64,
    commands: &[CommandPayload],
) -> Result<Vec<CommandPayload>> {
    let mut created = Vec::with_capacity(commands.len());
    for command in commands {
        created.push(client.create_guild(guild_id, command).await?);
    }
    info!("created {} commands in guild {guild_id}", created.len());
    Ok(created)
}

/// Create the payloads of the given modules in a guild, including modules
/// flagged `dont_auto_register`.
pub async fn add_modules_to_guild(
    client: &dyn CommandRegistryClient,
    guild_id: u64,
    modules: &[std::sync::Arc<ModuleInfo>],
) -> Result<Vec<CommandPayload>> {
    let payloads = build_payloads(modules, false);
    add_commands_to_guild(client, guild_id, &payloads).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_modules, BuildSettings};
    use crate::convert::TypeConverterRegistry;
    use crate::model::command::handler;
    use crate::model::descriptor::{
        ContextCommandDescriptor, ModuleDescriptor, ParameterDescriptor, SlashCommandDescriptor,
    };
    use crate::model::parameter::ParamType;
    use crate::payload::OptionType;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    fn noop() -> crate::model::command::HandlerCallback {
        handler(|_ctx, _args, _services| async { Ok(()) })
    }

    fn build(descriptors: Vec<ModuleDescriptor>) -> Vec<Arc<ModuleInfo>> {
        let converters = TypeConverterRegistry::with_builtins();
        build_modules(&descriptors, &converters, &BuildSettings::default()).unwrap()
    }

    fn chat(name: &str) -> CommandPayload {
        CommandPayload {
            id: None,
            kind: CommandType::ChatInput,
            name: name.into(),
            description: format!("{name} command"),
            options: Vec::new(),
            default_permission: true,
        }
    }

    /// Registry client that records calls and plays back a fixed set.
    #[derive(Default)]
    struct MockClient {
        global: Mutex<Vec<CommandPayload>>,
        guilds: Mutex<HashMap<u64, Vec<CommandPayload>>>,
        overwrites: Mutex<Vec<Vec<CommandPayload>>>,
    }

    #[async_trait]
    impl CommandRegistryClient for MockClient {
        async fn get_global(&self) -> Result<Vec<CommandPayload>> {
            Ok(self.global.lock().unwrap().clone())
        }

        async fn get_guild(&self, guild_id: u64) -> Result<Vec<CommandPayload>> {
            Ok(self
                .guilds
                .lock()
                .unwrap()
                .get(&guild_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn bulk_overwrite_global(
            &self,
            payloads: &[CommandPayload],
        ) -> Result<Vec<CommandPayload>> {
            *self.global.lock().unwrap() = payloads.to_vec();
            self.overwrites.lock().unwrap().push(payloads.to_vec());
            Ok(payloads.to_vec())
        }

        async fn bulk_overwrite_guild(
            &self,
            guild_id: u64,
            payloads: &[CommandPayload],
        ) -> Result<Vec<CommandPayload>> {
            self.guilds
                .lock()
                .unwrap()
                .insert(guild_id, payloads.to_vec());
            self.overwrites.lock().unwrap().push(payloads.to_vec());
            Ok(payloads.to_vec())
        }

        async fn create_guild(
            &self,
            guild_id: u64,
            payload: &CommandPayload,
        ) -> Result<CommandPayload> {
            self.guilds
                .lock()
                .unwrap()
                .entry(guild_id)
                .or_default()
                .push(payload.clone());
            Ok(payload.clone())
        }

        async fn delete(&self, _command_id: u64) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_flat_module_emits_individual_payloads() {
        let modules = build(vec![ModuleDescriptor::new("misc")
            .slash_command(SlashCommandDescriptor::new("ping", "pong latency", noop()))
            .slash_command(SlashCommandDescriptor::new("echo", "repeat text", noop()))]);
        let payloads = build_payloads(&modules, true);

        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].name, "ping");
        assert_eq!(payloads[1].name, "echo");
        assert!(payloads.iter().all(|p| p.kind == CommandType::ChatInput));
    }

    #[test]
    fn test_group_module_nests_subcommands() {
        let modules = build(vec![ModuleDescriptor::new("admin_module")
            .slash_group("admin", "admin commands")
            .slash_command(
                SlashCommandDescriptor::new("kick", "kick a member", noop()).parameter(
                    ParameterDescriptor::required("user", ParamType::User, "member to kick"),
                ),
            )
            .submodule(
                ModuleDescriptor::new("channels_module")
                    .slash_group("channels", "channel admin")
                    .slash_command(SlashCommandDescriptor::new("lock", "lock a channel", noop())),
            )]);
        let payloads = build_payloads(&modules, true);

        assert_eq!(payloads.len(), 1);
        let group = &payloads[0];
        assert_eq!(group.name, "admin");
        assert_eq!(group.options.len(), 2);

        let kick = &group.options[0];
        assert_eq!(kick.kind, OptionType::SubCommand);
        assert_eq!(kick.options[0].kind, OptionType::User);

        let channels = &group.options[1];
        assert_eq!(channels.kind, OptionType::SubCommandGroup);
        assert_eq!(channels.options[0].kind, OptionType::SubCommand);
        assert_eq!(channels.options[0].name, "lock");
    }

    #[test]
    fn test_ignore_group_names_escapes_to_top_level() {
        let modules = build(vec![ModuleDescriptor::new("admin_module")
            .slash_group("admin", "admin commands")
            .slash_command(SlashCommandDescriptor::new("kick", "kick a member", noop()))
            .slash_command(
                SlashCommandDescriptor::new("ping", "pong latency", noop()).ignore_group_names(),
            )]);
        let payloads = build_payloads(&modules, true);

        let names: Vec<_> = payloads.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"ping"));
        assert!(names.contains(&"admin"));
        let admin = payloads.iter().find(|p| p.name == "admin").unwrap();
        assert_eq!(admin.options.len(), 1);
    }

    #[test]
    fn test_context_commands_emit_individually() {
        let modules = build(vec![ModuleDescriptor::new("ctx").context_command(
            ContextCommandDescriptor::new(
                "report",
                crate::model::command::ContextCommandType::Message,
                noop(),
            ),
        )]);
        let payloads = build_payloads(&modules, true);

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].kind, CommandType::Message);
        assert!(payloads[0].description.is_empty());
    }

    #[test]
    fn test_dont_auto_register_is_skipped() {
        let modules = build(vec![ModuleDescriptor::new("hidden")
            .dont_auto_register()
            .slash_command(SlashCommandDescriptor::new("secret", "hidden command", noop()))]);

        assert!(build_payloads(&modules, true).is_empty());
        assert_eq!(build_payloads(&modules, false).len(), 1);
    }

    #[test]
    fn test_payload_roundtrip_through_properties() {
        let modules = build(vec![ModuleDescriptor::new("admin_module")
            .slash_group("admin", "admin commands")
            .slash_command(
                SlashCommandDescriptor::new("kick", "kick a member", noop()).parameter(
                    ParameterDescriptor::required("user", ParamType::User, "member to kick"),
                ),
            )]);
        let payloads = build_payloads(&modules, true);

        let reemitted: Vec<_> = payloads
            .iter()
            .map(|p| CommandPayload::from_properties(&p.to_properties()))
            .collect();
        assert_eq!(reemitted, payloads);
    }

    #[tokio::test]
    async fn test_sync_delete_missing_submits_exactly_declared() {
        let client = MockClient::default();
        *client.global.lock().unwrap() = vec![chat("a"), chat("b"), chat("c")];

        let modules = build(vec![ModuleDescriptor::new("m")
            .slash_command(SlashCommandDescriptor::new("b", "b command", noop()))
            .slash_command(SlashCommandDescriptor::new("d", "d command", noop()))]);

        sync_all(&client, &modules, SyncScope::Global, true)
            .await
            .unwrap();

        let overwrites = client.overwrites.lock().unwrap();
        assert_eq!(overwrites.len(), 1);
        let names: Vec<_> = overwrites[0].iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d"]);
    }

    #[tokio::test]
    async fn test_sync_preserves_unmanaged_commands() {
        let client = MockClient::default();
        client
            .guilds
            .lock()
            .unwrap()
            .insert(99, vec![chat("a"), chat("b")]);

        let modules = build(vec![ModuleDescriptor::new("m")
            .slash_command(SlashCommandDescriptor::new("b", "fresh description", noop()))
            .slash_command(SlashCommandDescriptor::new("d", "d command", noop()))]);

        sync_all(&client, &modules, SyncScope::Guild(99), false)
            .await
            .unwrap();

        let overwrites = client.overwrites.lock().unwrap();
        let submitted = &overwrites[0];
        let names: Vec<_> = submitted.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "d"]);
        // The declared definition replaced the registered one.
        let b = submitted.iter().find(|p| p.name == "b").unwrap();
        assert_eq!(b.description, "fresh description");
        // The unmanaged command is preserved verbatim.
        let a = submitted.iter().find(|p| p.name == "a").unwrap();
        assert_eq!(a.description, "a command");
    }

    #[tokio::test]
    async fn test_add_modules_to_guild_creates_individually() {
        let client = MockClient::default();
        let modules = build(vec![ModuleDescriptor::new("hidden")
            .dont_auto_register()
            .slash_command(SlashCommandDescriptor::new("secret", "hidden command", noop()))]);

        let created = add_modules_to_guild(&client, 42, &modules).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(client.guilds.lock().unwrap()[&42].len(), 1);
        // No bulk overwrite involved.
        assert!(client.overwrites.lock().unwrap().is_empty());
    }
}
