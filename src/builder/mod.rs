//! # Module Builder
//!
//! Transforms host-supplied module descriptors into the immutable command
//! tree, enforcing every platform invariant on the way: name format and
//! length, description length, option and choice counts, group nesting
//! depth, parameter ordering, and complex-parameter flattening with cycle
//! detection. Violations fail the registration call synchronously; nothing
//! invalid ever reaches the command map.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.2.0: Complex parameter flattening with cycle detection
//! - 1.1.0: Group nesting and path computation
//! - 1.0.0: Slash command validation

use std::collections::HashSet;
use std::sync::{Arc, OnceLock, Weak};

use regex::Regex;

use crate::convert::TypeConverterRegistry;
use crate::core::InteractionError;
use crate::map::wildcard::{self, WildcardSyntax};
use crate::model::command::{
    AutocompleteCommandInfo, ComponentCommandInfo, ContextCommandInfo, ModalCommandInfo,
    SlashCommandInfo,
};
use crate::model::descriptor::{
    AutocompleteDescriptor, ComponentCommandDescriptor, ModalCommandDescriptor, ModuleDescriptor,
    ParameterDescriptor, SlashCommandDescriptor,
};
use crate::model::modal::ModalDescriptor;
use crate::model::module::ModuleInfo;
use crate::model::parameter::{ParamType, ParameterInfo};

const MAX_NAME_LEN: usize = 32;
const MAX_DESCRIPTION_LEN: usize = 100;
const MAX_PARAMETERS: usize = 25;
const MAX_CHOICES: usize = 25;
/// group → subgroup → command.
const MAX_GROUP_DEPTH: usize = 2;

fn name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[-_\p{L}\p{N}]{1,32}$").unwrap())
}

/// Settings the builder needs from the service configuration.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub custom_id_delimiters: Vec<char>,
    pub wildcard_syntax: WildcardSyntax,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            custom_id_delimiters: Vec::new(),
            wildcard_syntax: WildcardSyntax::default(),
        }
    }
}

/// Build an immutable module tree from descriptors.
pub fn build_modules(
    descriptors: &[ModuleDescriptor],
    converters: &TypeConverterRegistry,
    settings: &BuildSettings,
) -> Result<Vec<Arc<ModuleInfo>>, InteractionError> {
    let mut seen_paths = HashSet::new();
    let mut modules = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let planned = plan_module(
            descriptor,
            converters,
            settings,
            &Inherited::root(),
            &mut seen_paths,
        )?;
        let module = assemble(planned, Weak::new());
        run_build_hooks(&module);
        modules.push(module);
    }
    Ok(modules)
}

/// Values flowing from parent to child module.
struct Inherited {
    default_permission: bool,
    dont_auto_register: bool,
    attributes: Vec<crate::model::descriptor::Attribute>,
    group_path: Vec<String>,
    group_depth: usize,
}

impl Inherited {
    fn root() -> Self {
        Inherited {
            default_permission: true,
            dont_auto_register: false,
            attributes: Vec::new(),
            group_path: Vec::new(),
            group_depth: 0,
        }
    }
}

// Planned forms: fully validated, no back-links yet. Assembly is infallible.

struct PlannedModule {
    name: String,
    group_name: Option<String>,
    description: Option<String>,
    default_permission: bool,
    dont_auto_register: bool,
    attributes: Vec<crate::model::descriptor::Attribute>,
    preconditions: Vec<Arc<dyn crate::model::command::Precondition>>,
    lifecycle: crate::model::module::ModuleLifecycle,
    submodules: Vec<PlannedModule>,
    slash_commands: Vec<PlannedSlash>,
    context_commands: Vec<crate::model::descriptor::ContextCommandDescriptor>,
    component_commands: Vec<PlannedPattern>,
    modal_commands: Vec<PlannedModal>,
    autocomplete_commands: Vec<AutocompleteDescriptor>,
}

struct PlannedSlash {
    descriptor: SlashCommandDescriptor,
    path: Vec<String>,
    default_permission: bool,
    parameters: Vec<Arc<ParameterInfo>>,
}

struct PlannedPattern {
    descriptor: ComponentCommandDescriptor,
    path: Vec<String>,
    parameters: Vec<Arc<ParameterInfo>>,
}

struct PlannedModal {
    descriptor: ModalCommandDescriptor,
    path: Vec<String>,
    parameters: Vec<Arc<ParameterInfo>>,
}

fn plan_module(
    descriptor: &ModuleDescriptor,
    converters: &TypeConverterRegistry,
    settings: &BuildSettings,
    inherited: &Inherited,
    seen_paths: &mut HashSet<String>,
) -> Result<PlannedModule, InteractionError> {
    if descriptor.name.is_empty() {
        return Err(InteractionError::parse_failed("module name must not be empty"));
    }

    let mut group_depth = inherited.group_depth;
    let mut group_path = inherited.group_path.clone();

    if let Some(group_name) = &descriptor.group_name {
        validate_command_name(group_name, "group name")?;
        let description = descriptor.description.as_deref().unwrap_or_default();
        validate_description(description, group_name)?;
        group_depth += 1;
        if group_depth > MAX_GROUP_DEPTH {
            return Err(InteractionError::parse_failed(format!(
                "slash group '{group_name}' exceeds the maximum nesting depth of {MAX_GROUP_DEPTH}"
            )));
        }
        group_path.push(group_name.to_lowercase());
    }

    let default_permission = descriptor
        .default_permission
        .unwrap_or(inherited.default_permission);
    let dont_auto_register = descriptor
        .dont_auto_register
        .unwrap_or(inherited.dont_auto_register);

    // Attributes inherit by concatenation, parents first.
    let mut attributes = inherited.attributes.clone();
    attributes.extend(descriptor.attributes.iter().cloned());

    let mut slash_commands = Vec::with_capacity(descriptor.slash_commands.len());
    for command in &descriptor.slash_commands {
        let planned = plan_slash(command, converters, default_permission, &group_path)?;
        let key = format!("slash {}", planned.path.join(" "));
        if !seen_paths.insert(key) {
            return Err(InteractionError::DuplicateCommand {
                path: planned.path.join(" "),
            });
        }
        slash_commands.push(planned);
    }

    for command in &descriptor.context_commands {
        if command.name.is_empty() || command.name.len() > MAX_NAME_LEN {
            return Err(InteractionError::parse_failed(format!(
                "context command name '{}' must be 1-{MAX_NAME_LEN} characters",
                command.name
            )));
        }
        let key = format!("context {:?} {}", command.command_type, command.name);
        if !seen_paths.insert(key) {
            return Err(InteractionError::DuplicateCommand {
                path: command.name.clone(),
            });
        }
    }

    let mut component_commands = Vec::with_capacity(descriptor.component_handlers.len());
    for handler in &descriptor.component_handlers {
        component_commands.push(plan_component(handler, converters, settings)?);
    }

    let mut modal_commands = Vec::with_capacity(descriptor.modal_handlers.len());
    for handler in &descriptor.modal_handlers {
        modal_commands.push(plan_modal(handler, converters, settings)?);
    }

    let child_scope = Inherited {
        default_permission,
        dont_auto_register,
        attributes: attributes.clone(),
        group_path: group_path.clone(),
        group_depth,
    };
    let mut submodules = Vec::with_capacity(descriptor.submodules.len());
    for submodule in &descriptor.submodules {
        submodules.push(plan_module(
            submodule,
            converters,
            settings,
            &child_scope,
            seen_paths,
        )?);
    }

    Ok(PlannedModule {
        name: descriptor.name.clone(),
        group_name: descriptor.group_name.clone(),
        description: descriptor.description.clone(),
        default_permission,
        dont_auto_register,
        attributes,
        preconditions: descriptor.preconditions.clone(),
        lifecycle: descriptor.lifecycle.clone(),
        submodules,
        slash_commands,
        context_commands: descriptor.context_commands.clone(),
        component_commands,
        modal_commands,
        autocomplete_commands: descriptor.autocomplete_handlers.clone(),
    })
}

fn plan_slash(
    descriptor: &SlashCommandDescriptor,
    converters: &TypeConverterRegistry,
    inherited_permission: bool,
    group_path: &[String],
) -> Result<PlannedSlash, InteractionError> {
    validate_command_name(&descriptor.name, "slash command name")?;
    validate_description(&descriptor.description, &descriptor.name)?;

    let parameters = flatten_parameters(&descriptor.parameters, converters, true)?;
    if parameters.len() > MAX_PARAMETERS {
        return Err(InteractionError::parse_failed(format!(
            "command '{}' declares {} parameters, the maximum is {MAX_PARAMETERS}",
            descriptor.name,
            parameters.len()
        )));
    }

    // Required parameters must precede optional ones.
    let mut optional_seen = false;
    for parameter in &parameters {
        if parameter.required && optional_seen {
            return Err(InteractionError::parse_failed(format!(
                "required parameter '{}' of '{}' follows an optional parameter",
                parameter.name, descriptor.name
            )));
        }
        optional_seen |= !parameter.required;
    }

    let path = if descriptor.ignore_group_names || group_path.is_empty() {
        vec![descriptor.name.clone()]
    } else {
        let mut path = group_path.to_vec();
        path.push(descriptor.name.clone());
        path
    };

    Ok(PlannedSlash {
        descriptor: descriptor.clone(),
        path,
        default_permission: descriptor.default_permission.unwrap_or(inherited_permission),
        parameters,
    })
}

fn plan_component(
    descriptor: &ComponentCommandDescriptor,
    converters: &TypeConverterRegistry,
    settings: &BuildSettings,
) -> Result<PlannedPattern, InteractionError> {
    if descriptor.name.is_empty() {
        return Err(InteractionError::parse_failed("component handler name must not be empty"));
    }
    let path = wildcard::split_pattern(
        &descriptor.name,
        &settings.custom_id_delimiters,
        &settings.wildcard_syntax,
    );
    let parameters = flatten_parameters(&descriptor.parameters, converters, false)?;
    validate_capture_arity(&descriptor.name, &path, &parameters, settings)?;
    Ok(PlannedPattern {
        descriptor: descriptor.clone(),
        path,
        parameters,
    })
}

fn plan_modal(
    descriptor: &ModalCommandDescriptor,
    converters: &TypeConverterRegistry,
    settings: &BuildSettings,
) -> Result<PlannedModal, InteractionError> {
    if descriptor.name.is_empty() {
        return Err(InteractionError::parse_failed("modal handler name must not be empty"));
    }
    validate_modal(&descriptor.modal)?;
    let path = wildcard::split_pattern(
        &descriptor.name,
        &settings.custom_id_delimiters,
        &settings.wildcard_syntax,
    );
    let parameters = flatten_parameters(&descriptor.parameters, converters, false)?;
    validate_capture_arity(&descriptor.name, &path, &parameters, settings)?;
    Ok(PlannedModal {
        descriptor: descriptor.clone(),
        path,
        parameters,
    })
}

fn validate_modal(modal: &ModalDescriptor) -> Result<(), InteractionError> {
    let mut seen = HashSet::new();
    for field in &modal.fields {
        if field.custom_id.is_empty() {
            return Err(InteractionError::parse_failed(format!(
                "modal field '{}' has an empty custom id",
                field.name
            )));
        }
        if !seen.insert(field.custom_id.as_str()) {
            return Err(InteractionError::parse_failed(format!(
                "modal declares the custom id '{}' twice",
                field.custom_id
            )));
        }
    }
    Ok(())
}

/// The leaf segment's captures must line up with the declared parameters: one
/// capture per parameter, except a trailing string-list which takes the
/// select-menu values instead.
fn validate_capture_arity(
    name: &str,
    path: &[String],
    parameters: &[Arc<ParameterInfo>],
    settings: &BuildSettings,
) -> Result<(), InteractionError> {
    let captures = match path.last() {
        Some(last) => wildcard::compile(last, &settings.wildcard_syntax)?
            .map(|p| p.capture_names.len())
            .unwrap_or(0),
        None => 0,
    };
    let takes_select_values = parameters
        .last()
        .map(|p| p.param_type == ParamType::StringList)
        .unwrap_or(false);
    let expected = captures + usize::from(takes_select_values);
    if parameters.len() != expected {
        return Err(InteractionError::parse_failed(format!(
            "handler '{name}' declares {} parameters but its pattern supplies {expected}",
            parameters.len()
        )));
    }
    Ok(())
}

/// Flatten a parameter list, recursing through complex parameters. Cycles are
/// detected by the type tag of each complex parameter on the recursion stack.
fn flatten_parameters(
    descriptors: &[ParameterDescriptor],
    converters: &TypeConverterRegistry,
    validate_descriptions: bool,
) -> Result<Vec<Arc<ParameterInfo>>, InteractionError> {
    let mut stack = Vec::new();
    let mut flattened = Vec::new();
    flatten_into(
        descriptors,
        converters,
        validate_descriptions,
        &mut stack,
        &mut flattened,
    )?;
    Ok(flattened)
}

fn flatten_into(
    descriptors: &[ParameterDescriptor],
    converters: &TypeConverterRegistry,
    validate_descriptions: bool,
    stack: &mut Vec<String>,
    out: &mut Vec<Arc<ParameterInfo>>,
) -> Result<(), InteractionError> {
    for descriptor in descriptors {
        if descriptor.is_complex {
            let type_name = descriptor
                .type_name
                .clone()
                .unwrap_or_else(|| descriptor.name.clone());
            if stack.contains(&type_name) {
                return Err(InteractionError::ComplexParameterCycle { type_name });
            }
            stack.push(type_name);
            flatten_into(&descriptor.fields, converters, validate_descriptions, stack, out)?;
            stack.pop();
            continue;
        }
        out.push(Arc::new(build_parameter(
            descriptor,
            converters,
            validate_descriptions,
        )?));
    }
    Ok(())
}

fn build_parameter(
    descriptor: &ParameterDescriptor,
    converters: &TypeConverterRegistry,
    check_description: bool,
) -> Result<ParameterInfo, InteractionError> {
    validate_command_name(&descriptor.name, "parameter name")?;
    if check_description {
        validate_description(&descriptor.description, &descriptor.name)?;
    }

    if descriptor.choices.len() > MAX_CHOICES {
        return Err(InteractionError::parse_failed(format!(
            "parameter '{}' declares {} choices, the maximum is {MAX_CHOICES}",
            descriptor.name,
            descriptor.choices.len()
        )));
    }
    for choice in &descriptor.choices {
        if choice.name.is_empty() || choice.name.len() > MAX_DESCRIPTION_LEN {
            return Err(InteractionError::parse_failed(format!(
                "choice name '{}' must be 1-{MAX_DESCRIPTION_LEN} characters",
                choice.name
            )));
        }
    }

    let converter = match &descriptor.converter_override {
        Some(converter) => Arc::clone(converter),
        None => converters.resolve(&descriptor.param_type)?,
    };

    Ok(ParameterInfo {
        name: descriptor.name.clone(),
        param_type: descriptor.param_type.clone(),
        description: descriptor.description.clone(),
        required: descriptor.required,
        default_value: descriptor.default_value.clone(),
        min_value: descriptor.min_value,
        max_value: descriptor.max_value,
        channel_types: descriptor.channel_types.clone(),
        choices: descriptor.choices.clone(),
        autocomplete: descriptor.autocomplete,
        converter,
    })
}

fn validate_command_name(name: &str, what: &str) -> Result<(), InteractionError> {
    if !name_regex().is_match(name) {
        return Err(InteractionError::parse_failed(format!(
            "{what} '{name}' must be 1-{MAX_NAME_LEN} word characters"
        )));
    }
    if name.chars().any(char::is_uppercase) {
        return Err(InteractionError::parse_failed(format!(
            "{what} '{name}' must be lowercase"
        )));
    }
    Ok(())
}

fn validate_description(description: &str, owner: &str) -> Result<(), InteractionError> {
    if description.is_empty() || description.len() > MAX_DESCRIPTION_LEN {
        return Err(InteractionError::parse_failed(format!(
            "description of '{owner}' must be 1-{MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// Assemble the planned tree into `Arc`-linked infos. The parent link of each
/// module and the module link of each command are weak.
fn assemble(planned: PlannedModule, parent: Weak<ModuleInfo>) -> Arc<ModuleInfo> {
    Arc::new_cyclic(|me: &Weak<ModuleInfo>| {
        let submodules = planned
            .submodules
            .into_iter()
            .map(|sub| assemble(sub, me.clone()))
            .collect();

        let slash_commands = planned
            .slash_commands
            .into_iter()
            .map(|planned| {
                Arc::new(SlashCommandInfo {
                    name: planned.descriptor.name,
                    description: planned.descriptor.description,
                    path: planned.path,
                    default_permission: planned.default_permission,
                    ignore_group_names: planned.descriptor.ignore_group_names,
                    parameters: planned.parameters,
                    attributes: planned.descriptor.attributes,
                    preconditions: planned.descriptor.preconditions,
                    module: me.clone(),
                    callback: planned.descriptor.callback,
                })
            })
            .collect();

        let context_commands = planned
            .context_commands
            .into_iter()
            .map(|descriptor| {
                Arc::new(ContextCommandInfo {
                    name: descriptor.name,
                    command_type: descriptor.command_type,
                    default_permission: descriptor
                        .default_permission
                        .unwrap_or(planned.default_permission),
                    attributes: descriptor.attributes,
                    preconditions: descriptor.preconditions,
                    module: me.clone(),
                    callback: descriptor.callback,
                })
            })
            .collect();

        let component_commands = planned
            .component_commands
            .into_iter()
            .map(|planned| {
                Arc::new(ComponentCommandInfo {
                    path: planned.path,
                    parameters: planned.parameters,
                    attributes: planned.descriptor.attributes,
                    preconditions: planned.descriptor.preconditions,
                    module: me.clone(),
                    callback: planned.descriptor.callback,
                })
            })
            .collect();

        let modal_commands = planned
            .modal_commands
            .into_iter()
            .map(|planned| {
                Arc::new(ModalCommandInfo {
                    path: planned.path,
                    modal: Arc::new(planned.descriptor.modal),
                    parameters: planned.parameters,
                    attributes: planned.descriptor.attributes,
                    preconditions: planned.descriptor.preconditions,
                    module: me.clone(),
                    callback: planned.descriptor.callback,
                })
            })
            .collect();

        let autocomplete_commands = planned
            .autocomplete_commands
            .into_iter()
            .map(|descriptor| {
                Arc::new(AutocompleteCommandInfo {
                    binding: descriptor.binding,
                    module: me.clone(),
                    callback: descriptor.callback,
                })
            })
            .collect();

        ModuleInfo {
            name: planned.name,
            group_name: planned.group_name,
            description: planned.description,
            default_permission: planned.default_permission,
            dont_auto_register: planned.dont_auto_register,
            attributes: planned.attributes,
            preconditions: planned.preconditions,
            parent,
            submodules,
            slash_commands,
            context_commands,
            component_commands,
            modal_commands,
            autocomplete_commands,
            lifecycle: planned.lifecycle,
        }
    })
}

fn run_build_hooks(module: &Arc<ModuleInfo>) {
    for submodule in &module.submodules {
        run_build_hooks(submodule);
    }
    if let Some(hook) = &module.lifecycle.on_module_building {
        hook(module);
    }
}
