//! Module metadata: named groups of handlers forming the command tree.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add lifecycle hooks
//! - 1.0.0: Initial module tree

use std::fmt;
use std::sync::{Arc, Weak};

use anyhow::Result;

use crate::interaction::InteractionContext;
use crate::model::command::{
    AutocompleteCommandInfo, ComponentCommandInfo, ContextCommandInfo, ModalCommandInfo,
    Precondition, SlashCommandInfo,
};
use crate::model::descriptor::Attribute;
use crate::BoxFuture;

/// Hook invoked once, after a module has been built.
pub type BuildHook = Arc<dyn Fn(&ModuleInfo) + Send + Sync>;

/// Hook invoked around handler dispatch.
pub type ExecuteHook =
    Arc<dyn Fn(Arc<InteractionContext>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Optional callbacks a module may supply, invoked at the corresponding
/// pipeline points. Stands in for overridable base-class methods of
/// attribute-driven platforms.
#[derive(Clone, Default)]
pub struct ModuleLifecycle {
    pub on_module_building: Option<BuildHook>,
    pub before_execute: Option<ExecuteHook>,
    pub after_execute: Option<ExecuteHook>,
}

impl fmt::Debug for ModuleLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLifecycle")
            .field("on_module_building", &self.on_module_building.is_some())
            .field("before_execute", &self.before_execute.is_some())
            .field("after_execute", &self.after_execute.is_some())
            .finish()
    }
}

/// A built module: a named group of commands, possibly published as a slash
/// group.
///
/// Modules are immutable once built and shared behind `Arc`; the parent link
/// is weak so a tree drops cleanly when the root is removed.
pub struct ModuleInfo {
    /// Internal id, unique among registered top-level modules.
    pub name: String,
    /// Platform-visible group name. Present iff this module is a slash group.
    pub group_name: Option<String>,
    pub description: Option<String>,
    pub default_permission: bool,
    /// Skipped by `sync_all`; published only through the explicit guild calls.
    pub dont_auto_register: bool,
    pub attributes: Vec<Attribute>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub parent: Weak<ModuleInfo>,
    pub submodules: Vec<Arc<ModuleInfo>>,
    pub slash_commands: Vec<Arc<SlashCommandInfo>>,
    pub context_commands: Vec<Arc<ContextCommandInfo>>,
    pub component_commands: Vec<Arc<ComponentCommandInfo>>,
    pub modal_commands: Vec<Arc<ModalCommandInfo>>,
    pub autocomplete_commands: Vec<Arc<AutocompleteCommandInfo>>,
    pub lifecycle: ModuleLifecycle,
}

impl ModuleInfo {
    /// A module is a slash group iff it carries a group name.
    pub fn is_slash_group(&self) -> bool {
        self.group_name.is_some()
    }

    /// Ancestor chain from the root module down to this one, inclusive.
    pub fn module_chain(self: &Arc<Self>) -> Vec<Arc<ModuleInfo>> {
        let mut chain = vec![Arc::clone(self)];
        let mut current = self.parent.clone();
        while let Some(module) = current.upgrade() {
            current = module.parent.clone();
            chain.push(module);
        }
        chain.reverse();
        chain
    }

    /// Total number of commands declared directly on this module.
    pub fn command_count(&self) -> usize {
        self.slash_commands.len()
            + self.context_commands.len()
            + self.component_commands.len()
            + self.modal_commands.len()
            + self.autocomplete_commands.len()
    }
}

impl fmt::Debug for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInfo")
            .field("name", &self.name)
            .field("group_name", &self.group_name)
            .field("submodules", &self.submodules.len())
            .field("slash_commands", &self.slash_commands.len())
            .finish()
    }
}
