//! Registry client contract for publishing commands to the platform.
//!
//! The wire transport is supplied by the host; the sync engine only needs
//! these six operations. Bulk overwrites are authoritative: the submitted
//! list becomes the scope's entire command set.

use anyhow::Result;
use async_trait::async_trait;

use crate::payload::CommandPayload;

/// CRUD and bulk operations over the platform's command registry.
#[async_trait]
pub trait CommandRegistryClient: Send + Sync {
    /// Fetch the globally registered command set.
    async fn get_global(&self) -> Result<Vec<CommandPayload>>;

    /// Fetch one guild's registered command set.
    async fn get_guild(&self, guild_id: u64) -> Result<Vec<CommandPayload>>;

    /// Replace the global command set with exactly `payloads`.
    async fn bulk_overwrite_global(&self, payloads: &[CommandPayload]) -> Result<Vec<CommandPayload>>;

    /// Replace one guild's command set with exactly `payloads`.
    async fn bulk_overwrite_guild(
        &self,
        guild_id: u64,
        payloads: &[CommandPayload],
    ) -> Result<Vec<CommandPayload>>;

    /// Create a single guild command without touching the rest of the set.
    async fn create_guild(&self, guild_id: u64, payload: &CommandPayload) -> Result<CommandPayload>;

    /// Delete a registered command by its platform id.
    async fn delete(&self, command_id: u64) -> Result<()>;
}
