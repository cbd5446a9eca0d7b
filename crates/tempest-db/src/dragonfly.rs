//! `Dragonfly` (Redis-compatible) world state.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `world:{id}:atmosphere` | Hash | Season, weather, and night-cycle fields |
//!
//! Field names and encodings are the ones documented in
//! [`tempest_core::persistence`].

use std::collections::{BTreeMap, HashMap};

use fred::prelude::*;
use tempest_core::{AtmosphereStore, StoreError};
use tempest_types::WorldId;

use crate::error::DbError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`]. Clones share the connection.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Hash key holding `world`'s atmosphere.
    pub fn atmosphere_key(world: WorldId) -> String {
        format!("world:{world}:atmosphere")
    }

    /// Every field stored for `world`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn fields(&self, world: WorldId) -> Result<BTreeMap<String, String>, DbError> {
        let fields: HashMap<String, String> =
            self.client.hgetall(Self::atmosphere_key(world)).await?;
        Ok(fields.into_iter().collect())
    }

    /// Upsert `fields` for `world`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn put_fields(
        &self,
        world: WorldId,
        fields: BTreeMap<String, String>,
    ) -> Result<(), DbError> {
        if fields.is_empty() {
            return Ok(());
        }
        let fields: HashMap<String, String> = fields.into_iter().collect();
        let _: u64 = self
            .client
            .hset(Self::atmosphere_key(world), fields)
            .await?;
        Ok(())
    }

    /// Delete `fields` of `world`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete_fields(&self, world: WorldId, fields: Vec<String>) -> Result<(), DbError> {
        if fields.is_empty() {
            return Ok(());
        }
        let _: u64 = self
            .client
            .hdel(Self::atmosphere_key(world), fields)
            .await?;
        Ok(())
    }

    /// Drop everything stored for `world`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn forget(&self, world: WorldId) -> Result<(), DbError> {
        let _: u32 = self.client.del(Self::atmosphere_key(world)).await?;
        Ok(())
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the quit command fails.
    pub async fn quit(&self) -> Result<(), DbError> {
        self.client.quit().await?;
        Ok(())
    }
}

impl core::fmt::Debug for DragonflyStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragonflyStore").finish_non_exhaustive()
    }
}

impl AtmosphereStore for DragonflyStore {
    async fn load(&self, world: WorldId) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self.fields(world).await?)
    }

    async fn save(
        &self,
        world: WorldId,
        fields: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        Ok(self.put_fields(world, fields).await?)
    }

    async fn remove(&self, world: WorldId, fields: Vec<String>) -> Result<(), StoreError> {
        Ok(self.delete_fields(world, fields).await?)
    }
}
