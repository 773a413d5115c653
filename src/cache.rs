//! Local cache of owned non-fungible token instances.
//!
//! Each entry joins the instance's owner with its decoded `rom` (immutable)
//! and `ram` (mutable) attributes. The cache is filled by a full
//! [`AssetCache::resync`] from the account's balance listing and updated
//! incrementally by the transaction workflow after a confirmed mint.
//!
//! Mutation goes through `&mut self`, so there is a single writer at a time.
//! Wrap the cache in a `tokio::sync::Mutex` to share it between tasks.

use std::collections::HashMap;

use thiserror::Error;

use crate::api::{ApiError, PhantasmaApi};
use crate::codec::{decode_hex_field, AssetCodec, CodecError};
use crate::error::ErrorKind;
use crate::models::TokenData;
use crate::rpc::Transport;

/// A decoded token instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset<R, M> {
    pub id: String,
    pub symbol: String,
    pub owner: String,
    pub rom: R,
    pub ram: M,
}

/// The asset type stored by an `AssetCache<C>`.
pub type CachedAsset<C> = Asset<<C as AssetCodec>::Rom, <C as AssetCodec>::Ram>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("token {id}: {source}")]
    Codec {
        id: String,
        #[source]
        source: CodecError,
    },
}

impl CacheError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::Api(e) => e.kind(),
            CacheError::Codec { .. } => ErrorKind::MalformedResponse,
        }
    }
}

/// Instances keyed by token id.
#[derive(Debug)]
pub struct AssetCache<C: AssetCodec> {
    codec: C,
    assets: HashMap<String, CachedAsset<C>>,
}

impl<C: AssetCodec> AssetCache<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            assets: HashMap::new(),
        }
    }

    /// The codec used to decode attribute blobs.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Rebuild the cache from the `symbol` instances held by `address`.
    ///
    /// Fetches the account, then `getTokenData` once per listed id. The new
    /// contents replace the old ones only when every fetch and decode
    /// succeeded; on error the cache is left untouched.
    ///
    /// Returns the number of cached instances.
    pub async fn resync<T: Transport>(
        &mut self,
        api: &PhantasmaApi<T>,
        address: &str,
        symbol: &str,
    ) -> Result<usize, CacheError> {
        let account = api.get_account(address).await?;
        let ids = account
            .balance(symbol)
            .map(|b| b.ids.clone())
            .unwrap_or_default();

        let mut fresh = HashMap::with_capacity(ids.len());
        for id in ids {
            let data = api.get_token_data(symbol, &id).await?;
            let asset = self.decode_asset(symbol, &data)?;
            fresh.insert(asset.id.clone(), asset);
        }

        self.assets = fresh;
        tracing::info!(symbol, address, assets = self.assets.len(), "asset cache resynced");
        Ok(self.assets.len())
    }

    /// Decode one `getTokenData` record into an asset.
    ///
    /// The asset id is the record's `ID` field.
    pub fn decode_asset(&self, symbol: &str, data: &TokenData) -> Result<CachedAsset<C>, CacheError> {
        let codec_err = |source| CacheError::Codec {
            id: data.id.clone(),
            source,
        };

        let rom_bytes = decode_hex_field("rom", &data.rom).map_err(codec_err)?;
        let ram_bytes = decode_hex_field("ram", &data.ram).map_err(codec_err)?;
        let rom = self.codec.decode_rom(&rom_bytes).map_err(codec_err)?;
        let ram = self.codec.decode_ram(&ram_bytes).map_err(codec_err)?;

        Ok(Asset {
            id: data.id.clone(),
            symbol: symbol.to_string(),
            owner: data.owner_address.clone(),
            rom,
            ram,
        })
    }

    /// Insert or replace the entry for `asset.id`; returns the replaced one.
    pub fn insert(&mut self, asset: CachedAsset<C>) -> Option<CachedAsset<C>> {
        self.assets.insert(asset.id.clone(), asset)
    }

    pub fn remove(&mut self, id: &str) -> Option<CachedAsset<C>> {
        self.assets.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&CachedAsset<C>> {
        self.assets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    /// Drop entries whose id is not in `listed`; returns how many were dropped.
    pub fn retain_listed(&mut self, listed: &[String]) -> usize {
        let before = self.assets.len();
        self.assets.retain(|id, _| listed.iter().any(|l| l == id));
        before - self.assets.len()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CachedAsset<C>> {
        self.assets.values()
    }

    /// Cached ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.assets.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
