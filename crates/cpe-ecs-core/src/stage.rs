//! CPE → ECS pipeline stage
//!
//! For each query:
//!
//! 1. Hold the query in the [`DelayGate`] (no-op for a zero delay)
//! 2. Look up the client address in the [`MappingStore`]
//! 3. On a hit, set the query's ECS option to the mapped subnet
//! 4. Call the next stage
//!
//! The table is shared with a [`SourceLoader`] so it can be reloaded while
//! queries are in flight.

use std::net::IpAddr;
use std::sync::Arc;
use tracing::trace;

use crate::config::CpeEcsConfig;
use crate::error::Result;
use crate::gate::DelayGate;
use crate::loader::SourceLoader;
use crate::store::MappingStore;
use crate::token::TokenIssuer;
use crate::traits::{ChainNode, ClientSubnet, QueryContext, RemoteFetcher, RequestContext};

/// CPE → ECS enrichment stage
pub struct CpeEcs {
    gate: DelayGate,
    loader: SourceLoader,
    entries: Vec<String>,
    files: Vec<String>,
    mask4: u8,
    mask6: u8,
    force_overwrite: bool,
}

impl CpeEcs {
    /// Create a stage from `config` with an empty table
    ///
    /// `fetcher` is required only when `url:` entries are configured.
    /// Call [`CpeEcs::reload`] to populate the table.
    pub fn new(config: CpeEcsConfig, fetcher: Option<Arc<dyn RemoteFetcher>>) -> Result<Self> {
        config.validate()?;

        let mut loader = SourceLoader::new(Arc::new(MappingStore::new()));
        if let Some(fetcher) = fetcher {
            loader = loader.with_fetcher(fetcher);
        }
        if let Some(secret) = &config.token_secret {
            loader = loader.with_token_issuer(TokenIssuer::new(secret.as_bytes()));
        }
        if let Some(tag) = &config.url_tag {
            loader = loader.with_url_tag(tag.clone());
        }

        Ok(Self {
            gate: DelayGate::new(config.delay()),
            loader,
            entries: config.entries,
            files: config.files,
            mask4: config.mask4,
            mask6: config.mask6,
            force_overwrite: config.force_overwrite,
        })
    }

    /// The shared mapping table
    pub fn store(&self) -> &Arc<MappingStore> {
        self.loader.store()
    }

    /// The loader writing into this stage's table
    pub fn loader(&self) -> &SourceLoader {
        &self.loader
    }

    /// Load the configured entries, then the configured files
    ///
    /// Stops at the first failure. Entries stored before it are kept.
    pub async fn reload(&self) -> Result<usize> {
        let from_entries = self.loader.batch_load(self.entries.as_slice()).await?;
        let from_files = self.loader.batch_load_from_files(self.files.as_slice()).await?;
        Ok(from_entries + from_files)
    }

    /// Run the stage for one query, then `next`
    ///
    /// Returns the context error without calling `next` if the request
    /// is cancelled during the delay.
    pub async fn exec(
        &self,
        ctx: &RequestContext,
        qctx: &mut dyn QueryContext,
        next: &dyn ChainNode,
    ) -> Result<()> {
        self.gate.wait(ctx).await?;
        self.enrich(qctx);
        next.exec(ctx, qctx).await
    }

    /// Rewrite the ECS option of `qctx` from the table
    ///
    /// Returns whether the option was set.
    pub fn enrich(&self, qctx: &mut dyn QueryContext) -> bool {
        let Some(client) = qctx.client_addr() else {
            return false;
        };
        let Some(entry) = self.store().lookup(&client) else {
            trace!("No ECS mapping for {}", client);
            return false;
        };
        if qctx.client_subnet().is_some() && !self.force_overwrite {
            trace!("Query from {} already carries ECS, keeping it", client);
            return false;
        }

        let mask = match entry.ecs_address {
            IpAddr::V4(_) => self.mask4,
            IpAddr::V6(_) => self.mask6,
        };
        let subnet = ClientSubnet::new(entry.ecs_address, mask);
        trace!("ECS for {} set to {}/{}", client, subnet.address, subnet.source_prefix);
        qctx.set_client_subnet(subnet);
        true
    }
}
