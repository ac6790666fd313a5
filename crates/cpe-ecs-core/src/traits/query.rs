// # Query Interfaces
//
// The query type and the chain belong to the host pipeline. The enrichment
// stage reads the client (CPE) address of a query, may rewrite its EDNS
// Client Subnet option, and then hands the query to the next stage.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::Result;
use crate::traits::context::RequestContext;

/// An EDNS Client Subnet option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientSubnet {
    /// Subnet address, host bits cleared
    pub address: IpAddr,
    /// Source prefix length
    pub source_prefix: u8,
    /// Scope prefix length (always 0 in queries)
    pub scope_prefix: u8,
}

impl ClientSubnet {
    /// Create an option for `address` truncated to `source_prefix` bits
    ///
    /// The prefix is clamped to the address width.
    pub fn new(address: IpAddr, source_prefix: u8) -> Self {
        let (address, source_prefix) = match address {
            IpAddr::V4(v4) => {
                let prefix = source_prefix.min(32);
                let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
                (IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask)), prefix)
            }
            IpAddr::V6(v6) => {
                let prefix = source_prefix.min(128);
                let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
                (IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask)), prefix)
            }
        };

        Self {
            address,
            source_prefix,
            scope_prefix: 0,
        }
    }

    /// IANA address family number (1 = IPv4, 2 = IPv6)
    pub fn family(&self) -> u16 {
        match self.address {
            IpAddr::V4(_) => 1,
            IpAddr::V6(_) => 2,
        }
    }
}

/// The query currently flowing through the pipeline
pub trait QueryContext: Send + Sync {
    /// Source address of the client that sent the query
    fn client_addr(&self) -> Option<IpAddr>;

    /// The ECS option the query carries, if any
    fn client_subnet(&self) -> Option<ClientSubnet>;

    /// Set or replace the ECS option
    fn set_client_subnet(&mut self, subnet: ClientSubnet);
}

/// The next stage of the pipeline
#[async_trait]
pub trait ChainNode: Send + Sync {
    /// Execute the rest of the chain for `qctx`
    async fn exec(&self, ctx: &RequestContext, qctx: &mut dyn QueryContext) -> Result<()>;
}

/// Terminal node that ends the chain successfully
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainEnd;

#[async_trait]
impl ChainNode for ChainEnd {
    async fn exec(&self, _ctx: &RequestContext, _qctx: &mut dyn QueryContext) -> Result<()> {
        Ok(())
    }
}
