// # cpe-ecs-core
//
// Core library for CPE → EDNS Client Subnet query enrichment.
//
// ## Architecture Overview
//
// - **MappingStore**: Concurrent CPE address → ECS address table
// - **SourceLoader**: Loads inline records, local files and remote lists into the table
// - **TokenIssuer**: Signs bearer tokens for remote list fetches
// - **DelayGate**: Cancellable delay before forwarding a query
// - **CpeEcs**: Pipeline stage composing the gate with the table lookup
//
// ## Design Principles
//
// 1. **Host-Agnostic**: Query, chain and transport are traits implemented by the host
// 2. **Owned State**: The table is an injected `Arc<MappingStore>`, never a global
// 3. **Fail Fast Loading**: The first bad record aborts a load; stored entries are kept
// 4. **Cancellation First**: Request waits always race the request context

pub mod traits;
pub mod entry;
pub mod store;
pub mod token;
pub mod loader;
pub mod gate;
pub mod stage;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{ChainNode, ClientSubnet, FetchResponse, QueryContext, RemoteFetcher, RequestContext};
pub use entry::{MappingEntry, parse_entry};
pub use store::MappingStore;
pub use token::TokenIssuer;
pub use loader::{EntrySource, SourceLoader};
pub use gate::DelayGate;
pub use stage::CpeEcs;
pub use config::CpeEcsConfig;
pub use error::{Error, Result};
