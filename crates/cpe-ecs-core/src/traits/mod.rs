//! Collaborator traits
//!
//! The host pipeline owns the query type and the chain; this crate only
//! sees them through these interfaces.
//!
//! - [`RequestContext`]: cancellation and deadline of one request
//! - [`QueryContext`]: the client address and ECS option of one query
//! - [`ChainNode`]: the next pipeline stage
//! - [`RemoteFetcher`]: HTTP GET for `url:` sources

pub mod context;
pub mod query;
pub mod fetcher;

pub use context::RequestContext;
pub use query::{ChainEnd, ChainNode, ClientSubnet, QueryContext};
pub use fetcher::{FetchResponse, RemoteFetcher};
