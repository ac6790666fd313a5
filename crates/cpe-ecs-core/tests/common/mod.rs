//! Test doubles and common utilities for contract tests

#![allow(dead_code)]

use cpe_ecs_core::error::Result;
use cpe_ecs_core::traits::{
    ChainNode, ClientSubnet, FetchResponse, QueryContext, RemoteFetcher, RequestContext,
};
use cpe_ecs_core::{Error, MappingStore, SourceLoader};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A RemoteFetcher that answers every request with a canned response
pub struct MockFetcher {
    status: u16,
    body: String,
    /// URLs requested, in order
    requested: Arc<Mutex<Vec<String>>>,
    /// Fail with a transport error instead of answering
    fail_transport: bool,
}

impl MockFetcher {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            requested: Arc::new(Mutex::new(Vec::new())),
            fail_transport: false,
        }
    }

    /// A fetcher whose every request fails in transport
    pub fn unreachable() -> Self {
        Self {
            fail_transport: true,
            ..Self::new(0, "")
        }
    }

    /// Get the URLs requested so far
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RemoteFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.fail_transport {
            return Err(Error::source(url, "connection refused"));
        }
        Ok(FetchResponse::new(self.status, self.body.clone()))
    }
}

/// A minimal query carrying a client address and an optional ECS option
#[derive(Debug, Clone, Default)]
pub struct TestQuery {
    pub client: Option<IpAddr>,
    pub subnet: Option<ClientSubnet>,
}

impl TestQuery {
    pub fn from(client: &str) -> Self {
        Self {
            client: Some(client.parse().expect("valid client address")),
            subnet: None,
        }
    }
}

impl QueryContext for TestQuery {
    fn client_addr(&self) -> Option<IpAddr> {
        self.client
    }

    fn client_subnet(&self) -> Option<ClientSubnet> {
        self.subnet
    }

    fn set_client_subnet(&mut self, subnet: ClientSubnet) {
        self.subnet = Some(subnet);
    }
}

/// A ChainNode that counts calls and records the ECS option it saw
#[derive(Default)]
pub struct RecordingNext {
    calls: AtomicUsize,
    seen: Mutex<Vec<Option<ClientSubnet>>>,
}

impl RecordingNext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of times exec() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// ECS options observed by exec(), in order
    pub fn seen(&self) -> Vec<Option<ClientSubnet>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChainNode for RecordingNext {
    async fn exec(&self, _ctx: &RequestContext, qctx: &mut dyn QueryContext) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(qctx.client_subnet());
        Ok(())
    }
}

/// Create a loader over a fresh store
pub fn fresh_loader() -> SourceLoader {
    SourceLoader::new(Arc::new(MappingStore::new()))
}

/// Parse an address literal
pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid address literal")
}
