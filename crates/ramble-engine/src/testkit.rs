//! Shared fixtures for engine tests.

use std::sync::Arc;

use ramble_ledger::InMemoryLedger;
use ramble_store::MemoryNetwork;
use ramble_types::Endpoint;

use crate::config::EngineConfig;
use crate::pool::EndpointPool;

pub const CONTRACT: &str = "0xcomments";
pub const SENDER: &str = "0xsender";
pub const MARKET: &str = "0xa1";

pub fn local() -> Endpoint {
    Endpoint::http("localhost", 5001)
}

pub fn remote(i: usize) -> Endpoint {
    Endpoint::https(format!("node{i}.example"), 443)
}

pub fn config() -> EngineConfig {
    EngineConfig {
        contract: CONTRACT.into(),
        sender: SENDER.into(),
        ..EngineConfig::default()
    }
}

/// `size` healthy remote nodes plus a healthy local node, a pool over them
/// bound to the local node, and an empty ledger.
pub struct Fixture {
    pub network: MemoryNetwork,
    pub remotes: Vec<Endpoint>,
    pub pool: Arc<EndpointPool>,
    pub ledger: Arc<InMemoryLedger>,
}

impl Fixture {
    pub fn new(size: usize) -> Self {
        let remotes: Vec<Endpoint> = (0..size).map(remote).collect();
        let network = MemoryNetwork::with_nodes(remotes.iter().cloned().chain([local()]));
        let pool = Arc::new(
            EndpointPool::new(Arc::new(network.clone()), local(), remotes.clone(), false)
                .expect("pool"),
        );
        Self {
            network,
            remotes,
            pool,
            ledger: Arc::new(InMemoryLedger::new()),
        }
    }

    /// Same nodes, but the pool starts on the first remote.
    pub fn remote_bound(size: usize) -> Self {
        let fixture = Self::new(size);
        fixture.pool.select_remote(None).expect("select remote");
        fixture
    }
}
