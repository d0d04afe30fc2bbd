use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use ramble_types::{ContentHash, Endpoint};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ContentStore, PinResponse, StoreConnector};

/// In-memory, HashMap-based storage node.
///
/// Intended for tests and embedding. Payloads are keyed by their SHA2-256
/// multihash, so `add` is idempotent and identical bytes deduplicate.
#[derive(Default)]
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<ContentHash, Vec<u8>>>,
    pins: RwLock<HashSet<ContentHash>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes without going through the async trait.
    pub fn insert(&self, data: &[u8]) -> ContentHash {
        let hash = ContentHash::digest(data);
        self.objects
            .write()
            .expect("lock poisoned")
            .entry(hash)
            .or_insert_with(|| data.to_vec());
        hash
    }

    /// Store `data` under an arbitrary hash, bypassing content addressing.
    /// Lets tests plant corrupt or empty payloads.
    pub fn insert_raw(&self, hash: ContentHash, data: &[u8]) {
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(hash, data.to_vec());
    }

    pub fn get(&self, hash: &ContentHash) -> Option<Vec<u8>> {
        self.objects.read().expect("lock poisoned").get(hash).cloned()
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(hash)
    }

    pub fn is_pinned(&self, hash: &ContentHash) -> bool {
        self.pins.read().expect("lock poisoned").contains(hash)
    }

    pub fn pin_count(&self) -> usize {
        self.pins.read().expect("lock poisoned").len()
    }

    /// Number of payloads currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("object_count", &self.len())
            .field("pin_count", &self.pin_count())
            .finish()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn add(&self, data: &[u8]) -> StoreResult<ContentHash> {
        Ok(self.insert(data))
    }

    async fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        match self.get(hash) {
            Some(data) if data.is_empty() => Err(StoreError::Empty(*hash)),
            Some(data) => Ok(data),
            None => Err(StoreError::NotFound(*hash)),
        }
    }

    async fn pin(&self, hash: &ContentHash) -> StoreResult<PinResponse> {
        if !self.contains(hash) {
            return Err(StoreError::PinRejected {
                hash: *hash,
                reason: "content not present on node".into(),
            });
        }
        self.pins.write().expect("lock poisoned").insert(*hash);
        Ok(PinResponse::pinned(*hash))
    }
}

// ---------------------------------------------------------------------------
// Simulated network
// ---------------------------------------------------------------------------

/// Misbehavior injected into a simulated node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeFault {
    #[default]
    Healthy,
    /// Every request fails at the transport level.
    Unreachable,
    /// `add` is refused.
    RejectAdds,
    /// `pin` is refused.
    RejectPins,
    /// `pin` succeeds with an HTML error page as its body.
    HtmlPins,
    /// `fetch` answers with an empty body.
    EmptyFetch,
}

struct SimNode {
    store: Arc<InMemoryContentStore>,
    fault: NodeFault,
    requests: usize,
}

impl SimNode {
    fn new() -> Self {
        Self {
            store: Arc::new(InMemoryContentStore::new()),
            fault: NodeFault::Healthy,
            requests: 0,
        }
    }
}

/// A set of in-memory storage nodes addressed by [`Endpoint`].
///
/// Implements [`StoreConnector`], so it can stand in for the real network
/// anywhere a connector is expected. Clones share the same nodes. Requests
/// to endpoints with no node fail as unreachable.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    nodes: Arc<RwLock<HashMap<Endpoint, SimNode>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// A network with one healthy node per endpoint.
    pub fn with_nodes(endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        let network = Self::new();
        for endpoint in endpoints {
            network.add_node(endpoint);
        }
        network
    }

    /// Add a healthy node, or return the existing one.
    pub fn add_node(&self, endpoint: Endpoint) -> Arc<InMemoryContentStore> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        Arc::clone(&nodes.entry(endpoint).or_insert_with(SimNode::new).store)
    }

    /// The store behind `endpoint`, creating the node if needed.
    pub fn node(&self, endpoint: &Endpoint) -> Arc<InMemoryContentStore> {
        self.add_node(endpoint.clone())
    }

    pub fn set_fault(&self, endpoint: &Endpoint, fault: NodeFault) {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        nodes.entry(endpoint.clone()).or_insert_with(SimNode::new).fault = fault;
    }

    /// Requests that reached `endpoint`, including failed ones.
    pub fn requests(&self, endpoint: &Endpoint) -> usize {
        self.nodes
            .read()
            .expect("lock poisoned")
            .get(endpoint)
            .map_or(0, |node| node.requests)
    }

    pub fn total_requests(&self) -> usize {
        self.nodes
            .read()
            .expect("lock poisoned")
            .values()
            .map(|node| node.requests)
            .sum()
    }

    /// Store `data` on every node, as if it had fully replicated.
    pub fn replicate(&self, data: &[u8]) -> ContentHash {
        let nodes = self.nodes.read().expect("lock poisoned");
        let hash = ContentHash::digest(data);
        for node in nodes.values() {
            node.store.insert(data);
        }
        hash
    }
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.nodes.read().expect("lock poisoned").len();
        f.debug_struct("MemoryNetwork").field("node_count", &count).finish()
    }
}

impl StoreConnector for MemoryNetwork {
    fn connect(&self, endpoint: &Endpoint) -> StoreResult<Arc<dyn ContentStore>> {
        Ok(Arc::new(SimHandle {
            endpoint: endpoint.clone(),
            nodes: Arc::clone(&self.nodes),
        }))
    }
}

/// Connection to one simulated node. Faults are read per request, so tests
/// can flip them while handles are alive.
struct SimHandle {
    endpoint: Endpoint,
    nodes: Arc<RwLock<HashMap<Endpoint, SimNode>>>,
}

impl SimHandle {
    fn enter(&self) -> StoreResult<(Arc<InMemoryContentStore>, NodeFault)> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        let node = nodes.get_mut(&self.endpoint).ok_or_else(|| StoreError::Unavailable {
            endpoint: self.endpoint.to_string(),
            reason: "no route to host".into(),
        })?;
        node.requests += 1;
        if node.fault == NodeFault::Unreachable {
            return Err(StoreError::Unavailable {
                endpoint: self.endpoint.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok((Arc::clone(&node.store), node.fault))
    }
}

#[async_trait]
impl ContentStore for SimHandle {
    async fn add(&self, data: &[u8]) -> StoreResult<ContentHash> {
        let (store, fault) = self.enter()?;
        if fault == NodeFault::RejectAdds {
            return Err(StoreError::Rejected(format!("{} refused the payload", self.endpoint)));
        }
        store.add(data).await
    }

    async fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        let (store, fault) = self.enter()?;
        if fault == NodeFault::EmptyFetch {
            return Err(StoreError::Empty(*hash));
        }
        store.fetch(hash).await
    }

    async fn pin(&self, hash: &ContentHash) -> StoreResult<PinResponse> {
        let (store, fault) = self.enter()?;
        match fault {
            NodeFault::RejectPins => Err(StoreError::PinRejected {
                hash: *hash,
                reason: format!("{} refused to pin", self.endpoint),
            }),
            NodeFault::HtmlPins => Ok(PinResponse {
                pins: Vec::new(),
                body: "<html><body><h1>502 Bad Gateway</h1></body></html>".into(),
            }),
            _ => store.pin(hash).await,
        }
    }
}
