use std::sync::{Arc, RwLock};

use ramble_types::{ContentHash, Endpoint};
use tracing::debug;

use crate::error::StoreResult;
use crate::traits::{ContentStore, PinResponse, StoreConnector};

/// The endpoint a backend was built for, paired with the backend.
#[derive(Clone)]
struct Binding {
    endpoint: Endpoint,
    store: Arc<dyn ContentStore>,
}

/// Uniform add/fetch/pin surface over a backend that can be swapped at
/// runtime.
///
/// Every call clones the current binding before awaiting, so a rebind only
/// affects calls issued after it.
pub struct ContentStoreAdapter {
    connector: Arc<dyn StoreConnector>,
    binding: RwLock<Binding>,
}

impl ContentStoreAdapter {
    /// Build an adapter bound to `endpoint`.
    pub fn connect(connector: Arc<dyn StoreConnector>, endpoint: Endpoint) -> StoreResult<Self> {
        let store = connector.connect(&endpoint)?;
        Ok(Self {
            connector,
            binding: RwLock::new(Binding { endpoint, store }),
        })
    }

    /// Rebind to another endpoint.
    pub fn rebind(&self, endpoint: &Endpoint) -> StoreResult<()> {
        let store = self.connector.connect(endpoint)?;
        let mut binding = self.binding.write().expect("lock poisoned");
        debug!(from = %binding.endpoint, to = %endpoint, "rebinding content store");
        *binding = Binding {
            endpoint: endpoint.clone(),
            store,
        };
        Ok(())
    }

    /// The endpoint currently bound.
    pub fn endpoint(&self) -> Endpoint {
        self.binding.read().expect("lock poisoned").endpoint.clone()
    }

    /// The connector used to build backends.
    pub fn connector(&self) -> Arc<dyn StoreConnector> {
        Arc::clone(&self.connector)
    }

    fn current(&self) -> Binding {
        self.binding.read().expect("lock poisoned").clone()
    }

    /// Snapshot of the current binding, for a sequence of calls that must
    /// all reach the same node.
    pub fn bound(&self) -> (Endpoint, Arc<dyn ContentStore>) {
        let Binding { endpoint, store } = self.current();
        (endpoint, store)
    }

    pub async fn add(&self, data: &[u8]) -> StoreResult<ContentHash> {
        self.current().store.add(data).await
    }

    pub async fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        self.current().store.fetch(hash).await
    }

    pub async fn pin(&self, hash: &ContentHash) -> StoreResult<PinResponse> {
        self.current().store.pin(hash).await
    }
}

impl std::fmt::Debug for ContentStoreAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStoreAdapter")
            .field("endpoint", &self.endpoint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::StoreError;
    use crate::memory::{InMemoryContentStore, MemoryNetwork, NodeFault};

    fn endpoints() -> (Endpoint, Endpoint) {
        (Endpoint::https("a.example", 443), Endpoint::https("b.example", 443))
    }

    #[tokio::test]
    async fn calls_go_to_bound_endpoint() {
        let (a, b) = endpoints();
        let network = MemoryNetwork::with_nodes([a.clone(), b.clone()]);
        let adapter = ContentStoreAdapter::connect(Arc::new(network.clone()), a.clone()).unwrap();

        let hash = adapter.add(b"on a").await.unwrap();
        assert!(network.node(&a).contains(&hash));
        assert!(!network.node(&b).contains(&hash));
    }

    #[tokio::test]
    async fn rebind_switches_backend() {
        let (a, b) = endpoints();
        let network = MemoryNetwork::with_nodes([a.clone(), b.clone()]);
        network.set_fault(&a, NodeFault::Unreachable);
        let adapter = ContentStoreAdapter::connect(Arc::new(network.clone()), a.clone()).unwrap();

        assert!(matches!(
            adapter.add(b"payload").await,
            Err(StoreError::Unavailable { .. })
        ));

        adapter.rebind(&b).unwrap();
        assert_eq!(adapter.endpoint(), b);
        let hash = adapter.add(b"payload").await.unwrap();
        assert_eq!(adapter.fetch(&hash).await.unwrap(), b"payload");
        assert_eq!(adapter.pin(&hash).await.unwrap().pins, vec![hash]);
    }

    #[test]
    fn debug_shows_endpoint() {
        let (a, _) = endpoints();
        let network = MemoryNetwork::with_nodes([a.clone()]);
        let adapter = ContentStoreAdapter::connect(Arc::new(network), a).unwrap();
        assert!(format!("{adapter:?}").contains("a.example"));
    }

    // ------------------------------------------------------------------
    // Rebind during an in-flight call
    // ------------------------------------------------------------------

    /// Holds every `add` until the gate opens.
    struct GatedStore {
        inner: Arc<InMemoryContentStore>,
        entered: Arc<Notify>,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ContentStore for GatedStore {
        async fn add(&self, data: &[u8]) -> StoreResult<ContentHash> {
            self.entered.notify_one();
            self.gate.notified().await;
            self.inner.add(data).await
        }

        async fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
            self.inner.fetch(hash).await
        }

        async fn pin(&self, hash: &ContentHash) -> StoreResult<PinResponse> {
            self.inner.pin(hash).await
        }
    }

    /// Hands out the gated store for `slow` and a plain one for anything else.
    struct FixedConnector {
        slow: Endpoint,
        gated: Arc<GatedStore>,
        fast: Arc<InMemoryContentStore>,
    }

    impl StoreConnector for FixedConnector {
        fn connect(&self, endpoint: &Endpoint) -> StoreResult<Arc<dyn ContentStore>> {
            if *endpoint == self.slow {
                Ok(self.gated.clone())
            } else {
                Ok(self.fast.clone())
            }
        }
    }

    #[tokio::test]
    async fn rebind_leaves_in_flight_call_on_old_node() {
        let (a, b) = endpoints();
        let slow = Arc::new(InMemoryContentStore::new());
        let fast = Arc::new(InMemoryContentStore::new());
        let entered = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let connector = FixedConnector {
            slow: a.clone(),
            gated: Arc::new(GatedStore {
                inner: Arc::clone(&slow),
                entered: Arc::clone(&entered),
                gate: Arc::clone(&gate),
            }),
            fast: Arc::clone(&fast),
        };
        let adapter = Arc::new(ContentStoreAdapter::connect(Arc::new(connector), a).unwrap());

        let in_flight = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move { adapter.add(b"first").await })
        };
        entered.notified().await;

        adapter.rebind(&b).unwrap();
        gate.notify_one();
        let first = in_flight.await.unwrap().unwrap();
        assert!(slow.contains(&first));
        assert!(!fast.contains(&first));

        let second = adapter.add(b"second").await.unwrap();
        assert!(fast.contains(&second));
        assert!(!slow.contains(&second));
    }
}
