use std::sync::{Arc, RwLock};

use ramble_store::{ContentStoreAdapter, StoreConnector};
use ramble_types::Endpoint;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

struct PoolState {
    nodes: Vec<Endpoint>,
    cursor: usize,
    /// Set while a remote endpoint is the binding.
    active: Option<Endpoint>,
    /// Set while the local endpoint is the binding.
    local: Option<Endpoint>,
}

impl PoolState {
    fn at_cursor(&self) -> Endpoint {
        self.nodes[self.cursor % self.nodes.len()].clone()
    }
}

/// Ordered storage endpoints plus the round-robin cursor that decides which
/// one the content store adapter is bound to.
///
/// Exactly one of [`active`](Self::active) and [`local`](Self::local) is set
/// at any time, and it always names the adapter's bound endpoint. The node
/// list only grows.
pub struct EndpointPool {
    adapter: ContentStoreAdapter,
    default_local: Endpoint,
    state: RwLock<PoolState>,
}

impl EndpointPool {
    /// Build a pool over `remotes`.
    ///
    /// The initial binding is `local`, unless `secure_context` is set: a
    /// secure page cannot reach a plain-http local node, so the first remote
    /// is bound instead.
    pub fn new(
        connector: Arc<dyn StoreConnector>,
        local: Endpoint,
        remotes: Vec<Endpoint>,
        secure_context: bool,
    ) -> EngineResult<Self> {
        let Some(first) = remotes.first().cloned() else {
            return Err(EngineError::ParameterError(
                "endpoint pool needs at least one remote endpoint".into(),
            ));
        };
        let (initial, state) = if secure_context {
            (
                first.clone(),
                PoolState {
                    nodes: remotes,
                    cursor: 0,
                    active: Some(first),
                    local: None,
                },
            )
        } else {
            (
                local.clone(),
                PoolState {
                    nodes: remotes,
                    cursor: 0,
                    active: None,
                    local: Some(local.clone()),
                },
            )
        };
        let adapter = ContentStoreAdapter::connect(connector, initial.clone())?;
        info!(endpoint = %initial, size = state.nodes.len(), "endpoint pool ready");
        Ok(Self {
            adapter,
            default_local: local,
            state: RwLock::new(state),
        })
    }

    /// Bind to the local endpoint, replacing it with `endpoint` if given.
    ///
    /// An override only lasts until a remote is bound; after that the
    /// configured local endpoint is used again.
    pub fn select_local(&self, endpoint: Option<Endpoint>) -> EngineResult<Endpoint> {
        let mut state = self.state.write().expect("lock poisoned");
        let target = endpoint
            .or_else(|| state.local.clone())
            .unwrap_or_else(|| self.default_local.clone());
        self.adapter.rebind(&target)?;
        state.local = Some(target.clone());
        state.active = None;
        debug!(endpoint = %target, "selected local endpoint");
        Ok(target)
    }

    /// Bind to a remote endpoint.
    ///
    /// With `endpoint`, it is appended to the pool and the cursor moves onto
    /// it. Without, the endpoint under the cursor is bound.
    pub fn select_remote(&self, endpoint: Option<Endpoint>) -> EngineResult<Endpoint> {
        let mut state = self.state.write().expect("lock poisoned");
        if let Some(endpoint) = endpoint {
            state.nodes.push(endpoint);
            state.cursor = state.nodes.len() - 1;
        }
        let target = state.at_cursor();
        self.adapter.rebind(&target)?;
        state.active = Some(target.clone());
        state.local = None;
        debug!(endpoint = %target, cursor = state.cursor, "selected remote endpoint");
        Ok(target)
    }

    /// Move the cursor to the next remote endpoint and bind to it.
    pub fn advance(&self) -> EngineResult<Endpoint> {
        let mut state = self.state.write().expect("lock poisoned");
        state.cursor = state.cursor.wrapping_add(1);
        let target = state.at_cursor();
        self.adapter.rebind(&target)?;
        state.active = Some(target.clone());
        state.local = None;
        debug!(endpoint = %target, cursor = state.cursor, "advanced to next endpoint");
        Ok(target)
    }

    pub fn size(&self) -> usize {
        self.state.read().expect("lock poisoned").nodes.len()
    }

    /// Snapshot of the remote endpoints, in pool order.
    pub fn nodes(&self) -> Vec<Endpoint> {
        self.state.read().expect("lock poisoned").nodes.clone()
    }

    pub fn cursor(&self) -> usize {
        self.state.read().expect("lock poisoned").cursor
    }

    pub fn active(&self) -> Option<Endpoint> {
        self.state.read().expect("lock poisoned").active.clone()
    }

    pub fn local(&self) -> Option<Endpoint> {
        self.state.read().expect("lock poisoned").local.clone()
    }

    /// The endpoint the adapter is bound to.
    pub fn current(&self) -> Endpoint {
        self.adapter.endpoint()
    }

    pub fn adapter(&self) -> &ContentStoreAdapter {
        &self.adapter
    }

    pub fn connector(&self) -> Arc<dyn StoreConnector> {
        self.adapter.connector()
    }
}

impl std::fmt::Debug for EndpointPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        f.debug_struct("EndpointPool")
            .field("nodes", &state.nodes)
            .field("cursor", &state.cursor)
            .field("active", &state.active)
            .field("local", &state.local)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{local, remote, Fixture};

    #[test]
    fn empty_pool_is_rejected() {
        let fixture = Fixture::new(2);
        let err = EndpointPool::new(Arc::new(fixture.network.clone()), local(), Vec::new(), false)
            .unwrap_err();
        assert!(matches!(err, EngineError::ParameterError(_)));
    }

    #[test]
    fn initial_binding_is_local() {
        let fixture = Fixture::new(3);
        let pool = &fixture.pool;
        assert_eq!(pool.local(), Some(local()));
        assert_eq!(pool.active(), None);
        assert_eq!(pool.current(), local());
        assert_eq!(pool.size(), 3);
    }

    #[test]
    fn secure_context_binds_first_remote() {
        let fixture = Fixture::new(3);
        let pool = EndpointPool::new(
            Arc::new(fixture.network.clone()),
            local(),
            fixture.remotes.clone(),
            true,
        )
        .unwrap();
        assert_eq!(pool.active(), Some(remote(0)));
        assert_eq!(pool.local(), None);
        assert_eq!(pool.current(), remote(0));
    }

    #[test]
    fn advance_wraps_round_robin() {
        let fixture = Fixture::new(3);
        let pool = &fixture.pool;
        let visited: Vec<Endpoint> = (0..4).map(|_| pool.advance().unwrap()).collect();
        assert_eq!(visited, vec![remote(1), remote(2), remote(0), remote(1)]);
        assert_eq!(pool.local(), None);
        assert_eq!(pool.active(), Some(remote(1)));
        assert_eq!(pool.current(), remote(1));
    }

    #[test]
    fn select_remote_appends_and_binds() {
        let fixture = Fixture::new(2);
        let pool = &fixture.pool;
        let extra = Endpoint::https("extra.example", 443);

        assert_eq!(pool.select_remote(Some(extra.clone())).unwrap(), extra);
        assert_eq!(pool.size(), 3);
        assert_eq!(pool.cursor(), 2);
        assert_eq!(pool.active(), Some(extra.clone()));
        assert_eq!(pool.current(), extra);

        // Wraps back to the start of the pool.
        assert_eq!(pool.advance().unwrap(), remote(0));
    }

    #[test]
    fn select_remote_without_endpoint_binds_cursor() {
        let fixture = Fixture::new(2);
        let pool = &fixture.pool;
        assert_eq!(pool.select_remote(None).unwrap(), remote(0));
        assert_eq!(pool.local(), None);
    }

    #[test]
    fn select_local_clears_active() {
        let fixture = Fixture::new(2);
        let pool = &fixture.pool;
        pool.advance().unwrap();

        assert_eq!(pool.select_local(None).unwrap(), local());
        assert_eq!(pool.active(), None);
        assert_eq!(pool.current(), local());

        let other = Endpoint::http("127.0.0.1", 5002);
        assert_eq!(pool.select_local(Some(other.clone())).unwrap(), other);
        assert_eq!(pool.local(), Some(other.clone()));

        pool.select_remote(None).unwrap();
        assert_eq!(pool.local(), None);
        // Binding a remote forgets the override.
        assert_eq!(pool.select_local(None).unwrap(), local());
    }
}
