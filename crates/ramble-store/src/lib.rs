//! Content-addressed storage for Ramble.
//!
//! Storage nodes expose three primitives: `add` stores bytes and returns
//! their [`ContentHash`](ramble_types::ContentHash), `fetch` (cat) returns the
//! bytes for a hash, and `pin` asks the node to retain a hash indefinitely.
//!
//! # Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`IpfsHttpStore`]: HTTP API client for one storage node
//! - [`InMemoryContentStore`]: `HashMap`-based node for tests and embedding
//!
//! A [`StoreConnector`] builds a backend for an [`Endpoint`](ramble_types::Endpoint);
//! [`MemoryNetwork`] is a connector over simulated nodes with injectable
//! faults. The [`ContentStoreAdapter`] wraps whichever backend is currently
//! bound and can be rebound to another endpoint at runtime.
//!
//! # Design Rules
//!
//! 1. Rebinding only affects calls issued after the rebind; in-flight calls
//!    finish against the backend they started on.
//! 2. Payloads are byte sequences; chunked transports are concatenated
//!    before they are returned.
//! 3. The store never interprets payload contents.

pub mod adapter;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use adapter::ContentStoreAdapter;
pub use error::{StoreError, StoreResult};
pub use http::{HttpConnector, IpfsHttpStore};
pub use memory::{InMemoryContentStore, MemoryNetwork, NodeFault};
pub use traits::{ContentStore, PinResponse, StoreConnector};
