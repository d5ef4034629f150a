//! services/client/src/http/mod.rs
//!
//! The HTTP plumbing shared by all adapters: request specs, the refreshing
//! transport, and the refresh-coordination gate it is built on.

pub mod refresh;
pub mod transport;

pub use refresh::{RefreshGate, RefreshVerdict};
pub use transport::{PartSpec, RequestSpec, Transport};
