// ringlink-api: Async Rust client for the Ring doorbell cloud API
//
// `HttpGateway` is the single request path: it composes headers for each
// endpoint class, enforces the request timeout, and classifies responses
// into the `Error` taxonomy. Endpoint groups (OAuth, session, devices,
// locations, snapshots) are inherent methods split across modules.

pub mod auth;
pub mod devices;
pub mod error;
pub mod gateway;
pub mod locations;
pub mod models;
pub mod oauth;
pub mod session;
pub mod snapshots;
pub mod transport;

pub use auth::{Endpoints, Host, RequestAuth, TokenPair};
pub use error::Error;
pub use gateway::{ApiRequest, Body, HttpGateway, ResponseKind};
pub use models::{
    AuthGrant, Ding, Location, RawDevice, RingDevices, SnapshotTimestamp, SnapshotTimestamps,
};
pub use transport::TransportConfig;
