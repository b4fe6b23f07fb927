//! Typed access to the server name generator REST API.
//!
//! [`models`] holds the wire types (camelCase JSON, matching the backend) and [`client`] the
//! [`ApiClient`](client::ApiClient) trait together with its `reqwest` implementation.

pub mod client;
pub mod models;
