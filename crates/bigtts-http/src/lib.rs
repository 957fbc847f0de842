//! Shared axum scaffolding for every HTTP-fronted service: the error type,
//! `/live`, a Prometheus `/metrics` exporter, and the upload/status/result/
//! clean route builders (thin adapters per §1, built on the teacher's
//! `nest` HTTP module conventions).

pub mod error;
pub mod live;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod sanitize;
pub mod serve;

pub use error::Error;
pub use sanitize::sanitize_url;

pub type Result<T, E = Error> = std::result::Result<T, E>;
