//! Persistence layer: libSQL-backed profiles and activity log.

pub mod libsql_backend;
pub mod migrations;
pub mod model;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use model::{ActivityCounts, ActivityKind, UserProfile};
pub use traits::WellnessStore;
