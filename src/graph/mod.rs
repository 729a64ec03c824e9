//! Dispatch graph: node set, edge table, per-request transcript, and the
//! loop that runs a message from `router` to `terminal`.

mod dispatch;
mod state;
mod transcript;

pub use dispatch::{DispatchGraph, Outcome};
pub use state::{Edge, EdgeTable, NodeId, RequestState};
pub use transcript::{Entry, Transcript};
