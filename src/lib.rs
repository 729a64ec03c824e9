//! Wellness agent: routes messages to fitness, nutrition, health, and
//! progress-tracking responders through a small dispatch graph.

pub mod api;
pub mod channels;
pub mod classifier;
pub mod config;
pub mod error;
pub mod graph;
pub mod knowledge;
pub mod llm;
pub mod lookup;
pub mod responders;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
