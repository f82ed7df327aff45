//! Process-wide shared state.

mod store;

pub use store::{StateStore, StatsSnapshot};
