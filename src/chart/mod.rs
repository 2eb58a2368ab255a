// Chart module: chart configuration assembly and chart instance lifecycle.

pub mod backend;
pub mod config;
pub mod session;

pub use backend::{ChartBackend, ChartSlot, JsonFileBackend};
pub use session::{ChartSession, ChartSessionManager};
