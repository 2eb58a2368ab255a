// Request module: turns form state into an AnalysisRequest.

pub mod builder;

pub use builder::{RequestBuilder, UiSelection};
