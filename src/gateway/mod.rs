// Gateway module: HTTP access to the market-data service.

pub mod client;

pub use client::{GatewayClient, MarketGateway};
