pub mod client;
pub mod protocol;

pub use client::{GatewayClient, GatewayHandle};
pub use protocol::{ClientFrame, GatewayEvent};
