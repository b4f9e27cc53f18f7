//! Tool dispatcher: newline-delimited JSON-RPC 2.0 over stdio.
//!
//! Exposes `findNextBus`, `getBusInformation` and `searchBusStops` to an
//! assistant client. Query problems come back as tool results flagged with
//! `isError`; protocol problems come back as JSON-RPC errors.

mod protocol;
mod server;

pub use protocol::{RpcError, RpcRequest, RpcResponse, ToolOutput};
pub use server::ToolServer;
