pub mod client;
pub mod controller;
pub mod handlers;
pub mod models;
pub mod router;
pub mod transport;

pub use client::SessionRoomApi;
pub use controller::{format_time, SessionRoomController};
pub use models::*;
pub use router::*;
pub use transport::{ConnectionState, MediaTransport, TransportError};
