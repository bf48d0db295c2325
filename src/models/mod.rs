pub mod events;
pub mod votes;
pub mod websocket;
