pub mod event_source;
pub mod websocket_feed;
