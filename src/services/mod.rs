//! Service layer: filesystem operations behind the HTTP handlers.

pub mod video_store;
