//! Embedded client: HTTP playback requests, the session event stream and debounced search.

pub mod error;
pub mod events;
pub mod http;
pub mod search;

pub use self::error::{ClientError, ClientResult};
