pub mod console;
pub mod constants;
pub mod conversation;
pub mod health;
pub mod logging;
pub mod main_helper;
pub mod provider;
pub mod redaction;
pub mod relay;
pub mod sanitize;
pub mod scroll;
pub mod server;
pub mod session;
pub mod specs;
pub mod str_utils;
pub mod types;

pub use types::*;

pub use main_helper::{AppState, Args, RelayConfig};
