//! UI primitives for the Vaultmark CLI.
//!
//! - **Context**: Environment detection (TTY, unicode, output mode)
//! - **Mode**: Output mode resolution (json, plain, pretty)
//! - **Render**: Tables, badges, key/value lines, error messages

mod context;
mod mode;
pub mod render;

pub use context::UiContext;
pub use mode::OutputMode;

pub use render::{
    badge, kv, local_time, print, print_error, print_json, short_id, table, Badge, Column,
};
