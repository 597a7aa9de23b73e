//! Data models for the upload workflow
//!
//! Request/grant types and their wire bodies live in `upload`, the session
//! state machine in `state`, and the records the server returns after linking
//! in `content`.

mod content;
mod state;
mod upload;

pub use content::*;
pub use state::*;
pub use upload::*;
