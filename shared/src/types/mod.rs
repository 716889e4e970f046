//! Type definitions shared across crates
//!
//! - `language` - Language selection for user-facing messages

pub mod language;

pub use language::Language;
