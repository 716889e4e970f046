//! Common utility functions

pub mod phone;

pub use phone::*;
