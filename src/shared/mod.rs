//! Cross-cutting helpers: configuration and text formatting.

pub mod config;
pub mod format;

pub use format::{format_count, format_number, is_valid_date, parse_date};
