//! Infrastructure adapters. Implement outbound ports.
//!
//! Telegram, Supabase, Gemini. Map errors to DomainError.

pub mod ai;
pub mod persistence;
pub mod telegram;
