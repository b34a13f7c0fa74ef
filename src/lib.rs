//! pie-ledger: Telegram bot for a small bakery's daily books, with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
