//! Channel Guardian Bot Library
//!
//! A Telegram bot for managing paid channel subscriptions.
//!
//! This crate provides the core functionality for:
//! - Tracking managed subscribers and offline records in a `SQLite` ledger
//! - Running the daily accounting pass (decrement, remind, expire)
//! - Detecting admin posting activity in the managed channel
//! - Serving the admin dashboard over inline keyboards

pub mod accounting;
pub mod config;
pub mod dashboard;
pub mod ledger;
pub mod telegram;
