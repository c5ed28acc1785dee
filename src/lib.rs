#![warn(missing_docs)]
//! Surge watches a live chat subscription and sends a Telegram alert when a
//! burst of messages coincides with a mention of a target identity or one of
//! a set of keywords.

pub mod config;
pub mod engine;
pub mod http_client;
pub mod models;
pub mod notification;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;
