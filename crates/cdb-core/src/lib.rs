//! Framework-agnostic core for the content-distribution bot.
//!
//! Everything the bot *is* lives here: the conversation engine, the catalog
//! and chat ports, rate limiting, and broadcast dispatch. Transport and
//! storage adapters plug in from the outside.

pub mod broadcast;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod formatting;
pub mod keyboards;
pub mod logging;
pub mod ports;
pub mod ratelimit;
pub mod session;
pub mod store;

pub use errors::{Error, Result};
