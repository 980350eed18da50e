//! Terminal storefront client for a restaurant ordering API.
//!
//! The remote API owns all durable state. This crate keeps the session token
//! in local SQLite storage, forwards menu, cart, checkout, status, feedback
//! and chat calls, and polls order status while signed in.

pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod money;
pub mod poller;
pub mod session;
pub mod storefront;
