//! Request handlers.

pub mod api;
pub mod chat;
pub mod hello;
