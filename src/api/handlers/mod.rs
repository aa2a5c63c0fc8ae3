//! API handlers for regdesk.

pub mod admin;
pub mod health;
