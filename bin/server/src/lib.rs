//! IAG gateway server.
//!
//! This crate provides the HTTP surface of the Identity and Authorization
//! Gateway: the OAuth login flow, token-protected profile routes, and
//! role- and permission-gated API routes.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
