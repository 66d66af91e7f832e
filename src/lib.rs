//! owlblog - A personal blog
//!
//! This library provides the content store, the public read API with
//! sample fallback, and the session-authenticated admin console.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
