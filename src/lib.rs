//! Client-side core of a download-manager console.
//!
//! Talks to the manager's HTTP api ([`api`]), caches per-site resource
//! catalogs in a local SQLite database for offline browsing ([`store`],
//! [`sync`]), keeps an in-memory download-status snapshot fresh on a fixed
//! interval ([`poller`]) and derives status counts and filtered views for
//! presentation ([`view`]).

pub mod api;
pub mod config;
pub mod error;
pub mod poller;
pub mod store;
pub mod sync;
pub mod view;
