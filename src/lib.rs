//! ConnectSphere - a social-style feed aggregator
//!
//! Pulls posts from news, discussion and market-data APIs, normalizes them
//! into one shape, and serves a merged, cached feed with comment threads,
//! plus a small store for first-party profiles and posts.

pub mod aggregator;
pub mod assets;
pub mod cache;
pub mod comments;
pub mod config;
pub mod db;
pub mod engagement;
pub mod fallback;
pub mod model;
pub mod routes;
pub mod sources;
pub mod synthetic;
