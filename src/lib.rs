//! Lead Cockpit Library
//!
//! Lead prioritization and pipeline analytics for a multi-tenant CRM
//! dashboard: normalizes raw score records and leads from the hosted store,
//! classifies scores into temperature bands, stages leads into a pipeline,
//! filters them and derives live KPIs, then serves the resulting view models
//! over HTTP.
//!
//! # Modules
//!
//! - `api`: HTTP-layer components.
//! - `core`: Scoring, staging and analytics logic.
//! - `integrations`: Record store access and change notifications.
//! - `analytics`: KPIs and band distribution.
//! - `band`: Temperature band classification.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `filter`: Compound lead filters.
//! - `handlers`: HTTP request handlers.
//! - `loader`: Tenant-scoped load coordination and view states.
//! - `models`: Core data models.
//! - `normalizer`: Coercion of raw store rows into strict records.
//! - `pipeline`: Pipeline stage catalog and staging.
//! - `radar`: Factor radar geometry.
//! - `realtime_handler`: Store change webhook handler.
//! - `realtime_models`: Change notification payloads.
//! - `rest_client`: PostgREST-style store client.
//! - `routes`: Router assembly and middleware.
//! - `snapshot_digest`: Snapshot fingerprints.
//! - `store`: Store backend selection.
//! - `views`: Lead-scoring and pipeline view models.

pub mod api;
pub mod core;
pub mod integrations;

pub mod analytics;
pub mod band;
pub mod config;
pub mod db;
pub mod errors;
pub mod filter;
pub mod handlers;
pub mod loader;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod radar;
pub mod realtime_handler;
pub mod realtime_models;
pub mod rest_client;
pub mod routes;
pub mod snapshot_digest;
pub mod store;
pub mod views;
