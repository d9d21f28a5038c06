//! # canopy
//!
//! A feed reader that keeps each owner's subscriptions in a folder tree and
//! pulls only what is new since the last visit.
//!
//! ## Architecture
//!
//! ```text
//! TreeSynchronizer → SyncEngine → Fetcher → normalizer → Registry → Store
//! ```
//!
//! - [`normalizer`]: detects Atom, RSS 1.0 and RSS 2.0 and decodes them into one model
//! - [`registry`]: registration with (owner, url) dedup, plus folder and feed lifecycle
//! - [`sync`]: watermark-based incremental sync of a feed, and of whole trees
//! - [`store`]: SQLite persistence layer
//!
//! ## Quick Start
//!
//! ```bash
//! # Subscribe and organize
//! canopy mkdir Rust
//! canopy add https://blog.rust-lang.org/feed.xml --folder folder:2
//!
//! # Pull new entries for the whole tree
//! canopy update
//!
//! # Keep every tree fresh in the background
//! canopy daemon start --interval 6h
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// fetcher, registry and synchronizers.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/canopy/config.toml`.
pub mod config;

/// Background daemon that runs [`TreeSynchronizer::update_all`](sync::TreeSynchronizer::update_all)
/// on an interval.
pub mod daemon;

/// Core domain models and their typed keys.
///
/// - [`Folder`](domain::Folder): a node of an owner's tree
/// - [`Feed`](domain::Feed): a subscription with its watermark
/// - [`Entry`](domain::Entry): one unread item of a feed
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for document fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

pub mod normalizer;

/// OPML outline parsing for imports.
pub mod opml;

pub mod registry;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

pub mod sync;
