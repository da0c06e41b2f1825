#![deny(missing_docs)]
//! A web based management layer over an embedded, ordered key-value store.
//!
//! This crate exposes create, read, update, delete, list, search and stat operations on a
//! [`sled`] database through a JSON HTTP API and a single HTML page. It also provides a
//! [`kvs-client`] and [`kvs-server`] executable that can be used to interact with the store.
//!
//! ## Supported Operations
//!
//! | Method | Path                | Operation                                   |
//! |--------|---------------------|---------------------------------------------|
//! | GET    | `/api/keys?limit=N` | list up to N records (default 50)           |
//! | POST   | `/api/keys`         | create (or overwrite) a key                 |
//! | GET    | `/api/keys/{key}`   | get a key                                   |
//! | PUT    | `/api/keys/{key}`   | update (or create) a key                    |
//! | DELETE | `/api/keys/{key}`   | delete a key                                |
//! | GET    | `/api/stats`        | number of keys and size of the store on disk|
//! | GET    | `/api/search?q=Q`   | keys containing Q, ignoring case            |
//!
//! Records are returned as `{"key": .., "value": .., "created_at": ..}` where `created_at` is
//! the RFC 3339 time of the last write to the key.
//!
//! ## Storage Engine
//! All storage work goes through the [`KvsEngine`] trait, which hands out read only views and
//! write transactions. [`SledKvsEngine`] is the implementor of that trait. The engine provides
//! durability, ordering and its own concurrency control, this crate adds none of its own.
//!
//! ## Query Handlers
//! [`KeyService`] performs each operation against a [`KvsEngine`], opening exactly one
//! transaction per call and re-reading the store every time.
//!
//! ## Client / Server
//! [`KvsServer`] is an [`axum`] server whose request handlers run their storage work on the
//! runtime's blocking threads. [`KvsClient`] is a blocking client for the same HTTP API.
//!
//! [`sled`]: https://docs.rs/sled/latest/sled/
//! [`axum`]: https://docs.rs/axum/latest/axum/
//! [`kvs-server`]: ./kvs-server.rs
//! [`kvs-client`]: ./kvs-client.rs

pub use client::KvsClient;
pub use config::ServerConfig;
pub use engine::{Entry, KvsEngine, ReadTxn, SledKvsEngine, WriteTxn};
pub use error::{KvsError, Result};
pub use record::Record;
pub use server::{load_page, ErrorResponse, KvsServer};
pub use service::{parse_limit, KeyService, Stats, DEFAULT_LIST_LIMIT};

mod client;
pub mod config;
pub mod engine;
mod error;
mod record;
mod server;
mod service;
