//! # ng12-rag
//!
//! Ingestion and retrieval of NICE NG12 guideline excerpts for a clinical
//! decision-support assistant.
//!
//! A guideline PDF is split page by page into overlapping token windows,
//! each window is embedded, and the vectors are persisted in a named
//! collection of a file-backed store. At query time a question is embedded
//! with the same model and the nearest chunks are returned with their
//! provenance (source, page, chunk id).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌─────────────┐
//! │ PDF pages│──▶│ Chunker │──▶│ Embedder │──▶│ VectorIndex │
//! └──────────┘   └─────────┘   └──────────┘   └──────┬──────┘
//!                                                    │
//!                       ┌────────────────────────────┤
//!                       ▼                            ▼
//!                  ┌──────────┐                ┌──────────┐
//!                  │   CLI    │                │   HTTP   │
//!                  │  (ng12)  │                │  server  │
//!                  └──────────┘                └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ng12 init                          # create the store
//! ng12 ingest --pdf ./data/ng12.pdf  # chunk, embed, index
//! ng12 search "haemoptysis in a smoker over 40"
//! ng12 serve                         # JSON HTTP surface
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Typed pipeline errors |
//! | [`models`] | Core data types |
//! | [`tokenize`] | Reproducible tokenization |
//! | [`chunk`] | Overlapping token-window chunking |
//! | [`extract`] | Per-page PDF text extraction |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Collection storage (SQLite, in-memory) |
//! | [`index`] | Validated add and normalized query |
//! | [`ingest`] | Ingestion pipeline |
//! | [`search`] | Retrieval and the tool boundary |
//! | [`patients`] | Patient record lookup |
//! | [`stats`] | Collection overview |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`logging`] | Tracing subscriber setup |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod patients;
pub mod search;
pub mod server;
pub mod stats;
pub mod store;
pub mod tokenize;
