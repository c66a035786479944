//! Semantic journal and code search backed by local embeddings.
//!
//! Vellum turns text into vectors, stores them next to their source in plain
//! files, and ranks stored entries against a query by cosine similarity. It
//! ships as a library and as a binary that exposes the same operations on the
//! command line and as [MCP](https://modelcontextprotocol.io/) tools.
//!
//! # Architecture
//!
//! - **Embeddings**: local ONNX Runtime inference (mean pooling by default), a
//!   deterministic hash provider for offline use, or a worker subprocess spoken
//!   to over a one-shot stdin/stdout bridge
//! - **Storage**: an append-only JSON Lines journal and a date-partitioned code
//!   index, vectors encoded as little-endian `f32` hex
//! - **Search**: exact linear scan, cosine similarity, stable top-k
//!
//! # Modules
//!
//! - [`bridge`] — Bridge wire types, subprocess client, and worker side
//! - [`codec`] — Hex encoding of `f32` vectors
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`embedding`] — The [`embedding::EmbeddingProvider`] trait and its implementations
//! - [`error`] — Error taxonomy shared by every layer
//! - [`index`] — Incremental, date-partitioned code index
//! - [`journal`] — Append-only journal: add, list, search, stats, re-embed
//! - [`similarity`] — Cosine similarity and top-k ranking

pub mod bridge;
pub mod codec;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod journal;
pub mod similarity;

pub use error::{Result, VellumError};
