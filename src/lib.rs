// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # kglove
//!
//! Graph embeddings from bookmark coloring and a GloVe-style factorization.
//!
//! ## Architecture
//!
//! - **Input graph** (`graph`): typed vertices, weighted relation-typed edges,
//!   CSR adjacency, focus set
//! - **Bookmark coloring** (`bca`): bounded paint propagation from every focus
//!   vertex, one rayon job per vertex
//! - **Co-occurrence matrix** (`matrix`): append-only triplets with shuffled access
//! - **Optimizer** (`optimize`): parallel Adagrad / Adam / AMSGrad over atomic
//!   parameters, Hogwild or strict
//! - **Embedding** (`embedding`): unit-norm vector per focus vertex
//!
//! ## Library usage
//!
//! ```no_run
//! use kglove::config::EmbeddingConfig;
//! use kglove::engine::EmbeddingEngine;
//! use kglove::graph::GraphBuilder;
//!
//! let mut builder = GraphBuilder::new();
//! builder.add_triple("Sun", "is-a", "Star");
//! builder.add_triple("Sirius", "is-a", "Star");
//! let graph = builder.build().unwrap();
//!
//! let engine = EmbeddingEngine::new(EmbeddingConfig::default()).unwrap();
//! let embedding = engine.embed(&graph).unwrap();
//! let near = embedding.most_similar("Sun", 1).unwrap();
//! ```

pub mod bca;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod graph;
pub mod matrix;
pub mod optimize;
pub mod rng;
pub mod worker;
