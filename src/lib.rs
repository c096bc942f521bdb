//! # doc-harness
//!
//! Local question answering over a folder of PDFs and images.
//!
//! Documents are read from a source directory, their text extracted (with
//! OCR for scans and images), split into fixed-size word chunks, embedded,
//! and stored in a persistent vector index. Questions are embedded the same
//! way and answered from the nearest chunks, optionally summarized by a
//! language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────┐   ┌──────────────┐
//! │ Source dir   │──▶│ Extract → Chunk →    │──▶│ Vector index │
//! │ PDF/PNG/JPG  │   │ Embed (pipeline)     │   │ (SQLite)     │
//! └──────────────┘   └──────────────────────┘   └──────┬───────┘
//!                                                      │
//!                          ┌───────────────────────────┤
//!                          ▼                           ▼
//!                     ┌──────────┐               ┌──────────┐
//!                     │   CLI    │               │   HTTP   │
//!                     │   (dh)   │               │  (axum)  │
//!                     └──────────┘               └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dh init
//! cp report.pdf scan.png ./data/docs/
//! dh ingest
//! dh ask "what is the termination clause?"
//! dh serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF and image text extraction |
//! | [`ocr`] | `tesseract` / `pdftoppm` OCR |
//! | [`chunk`] | Word chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index trait, SQLite and in-memory stores |
//! | [`ingest`] | Ingestion pipeline |
//! | [`retrieval`] | Question answering |
//! | [`summarize`] | Optional LLM summarization |
//! | [`app`] | Component wiring from config |
//! | [`inspect`] | Listing stored chunks |
//! | [`chat`] | Small-talk replies |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`logging`] | Tracing setup |

pub mod app;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod inspect;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod ocr;
pub mod retrieval;
pub mod server;
pub mod summarize;
