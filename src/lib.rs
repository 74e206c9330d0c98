//! # Photodesk
//!
//! An in-memory image library and editing engine. Upload images, tag them,
//! search and sort the collection, run filter pipelines and geometric
//! transforms, compress and export, apply one edit across a selection, and
//! keep a per-image edit history of everything that happened.
//!
//! # Architecture: Store + Collaborators
//!
//! One owned [`store::ImageStore`] holds all state. The pixel work and file
//! parsing happen in collaborators behind traits, so every flow can run
//! against a mock in tests:
//!
//! ```text
//!                       ┌──────────────────────────┐
//!  caller ─ editing ──▶ │ ImageStore               │
//!         ─ batch ────▶ │  images, tags, presets,  │
//!                       │  view criteria, batch log│
//!                       └────────────┬─────────────┘
//!                                    │ reads preview / bytes
//!         ┌──────────────────────────┼──────────────────────────┐
//!         ▼                          ▼                          ▼
//!   DrawingSurface              Compressor              MetadataExtractor
//!   (RustBackend)            (ImageCompressor)           (ExifExtractor)
//! ```
//!
//! A flow reads the record, calls its collaborator, then writes the result
//! and one history entry back. Collaborator errors abort before the write,
//! so a failed edit never leaves a record half-updated.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | The image collection: records, selection, tags, gallery view, presets, batch log |
//! | [`editing`] | Single-image flows: filters, presets, transforms, compress, export, annotations, undo/redo |
//! | [`batch`] | One action over a selection, one history entry per image |
//! | [`history`] | Append-only per-image command log |
//! | [`tags`] | Tag taxonomy with parent/child hierarchy |
//! | [`search`] | Typo-tolerant substring matching for the gallery search |
//! | [`presets`] | Named filter presets (`vintage`, `dramatic`) |
//! | [`progressive`] | Chunked byte streaming and JPEG quality ladders |
//! | [`metadata`] | Dimensions, camera and GPS extraction (`image` + `kamadak-exif`) |
//! | [`imaging`] | Filter pipeline, transforms, compression and the pure-Rust drawing surface |
//! | [`config`] | `photodesk.toml` loading, validation and merging |
//! | [`types`] | Shared types: image ids, source files, sort criteria |
//!
//! # Design Decisions
//!
//! ## A Constructible Store
//!
//! There is no global state. A store is a plain value built with
//! [`store::ImageStore::new`] or from a [`config::StudioConfig`]; tests build
//! as many as they like. Mutation goes through `&mut self`, so the borrow
//! checker guarantees a single writer.
//!
//! ## Filters as Data
//!
//! Filter knobs compile to an ordered `Vec` of typed operations
//! ([`imaging::FilterOp`]) before any pixel is touched. The order is fixed
//! and neutral knobs contribute nothing, so neutral parameters are an exact
//! identity and the result of a parameter set never depends on how it was
//! built.
//!
//! ## Undo as a Command Log
//!
//! History entries are never removed. Undo and redo are entries that point
//! at the entry they toggle, and a clear hides what came before it. The log
//! can always answer "what happened", and [`history::EditHistory::effective`]
//! answers "what is in force".
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, encoding and every filter run on the `image` crate with
//! `rayon` for per-pixel parallelism. No system libraries are needed.

pub mod batch;
pub mod config;
pub mod editing;
pub mod history;
pub mod imaging;
pub mod metadata;
pub mod presets;
pub mod progressive;
pub mod search;
pub mod store;
pub mod tags;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
