//! # Minotes Architecture
//!
//! Minotes is a **UI-agnostic conversion library** for Xiaomi/MIUI Notes
//! backup blobs (`.bak`). The binary is a thin CLI client over it.
//!
//! The backup format is undocumented and reverse-engineered: record
//! boundaries are inferred from byte patterns, and note bodies use a
//! proprietary tag dialect that has to be decoded before it can be
//! re-emitted as Markdown.
//!
//! ## The Pipeline
//!
//! ```text
//! raw .bak buffer
//!   │
//!   ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Backup Scanner (scan.rs)                                    │
//! │  - Locates the notes section, segments it into raw records   │
//! │  - Primary folder-marker strategy + field-tag fallback       │
//! └──────────────────────────────────────────────────────────────┘
//!   │ RawNoteRecord { title, payload, folder, origin }
//!   ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Markup Decoder (markup.rs)                                  │
//! │  - Parses the tag dialect into a block/inline content tree   │
//! │  - Unknown tags degrade to literal text, never errors        │
//! └──────────────────────────────────────────────────────────────┘
//!   │ Vec<Block>
//!   ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Markdown Renderer (markdown.rs)                             │
//! │  - Pure, deterministic tree → Markdown string                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The Media Locator (`media.rs`) runs independently over the same buffer
//! and classifies embedded attachments by content signature.
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code:
//! - Takes regular Rust function arguments
//! - Returns regular Rust types (`Result<Conversion>`)
//! - **Never** writes to stdout/stderr
//! - **Never** calls `std::process::exit`
//!
//! Recoverable conditions (skipped spans, unknown signatures) surface as
//! [`api::Message`] values on the result; the CLI layer decides how to
//! print them. Only a missing notes section is fatal for a run.
//!
//! ## Module Overview
//!
//! - [`api`]: The conversion facade—entry point for the whole pipeline
//! - [`scan`]: Backup Scanner—section location and record segmentation
//! - [`markup`]: Markup Decoder—tag dialect → content tree
//! - [`markdown`]: Markdown Renderer—content tree → text
//! - [`media`]: Media Locator—attachment discovery and classification
//! - [`export`]: Writes notes and attachments to disk
//! - [`loader`]: Finds and reads the backup file
//! - [`model`]: Core data types (`Note`, `Folder`, `MediaKind`)
//! - [`error`]: Error types

pub mod api;
pub mod error;
pub mod export;
pub mod loader;
pub mod markdown;
pub mod markup;
pub mod media;
pub mod model;
pub mod scan;
