//! # txt2epub
//!
//! A CLI utility to turn a manifest of plain-text chapter files into an EPUB book.
//!
//! ## Current Features
//!
//! - `# Chapter` / `## Section` headers split the text into a two-level outline
//! - Nested or flat table of contents
//! - Optional cover image and a default stylesheet
//!
//! ## Usage
//!
//! ```bash
//! txt2epub build book/manifest.toml -o dist
//! ```

pub mod builder;
pub mod epub_writer;
pub mod manifest;
pub mod parser;
pub mod toc;

pub use builder::BookBuilder;
pub use epub_writer::EpubWriter;
pub use manifest::Manifest;
pub use parser::{parse_text, Chapter};
