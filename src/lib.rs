//! `typomesh` library crate root.
//!
//! Turns UTF-16 text into cached triangle meshes, one per glyph:
//! - `text_break` splits text into word/number/space segments.
//! - `layout` maps segments to glyphs, applies `gsub` substitutions and
//!   positions the result in font units.
//! - `font` resolves glyph outlines, flattens and tessellates them.
//! - `mesh` caches processed glyphs per (typeface, size, hint) scope.
//! - `printer` ties everything together and assembles a `scene::Mesh2D`.
//!
//! The library only logs through the `log` facade; installing a logger is up
//! to the caller.

pub mod config;
pub mod font;
pub mod gsub;
pub mod layout;
pub mod mesh;
pub mod printer;
pub mod scene;
pub mod text_break;

pub use config::{ConfigError, PrinterConfig};
pub use font::{FontError, GlyphAdjustment, GlyphIndex, PairAdjustment, Typeface, TypefaceId};
pub use layout::{GlyphLayout, LayoutError, UnscaledGlyphPlan};
pub use mesh::{GlyphMeshStore, MeshError, MeshVariant, ProcessedGlyph};
pub use printer::{GlyphRun, PrinterError, TextPrinter, TextRun};
pub use text_break::{WordBreaker, WordKind};
