//! System font discovery.
//!
//! `FontSystem` owns a `fontdb::Database` and resolves a `FontQuery`
//! (families/weight/italic) to a loaded `TtfTypeface`:
//! - Named families are tried in order; generic names map to fontdb's generics.
//! - With no match, fall back to `serif`, then to the first face found.

use std::path::Path;
use std::sync::Arc;

use fontdb::{Database, Family, Query, Stretch, Style, Weight};

use crate::font::ttf::TtfTypeface;
use crate::font::{FontError, FontQuery};

pub struct FontSystem {
    db: Database,
}

impl FontSystem {
    /// Create a font system and load system fonts.
    pub fn new() -> Result<Self, FontError> {
        let mut db = Database::new();
        db.load_system_fonts();

        if db.faces().next().is_none() {
            return Err(FontError::NoFontsAvailable);
        }
        log::debug!("font database: {} faces", db.len());

        Ok(Self { db })
    }

    /// A font system over explicitly added files only.
    pub fn empty() -> Self {
        Self {
            db: Database::new(),
        }
    }

    pub fn load_font_file(&mut self, path: impl AsRef<Path>) -> Result<(), FontError> {
        let path = path.as_ref();
        self.db
            .load_font_file(path)
            .map_err(|source| FontError::ReadFailed {
                path: path.display().to_string(),
                source,
            })
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Resolve `query` to a face and load it.
    pub fn resolve(&self, query: &FontQuery) -> Result<TtfTypeface, FontError> {
        let style = if query.italic {
            Style::Italic
        } else {
            Style::Normal
        };
        let weight = Weight(query.weight.clamp(1, 1000));

        let families: Vec<Family<'_>> = query
            .families
            .iter()
            .map(|f| f.trim())
            .filter(|s| !s.is_empty())
            .map(generic_or_named)
            .collect();

        let run = |families: &[Family<'_>]| {
            self.db.query(&Query {
                families,
                weight,
                style,
                stretch: Stretch::Normal,
            })
        };

        let id = run(&families)
            .or_else(|| run(&[Family::Serif]))
            .or_else(|| self.db.faces().next().map(|f| f.id))
            .ok_or(FontError::NoFontsAvailable)?;

        let loaded = self
            .db
            .with_face_data(id, |data, index| {
                TtfTypeface::from_bytes(Arc::from(data.to_vec()), index)
            })
            .ok_or_else(|| FontError::ResolveFailed(query.clone()))??;

        log::debug!("resolved {:?} to fontdb face {:?}", query.families, id);
        Ok(loaded)
    }
}

fn generic_or_named(name: &str) -> Family<'_> {
    if name.eq_ignore_ascii_case("serif") {
        Family::Serif
    } else if name.eq_ignore_ascii_case("sans-serif") || name.eq_ignore_ascii_case("sans") {
        Family::SansSerif
    } else if name.eq_ignore_ascii_case("monospace") || name.eq_ignore_ascii_case("mono") {
        Family::Monospace
    } else {
        Family::Name(name)
    }
}
