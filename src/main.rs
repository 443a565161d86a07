//! Thin binary wrapper for local development.
//!
//! Usage: `typomesh <font-path|family> <text> [config.toml]`
//!
//! Loads the typeface (a font file when the path exists, otherwise a family
//! query against system fonts), prints the text into glyph meshes and logs
//! what was built. Run with `RUST_LOG=debug` to see the details.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use typomesh::font::FontQuery;
use typomesh::font::db::FontSystem;
use typomesh::font::tessellate::FrontFace;
use typomesh::font::ttf::TtfTypeface;
use typomesh::{PrinterConfig, TextPrinter, TextRun};

fn main() -> anyhow::Result<()> {
    // Keep logging setup in the binary so the library remains unopinionated.
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(font), Some(text)) = (args.next(), args.next()) else {
        bail!("usage: typomesh <font-path|family> <text> [config.toml]");
    };

    let config = match args.next() {
        Some(path) => PrinterConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => PrinterConfig::default(),
    };

    let typeface = load_typeface(&font)?;
    let mut printer = TextPrinter::new(config);
    printer.set_typeface(Arc::new(typeface));

    let chars: Vec<u16> = text.encode_utf16().collect();
    let mut run = TextRun::new();
    printer
        .generate_glyph_runs(&chars, 0, chars.len(), &mut run)
        .context("generating glyph runs")?;

    for (glyph, [x, y]) in run.glyphs().iter().zip(run.positions()) {
        log::info!(
            "glyph {:>5} cluster {:>3} at ({x:.2}, {y:.2}): {} triangles",
            glyph.plan.glyph_index,
            glyph.plan.cluster,
            glyph.mesh.triangle_count()
        );
    }

    let mesh = run.build_mesh(FrontFace::default());
    let bounds = mesh.bounds();
    log::info!(
        "{} glyphs, {} vertices, {} triangles, {} bytes; width {:.2}px; bounds {:?}..{:?}",
        run.len(),
        mesh.positions.len(),
        mesh.triangle_count(),
        mesh.position_bytes().len() + mesh.index_bytes().len(),
        run.width(),
        bounds.min,
        bounds.max
    );
    Ok(())
}

fn load_typeface(font: &str) -> anyhow::Result<TtfTypeface> {
    if Path::new(font).exists() {
        return TtfTypeface::from_path(font, 0).with_context(|| format!("loading {font}"));
    }

    let fonts = FontSystem::new().context("loading system fonts")?;
    let query = FontQuery {
        families: vec![font.to_string()],
        weight: 400,
        italic: false,
    };
    fonts
        .resolve(&query)
        .with_context(|| format!("resolving font family {font:?}"))
}
