//! End-to-end: text → breaker → layout → glyph meshes → assembled mesh.

use std::sync::Arc;

use ttf_parser::OutlineBuilder;
use typomesh::font::{GlyphAdjustment, GlyphIndex, PairAdjustment};
use typomesh::font::memory::{MemoryTypeface, rect};
use typomesh::font::outline::HintTechnique;
use typomesh::font::tessellate::FrontFace;
use typomesh::gsub::{
    DEFAULT_SCRIPT, FeatureRecord, LangSys, LayoutTable, LigatureSubstitution, Lookup,
    LookupSubtable, ScriptRecord, tag_from_str,
};
use typomesh::text_break::BreakOptions;
use typomesh::{PrinterConfig, TextPrinter, TextRun, Typeface, WordBreaker, WordKind};

const A: GlyphIndex = 1;
const ONE: GlyphIndex = 2;
const TWO: GlyphIndex = 3;
const THREE: GlyphIndex = 4;
const O: GlyphIndex = 6;
const A1_LIGATURE: GlyphIndex = 7;

fn liga_table() -> LayoutTable {
    let mut liga = LigatureSubstitution::new();
    liga.insert(vec![A, ONE], A1_LIGATURE);
    LayoutTable {
        scripts: vec![ScriptRecord {
            tag: DEFAULT_SCRIPT,
            default_language: Some(LangSys {
                tag: tag_from_str("dflt"),
                required_feature: None,
                feature_indices: vec![0],
            }),
            languages: vec![],
        }],
        features: vec![FeatureRecord {
            tag: tag_from_str("liga"),
            lookup_indices: vec![0],
        }],
        lookups: vec![Lookup {
            subtables: vec![LookupSubtable::ManyToOne(liga)],
        }],
    }
}

fn face() -> Arc<dyn Typeface> {
    Arc::new(
        MemoryTypeface::builder(1000)
            .glyph('A', 600, |b| {
                b.move_to(0.0, 0.0);
                b.line_to(600.0, 0.0);
                b.line_to(300.0, 700.0);
                b.close();
            })
            .glyph('1', 500, |b| rect(b, 200.0, 0.0, 300.0, 700.0))
            .glyph('2', 500, |b| rect(b, 100.0, 0.0, 400.0, 700.0))
            .glyph('3', 500, |b| rect(b, 100.0, 0.0, 400.0, 700.0))
            .empty_glyph(' ', 250)
            .glyph('O', 700, |b| {
                // Curved outer contour with a square hole.
                b.move_to(350.0, 0.0);
                b.quad_to(650.0, 0.0, 650.0, 350.0);
                b.quad_to(650.0, 700.0, 350.0, 700.0);
                b.quad_to(50.0, 700.0, 50.0, 350.0);
                b.quad_to(50.0, 0.0, 350.0, 0.0);
                b.close();
                b.move_to(250.0, 250.0);
                b.line_to(250.0, 450.0);
                b.line_to(450.0, 450.0);
                b.line_to(450.0, 250.0);
                b.close();
            })
            .unmapped_glyph(1100, |b| rect(b, 0.0, 0.0, 1000.0, 700.0))
            .gsub(liga_table())
            .build(),
    )
}

fn utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn printer(config: PrinterConfig) -> TextPrinter {
    let mut printer = TextPrinter::new(config);
    printer.set_typeface(face());
    printer
}

fn glyph_ids(run: &TextRun) -> Vec<GlyphIndex> {
    run.glyphs().iter().map(|g| g.plan.glyph_index).collect()
}

#[test]
fn number_after_text_splits_groups_and_skips_ligature() {
    let mut printer = printer(PrinterConfig {
        break_options: BreakOptions {
            break_number_after_text: true,
            ..BreakOptions::default()
        },
        ..PrinterConfig::default()
    });
    let text = utf16("A123");
    let mut run = TextRun::new();
    printer.generate_glyph_runs(&text, 0, 4, &mut run).unwrap();
    assert_eq!(glyph_ids(&run), [A, ONE, TWO, THREE]);

    let mut layout = typomesh::GlyphLayout::new();
    layout.set_typeface(face());
    layout.set_break_options(BreakOptions {
        break_number_after_text: true,
        ..BreakOptions::default()
    });
    let out = layout.layout(&text, 0, 4).unwrap();
    assert_eq!(out.groups.len(), 2);
    assert_eq!(out.groups[0].kind, WordKind::Text);
    assert_eq!(out.groups[0].char_range, 0..1);
    assert_eq!(out.groups[1].kind, WordKind::Number);
    assert_eq!(out.groups[1].char_range, 1..4);
    assert_eq!(out.plans.len(), 4);
}

#[test]
fn ligature_forms_when_text_and_number_share_a_segment() {
    let mut printer = printer(PrinterConfig::default());
    let mut run = TextRun::new();
    printer.generate_glyph_runs(&utf16("A123"), 0, 4, &mut run).unwrap();
    assert_eq!(glyph_ids(&run), [A1_LIGATURE, TWO, THREE]);
    assert_eq!(run.glyphs()[1].plan.cluster, 2);
}

#[test]
fn feature_toggles_from_toml_disable_ligatures() {
    let config = PrinterConfig::from_toml_str(r#"features = ["-liga"]"#).unwrap();
    let mut printer = printer(config);
    let mut run = TextRun::new();
    printer.generate_glyph_runs(&utf16("A1"), 0, 2, &mut run).unwrap();
    assert_eq!(glyph_ids(&run), [A, ONE]);
}

#[test]
fn each_glyph_is_built_once_per_scope() {
    let mut printer = printer(PrinterConfig::default());
    let text = utf16("O3 O3 A");
    let mut run = TextRun::new();
    printer.generate_glyph_runs(&text, 0, text.len(), &mut run).unwrap();
    // O, 3, space, A
    assert_eq!(printer.store().build_count(), 4);
    let first_o = Arc::clone(&run.glyphs()[0].mesh);
    assert!(Arc::ptr_eq(&first_o, &run.glyphs()[3].mesh));

    printer.generate_glyph_runs(&text, 0, text.len(), &mut run).unwrap();
    assert_eq!(printer.store().build_count(), 4);
    assert!(Arc::ptr_eq(&first_o, &run.glyphs()[0].mesh));

    // Unscaled meshes are shared across sizes.
    printer.set_font_size(48.0);
    printer.generate_glyph_runs(&text, 0, text.len(), &mut run).unwrap();
    assert_eq!(printer.store().build_count(), 4);

    // Unscaled meshes are never hinted, so the hint does not split them.
    printer.set_hint(HintTechnique::TrueTypeInstruction);
    printer.generate_glyph_runs(&text, 0, text.len(), &mut run).unwrap();
    assert_eq!(printer.store().build_count(), 4);
    assert!(Arc::ptr_eq(&first_o, &run.glyphs()[0].mesh));
}

#[test]
fn hinting_changes_the_scope_of_sized_meshes() {
    let mut printer = printer(PrinterConfig {
        scale_at_assembly: false,
        ..PrinterConfig::default()
    });
    let text = utf16("O3 O3 A");
    let mut run = TextRun::new();
    printer.generate_glyph_runs(&text, 0, text.len(), &mut run).unwrap();
    assert_eq!(printer.store().build_count(), 4);
    let plain_o = Arc::clone(&run.glyphs()[0].mesh);

    printer.set_hint(HintTechnique::TrueTypeInstruction);
    printer.generate_glyph_runs(&text, 0, text.len(), &mut run).unwrap();
    assert_eq!(printer.store().build_count(), 8);
    assert!(!Arc::ptr_eq(&plain_o, &run.glyphs()[0].mesh));
}

#[test]
fn pair_positioning_places_glyphs_in_the_assembled_mesh() {
    // Only a `latn` script: the default script resolves to it.
    let gpos = LayoutTable {
        scripts: vec![ScriptRecord {
            tag: tag_from_str("latn"),
            default_language: Some(LangSys {
                tag: tag_from_str("dflt"),
                required_feature: None,
                feature_indices: vec![0],
            }),
            languages: vec![],
        }],
        features: vec![FeatureRecord {
            tag: tag_from_str("kern"),
            lookup_indices: vec![0],
        }],
        lookups: vec![Lookup::default()],
    };
    let lift = PairAdjustment {
        first: GlyphAdjustment {
            x_advance: -100,
            ..GlyphAdjustment::default()
        },
        second: GlyphAdjustment {
            y_placement: 100,
            ..GlyphAdjustment::default()
        },
    };
    let face: Arc<dyn Typeface> = Arc::new(
        MemoryTypeface::builder(1000)
            .glyph('1', 500, |b| rect(b, 200.0, 0.0, 300.0, 700.0))
            .glyph('A', 600, |b| rect(b, 0.0, 0.0, 600.0, 700.0))
            .gpos(gpos)
            .pair_positioning(0, '1', 'A', lift)
            .build(),
    );

    // 75pt at 1000 upm: 0.1 px per unit.
    let mut printer = TextPrinter::new(PrinterConfig {
        font_size_pt: 75.0,
        ..PrinterConfig::default()
    });
    printer.set_typeface(face);
    let text = utf16("1A");
    let mut run = TextRun::new();
    printer.generate_glyph_runs(&text, 0, text.len(), &mut run).unwrap();

    let positions = run.positions();
    assert!((positions[1][0] - 40.0).abs() < 1e-3);
    assert!((positions[1][1] - 10.0).abs() < 1e-3);
    assert!((run.width() - 100.0).abs() < 1e-3);

    let mesh = run.build_mesh(FrontFace::CounterClockwise);
    let second_glyph = &mesh.positions[run.glyphs()[0].mesh.vertex_count..];
    let lowest = second_glyph.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min);
    assert!((lowest - 10.0).abs() < 1e-3);
}

#[test]
fn pipeline_is_deterministic() {
    let config = PrinterConfig {
        scale_at_assembly: false,
        font_size_pt: 30.0,
        tolerance: 0.05,
        ..PrinterConfig::default()
    };
    let text = utf16("OA 12");
    let mesh_of = |config: PrinterConfig| {
        let mut printer = printer(config);
        let mut run = TextRun::new();
        printer.generate_glyph_runs(&text, 0, text.len(), &mut run).unwrap();
        run.build_mesh(FrontFace::CounterClockwise)
    };
    let a = mesh_of(config.clone());
    let b = mesh_of(config);
    assert!(a.triangle_count() > 0);
    assert_eq!(a.positions, b.positions);
    assert_eq!(a.indices, b.indices);
}

#[test]
fn hole_is_left_unfilled() {
    let mut printer = printer(PrinterConfig {
        tolerance: 0.5,
        ..PrinterConfig::default()
    });
    let mut run = TextRun::new();
    printer.generate_glyph_runs(&utf16("O"), 0, 1, &mut run).unwrap();
    let mesh = &run.glyphs()[0].mesh;

    let area: f32 = mesh
        .tess_data
        .chunks_exact(6)
        .map(|t| ((t[2] - t[0]) * (t[5] - t[1]) - (t[4] - t[0]) * (t[3] - t[1])).abs() / 2.0)
        .sum();
    // The quadratic "circle" covers a bit less than its 600x700 box;
    // the hole removes 200x200.
    assert!(area < 600.0 * 700.0 - 200.0 * 200.0);
    assert!(area > 0.6 * 600.0 * 700.0);

    let bounds = mesh.control.bounds;
    assert!((bounds.min[0] - 50.0).abs() < 1e-3);
    assert!((bounds.max[1] - 700.0).abs() < 1e-3);
}

#[test]
fn empty_and_unpaired_input_degrade_gracefully() {
    let mut printer = printer(PrinterConfig::default());
    let mut run = TextRun::new();
    printer.generate_glyph_runs(&[], 0, 0, &mut run).unwrap();
    assert!(run.is_empty());
    assert_eq!(run.build_mesh(FrontFace::default()).triangle_count(), 0);

    // No U+FFFD glyph in this face: the lone surrogate lands on .notdef.
    let text = [0xDC00, 'A' as u16];
    printer.generate_glyph_runs(&text, 0, 2, &mut run).unwrap();
    assert_eq!(glyph_ids(&run), [0, A]);
    assert!(run.glyphs()[0].mesh.is_empty());
    assert!(run.triangle_count() > 0);
}

#[test]
fn breaker_segments_reconstitute_the_input() {
    let text = "We are #1 at 3.14, e.g. 1337 5P34K!\t\tdone\r\n😂👩\u{200D}👩";
    let units = utf16(text);
    let breaker = WordBreaker::default();

    let mut next = 0;
    let mut rebuilt = Vec::new();
    for seg in breaker.breaks(&units) {
        assert_eq!(seg.start, next);
        assert!(seg.len > 0);
        next = seg.end();
        rebuilt.extend_from_slice(&units[seg.range()]);
    }
    assert_eq!(rebuilt, units);
}
