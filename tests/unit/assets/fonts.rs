use super::*;

fn fake_face(family: &str, weight: f32) -> FontFace {
    FontFace {
        family: family.to_owned(),
        weight,
        index: 0,
        bytes: Arc::new(Vec::new()),
        source: format!("{family}-{weight}"),
    }
}

fn book(faces: Vec<FontFace>) -> FontBook {
    FontBook {
        faces,
        fallback_family: None,
    }
}

const TEST_FONT: &str = "tests/data/fonts/DejaVuSans.ttf";

/// Book holding only the vendored test face, plus that face's id.
fn vendored_font() -> (FontBook, FaceId) {
    let mut b = FontBook::new();
    b.register_file(Path::new(TEST_FONT))
        .unwrap_or_else(|e| panic!("vendored test font {TEST_FONT} must load: {e}"));
    let id = b.resolve("DejaVu Sans", 400.0).expect("vendored face resolves").id;
    (b, id)
}

const WHITE: TextBrushRgba8 = TextBrushRgba8 {
    r: 255,
    g: 255,
    b: 255,
    a: 255,
};

#[test]
fn empty_book_resolves_nothing() {
    assert!(FontBook::new().resolve("Inter", 800.0).is_none());
}

#[test]
fn exact_family_is_case_insensitive_and_picks_nearest_weight() {
    let b = book(vec![
        fake_face("Inter", 400.0),
        fake_face("Inter", 700.0),
        fake_face("Inter", 900.0),
        fake_face("Lobster", 400.0),
    ]);
    let r = b.resolve("inter", 800.0).unwrap();
    assert!(!r.substituted);
    assert_eq!(r.face.weight, 700.0);

    let r = b.resolve("\"Lobster\"", 800.0).unwrap();
    assert_eq!(r.face.family, "Lobster");
}

#[test]
fn missing_family_falls_back_to_configured_then_sans_then_anything() {
    let mut b = book(vec![
        fake_face("Lobster", 400.0),
        fake_face("DejaVu Sans", 400.0),
        fake_face("Oswald", 700.0),
    ]);
    let r = b.resolve("Missing Family", 800.0).unwrap();
    assert!(r.substituted);
    assert_eq!(r.face.family, "DejaVu Sans");

    b.set_fallback_family("Oswald");
    let r = b.resolve("Missing Family", 800.0).unwrap();
    assert_eq!(r.face.family, "Oswald");

    let only_display = book(vec![fake_face("Lobster", 400.0)]);
    let r = only_display.resolve("Missing Family", 800.0).unwrap();
    assert!(r.substituted);
    assert_eq!(r.face.family, "Lobster");
}

#[test]
fn generic_sans_serif_is_not_reported_as_substitution() {
    let b = book(vec![fake_face("Roboto", 400.0)]);
    let r = b.resolve("sans-serif", 400.0).unwrap();
    assert!(!r.substituted);
    assert_eq!(r.face.family, "Roboto");
}

#[test]
fn families_are_deduplicated_in_registration_order() {
    let b = book(vec![
        fake_face("B", 400.0),
        fake_face("A", 400.0),
        fake_face("b", 700.0),
    ]);
    assert_eq!(b.families(), vec!["B", "A"]);
}

#[test]
fn load_dir_on_missing_directory_is_zero() {
    let mut b = FontBook::new();
    assert_eq!(b.load_dir(Path::new("does/not/exist")), 0);
    assert!(b.is_empty());
}

#[test]
fn register_garbage_bytes_fails() {
    let mut b = FontBook::new();
    assert!(b.register_bytes(b"not a font".to_vec(), "garbage").is_err());
}

#[test]
fn vendored_font_registers_as_dejavu_sans() {
    let (b, _) = vendored_font();
    assert_eq!(b.families(), vec!["DejaVu Sans"]);
    let r = b.resolve("Inter", 800.0).unwrap();
    assert!(r.substituted);
    assert_eq!(r.face.family, "DejaVu Sans");
}

#[test]
fn shaping_measures_the_line() {
    let (b, id) = vendored_font();
    let mut engine = TextLayoutEngine::new();
    let shaped = engine.layout_line(&b, id, "HI", 100.0, 400.0, WHITE).unwrap();
    assert!(shaped.width > 0.0);
    assert!(shaped.height > 0.0);
    assert!(engine.layout_line(&b, id, "HI", 0.0, 400.0, WHITE).is_err());

    let wide = engine.layout_line(&b, id, "HIHI", 100.0, 400.0, WHITE).unwrap();
    assert!(wide.width > shaped.width * 1.9, "{} vs {}", wide.width, shaped.width);
}

#[test]
fn line_breaks_shape_as_spaces() {
    let (b, id) = vendored_font();
    let mut engine = TextLayoutEngine::new();
    for text in ["A\nB", "A\r\nB", "A\rB"] {
        let shaped = engine.layout_line(&b, id, text, 80.0, 400.0, WHITE).unwrap();
        assert_eq!(shaped.layout.len(), 1, "{text:?}");
        let spaced = engine.layout_line(&b, id, "A B", 80.0, 400.0, WHITE).unwrap();
        assert_eq!(shaped.width, spaced.width, "{text:?}");
    }
}

#[test]
fn single_line_only_allocates_when_needed() {
    assert!(matches!(single_line("plain"), Cow::Borrowed("plain")));
    assert_eq!(single_line("a\r\nb\nc\rd"), "a b c d");
}
