use super::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn parses_hex_short_and_long_forms() {
    assert_eq!(parse_css_color("#f00").unwrap(), CssColor::rgba(1.0, 0.0, 0.0, 1.0));
    assert_eq!(
        parse_css_color("#FF0000").unwrap(),
        CssColor::rgba(1.0, 0.0, 0.0, 1.0)
    );

    let c = parse_css_color("#0000ff80").unwrap();
    assert!(close(c.b, 1.0));
    assert!(close(c.a, 128.0 / 255.0));

    let c = parse_css_color("#0f08").unwrap();
    assert!(close(c.g, 1.0));
    assert!(close(c.a, 136.0 / 255.0));
}

#[test]
fn parses_rgba_with_commas_spaces_and_percentages() {
    let c = parse_css_color("rgba(0, 0, 0, 0.8)").unwrap();
    assert_eq!(c, CssColor::rgba(0.0, 0.0, 0.0, 0.8));

    let c = parse_css_color("rgb(255 128 0 / 50%)").unwrap();
    assert!(close(c.r, 1.0));
    assert!(close(c.g, 128.0 / 255.0));
    assert!(close(c.a, 0.5));

    let c = parse_css_color("rgb(100%, 0%, 0%)").unwrap();
    assert_eq!(c, CssColor::rgba(1.0, 0.0, 0.0, 1.0));
}

#[test]
fn parses_hsl() {
    let c = parse_css_color("hsl(0, 100%, 50%)").unwrap();
    assert!(close(c.r, 1.0));
    assert!(close(c.g, 0.0));
    assert!(close(c.b, 0.0));

    let c = parse_css_color("hsla(120deg 100% 25% / 0.5)").unwrap();
    assert!(close(c.g, 0.5));
    assert!(close(c.a, 0.5));
}

#[test]
fn parses_named_colors_case_insensitively() {
    assert_eq!(parse_css_color("White").unwrap().to_rgba8(), [255, 255, 255, 255]);
    assert!(parse_css_color("transparent").unwrap().is_transparent());
    assert_eq!(parse_css_color("orange").unwrap().to_rgba8(), [255, 165, 0, 255]);
}

#[test]
fn rejects_garbage() {
    for bad in ["", "#12", "#ggg", "rgb(1,2)", "rgba(a,b,c)", "blurple", "hsl(1,2)"] {
        let err = parse_css_color(bad).unwrap_err();
        assert!(matches!(err, VeilError::Validation(_)), "{bad}");
    }
}

#[test]
fn rgba8_rounds_straight_alpha() {
    let c = parse_css_color("rgba(255, 255, 255, 0.5)").unwrap();
    assert_eq!(c.to_rgba8(), [255, 255, 255, 128]);
    assert!(!c.is_transparent());
    assert!(parse_css_color("rgba(0, 0, 0, 0.001)").unwrap().is_transparent());
}
