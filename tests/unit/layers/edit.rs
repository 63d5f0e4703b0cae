use serde_json::json;

use super::*;

#[test]
fn key_value_form_matches_camel_case_fields() {
    let attr = LayerAttr::from_key_value("fontSize", json!(120)).unwrap();
    assert_eq!(attr, LayerAttr::FontSize(120.0));
    assert_eq!(attr.key(), "fontSize");

    let attr = LayerAttr::from_key_value("shadowColor", json!("#000")).unwrap();
    assert_eq!(attr, LayerAttr::ShadowColor("#000".to_owned()));
}

#[test]
fn unknown_key_or_wrong_type_is_validation_error() {
    let err = LayerAttr::from_key_value("fontSlant", json!(1)).unwrap_err();
    assert!(matches!(err, VeilError::Validation(_)));

    let err = LayerAttr::from_key_value("fontSize", json!("big")).unwrap_err();
    assert!(err.to_string().contains("fontSize"));
}

#[test]
fn validate_rejects_undrawable_values() {
    assert!(LayerAttr::FontSize(0.0).validate().is_err());
    assert!(LayerAttr::FontSize(f32::NAN).validate().is_err());
    assert!(LayerAttr::FontWeight(0).validate().is_err());
    assert!(LayerAttr::ShadowSize(-1.0).validate().is_err());
    assert!(LayerAttr::Color("not-a-color".to_owned()).validate().is_err());
    assert!(LayerAttr::FontFamily("  ".to_owned()).validate().is_err());

    assert!(LayerAttr::ShadowSize(1e30).validate().is_err());
    assert!(LayerAttr::ShadowSize(LayerAttr::MAX_SHADOW_SIZE + 1.0).validate().is_err());
    assert!(LayerAttr::FontSize(1e30).validate().is_err());
    assert!(LayerAttr::FontSize(f32::INFINITY).validate().is_err());

    assert!(LayerAttr::ShadowSize(LayerAttr::MAX_SHADOW_SIZE).validate().is_ok());
    assert!(LayerAttr::FontSize(LayerAttr::MAX_FONT_SIZE).validate().is_ok());
    assert!(LayerAttr::Color("rgba(0, 0, 0, 0.8)".to_owned()).validate().is_ok());
    assert!(LayerAttr::Rotation(-720.0).validate().is_ok());
}

#[test]
fn opacity_is_clamped_on_apply() {
    let mut layer = TextLayer::with_id(1);
    LayerAttr::Opacity(1.7).apply_to(&mut layer);
    assert_eq!(layer.opacity, 1.0);
    LayerAttr::Opacity(-0.2).apply_to(&mut layer);
    assert_eq!(layer.opacity, 0.0);
}

#[test]
fn layer_geometry_check_names_the_layer() {
    let mut layer = TextLayer::with_id(7);
    assert!(validate_layer_geometry(&layer).is_ok());

    layer.shadow_size = 1e30;
    let err = validate_layer_geometry(&layer).unwrap_err();
    assert!(matches!(err, VeilError::Validation(_)));
    let msg = err.to_string();
    assert!(msg.contains("text layer 7"), "{msg}");
    assert!(msg.contains("shadowSize"), "{msg}");

    let mut layer = TextLayer::with_id(2);
    layer.color = "not-a-color".to_owned();
    assert!(validate_layer_geometry(&layer).is_ok());
}
