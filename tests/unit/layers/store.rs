use std::collections::HashSet;

use super::*;

fn assert_unique_ids(store: &LayerStore) {
    let ids = store.ids();
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len(), "duplicate ids in {ids:?}");
}

#[test]
fn add_on_empty_store_yields_id_1_with_defaults() {
    let mut store = LayerStore::new();
    let layer = store.add().clone();
    assert_eq!(layer.id, 1);
    assert_eq!(layer.text, "edit");
    assert_eq!(layer.font_family, "Inter");
    assert_eq!(layer.font_size, 200.0);
    assert_eq!(layer.font_weight, 800);
    assert_eq!(layer.color, "white");
    assert_eq!(layer.opacity, 1.0);
    assert_eq!(layer.shadow_color, "rgba(0, 0, 0, 0.8)");
    assert_eq!(layer.shadow_size, 4.0);
    assert_eq!((layer.top, layer.left, layer.rotation), (0.0, 0.0, 0.0));
}

#[test]
fn add_after_gap_uses_max_plus_one() {
    let mut store = LayerStore::new();
    store.add();
    store.add();
    store.add();
    store.remove(2);
    assert_eq!(store.ids(), vec![1, 3]);
    assert_eq!(store.add().id, 4);
}

#[test]
fn duplicate_copies_every_field_but_id() {
    let mut store = LayerStore::new();
    store.add();
    store
        .set_attribute(1, LayerAttr::Text("HELLO".to_owned()))
        .unwrap();
    store.set_attribute(1, LayerAttr::Rotation(-12.5)).unwrap();
    store
        .set_attribute(1, LayerAttr::ShadowColor("#ff000080".to_owned()))
        .unwrap();

    let original = store.get(1).unwrap().clone();
    let copy = store.duplicate(1).unwrap().clone();
    assert_eq!(copy.id, 2);
    assert_eq!(TextLayer { id: original.id, ..copy }, original);
    assert_eq!(store.ids(), vec![1, 2]);
}

#[test]
fn duplicate_of_missing_id_is_none() {
    let mut store = LayerStore::new();
    assert!(store.duplicate(9).is_none());
    assert!(store.is_empty());
}

#[test]
fn set_attribute_on_missing_id_reports_and_leaves_store_untouched() {
    let mut store = LayerStore::new();
    store.add();
    let before = store.clone();
    let err = store.set_attribute(42, LayerAttr::Top(10.0)).unwrap_err();
    assert!(matches!(err, VeilError::NoSuchLayer(42)));
    assert_eq!(store, before);
}

#[test]
fn set_attribute_by_name_updates_matching_record_only() {
    let mut store = LayerStore::new();
    store.add();
    store.add();
    store
        .set_attribute_by_name(2, "left", serde_json::json!(25))
        .unwrap();
    assert_eq!(store.get(1).unwrap().left, 0.0);
    assert_eq!(store.get(2).unwrap().left, 25.0);
}

#[test]
fn remove_missing_id_is_noop() {
    let mut store = LayerStore::new();
    store.add();
    assert!(store.remove(5).is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn ids_stay_unique_over_mixed_sequences() {
    let mut store = LayerStore::new();
    for step in 0u32..200 {
        match step % 5 {
            0 | 1 => {
                store.add();
            }
            2 => {
                if let Some(&id) = store.ids().first() {
                    store.duplicate(id);
                }
            }
            3 => {
                let ids = store.ids();
                if !ids.is_empty() {
                    store.remove(ids[(step as usize * 7) % ids.len()]);
                }
            }
            _ => {
                let ids = store.ids();
                if let Some(&id) = ids.last() {
                    let layer = store.get(id).unwrap().clone();
                    store.duplicate_layer(&layer);
                }
            }
        }
        assert_unique_ids(&store);
    }
}

#[test]
fn deserialize_rejects_duplicate_ids() {
    let json = r#"[{"id": 1, "text": "a"}, {"id": 1, "text": "b"}]"#;
    assert!(serde_json::from_str::<LayerStore>(json).is_err());

    let json = r#"[{"id": 3, "text": "a"}, {"id": 1}]"#;
    let store: LayerStore = serde_json::from_str(json).unwrap();
    assert_eq!(store.ids(), vec![3, 1]);
    assert_eq!(store.get(1).unwrap().text, "edit");
}

#[test]
fn loading_rejects_out_of_range_layers() {
    let mut huge_shadow = TextLayer::with_id(1);
    huge_shadow.shadow_size = 1e30;
    assert!(LayerStore::from_layers(vec![huge_shadow]).is_err());

    let json = r#"[{"id": 1, "fontSize": 1e30}]"#;
    assert!(serde_json::from_str::<LayerStore>(json).is_err());

    let json = r#"[{"id": 1, "shadowSize": 1e30}]"#;
    let err = serde_json::from_str::<LayerStore>(json).unwrap_err();
    assert!(err.to_string().contains("shadowSize"), "{err}");

    let json = r#"[{"id": 1, "shadowSize": 12, "color": "chartreuse"}]"#;
    assert!(serde_json::from_str::<LayerStore>(json).is_ok());
}

#[test]
fn serialized_layers_use_camel_case_keys() {
    let mut store = LayerStore::new();
    store.add();
    let v = serde_json::to_value(&store).unwrap();
    assert_eq!(v[0]["fontFamily"], "Inter");
    assert_eq!(v[0]["shadowSize"], 4.0);
}
