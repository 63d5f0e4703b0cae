use std::io::Cursor;

use super::*;
use crate::{
    foundation::error::VeilError,
    pipeline::image::{CutoutState, SourceImage},
};

fn png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

struct Fixed(Vec<u8>);

impl BackgroundRemover for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn remove_background(&self, _source: &SourceImage) -> VeilResult<Vec<u8>> {
        Ok(self.0.clone())
    }
}

fn session() -> EditorSession {
    EditorSession::new(Arc::new(FontBook::new()))
}

fn upload(s: &mut EditorSession, w: u32, h: u32) -> bool {
    s.dispatch(EditorAction::Upload(ImageFile::new(
        "photo.png",
        png(w, h, [50, 60, 70, 255]),
    )))
}

#[test]
fn export_without_image_is_none() {
    let mut s = session();
    assert!(s.export(ExportFormat::Png).unwrap().is_none());
    assert!(s.render_preview(100).unwrap().is_none());
}

#[test]
fn export_to_dir_without_image_writes_nothing() {
    let dir = std::env::temp_dir().join(format!("veil-session-none-{}", std::process::id()));
    let mut s = session();
    assert!(s.export_to_dir(ExportFormat::Png, &dir).unwrap().is_none());
    assert!(!dir.join("text-behind-image.png").exists());
}

#[test]
fn layer_actions_bump_revision_only_on_change() {
    let mut s = session();
    assert_eq!(s.revision(), 0);
    assert!(s.dispatch(EditorAction::AddLayer));
    assert!(s.dispatch(EditorAction::AddLayer));
    assert_eq!(s.layers().ids(), vec![1, 2]);
    assert_eq!(s.revision(), 2);

    assert!(!s.dispatch(EditorAction::SetAttribute {
        id: 99,
        attr: LayerAttr::Text("x".to_owned()),
    }));
    assert!(!s.dispatch(EditorAction::DuplicateLayer(99)));
    assert!(!s.dispatch(EditorAction::RemoveLayer(99)));
    assert_eq!(s.revision(), 2);

    assert!(s.dispatch(EditorAction::SetAttributeByName {
        id: 1,
        key: "fontSize".to_owned(),
        value: serde_json::json!(120),
    }));
    assert_eq!(s.layers().get(1).unwrap().font_size, 120.0);

    assert!(s.dispatch(EditorAction::DuplicateLayer(1)));
    assert_eq!(s.layers().get(3).unwrap().font_size, 120.0);

    assert!(s.dispatch(EditorAction::RemoveLayer(2)));
    assert_eq!(s.layers().ids(), vec![1, 3]);
    assert_eq!(s.snapshot().len(), 2);
}

#[test]
fn invalid_attribute_value_is_ignored() {
    let mut s = session();
    s.dispatch(EditorAction::AddLayer);
    let before = s.snapshot();
    assert!(!s.dispatch(EditorAction::SetAttributeByName {
        id: 1,
        key: "fontSize".to_owned(),
        value: serde_json::json!("huge"),
    }));
    assert!(!s.dispatch(EditorAction::SetAttribute {
        id: 1,
        attr: LayerAttr::Color("not-a-color".to_owned()),
    }));
    assert_eq!(s.snapshot(), before);
}

#[test]
fn upload_without_remover_completes_setup() {
    let mut s = session();
    assert!(upload(&mut s, 20, 10));
    assert_eq!(s.pipeline().state(), CutoutState::Unavailable);
    let out = s.export(ExportFormat::Png).unwrap().unwrap();
    assert_eq!((out.width, out.height), (20, 10));
    assert_eq!(out.file_name, "text-behind-image.png");
}

#[test]
fn rejected_upload_changes_nothing() {
    let mut s = session();
    assert!(!s.dispatch(EditorAction::Upload(ImageFile::new("x.bmp", b"BM..".to_vec()))));
    assert_eq!(s.revision(), 0);
    assert_eq!(s.pipeline().state(), CutoutState::Idle);
}

#[test]
fn export_waits_for_background_removal() {
    let mut s = session().with_remover(Arc::new(Fixed(png(20, 10, [0, 0, 0, 0]))));
    upload(&mut s, 20, 10);
    assert!(s.has_pending_cutout());
    assert!(!s.pipeline().is_setup_done());
    assert!(s.export(ExportFormat::Png).unwrap().is_none());

    assert!(s.wait_for_cutout());
    assert!(!s.has_pending_cutout());
    assert_eq!(s.pipeline().state(), CutoutState::Ready);
    assert!(s.export(ExportFormat::Jpeg).unwrap().is_some());
}

#[test]
fn stale_settle_is_not_a_change() {
    let mut s = session();
    upload(&mut s, 4, 4);
    let old = s.pipeline().current_ticket().unwrap();
    upload(&mut s, 4, 4);
    let rev = s.revision();
    assert!(!s.dispatch(EditorAction::SettleCutout {
        ticket: old,
        result: Err(VeilError::removal("late")),
    }));
    assert_eq!(s.revision(), rev);
}

#[test]
fn preview_is_cached_per_revision_and_width() {
    let mut s = session();
    upload(&mut s, 40, 20);
    let a = s.render_preview(20).unwrap().unwrap();
    let b = s.render_preview(20).unwrap().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!((a.width, a.height), (20, 10));

    let c = s.render_preview(10).unwrap().unwrap();
    assert!(!Arc::ptr_eq(&a, &c));

    s.dispatch(EditorAction::AddLayer);
    let d = s.render_preview(10).unwrap().unwrap();
    assert!(!Arc::ptr_eq(&c, &d));
}

#[test]
fn export_writes_fixed_file_name() {
    let dir = std::env::temp_dir().join(format!("veil-session-export-{}", std::process::id()));
    let mut s = session();
    upload(&mut s, 8, 8);
    let path = s.export_to_dir(ExportFormat::Jpeg, &dir).unwrap().unwrap();
    assert_eq!(path.file_name().unwrap(), "text-behind-image.jpg");
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
    let _ = std::fs::remove_dir_all(&dir);
}
