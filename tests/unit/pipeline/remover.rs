use std::sync::Arc;

use super::*;
use crate::assets::decode::{DecodedImage, SourceFormat};

fn source(bytes: Vec<u8>) -> SourceImage {
    SourceImage {
        name: "photo.png".to_owned(),
        bytes: Arc::new(bytes),
        format: SourceFormat::Png,
        decoded: DecodedImage {
            width: 1,
            height: 1,
            rgba8_premul: Arc::new(vec![0, 0, 0, 255]),
        },
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("veil-remover-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn file_cutout_returns_file_bytes() {
    let dir = scratch_dir("file");
    let path = dir.join("cut.png");
    std::fs::write(&path, b"cutout-bytes").unwrap();

    let remover = FileCutout::new(&path);
    assert_eq!(remover.name(), "file");
    assert_eq!(
        remover.remove_background(&source(vec![1, 2, 3])).unwrap(),
        b"cutout-bytes"
    );
}

#[test]
fn file_cutout_missing_file_is_removal_error() {
    let remover = FileCutout::new("/definitely/not/here/cut.png");
    let err = remover.remove_background(&source(vec![])).unwrap_err();
    assert!(matches!(err, VeilError::Removal(_)));
}

#[test]
fn missing_program_is_removal_error() {
    let remover = CommandRemover::new("veil-no-such-program-xyz", vec!["{input}".to_owned()]);
    let err = remover.remove_background(&source(vec![1])).unwrap_err();
    assert!(matches!(err, VeilError::Removal(_)));
}

#[cfg(unix)]
#[test]
fn command_placeholders_are_substituted() {
    let remover = CommandRemover::new(
        "cp",
        vec!["{input}".to_owned(), "{output}".to_owned()],
    );
    let out = remover.remove_background(&source(b"same bytes".to_vec())).unwrap();
    assert_eq!(out, b"same bytes");
}

#[cfg(unix)]
#[test]
fn command_without_output_placeholder_reads_stdout() {
    let remover = CommandRemover::new("cat", vec!["{input}".to_owned()]);
    let out = remover.remove_background(&source(b"piped".to_vec())).unwrap();
    assert_eq!(out, b"piped");
}

#[cfg(unix)]
#[test]
fn failing_command_reports_status() {
    let remover = CommandRemover::new("false", vec![]);
    let err = remover.remove_background(&source(vec![1])).unwrap_err();
    assert!(err.to_string().contains("failed"));
}

#[cfg(feature = "remove-bg")]
#[test]
fn remove_bg_from_env_requires_key() {
    let err = RemoveBgApi::from_env("VEIL_TEST_UNSET_REMOVEBG_KEY_VAR").unwrap_err();
    assert!(matches!(err, VeilError::Validation(_)));
}

#[cfg(feature = "remove-bg")]
#[test]
fn remove_bg_debug_hides_key() {
    let api = RemoveBgApi::new("secret-key").with_size("full");
    let dbg = format!("{api:?}");
    assert!(!dbg.contains("secret-key"));
    assert!(dbg.contains("full"));
}
