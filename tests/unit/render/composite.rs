use super::*;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_half_opacity_blends() {
    let dst = [0, 0, 0, 255];
    let src = [255, 255, 255, 255];
    let out = over(dst, src, 0.5);
    assert_eq!(out[3], 255);
    assert!((127..=129).contains(&out[0]));
}

#[test]
fn over_in_place_checks_lengths() {
    let mut dst = vec![0u8; 8];
    assert!(over_in_place(&mut dst, &[0u8; 4], 1.0).is_err());
    let src = [9u8, 9, 9, 255, 0, 0, 0, 0];
    over_in_place(&mut dst, &src, 1.0).unwrap();
    assert_eq!(dst, vec![9, 9, 9, 255, 0, 0, 0, 0]);
}

#[test]
fn unpremultiply_restores_straight_channels() {
    let premul = [64u8, 0, 32, 128, 5, 5, 5, 0, 10, 20, 30, 255];
    let straight = unpremultiply_rgba8(&premul);
    assert_eq!(&straight[0..4], &[128, 0, 64, 128]);
    assert_eq!(&straight[4..8], &[0, 0, 0, 0]);
    assert_eq!(&straight[8..12], &[10, 20, 30, 255]);
}
