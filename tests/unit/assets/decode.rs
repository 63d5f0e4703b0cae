use std::io::Cursor;

use super::*;

fn encode(img: image::DynamicImage, format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

#[test]
fn decode_png_dimensions_and_premul() {
    let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
    let img = image::RgbaImage::from_raw(1, 1, src_rgba).unwrap();
    let buf = encode(image::DynamicImage::ImageRgba8(img), image::ImageFormat::Png);

    assert_eq!(sniff_format(&buf).unwrap(), SourceFormat::Png);
    let decoded = decode_source(&buf, SourceFormat::Png).unwrap();
    assert_eq!((decoded.width, decoded.height), (1, 1));
    assert_eq!(
        decoded.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn jpeg_and_gif_are_accepted() {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        4,
        3,
        image::Rgb([10, 20, 30]),
    ));
    let jpeg = encode(img.clone(), image::ImageFormat::Jpeg);
    assert_eq!(sniff_format(&jpeg).unwrap(), SourceFormat::Jpeg);
    let decoded = decode_source(&jpeg, SourceFormat::Jpeg).unwrap();
    assert_eq!((decoded.width, decoded.height), (4, 3));
    assert!(decoded.rgba8_premul.chunks_exact(4).all(|px| px[3] == 255));

    let gif = encode(
        image::DynamicImage::ImageRgba8(img.to_rgba8()),
        image::ImageFormat::Gif,
    );
    assert_eq!(sniff_format(&gif).unwrap(), SourceFormat::Gif);
}

#[test]
fn sniff_rejects_unsupported_and_garbage() {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
    let bmp = encode(img, image::ImageFormat::Bmp);
    assert!(matches!(sniff_format(&bmp), Err(VeilError::Decode(_))));
    assert!(sniff_format(b"definitely not an image").is_err());
}

#[test]
fn truncated_png_fails_to_decode() {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
    let png = encode(img, image::ImageFormat::Png);
    assert!(decode_image(&png[..png.len() / 2]).is_err());
}
