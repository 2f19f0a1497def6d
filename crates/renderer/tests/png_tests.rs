//! Tests for PNG encoding on tile-shaped data.

use renderer::png::{encode_auto, encode_rgba};

// ============================================================================
// Helper functions
// ============================================================================

/// Color type byte from the IHDR chunk.
fn color_type(png: &[u8]) -> u8 {
    png[25]
}

/// Horizontal bands of a few index-style colours, like a classified raster.
fn banded_tile(size: usize, bands: &[[u8; 4]]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(size * size * 4);
    for row in 0..size {
        let color = bands[row * bands.len() / size];
        for _ in 0..size {
            pixels.extend_from_slice(&color);
        }
    }
    pixels
}

/// A gradient with more distinct colours than a palette can hold.
fn gradient_tile(size: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(size * size * 4);
    for row in 0..size {
        for col in 0..size {
            pixels.extend_from_slice(&[row as u8, col as u8, (row ^ col) as u8, 255]);
        }
    }
    pixels
}

// ============================================================================
// Format selection
// ============================================================================

#[test]
fn test_banded_tile_is_indexed_and_smaller() {
    let bands = [
        [76, 175, 80, 200],
        [33, 150, 243, 200],
        [158, 158, 158, 200],
        [255, 235, 59, 200],
    ];
    let pixels = banded_tile(256, &bands);

    let indexed = encode_auto(&pixels, 256, 256).unwrap();
    let rgba = encode_rgba(&pixels, 256, 256).unwrap();

    assert_eq!(color_type(&indexed), 3);
    assert_eq!(color_type(&rgba), 6);
    assert!(
        indexed.len() < rgba.len(),
        "indexed {} bytes vs rgba {} bytes",
        indexed.len(),
        rgba.len()
    );
}

#[test]
fn test_gradient_tile_stays_rgba() {
    let pixels = gradient_tile(256);
    let png = encode_auto(&pixels, 256, 256).unwrap();
    assert_eq!(color_type(&png), 6);
}

#[test]
fn test_non_square_dimensions_in_ihdr() {
    let pixels = vec![0u8; 512 * 128 * 4];
    let png = encode_auto(&pixels, 512, 128).unwrap();

    assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 512);
    assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 128);
}

#[test]
fn test_ends_with_iend() {
    let png = encode_auto(&banded_tile(16, &[[1, 2, 3, 4]]), 16, 16).unwrap();
    assert_eq!(&png[png.len() - 12..png.len() - 4], b"\0\0\0\0IEND");
}
