use super::*;

fn canvas(width: u32, height: u32) -> Canvas {
    Canvas { width, height }
}

#[test]
fn resize_reallocates_transparent() {
    let mut s = CpuSurface::new(canvas(2, 2)).unwrap();
    s.write_pixels(&RasterImage::filled(2, 2, [9, 9, 9, 9]).unwrap())
        .unwrap();
    s.resize(canvas(3, 1)).unwrap();
    assert_eq!(s.canvas(), canvas(3, 1));
    assert!(s.read_pixels().data().iter().all(|&b| b == 0));
}

#[test]
fn clear_is_clipped_to_surface() {
    let mut s = CpuSurface::new(canvas(3, 2)).unwrap();
    s.write_pixels(&RasterImage::filled(3, 2, [1, 2, 3, 4]).unwrap())
        .unwrap();
    s.clear(PixelRect {
        x: 2,
        y: 1,
        width: 10,
        height: 10,
    });
    let px = s.read_pixels();
    assert_eq!(px.pixel(2, 1), Some([0, 0, 0, 0]));
    assert_eq!(px.pixel(1, 1), Some([1, 2, 3, 4]));
    assert_eq!(px.pixel(2, 0), Some([1, 2, 3, 4]));
}

#[test]
fn draw_same_size_onto_cleared_surface_copies_visible_pixels() {
    let img = RasterImage::from_raw(2, 1, vec![10, 20, 30, 255, 40, 50, 60, 0]).unwrap();
    let mut s = CpuSurface::new(canvas(2, 1)).unwrap();
    s.clear(PixelRect::from_canvas(s.canvas()));
    s.draw_image_scaled(&img, 2, 1).unwrap();
    let px = s.read_pixels();
    assert_eq!(px.pixel(0, 0), Some([10, 20, 30, 255]));
    // Fully transparent source pixels read back as transparent black.
    assert_eq!(px.pixel(1, 0), Some([0, 0, 0, 0]));
}

#[test]
fn draw_scaled_solid_stays_solid() {
    let img = RasterImage::filled(3, 2, [200, 100, 50, 255]).unwrap();
    let mut s = CpuSurface::new(canvas(9, 6)).unwrap();
    s.draw_image_scaled(&img, 9, 6).unwrap();
    assert!(
        s.read_pixels()
            .data()
            .chunks_exact(4)
            .all(|px| px == [200, 100, 50, 255])
    );
}

#[test]
fn draw_larger_than_surface_is_clipped() {
    let img = RasterImage::filled(4, 4, [5, 6, 7, 255]).unwrap();
    let mut s = CpuSurface::new(canvas(2, 2)).unwrap();
    s.draw_image_scaled(&img, 4, 4).unwrap();
    assert_eq!(s.read_pixels(), RasterImage::filled(2, 2, [5, 6, 7, 255]).unwrap());
}

#[test]
fn write_pixels_requires_matching_size() {
    let mut s = CpuSurface::new(canvas(2, 2)).unwrap();
    assert!(
        s.write_pixels(&RasterImage::new(1, 1).unwrap())
            .is_err()
    );
}
