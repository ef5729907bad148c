use pollster::block_on;

use super::*;
use crate::assets::source::MemoryImageSource;

const BASE: &str = "products/wallet.png";
const PATTERN: &str = "patterns/dots.png";

fn small_opts() -> EngineOpts {
    EngineOpts {
        sizer: SizerOpts {
            max_width: 32.0,
            viewport_fraction: 0.8,
            max_height: 20.0,
        },
        tile: TileOpts {
            base_pattern_size: 8.0,
        },
        ..EngineOpts::default()
    }
}

fn source_with(base: RasterImage, pattern: RasterImage) -> MemoryImageSource {
    let mut src = MemoryImageSource::new();
    src.insert_raster(BASE, base);
    src.insert_raster(PATTERN, pattern);
    src
}

fn solid_engine(base_rgba: [u8; 4], pattern_rgba: [u8; 4]) -> CompositeEngine<MemoryImageSource> {
    let src = source_with(
        RasterImage::filled(32, 20, base_rgba).unwrap(),
        RasterImage::filled(4, 4, pattern_rgba).unwrap(),
    );
    CompositeEngine::new(src, small_opts()).unwrap()
}

fn half_transparent_base() -> RasterImage {
    let mut base = RasterImage::filled(32, 20, [90, 60, 30, 255]).unwrap();
    for px in base.data_mut().chunks_exact_mut(4).step_by(3) {
        px.copy_from_slice(&[17, 34, 51, 0]);
    }
    base
}

#[test]
fn empty_engine_has_no_output() {
    let mut eng = solid_engine([0, 0, 0, 255], [0, 0, 0, 255]);
    assert_eq!(block_on(eng.composite()).unwrap(), EnginePhase::Empty);
    assert!(eng.current().is_none());
    assert_eq!(block_on(eng.set_pattern(PATTERN)).unwrap(), EnginePhase::Empty);
    assert!(eng.current().is_none());
}

#[test]
fn base_only_draws_base_at_sized_canvas() {
    let mut eng = solid_engine([10, 20, 30, 255], [200, 200, 200, 255]);
    assert_eq!(block_on(eng.set_base_image(BASE)).unwrap(), EnginePhase::BaseOnly);
    let out = eng.current().unwrap();
    assert_eq!((out.width(), out.height()), (32, 20));
    assert_eq!(out, &RasterImage::filled(32, 20, [10, 20, 30, 255]).unwrap());
}

#[test]
fn solid_layers_blend_per_mode() {
    let mut eng = solid_engine([100, 100, 100, 255], [200, 200, 200, 255]);
    block_on(eng.set_base_image(BASE)).unwrap();
    block_on(eng.set_blend_mode(BlendMode::Overlay)).unwrap();
    assert_eq!(block_on(eng.set_pattern(PATTERN)).unwrap(), EnginePhase::Composited);
    assert_eq!(eng.current().unwrap().pixel(5, 5), Some([157, 157, 157, 255]));

    block_on(eng.set_blend_mode(BlendMode::Screen)).unwrap();
    assert_eq!(eng.current().unwrap().pixel(5, 5), Some([222, 222, 222, 255]));

    block_on(eng.set_blend_mode(BlendMode::parse("unknown"))).unwrap();
    assert_eq!(eng.current().unwrap().pixel(31, 19), Some([150, 150, 150, 255]));
}

#[test]
fn transparent_base_pixels_match_base_draw() {
    let src = source_with(
        half_transparent_base(),
        RasterImage::filled(3, 5, [250, 10, 128, 255]).unwrap(),
    );
    let mut eng = CompositeEngine::new(src, small_opts()).unwrap();
    block_on(eng.set_base_image(BASE)).unwrap();
    let drawn = eng.current().unwrap().clone();

    block_on(eng.set_pattern(PATTERN)).unwrap();
    let out = eng.current().unwrap();

    let mut transparent = 0;
    for (d, o) in drawn.data().chunks_exact(4).zip(out.data().chunks_exact(4)) {
        if d[3] == 0 {
            transparent += 1;
            assert_eq!(d, o);
        } else {
            assert_eq!(d[3], o[3]);
        }
    }
    assert!(transparent > 0);
}

#[test]
fn composite_is_idempotent() {
    let src = source_with(
        half_transparent_base(),
        RasterImage::from_raw(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255]).unwrap(),
    );
    let mut eng = CompositeEngine::new(src, small_opts()).unwrap();
    block_on(eng.set_base_image(BASE)).unwrap();
    block_on(eng.set_pattern(PATTERN)).unwrap();
    let first = eng.current().unwrap().clone();
    block_on(eng.composite()).unwrap();
    assert_eq!(eng.current().unwrap().fingerprint(), first.fingerprint());
    assert_eq!(eng.current().unwrap(), &first);
}

#[test]
fn decodes_are_cached_across_recomputes() {
    let mut eng = solid_engine([100, 100, 100, 255], [200, 200, 200, 255]);
    block_on(eng.set_base_image(BASE)).unwrap();
    block_on(eng.set_pattern(PATTERN)).unwrap();
    block_on(eng.set_blend_mode(BlendMode::Normal)).unwrap();
    block_on(eng.set_user_scale(120)).unwrap();
    block_on(eng.set_viewport_width(30)).unwrap();
    assert_eq!(eng.source().load_count(), 2);
}

#[test]
fn new_base_clears_pattern_and_scale() {
    let mut eng = solid_engine([100, 100, 100, 255], [200, 200, 200, 255]);
    block_on(eng.set_base_image(BASE)).unwrap();
    block_on(eng.set_pattern(PATTERN)).unwrap();
    block_on(eng.set_user_scale(180)).unwrap();
    assert_eq!(eng.phase(), EnginePhase::Composited);

    assert_eq!(block_on(eng.set_base_image(BASE)).unwrap(), EnginePhase::BaseOnly);
    assert_eq!(eng.state().pattern(), None);
    assert_eq!(eng.state().user_scale(), UserScale::default());
    assert_eq!(eng.current().unwrap().pixel(0, 0), Some([100, 100, 100, 255]));
}

#[test]
fn mode_and_scale_changes_without_pattern_are_recorded_only() {
    let mut eng = solid_engine([100, 100, 100, 255], [200, 200, 200, 255]);
    block_on(eng.set_base_image(BASE)).unwrap();
    let before = eng.current().unwrap().clone();

    assert_eq!(
        block_on(eng.set_blend_mode(BlendMode::Overlay)).unwrap(),
        EnginePhase::BaseOnly
    );
    assert_eq!(block_on(eng.set_user_scale(75)).unwrap(), EnginePhase::BaseOnly);
    assert_eq!(eng.current().unwrap(), &before);
    assert_eq!(eng.state().mode(), BlendMode::Overlay);
    assert_eq!(eng.state().user_scale().percent(), 75);
    assert_eq!(eng.source().load_count(), 1);
}

#[test]
fn out_of_range_scale_is_rejected_without_side_effects() {
    let mut eng = solid_engine([100, 100, 100, 255], [200, 200, 200, 255]);
    block_on(eng.set_base_image(BASE)).unwrap();
    block_on(eng.set_pattern(PATTERN)).unwrap();
    let before = eng.current().unwrap().clone();

    for bad in [0u32, 9, 201] {
        let err = block_on(eng.set_user_scale(bad)).unwrap_err();
        assert!(matches!(err, DrapeError::InvalidScale(v) if v == bad));
    }
    assert_eq!(eng.state().user_scale(), UserScale::default());
    assert_eq!(eng.current().unwrap(), &before);
}

#[test]
fn pattern_load_failure_falls_back_to_base_only() {
    let mut eng = solid_engine([100, 100, 100, 255], [200, 200, 200, 255]);
    block_on(eng.set_base_image(BASE)).unwrap();
    let base_only = eng.current().unwrap().clone();

    block_on(eng.set_pattern(PATTERN)).unwrap();
    let err = block_on(eng.set_pattern("patterns/missing.png")).unwrap_err();
    assert_eq!(err.as_load().unwrap().reference, "patterns/missing.png");
    assert_eq!(eng.phase(), EnginePhase::BaseOnly);
    assert_eq!(eng.current().unwrap(), &base_only);
    assert_eq!(eng.state().pattern(), None);

    // Later setters act on the base-only selection instead of retrying the missing pattern.
    assert_eq!(block_on(eng.set_viewport_width(20)).unwrap(), EnginePhase::BaseOnly);
    assert_eq!(block_on(eng.set_pattern(PATTERN)).unwrap(), EnginePhase::Composited);
}

#[test]
fn base_load_failure_keeps_last_output() {
    let mut eng = solid_engine([100, 100, 100, 255], [200, 200, 200, 255]);
    block_on(eng.set_base_image(BASE)).unwrap();
    block_on(eng.set_pattern(PATTERN)).unwrap();
    let last = eng.current().unwrap().clone();

    let err = block_on(eng.set_base_image("products/missing.png")).unwrap_err();
    assert!(err.as_load().is_some());
    assert_eq!(eng.phase(), EnginePhase::Composited);
    assert_eq!(eng.current().unwrap(), &last);
    assert_eq!(eng.state().base().map(ImageRef::as_str), Some(BASE));
    assert_eq!(eng.state().pattern().map(ImageRef::as_str), Some(PATTERN));

    // The restored selection keeps working from the cached decodes.
    assert_eq!(
        block_on(eng.set_blend_mode(BlendMode::Normal)).unwrap(),
        EnginePhase::Composited
    );
    assert_eq!(eng.current().unwrap().pixel(3, 3), Some([150, 150, 150, 255]));
    assert_eq!(block_on(eng.set_pattern(PATTERN)).unwrap(), EnginePhase::Composited);
    assert_eq!(eng.source().load_count(), 3);

    assert_eq!(block_on(eng.set_base_image(BASE)).unwrap(), EnginePhase::BaseOnly);
}

#[test]
fn base_load_failure_from_empty_stays_empty() {
    let mut eng = solid_engine([100, 100, 100, 255], [200, 200, 200, 255]);
    assert!(block_on(eng.set_base_image("products/missing.png")).is_err());
    assert_eq!(eng.phase(), EnginePhase::Empty);
    assert_eq!(eng.state().base(), None);
    assert!(eng.current().is_none());
}

#[test]
fn viewport_change_resizes_output() {
    let mut eng = solid_engine([100, 100, 100, 255], [200, 200, 200, 255]);
    assert_eq!(block_on(eng.set_viewport_width(20)).unwrap(), EnginePhase::Empty);
    block_on(eng.set_base_image(BASE)).unwrap();
    // maxWidth = min(32, 20 * 0.8) = 16; ratio = min(16/32, 20/20) = 0.5
    let out = eng.current().unwrap();
    assert_eq!((out.width(), out.height()), (16, 10));
    assert!(block_on(eng.set_viewport_width(0)).is_err());
}

#[test]
fn parallel_blend_matches_serial() {
    let make = |parallel: bool| {
        let src = source_with(
            half_transparent_base(),
            RasterImage::from_raw(2, 2, (0..16).map(|v| v * 16).collect()).unwrap(),
        );
        let opts = EngineOpts {
            parallel_blend: parallel,
            threads: Some(2),
            blend_chunk_px: 7,
            ..small_opts()
        };
        let mut eng = CompositeEngine::new(src, opts).unwrap();
        block_on(eng.set_base_image(BASE)).unwrap();
        block_on(eng.set_blend_mode(BlendMode::Overlay)).unwrap();
        block_on(eng.set_pattern(PATTERN)).unwrap();
        eng.into_output().unwrap()
    };
    assert_eq!(make(true), make(false));
}

#[test]
fn zero_threads_is_rejected() {
    let opts = EngineOpts {
        parallel_blend: true,
        threads: Some(0),
        ..EngineOpts::default()
    };
    assert!(CompositeEngine::new(MemoryImageSource::new(), opts).is_err());
}

#[test]
fn invalid_sizer_or_tile_opts_are_rejected_up_front() {
    let opts = EngineOpts {
        tile: TileOpts {
            base_pattern_size: 0.0,
        },
        ..small_opts()
    };
    assert!(matches!(
        CompositeEngine::new(MemoryImageSource::new(), opts),
        Err(DrapeError::Validation(_))
    ));

    let opts = EngineOpts {
        sizer: SizerOpts {
            max_height: f64::NAN,
            ..SizerOpts::default()
        },
        ..EngineOpts::default()
    };
    assert!(CompositeEngine::new(MemoryImageSource::new(), opts).is_err());
}
