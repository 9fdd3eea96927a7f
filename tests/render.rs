use std::f64::consts::PI;
use std::sync::Arc;

use vecraster::{
    fill, fill_with_options, stroke, Antialias, Color, Extend, Filter, FillOptions, FillRule,
    LinearGradient, Matrix, Operator, Paint, Path, Pixmap, PixmapMut, RadialGradient, RasterError,
    Renderer, Rgba8, StrokeStyle, SurfacePattern,
};

const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);
const WHITE: Rgba8 = Rgba8::new(255, 255, 255, 255);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn white(w: u32, h: u32) -> Pixmap {
    let mut pm = Pixmap::new(w, h).unwrap();
    pm.fill(WHITE);
    pm
}

fn rect(x: f64, y: f64, w: f64, h: f64) -> Path {
    let mut p = Path::new();
    p.rectangle(x, y, w, h);
    p
}

fn star(cx: f64, cy: f64, r: f64) -> Path {
    let mut p = Path::new();
    for i in 0..5 {
        let a = -PI / 2.0 + i as f64 * 4.0 * PI / 5.0;
        let (x, y) = (cx + r * a.cos(), cy + r * a.sin());
        if i == 0 {
            p.move_to(x, y);
        } else {
            p.line_to(x, y);
        }
    }
    p.close_path();
    p
}

fn fill_over(path: &Path, paint: &Paint, rule: FillRule, dest: &mut Pixmap) {
    fill(path, paint, rule, &Matrix::IDENTITY, Operator::Over, &mut dest.as_mut()).unwrap();
}

#[test]
fn red_square_on_white() {
    init_logging();
    let mut pm = white(20, 20);
    fill_over(&rect(5.0, 5.0, 10.0, 10.0), &Paint::Solid(RED), FillRule::NonZero, &mut pm);

    for y in 0..20 {
        for x in 0..20 {
            let inside = (5..15).contains(&x) && (5..15).contains(&y);
            let expect = if inside { Rgba8::new(255, 0, 0, 255) } else { WHITE };
            assert_eq!(pm.pixel(x, y), Some(expect), "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn half_covered_row_blends() {
    let mut pm = white(10, 10);
    fill_over(&rect(0.0, 0.0, 10.0, 5.5), &Paint::Solid(RED), FillRule::NonZero, &mut pm);

    assert_eq!(pm.pixel(3, 4), Some(Rgba8::new(255, 0, 0, 255)));
    let edge = pm.pixel(3, 5).unwrap();
    assert_eq!(edge.r, 255);
    assert_eq!(edge.a, 255);
    assert!((126..=129).contains(&edge.g), "g = {}", edge.g);
    assert_eq!(edge.g, edge.b);
    assert_eq!(pm.pixel(3, 6), Some(WHITE));
}

#[test]
fn star_fill_rules_differ() {
    let path = star(50.0, 50.0, 40.0);
    let paint = Paint::Solid(RED);

    let mut nonzero = Pixmap::new(100, 100).unwrap();
    fill_over(&path, &paint, FillRule::NonZero, &mut nonzero);
    let mut evenodd = Pixmap::new(100, 100).unwrap();
    fill_over(&path, &paint, FillRule::EvenOdd, &mut evenodd);

    // the pentagon in the middle has winding 2
    assert_eq!(nonzero.pixel(50, 50), Some(Rgba8::new(255, 0, 0, 255)));
    assert_eq!(evenodd.pixel(50, 50), Some(Rgba8::TRANSPARENT));

    // the top point has winding 1
    assert_eq!(nonzero.pixel(50, 20), Some(Rgba8::new(255, 0, 0, 255)));
    assert_eq!(evenodd.pixel(50, 20), Some(Rgba8::new(255, 0, 0, 255)));

    // outside the bounding box nothing is touched
    assert_eq!(nonzero.pixel(5, 5), Some(Rgba8::TRANSPARENT));
    assert_ne!(nonzero, evenodd);
}

#[test]
fn degenerate_paths_paint_nothing() {
    let mut pm = white(10, 10);
    let mut p = Path::new();
    p.move_to(3.0, 3.0);
    fill_over(&p, &Paint::Solid(RED), FillRule::NonZero, &mut pm);
    p.line_to(3.0, 3.0).line_to(7.0, 7.0).close_path();
    fill_over(&p, &Paint::Solid(RED), FillRule::NonZero, &mut pm);
    fill_over(&Path::new(), &Paint::Solid(RED), FillRule::NonZero, &mut pm);
    assert!(pm.data().chunks(4).all(|px| px == [255, 255, 255, 255]));
}

#[test]
fn linear_gradient_across_the_fill() {
    let mut g = LinearGradient::new(0.0, 0.0, 100.0, 0.0);
    g.add_stop(0.0, RED).add_stop(1.0, BLUE);
    let mut pm = Pixmap::new(100, 4).unwrap();
    fill_over(&rect(0.0, 0.0, 100.0, 4.0), &Paint::from(g), FillRule::NonZero, &mut pm);

    let first = pm.pixel(0, 1).unwrap();
    let last = pm.pixel(99, 1).unwrap();
    assert!(first.r >= 253 && first.b <= 2);
    assert!(last.b >= 253 && last.r <= 2);
    let mid = pm.pixel(50, 1).unwrap();
    assert!((126..=129).contains(&mid.r) && (126..=129).contains(&mid.b));

    let mut prev = 256;
    for x in 0..100 {
        let r = pm.pixel(x, 2).unwrap().r as i32;
        assert!(r <= prev);
        prev = r;
    }
}

#[test]
fn gradient_follows_its_matrix_and_extend() {
    let mut g = LinearGradient::new(0.0, 0.0, 10.0, 0.0);
    g.add_stop(0.0, RED).add_stop(1.0, BLUE);
    g.extend = Extend::Repeat;
    let mut pm = Pixmap::new(40, 1).unwrap();
    fill_over(&rect(0.0, 0.0, 40.0, 1.0), &Paint::from(g.clone()), FillRule::NonZero, &mut pm);
    // same phase every 10 pixels
    assert_eq!(pm.pixel(2, 0), pm.pixel(12, 0));
    assert_eq!(pm.pixel(7, 0), pm.pixel(37, 0));

    // shifting the pattern by its period leaves the picture unchanged
    g.matrix = Matrix::translation(10.0, 0.0);
    let mut shifted = Pixmap::new(40, 1).unwrap();
    fill_over(&rect(0.0, 0.0, 40.0, 1.0), &Paint::from(g), FillRule::NonZero, &mut shifted);
    assert_eq!(pm, shifted);
}

#[test]
fn radial_gradient_without_extend_is_clipped() {
    let mut g = RadialGradient::new(50.0, 50.0, 0.0, 50.0, 50.0, 20.0);
    g.add_stop(0.0, RED).add_stop(1.0, BLUE);
    g.extend = Extend::None;
    let mut pm = Pixmap::new(100, 100).unwrap();
    fill_over(&rect(0.0, 0.0, 100.0, 100.0), &Paint::from(g), FillRule::NonZero, &mut pm);

    let center = pm.pixel(50, 50).unwrap();
    assert!(center.r > 240 && center.a == 255);
    assert_eq!(pm.pixel(90, 50), Some(Rgba8::TRANSPARENT));
    assert_eq!(pm.pixel(5, 5), Some(Rgba8::TRANSPARENT));
    let ring = pm.pixel(50 + 18, 50).unwrap();
    assert!(ring.b > ring.r);
}

#[test]
fn surface_pattern_is_scaled_by_transform() {
    let mut tile = Pixmap::new(2, 1).unwrap();
    {
        let mut t = tile.as_mut();
        Rgba8::new(255, 0, 0, 255).write_to(&mut t.row_mut(0)[0..4]);
        Rgba8::new(0, 0, 255, 255).write_to(&mut t.row_mut(0)[4..8]);
    }
    let mut sp = SurfacePattern::new(Arc::new(tile));
    sp.filter = Filter::Nearest;
    sp.extend = Extend::Repeat;
    let paint = Paint::from(sp);

    let mut pm = Pixmap::new(40, 4).unwrap();
    fill(
        &rect(0.0, 0.0, 4.0, 0.4),
        &paint,
        FillRule::NonZero,
        &Matrix::scaling(10.0, 10.0),
        Operator::Source,
        &mut pm.as_mut(),
    )
    .unwrap();
    assert_eq!(pm.pixel(5, 1), Some(Rgba8::new(255, 0, 0, 255)));
    assert_eq!(pm.pixel(15, 1), Some(Rgba8::new(0, 0, 255, 255)));
    assert_eq!(pm.pixel(25, 1), Some(Rgba8::new(255, 0, 0, 255)));
}

#[test]
fn clear_and_source_operators() {
    let mut pm = white(10, 10);
    fill(
        &rect(2.0, 2.0, 4.0, 4.0),
        &Paint::Solid(RED),
        FillRule::NonZero,
        &Matrix::IDENTITY,
        Operator::Clear,
        &mut pm.as_mut(),
    )
    .unwrap();
    assert_eq!(pm.pixel(3, 3), Some(Rgba8::TRANSPARENT));
    assert_eq!(pm.pixel(7, 7), Some(WHITE));

    let half_blue = Paint::Solid(Color::new(0.0, 0.0, 1.0, 0.5));
    fill(
        &rect(0.0, 0.0, 10.0, 10.0),
        &half_blue,
        FillRule::NonZero,
        &Matrix::IDENTITY,
        Operator::Source,
        &mut pm.as_mut(),
    )
    .unwrap();
    // source replaces regardless of what was there
    assert_eq!(pm.pixel(3, 3), Some(Rgba8::new(0, 0, 128, 128)));
    assert_eq!(pm.pixel(7, 7), Some(Rgba8::new(0, 0, 128, 128)));
}

#[test]
fn source_edge_writes_masked_source() {
    let mut pm = white(10, 10);
    fill(
        &rect(0.0, 0.0, 10.0, 5.5),
        &Paint::Solid(RED),
        FillRule::NonZero,
        &Matrix::IDENTITY,
        Operator::Source,
        &mut pm.as_mut(),
    )
    .unwrap();
    assert_eq!(pm.pixel(4, 4), Some(Rgba8::new(255, 0, 0, 255)));
    // half coverage replaces white with half-transparent red
    assert_eq!(pm.pixel(4, 5), Some(Rgba8::new(128, 0, 0, 128)));
    assert_eq!(pm.pixel(4, 6), Some(WHITE));
}

#[test]
fn multiply_darkens() {
    let mut pm = Pixmap::new(4, 4).unwrap();
    pm.fill(Rgba8::new(128, 255, 255, 255));
    fill(
        &rect(0.0, 0.0, 4.0, 4.0),
        &Paint::Solid(Color::rgb(1.0, 0.5, 0.0)),
        FillRule::NonZero,
        &Matrix::IDENTITY,
        Operator::Multiply,
        &mut pm.as_mut(),
    )
    .unwrap();
    let px = pm.pixel(1, 1).unwrap();
    assert_eq!(px.r, 128);
    assert!((127..=128).contains(&px.g));
    assert_eq!(px.b, 0);
    assert_eq!(px.a, 255);
}

#[test]
fn singular_transform_with_gradient_fails() {
    let mut g = LinearGradient::new(0.0, 0.0, 10.0, 0.0);
    g.add_stop(0.0, RED);
    let mut pm = white(8, 8);
    let err = fill(
        &rect(0.0, 0.0, 8.0, 8.0),
        &Paint::from(g),
        FillRule::NonZero,
        &Matrix::scaling(0.0, 1.0),
        Operator::Over,
        &mut pm.as_mut(),
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::InvalidMatrix { .. }));
    // nothing was painted
    assert_eq!(pm.pixel(4, 4), Some(WHITE));

    // a solid paint never needs the inverse
    fill(
        &rect(0.0, 0.0, 8.0, 8.0),
        &Paint::Solid(RED),
        FillRule::NonZero,
        &Matrix::scaling(0.0, 1.0),
        Operator::Over,
        &mut pm.as_mut(),
    )
    .unwrap();
}

#[test]
fn invalid_patterns_are_rejected() {
    let mut pm = white(8, 8);
    let empty = Paint::from(LinearGradient::new(0.0, 0.0, 1.0, 0.0));
    let err = fill(
        &rect(0.0, 0.0, 8.0, 8.0),
        &empty,
        FillRule::NonZero,
        &Matrix::IDENTITY,
        Operator::Over,
        &mut pm.as_mut(),
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::InvalidPattern(_)));

    let mut cone = RadialGradient::new(4.0, 4.0, 0.0, 4.0, 4.0, 0.0);
    cone.add_stop(0.0, RED);
    let err = fill(
        &rect(0.0, 0.0, 8.0, 8.0),
        &Paint::from(cone),
        FillRule::NonZero,
        &Matrix::IDENTITY,
        Operator::Over,
        &mut pm.as_mut(),
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::InvalidPattern(_)));
}

#[test]
fn buffer_mismatches() {
    let mut small = vec![0u8; 15];
    assert!(matches!(
        PixmapMut::from_bytes(&mut small, 2, 2, 8),
        Err(RasterError::BufferMismatch(_))
    ));

    let mut pm = white(8, 8);
    let err = fill_with_options(
        &rect(0.0, 0.0, 8.0, 8.0),
        &Paint::Solid(RED),
        FillRule::NonZero,
        &Matrix::IDENTITY,
        Operator::Over,
        &mut pm.as_mut(),
        &FillOptions::default().with_clip(vecraster::RectI::new(-1, 0, 4, 4)),
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::BufferMismatch(_)));
}

#[test]
fn band_count_does_not_change_output() {
    init_logging();
    let mut path = star(64.0, 64.0, 60.0);
    path.ellipse(64.0, 64.0, 30.0, 50.0);
    let mut g = RadialGradient::new(40.0, 40.0, 5.0, 64.0, 64.0, 70.0);
    g.add_stop(0.0, RED).add_stop(1.0, Color::new(0.0, 1.0, 0.0, 0.6));
    let paint = Paint::from(g);
    let transform = Matrix::rotation(0.2);

    let render = |bands: usize| {
        let mut pm = white(128, 128);
        fill_with_options(
            &path,
            &paint,
            FillRule::EvenOdd,
            &transform,
            Operator::Over,
            &mut pm.as_mut(),
            &FillOptions::default().with_bands(bands),
        )
        .unwrap();
        pm
    };
    let one = render(1);
    assert_eq!(one, render(4));
    assert_eq!(one, render(128));
    assert_eq!(one, render(0));
}

#[test]
fn aliased_fill_has_no_partial_pixels() {
    let mut pm = Pixmap::new(64, 64).unwrap();
    let mut path = Path::new();
    path.ellipse(32.0, 32.0, 25.3, 17.7);
    fill_with_options(
        &path,
        &Paint::Solid(RED),
        FillRule::NonZero,
        &Matrix::IDENTITY,
        Operator::Over,
        &mut pm.as_mut(),
        &FillOptions::default().with_antialias(Antialias::None),
    )
    .unwrap();
    assert!(pm.data().chunks(4).all(|px| px[3] == 0 || px[3] == 255));
    assert_eq!(pm.pixel(32, 32), Some(Rgba8::new(255, 0, 0, 255)));
}

#[test]
fn stroked_rectangle_keeps_interior() {
    let mut pm = white(40, 40);
    stroke(
        &rect(10.0, 10.0, 20.0, 20.0),
        &StrokeStyle::new(4.0),
        &Paint::Solid(BLUE),
        &Matrix::IDENTITY,
        Operator::Over,
        &mut pm.as_mut(),
    )
    .unwrap();
    let blue = Rgba8::new(0, 0, 255, 255);
    assert_eq!(pm.pixel(9, 20), Some(blue));
    assert_eq!(pm.pixel(20, 30), Some(blue));
    assert_eq!(pm.pixel(20, 20), Some(WHITE));
    assert_eq!(pm.pixel(5, 20), Some(WHITE));
    // miter corner
    assert_eq!(pm.pixel(8, 8), Some(blue));
}

#[test]
fn stroke_scales_with_transform() {
    let mut path = Path::new();
    path.move_to(1.0, 5.0).line_to(9.0, 5.0);
    let mut pm = white(40, 40);
    let mut renderer = Renderer::new();
    renderer
        .stroke(
            &path,
            &StrokeStyle::new(1.0),
            &Paint::Solid(RED),
            &Matrix::scaling(4.0, 4.0),
            Operator::Over,
            &mut pm.as_mut(),
        )
        .unwrap();
    // one user unit is four device pixels: rows 18 and 19, 20 and 21 are covered
    for y in 18..22 {
        assert_eq!(pm.pixel(20, y), Some(Rgba8::new(255, 0, 0, 255)), "row {}", y);
    }
    assert_eq!(pm.pixel(20, 17), Some(WHITE));
    assert_eq!(pm.pixel(20, 22), Some(WHITE));
    assert_eq!(renderer.rasterizer().coverage_at(20, 22), 0.0);
}
