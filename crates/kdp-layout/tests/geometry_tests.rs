use kdp_layout::*;

#[test]
fn test_validate_page_count_boundaries() {
    assert!(!validate_page_count(23));
    assert!(validate_page_count(24));
    assert!(!validate_page_count(25));
    assert!(validate_page_count(828));
    assert!(!validate_page_count(829));
    assert!(!validate_page_count(830));
    assert!(!validate_page_count(0));
}

#[test]
fn test_ensure_page_count_never_rounds() {
    assert_eq!(ensure_page_count(30), Ok(30));
    match ensure_page_count(31) {
        Err(GeometryError::InvalidPageCount { count }) => assert_eq!(count, 31),
        other => panic!("Expected InvalidPageCount, got {:?}", other),
    }
}

#[test]
fn test_page_count_from_signed_and_fractional_input() {
    assert_eq!(page_count_from_i64(100), Ok(100));
    assert!(matches!(
        page_count_from_i64(-24),
        Err(GeometryError::InvalidPageCount { count: -24 })
    ));
    assert!(matches!(
        page_count_from_f64(30.5),
        Err(GeometryError::NonIntegerPageCount { .. })
    ));
    assert!(matches!(
        page_count_from_f64(f64::NAN),
        Err(GeometryError::NonIntegerPageCount { .. })
    ));
    assert_eq!(page_count_from_f64(48.0), Ok(48));
}

#[test]
fn test_margins_inner_steps() {
    assert_eq!(compute_margins(10).inner_in, 0.375);
    assert_eq!(compute_margins(50).inner_in, 0.375);
    assert_eq!(compute_margins(52).inner_in, 0.4375);
    assert_eq!(compute_margins(60).inner_in, 0.4375);
    assert_eq!(compute_margins(100).inner_in, 0.4375);
    assert_eq!(compute_margins(150).inner_in, 0.5);
}

#[test]
fn test_margins_fixed_edges() {
    for count in [10, 24, 60, 150, 828] {
        let margins = compute_margins(count);
        assert_eq!(margins.top_in, 0.25);
        assert_eq!(margins.bottom_in, 0.25);
        assert_eq!(margins.outer_in, 0.25);
    }
}

#[test]
fn test_spine_width_exact() {
    assert_eq!(compute_spine_width(100, PaperTint::White), 0.23);
    assert_eq!(compute_spine_width(100, PaperTint::Cream), 0.25);
    assert_eq!(compute_spine_width(30, PaperTint::White), 0.069);
    assert_eq!(compute_spine_width(24, PaperTint::Cream), 0.06);
}

#[test]
fn test_trim_sizes() {
    assert_eq!(TrimSize::Letter.dimensions_in(), (8.5, 11.0));
    assert_eq!(TrimSize::Square.dimensions_in(), (8.5, 8.5));
    assert_eq!(TrimSize::Trade6x9.dimensions_in(), (6.0, 9.0));
    assert_eq!("8x10".parse::<TrimSize>(), Ok(TrimSize::Portrait8x10));
    assert_eq!(
        "5x8".parse::<TrimSize>(),
        Ok(TrimSize::Custom {
            width_in: 5.0,
            height_in: 8.0
        })
    );
    assert!("letter".parse::<TrimSize>().is_err());
}

#[test]
fn test_print_spec_rejects_bad_input() {
    assert!(PrintSpec::new(TrimSize::Letter, 26, PaperTint::White, false).is_ok());
    assert!(matches!(
        PrintSpec::new(TrimSize::Letter, 27, PaperTint::White, false),
        Err(GeometryError::InvalidPageCount { .. })
    ));
    assert!(matches!(
        PrintSpec::new(
            TrimSize::Custom {
                width_in: 12.0,
                height_in: 12.0
            },
            24,
            PaperTint::White,
            false
        ),
        Err(GeometryError::InvalidTrimSize { .. })
    ));
}

#[test]
fn test_page_size_with_and_without_bleed() {
    let plain = PrintSpec::new(TrimSize::Letter, 24, PaperTint::White, false).unwrap();
    assert_eq!(page_size(&plain), (8.5, 11.0));

    let bleed = PrintSpec::new(TrimSize::Letter, 24, PaperTint::White, true).unwrap();
    assert_eq!(page_size(&bleed), (8.625, 11.25));
}

#[test]
fn test_cover_wrap_dimensions() {
    let spec = PrintSpec::new(TrimSize::Letter, 100, PaperTint::White, false).unwrap();
    let wrap = cover_wrap_size(&spec);
    assert_eq!(wrap.spine_width_in, 0.23);
    assert_eq!(wrap.spine_x_in, 8.625);
    assert_eq!(wrap.width_in, 17.48);
    assert_eq!(wrap.height_in, 11.25);
    assert!(wrap.allows_spine_text());

    let thin = PrintSpec::new(TrimSize::Letter, 24, PaperTint::White, false).unwrap();
    assert!(!cover_wrap_size(&thin).allows_spine_text());
}

#[test]
fn test_content_box_respects_margins() {
    let spec = PrintSpec::new(TrimSize::Letter, 120, PaperTint::Cream, false).unwrap();
    let recto = content_box(&spec, 0);
    assert_eq!(recto.x_in, 0.5);
    assert_eq!(recto.y_in, 0.25);
    assert_eq!(recto.width_in, 8.5 - 0.5 - 0.25);
    assert_eq!(recto.height_in, 10.5);

    let verso = content_box(&spec, 1);
    assert_eq!(verso.x_in, 0.25);
}

#[test]
fn test_unit_conversion() {
    assert_eq!(constants::in_to_pt(1.0), 72.0);
    assert_eq!(constants::pt_to_in(36.0), 0.5);
    assert_eq!(constants::in_to_mm(1.0), 25.4);
}
