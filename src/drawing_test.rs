use super::*;

const DOT_OUTPUT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN"
 "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<!-- Generated by graphviz version 2.43.0 -->
<svg width="62pt" height="116pt"
 viewBox="0.00 0.00 62.00 116.00" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
<g id="graph0" class="graph" transform="scale(1 1) rotate(0) translate(4 112)">
<title>%3</title>
</g>
</svg>
"#;

// =============================================================
// Declared bounds
// =============================================================

#[test]
fn reads_view_box_from_engine_output() {
    let drawing = Drawing::from_markup(DOT_OUTPUT).unwrap();
    assert_eq!(drawing.view_box(), Some(Rect::new(0.0, 0.0, 62.0, 116.0)));
}

#[test]
fn view_box_accepts_commas_and_offsets() {
    let drawing = Drawing::from_markup(r#"<svg viewBox="-10,5, 200 100"></svg>"#).unwrap();
    assert_eq!(drawing.view_box(), Some(Rect::new(-10.0, 5.0, 200.0, 100.0)));
}

#[test]
fn falls_back_to_width_and_height() {
    let drawing = Drawing::from_markup(r#"<svg width="62pt" height="116pt"></svg>"#).unwrap();
    assert_eq!(drawing.view_box(), Some(Rect::new(0.0, 0.0, 62.0, 116.0)));
}

#[test]
fn malformed_view_box_falls_back_to_size() {
    let drawing = Drawing::from_markup(r#"<svg viewBox="0 0 wide" width="30px" height="40px"></svg>"#).unwrap();
    assert_eq!(drawing.view_box(), Some(Rect::new(0.0, 0.0, 30.0, 40.0)));
}

#[test]
fn percentage_size_has_no_bounds() {
    let drawing = Drawing::from_markup(r#"<svg width="100%" height="100%"></svg>"#).unwrap();
    assert_eq!(drawing.view_box(), None);
}

#[test]
fn empty_view_box_area_is_ignored() {
    let drawing = Drawing::from_markup(r#"<svg viewBox="0 0 0 0"></svg>"#).unwrap();
    assert_eq!(drawing.view_box(), None);
}

// =============================================================
// Root tag
// =============================================================

#[test]
fn missing_root_is_an_error() {
    assert_eq!(Drawing::from_markup("<html></html>"), Err(DrawingError::MissingRoot));
    assert_eq!(Drawing::from_markup("<svgfoo></svgfoo>"), Err(DrawingError::MissingRoot));
}

#[test]
fn unterminated_root_is_an_error() {
    let err = Drawing::from_markup(r#"<svg width="10""#).unwrap_err();
    assert!(matches!(err, DrawingError::Malformed { .. }));
}

#[test]
fn root_must_be_the_first_element() {
    let err = Drawing::from_markup(r#"<html><svg viewBox="0 0 1 1"></svg></html>"#).unwrap_err();
    assert_eq!(err, DrawingError::MissingRoot);
}

#[test]
fn commented_out_svg_in_prolog_is_skipped() {
    let markup = r#"<!-- <svg viewBox="0 0 1 1"> --><svg viewBox="0 0 100 50"><g/></svg>"#;
    let drawing = Drawing::from_markup(markup).unwrap();
    assert_eq!(drawing.view_box(), Some(Rect::new(0.0, 0.0, 100.0, 50.0)));

    let drawing = drawing.responsive();
    assert_eq!(
        drawing.markup(),
        r#"<!-- <svg viewBox="0 0 1 1"> --><svg viewBox="0 0 100 50" preserveAspectRatio="xMidYMid meet"><g/></svg>"#
    );
}

#[test]
fn quoted_gt_does_not_end_root_tag() {
    let drawing = Drawing::from_markup(r#"<svg data-x="a>b" viewBox="0 0 10 20"></svg>"#).unwrap();
    assert_eq!(drawing.view_box(), Some(Rect::new(0.0, 0.0, 10.0, 20.0)));
}

#[test]
fn error_codes() {
    assert_eq!(DrawingError::MissingRoot.error_code(), "E_DRAWING_MISSING_ROOT");
    let malformed = DrawingError::Malformed { position: 0, message: "bad".into() };
    assert_eq!(malformed.error_code(), "E_DRAWING_MALFORMED");
    assert!(!DrawingError::MissingRoot.retryable());
}

// =============================================================
// Attributes
// =============================================================

#[test]
fn responsive_sets_preserve_aspect_ratio() {
    let drawing = Drawing::from_markup(DOT_OUTPUT).unwrap().responsive();
    assert!(drawing.markup().contains(r#"preserveAspectRatio="xMidYMid meet""#));
    assert!(drawing.markup().starts_with("<?xml"));
    assert!(drawing.markup().contains("<title>%3</title>"));
    assert_eq!(drawing.view_box(), Some(Rect::new(0.0, 0.0, 62.0, 116.0)));
}

#[test]
fn responsive_is_idempotent() {
    let once = Drawing::from_markup(DOT_OUTPUT).unwrap().responsive();
    let twice = once.clone().responsive();
    assert_eq!(once, twice);
    assert_eq!(twice.markup().matches("preserveAspectRatio").count(), 1);
}

#[test]
fn with_root_attr_replaces_existing_value() {
    let drawing = Drawing::from_markup(r#"<svg width="62pt" height="116pt"></svg>"#)
        .unwrap()
        .with_root_attr("width", "62");
    assert_eq!(drawing.markup(), r#"<svg width="62" height="116pt"></svg>"#);
}

#[test]
fn with_root_attr_keeps_self_closing_root() {
    let drawing = Drawing::from_markup("<svg/>").unwrap().with_root_attr("id", "g");
    assert_eq!(drawing.markup(), r#"<svg id="g"/>"#);
}

#[test]
fn with_root_attr_escapes_quotes() {
    let drawing = Drawing::from_markup("<svg></svg>").unwrap().with_root_attr("data-label", r#"say "hi""#);
    assert_eq!(drawing.markup(), r#"<svg data-label="say &quot;hi&quot;"></svg>"#);
}

#[test]
fn character_references_survive_rewrite() {
    let drawing = Drawing::from_markup(r#"<svg aria-label="A&#38;B"></svg>"#).unwrap().responsive();
    assert_eq!(drawing.markup(), r#"<svg aria-label="A&amp;B" preserveAspectRatio="xMidYMid meet"></svg>"#);
    assert!(!drawing.markup().contains("&amp;#38;"));
}

#[test]
fn single_quoted_values_stay_well_formed() {
    let drawing = Drawing::from_markup(r#"<svg data-q='say "hi"'></svg>"#).unwrap().with_root_attr("id", "g");
    assert_eq!(drawing.markup(), r#"<svg data-q="say &quot;hi&quot;" id="g"></svg>"#);
}

#[test]
fn with_root_attr_leaves_children_alone() {
    let drawing = Drawing::from_markup(r#"<svg><svg width="1"></svg></svg>"#)
        .unwrap()
        .with_root_attr("width", "9");
    assert_eq!(drawing.markup(), r#"<svg width="9"><svg width="1"></svg></svg>"#);
}

// =============================================================
// Export
// =============================================================

#[test]
fn export_uses_fixed_filename_and_full_markup() {
    let drawing = Drawing::from_markup(DOT_OUTPUT).unwrap().responsive();
    let export = drawing.export();
    assert_eq!(export.filename, "graph.svg");
    assert_eq!(export.markup, drawing.markup());
}
