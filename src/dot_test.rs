use super::*;

const SVG: &str = r#"<svg width="62pt" height="44pt" viewBox="0.00 0.00 62.00 44.00"><g id="graph0"></g></svg>"#;

// =============================================================
// drawing_from_output
// =============================================================

#[test]
fn success_parses_drawing() {
    let drawing = drawing_from_output(Some(0), SVG.as_bytes().to_vec(), b"").unwrap();
    assert_eq!(drawing.markup(), SVG);
    assert_eq!(drawing.view_box().map(|vb| (vb.width, vb.height)), Some((62.0, 44.0)));
}

#[test]
fn success_with_warnings_still_renders() {
    let stderr = b"Warning: node A, position (1,2), expected two numbers\n";
    assert!(drawing_from_output(Some(0), SVG.as_bytes().to_vec(), stderr).is_ok());
}

#[test]
fn nonzero_exit_reports_stderr() {
    let stderr = b"Error: <stdin>: syntax error in line 1 near '->'\n";
    let err = drawing_from_output(Some(1), Vec::new(), stderr).unwrap_err();
    assert_eq!(err, EngineError::Render("Error: <stdin>: syntax error in line 1 near '->'".into()));
}

#[test]
fn nonzero_exit_without_stderr_reports_status() {
    let err = drawing_from_output(Some(2), Vec::new(), b"  \n").unwrap_err();
    assert_eq!(err, EngineError::Render("dot exited with status 2".into()));
}

#[test]
fn signal_exit_is_disposed() {
    let err = drawing_from_output(None, Vec::new(), b"").unwrap_err();
    assert!(matches!(err, EngineError::Disposed(_)));
}

#[test]
fn non_utf8_output_is_render_error() {
    let err = drawing_from_output(Some(0), vec![0xff, 0xfe, 0x00], b"").unwrap_err();
    assert!(matches!(err, EngineError::Render(m) if m.contains("not UTF-8")));
}

#[test]
fn output_without_svg_root_is_render_error() {
    let err = drawing_from_output(Some(0), b"digraph {}".to_vec(), b"").unwrap_err();
    assert!(matches!(err, EngineError::Render(m) if m.contains("<svg>")));
}

// =============================================================
// version_banner
// =============================================================

#[test]
fn banner_prefers_stderr() {
    let banner = version_banner(b"dot - graphviz version 2.43.0 (0)\n", b"");
    assert_eq!(banner, "dot - graphviz version 2.43.0 (0)");
}

#[test]
fn banner_falls_back_to_stdout() {
    let banner = version_banner(b"\n", b"dot - graphviz version 9.0.0\n");
    assert_eq!(banner, "dot - graphviz version 9.0.0");
}

// =============================================================
// Process seams
// =============================================================

const MISSING: &str = "/nonexistent/vizport-test-dot";

#[tokio::test]
async fn missing_program_is_not_found() {
    let source = DotSource::new(MISSING, Duration::from_secs(5));
    assert!(source.installed().is_none());
    let err = source.load().await.err();
    assert_eq!(err, Some(LoadError::NotFound(MISSING.into())));
    assert!(registered(Path::new(MISSING)).is_none());
}

#[tokio::test]
async fn unspawnable_handle_is_disposed() {
    let handle = DotHandle { program: PathBuf::from(MISSING), timeout: Duration::from_secs(5) };
    let err = handle.render_to_node("digraph {}").await.unwrap_err();
    assert!(matches!(err, EngineError::Disposed(_)));
}

#[test]
fn registry_keeps_first_capability_per_program() {
    let program = PathBuf::from("/registry-test/dot");
    let first = register(Arc::new(DotCapability {
        program: program.clone(),
        version: "first".into(),
        timeout: Duration::from_secs(1),
    }));
    let second = register(Arc::new(DotCapability {
        program: program.clone(),
        version: "second".into(),
        timeout: Duration::from_secs(1),
    }));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registered(&program).map(|cap| cap.describe()), Some("first".to_owned()));

    let source = DotSource::new(program, Duration::from_secs(1));
    assert_eq!(source.installed().map(|cap| cap.describe()), Some("first".to_owned()));
}

#[test]
fn capability_creates_independent_handles() {
    let capability = DotCapability { program: PathBuf::from("dot"), version: "v".into(), timeout: Duration::from_secs(1) };
    let a = capability.create_handle();
    let b = capability.create_handle();
    assert!(!Arc::ptr_eq(&a, &b));
}
