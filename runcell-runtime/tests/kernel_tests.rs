//! Integration tests against a real Python kernel
//!
//! Each test returns early when no `python3` can be started.

use runcell_runtime::{
    Harness, HtmlCanvas, HtmlOutput, KernelConfig, KernelError, Offloaded, Preload, PythonKernel,
    Session, TextEditor,
};
use runcell_types::{ExecutionResult, SessionId, Status};
use std::sync::Arc;

fn kernel() -> Option<PythonKernel> {
    match PythonKernel::spawn(&KernelConfig::default()) {
        Ok(kernel) => Some(kernel),
        Err(KernelError::Spawn { .. }) => {
            eprintln!("python3 not available, skipping");
            None
        }
        Err(e) => panic!("kernel failed to start: {}", e),
    }
}

fn cell(id: u64, code: &str) -> (Arc<TextEditor>, Arc<HtmlOutput>, Session) {
    let editor = Arc::new(TextEditor::new(code));
    let output = Arc::new(HtmlOutput::new());
    let session = Session::new(SessionId(id), editor.clone()).with_output(output.clone());
    (editor, output, session)
}

#[test]
fn test_print_is_captured() {
    let Some(kernel) = kernel() else { return };
    assert!(!kernel.version().is_empty());

    let harness = Harness::new(kernel);
    harness.initialize_blocking(&Preload::new()).unwrap();

    let (editor, output, session) = cell(0, "print(\"hi\")");
    let outcome = harness.run_blocking(&session).unwrap();

    assert_eq!(outcome.result, ExecutionResult::Value("hi\n".to_string()));
    assert_eq!(output.html(), "hi\n");
    assert_eq!(editor.status(), Some(Status::Ok));
}

#[test]
fn test_exception_marks_editor_red() {
    let Some(kernel) = kernel() else { return };
    let harness = Harness::new(kernel);
    harness.initialize_blocking(&Preload::new()).unwrap();

    let (editor, output, session) = cell(0, "1/0");
    let outcome = harness.run_blocking(&session).unwrap();

    assert_eq!(outcome.status, Status::Failed);
    assert!(output.html().contains("ZeroDivisionError"));
    assert!(output.html().starts_with("<span style=\"color:red\">"));
    assert_eq!(editor.border(), Some("1px solid red"));
}

#[test]
fn test_failure_keeps_output_printed_before_it() {
    let Some(kernel) = kernel() else { return };
    let harness = Harness::new(kernel);
    harness.initialize_blocking(&Preload::new()).unwrap();

    let (_, output, session) = cell(0, "print('before')\n1/0");
    harness.run_blocking(&session).unwrap();

    assert_eq!(
        output.html(),
        "before\n<span style=\"color:red\">ZeroDivisionError: division by zero</span>"
    );
}

#[test]
fn test_wrapping_leaves_user_globals_alone() {
    let Some(kernel) = kernel() else { return };
    let harness = Harness::new(kernel);
    harness.initialize_blocking(&Preload::new()).unwrap();

    let (_, _, assign) = cell(0, "io = 5\nsys = 'mine'");
    let (_, output, show) = cell(1, "print(io, sys)");
    let outcomes = harness.run_all_blocking(&[assign, show]);

    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert_eq!(output.html(), "5 mine\n");
}

#[test]
fn test_printed_markup_is_escaped() {
    let Some(kernel) = kernel() else { return };
    let harness = Harness::new(kernel);
    harness.initialize_blocking(&Preload::new()).unwrap();

    let (_, output, session) = cell(0, "print('<script>alert(1)</script>')");
    harness.run_blocking(&session).unwrap();

    assert_eq!(output.html(), "&lt;script&gt;alert(1)&lt;/script&gt;\n");
}

#[test]
fn test_sessions_share_one_namespace() {
    let Some(kernel) = kernel() else { return };
    let harness = Harness::new(kernel);
    harness.initialize_blocking(&Preload::new()).unwrap();

    let (_, _, first) = cell(0, "x = 41");
    let (_, output, second) = cell(1, "print(x + 1)");
    harness.run_all_blocking(&[first, second]);

    assert_eq!(output.html(), "42\n");
}

#[test]
fn test_canvas_callback_draws_image() {
    let Some(kernel) = kernel() else { return };
    let harness = Harness::new(kernel);
    harness.initialize_blocking(&Preload::new()).unwrap();

    let canvas = Arc::new(HtmlCanvas::new());
    let session = Session::new(
        SessionId(0),
        Arc::new(TextEditor::new("__canvas__('first.png')\n__canvas__('plot.png')")),
    )
    .with_canvas(canvas.clone());

    let outcome = harness.run_blocking(&session).unwrap();

    assert_eq!(outcome.status, Status::Ok);
    assert_eq!(canvas.child_count(), 1);
    assert_eq!(canvas.html(), "<img src=\"plot.png\">");
}

#[test]
fn test_preload_imports_and_bootstrap() {
    let Some(kernel) = kernel() else { return };
    let harness = Harness::new(kernel);
    harness
        .initialize_blocking(
            &Preload::new()
                .with_imports(["json"])
                .with_bootstrap("GREETING = 'hello'\n"),
        )
        .unwrap();

    let (_, output, session) = cell(0, "print(json.dumps(GREETING))");
    harness.run_blocking(&session).unwrap();

    assert_eq!(output.html(), "&quot;hello&quot;\n");
}

#[test]
fn test_failed_import_fails_initialize() {
    let Some(kernel) = kernel() else { return };
    let harness = Harness::new(kernel);

    let err = harness
        .initialize_blocking(&Preload::new().with_imports(["runcell_no_such_module"]))
        .unwrap_err();

    assert!(err.to_string().contains("runcell_no_such_module"));
    assert!(!harness.gate().state().is_ready());
}

#[tokio::test]
async fn test_offloaded_kernel_runs_all() {
    let Some(kernel) = kernel() else { return };
    let harness = Harness::new(Offloaded::new(kernel));
    harness.initialize(&Preload::new()).await.unwrap();

    let (_, out_a, a) = cell(0, "print('a')");
    let (_, out_b, b) = cell(1, "print('b')");
    let outcomes = harness.run_all(&[a, b]).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert_eq!(out_a.html(), "a\n");
    assert_eq!(out_b.html(), "b\n");
}
