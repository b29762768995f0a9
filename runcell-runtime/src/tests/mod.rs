//! Integration tests for runcell-runtime

#[cfg(test)]
mod harness_tests {
    use crate::{
        abi::{ExecutionFailure, HarnessError, KernelError},
        context::ExecutionContext,
        harness::{CaptureOptions, Harness},
        interpreter::{Interpreter, Offloaded, Preload, SuspendingInterpreter},
        lifecycle::Lifecycle,
        session::{Session, SessionRole},
        surfaces::{HtmlCanvas, HtmlOutput, OutputSurface, TextEditor},
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use runcell_types::{DrawPayload, ExecutionResult, SessionId, Status};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    type Script = dyn Fn(&str, &mut ExecutionContext) -> Result<String, ExecutionFailure>
        + Send
        + Sync;

    /// Interpreter whose behavior is a closure over the submitted code
    struct Scripted {
        script: Box<Script>,
        seen: Mutex<Vec<String>>,
        fail_loads: AtomicUsize,
    }

    impl Scripted {
        fn new<F>(script: F) -> Self
        where
            F: Fn(&str, &mut ExecutionContext) -> Result<String, ExecutionFailure>
                + Send
                + Sync
                + 'static,
        {
            Self {
                script: Box::new(script),
                seen: Mutex::new(Vec::new()),
                fail_loads: AtomicUsize::new(0),
            }
        }

        /// Value of the code is the code itself
        fn echo() -> Self {
            Self::new(|code, _| Ok(code.to_string()))
        }

        fn failing_loads(self, count: usize) -> Self {
            self.fail_loads.store(count, Ordering::SeqCst);
            self
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().clone()
        }
    }

    impl Interpreter for Scripted {
        fn load(&self, _preload: &Preload) -> Result<(), KernelError> {
            let remaining = self.fail_loads.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_loads.store(remaining - 1, Ordering::SeqCst);
                return Err(KernelError::Load("ModuleNotFoundError: sympy".to_string()));
            }
            Ok(())
        }

        fn execute(
            &self,
            code: &str,
            ctx: &mut ExecutionContext,
        ) -> Result<String, ExecutionFailure> {
            self.seen.lock().push(code.to_string());
            (self.script)(code, ctx)
        }
    }

    /// Suspending interpreter: code is `name:millis`, it sleeps then returns name
    #[derive(Default)]
    struct Sleepy {
        calls: AtomicUsize,
    }

    impl Sleepy {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SuspendingInterpreter for Sleepy {
        async fn execute(
            &self,
            code: &str,
            _ctx: &mut ExecutionContext,
        ) -> Result<String, ExecutionFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (name, millis) = code
                .split_once(':')
                .ok_or_else(|| ExecutionFailure::new("SyntaxError: invalid syntax"))?;
            let millis: u64 = millis
                .parse()
                .map_err(|_| ExecutionFailure::new("ValueError: bad delay"))?;
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(name.to_string())
        }
    }

    fn unwrapped() -> CaptureOptions {
        CaptureOptions {
            wrap_stdout: false,
            trim_trailing_newline: false,
        }
    }

    fn ready<I: Interpreter>(interpreter: I) -> Harness<I> {
        let harness = Harness::new(interpreter).with_capture(unwrapped());
        harness.initialize_blocking(&Preload::new()).unwrap();
        harness
    }

    struct Cell {
        editor: Arc<TextEditor>,
        output: Arc<HtmlOutput>,
        session: Session,
    }

    fn cell(id: u64, code: &str) -> Cell {
        let editor = Arc::new(TextEditor::new(code));
        let output = Arc::new(HtmlOutput::new());
        let session = Session::new(SessionId(id), editor.clone()).with_output(output.clone());
        Cell {
            editor,
            output,
            session,
        }
    }

    #[test]
    fn test_success_is_escaped_and_marked_ok() {
        let harness = ready(Scripted::echo());
        let c = cell(0, "<b>bold</b> & 'q'");

        let outcome = harness.run_blocking(&c.session).unwrap();

        assert_eq!(
            outcome.result,
            ExecutionResult::Value("<b>bold</b> & 'q'".to_string())
        );
        assert_eq!(outcome.status, Status::Ok);
        assert_eq!(
            c.output.html(),
            "&lt;b&gt;bold&lt;/b&gt; &amp; &#x27;q&#x27;"
        );
        assert_eq!(c.editor.border(), Some("1px solid black"));
    }

    #[test]
    fn test_failure_is_red_and_keeps_printed_output() {
        let harness = ready(Scripted::new(|_, ctx| {
            ctx.write_stdout("1\n");
            Err(ExecutionFailure::new("ZeroDivisionError: division by zero"))
        }));
        let c = cell(0, "print(1)\n1/0");

        let outcome = harness.run_blocking(&c.session).unwrap();

        assert!(outcome.result.is_failure());
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(
            c.output.html(),
            "1\n<span style=\"color:red\">ZeroDivisionError: division by zero</span>"
        );
        assert_eq!(c.editor.border(), Some("1px solid red"));
    }

    #[test]
    fn test_error_message_is_escaped() {
        let harness = ready(Scripted::new(|_, _| {
            Err(ExecutionFailure::new("SyntaxError: <unexpected>"))
        }));
        let c = cell(0, "(");

        harness.run_blocking(&c.session).unwrap();
        assert_eq!(
            c.output.html(),
            "<span style=\"color:red\">SyntaxError: &lt;unexpected&gt;</span>"
        );
    }

    #[test]
    fn test_rerun_replaces_previous_output() {
        let harness = ready(Scripted::echo());
        let c = cell(0, "first");

        harness.run_blocking(&c.session).unwrap();
        c.editor.set_text("second");
        harness.run_blocking(&c.session).unwrap();

        assert_eq!(c.output.html(), "second");
    }

    #[test]
    fn test_status_follows_latest_run() {
        let harness = ready(Scripted::new(|code, _| {
            if code.contains("raise") {
                Err(ExecutionFailure::new("RuntimeError"))
            } else {
                Ok(String::new())
            }
        }));
        let c = cell(0, "raise RuntimeError");

        harness.run_blocking(&c.session).unwrap();
        assert_eq!(c.editor.status(), Some(Status::Failed));

        c.editor.set_text("pass");
        let outcome = harness.run_blocking(&c.session).unwrap();
        assert_eq!(outcome.result, ExecutionResult::Empty);
        assert_eq!(c.editor.status(), Some(Status::Ok));
        assert!(c.output.is_empty());
    }

    #[test]
    fn test_editor_is_read_on_every_run() {
        let interp = Arc::new(Scripted::echo());
        let harness = ready(Arc::clone(&interp));
        let c = cell(0, "a = 1");

        harness.run_blocking(&c.session).unwrap();
        c.editor.set_text("a = 2");
        harness.run_blocking(&c.session).unwrap();

        assert_eq!(interp.seen(), vec!["a = 1", "a = 2"]);
    }

    #[test]
    fn test_code_is_wrapped_by_default() {
        let interp = Arc::new(Scripted::echo());
        let harness = Harness::new(Arc::clone(&interp));
        harness.initialize_blocking(&Preload::new()).unwrap();
        let c = cell(0, "print('hi')");

        harness.run_blocking(&c.session).unwrap();

        let seen = interp.seen();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("__runcell_out = "));
        assert!(seen[0].contains("\nprint('hi')\n"));
        assert!(seen[0].ends_with(".getvalue()"));
    }

    #[test]
    fn test_trailing_newline_option() {
        let script = |_: &str, _: &mut ExecutionContext| -> Result<String, ExecutionFailure> {
            Ok("hi\n".to_string())
        };

        let kept = ready(Scripted::new(script));
        let c = cell(0, "print('hi')");
        kept.run_blocking(&c.session).unwrap();
        assert_eq!(c.output.html(), "hi\n");

        let trimmed = Harness::new(Scripted::new(script)).with_capture(CaptureOptions {
            wrap_stdout: false,
            trim_trailing_newline: true,
        });
        trimmed.initialize_blocking(&Preload::new()).unwrap();
        let c = cell(1, "print('hi')");
        trimmed.run_blocking(&c.session).unwrap();
        assert_eq!(c.output.html(), "hi");
    }

    #[test]
    fn test_run_before_initialize_is_rejected() {
        let interp = Arc::new(Scripted::echo());
        let harness = Harness::new(Arc::clone(&interp));
        let c = cell(0, "1");
        c.output.append_escaped("stale");

        let err = harness.run_blocking(&c.session).unwrap_err();

        assert!(matches!(err, HarnessError::NotReady(Lifecycle::Uninitialized)));
        assert!(interp.seen().is_empty());
        assert_eq!(c.output.html(), "stale");
        assert_eq!(c.editor.status(), None);
    }

    #[test]
    fn test_failed_initialize_can_be_retried() {
        let harness = Harness::new(Scripted::echo().failing_loads(1));

        let err = harness.initialize_blocking(&Preload::new()).unwrap_err();
        assert!(matches!(err, HarnessError::InitializationFailed(_)));
        assert!(matches!(harness.gate().state(), Lifecycle::Failed(_)));
        assert!(harness.run_blocking(&cell(0, "1").session).is_err());

        harness.initialize_blocking(&Preload::new()).unwrap();
        assert_eq!(harness.gate().state(), Lifecycle::Ready);
        assert!(matches!(
            harness.initialize_blocking(&Preload::new()),
            Err(HarnessError::AlreadyInitialized(Lifecycle::Ready))
        ));
    }

    #[test]
    fn test_missing_output_surface_still_sets_status() {
        let harness = ready(Scripted::echo());
        let editor = Arc::new(TextEditor::new("value"));
        let session = Session::new(SessionId(3), editor.clone());

        let outcome = harness.run_blocking(&session).unwrap();
        assert_eq!(outcome.status, Status::Ok);
        assert_eq!(editor.status(), Some(Status::Ok));
    }

    #[test]
    fn test_draw_reaches_session_canvas() {
        let harness = ready(Scripted::new(|code, ctx| {
            ctx.draw(&DrawPayload::new(code));
            Ok(String::new())
        }));

        let canvas = Arc::new(HtmlCanvas::new());
        let with_canvas = Session::new(SessionId(0), Arc::new(TextEditor::new("a.png")))
            .with_canvas(canvas.clone());
        let without_canvas = cell(1, "b.png");

        harness.run_blocking(&with_canvas).unwrap();
        let outcome = harness.run_blocking(&without_canvas.session).unwrap();

        assert_eq!(canvas.html(), "<img src=\"a.png\">");
        assert_eq!(canvas.child_count(), 1);
        assert_eq!(outcome.status, Status::Ok);
    }

    #[test]
    fn test_run_all_blocking_runs_cells_in_page_order() {
        let interp = Arc::new(Scripted::echo());
        let harness = ready(Arc::clone(&interp));

        let sessions = vec![
            Session::new(SessionId(0), Arc::new(TextEditor::new("sympy")))
                .with_role(SessionRole::SysImports),
            cell(1, "one").session,
            Session::new(SessionId(2), Arc::new(TextEditor::new("micropip")))
                .with_role(SessionRole::Preinstall),
            cell(3, "two").session,
            cell(4, "three").session,
        ];

        let outcomes = harness.run_all_blocking(&sessions);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(interp.seen(), vec!["one", "two", "three"]);
        let ids: Vec<_> = outcomes
            .into_iter()
            .map(|o| o.unwrap().session)
            .collect();
        assert_eq!(ids, vec![SessionId(1), SessionId(3), SessionId(4)]);
    }

    #[tokio::test]
    async fn test_run_all_reports_in_completion_order() {
        let harness = Harness::new(Sleepy::default()).with_capture(unwrapped());
        harness.initialize(&Preload::new()).await.unwrap();

        let slow = cell(0, "slow:80");
        let fast = cell(1, "fast:5");
        let broken = cell(2, "broken");
        let sessions = vec![
            slow.session.clone(),
            fast.session.clone(),
            broken.session.clone(),
        ];

        let outcomes = harness.run_all(&sessions).await;
        let ids: Vec<_> = outcomes
            .iter()
            .map(|o| o.as_ref().unwrap().session)
            .collect();

        assert_eq!(ids.len(), 3);
        assert_eq!(ids.last(), Some(&SessionId(0)));
        assert_eq!(slow.output.html(), "slow");
        assert_eq!(fast.output.html(), "fast");
        assert_eq!(broken.editor.status(), Some(Status::Failed));
        assert_eq!(slow.editor.status(), Some(Status::Ok));
        assert_eq!(harness.interpreter().calls(), 3);
    }

    #[tokio::test]
    async fn test_run_all_executes_each_runnable_session_once() {
        let harness = Harness::new(Sleepy::default()).with_capture(unwrapped());
        harness.initialize(&Preload::new()).await.unwrap();

        let cells: Vec<_> = (0..5).map(|i| cell(i, &format!("c{}:{}", i, 5 - i))).collect();
        let mut sessions: Vec<_> = cells.iter().map(|c| c.session.clone()).collect();
        sessions.push(
            Session::new(SessionId(9), Arc::new(TextEditor::new("numpy")))
                .with_role(SessionRole::Preinstall),
        );

        let outcomes = harness.run_all(&sessions).await;

        assert_eq!(outcomes.len(), 5);
        assert_eq!(harness.interpreter().calls(), 5);
        for c in &cells {
            assert_eq!(c.editor.status(), Some(Status::Ok));
        }
    }

    #[tokio::test]
    async fn test_run_when_ready_waits_for_initialize() {
        let harness = Harness::new(Offloaded::new(Scripted::echo())).with_capture(unwrapped());
        let c = cell(0, "late");

        assert!(matches!(
            harness.run(&c.session).await,
            Err(HarnessError::NotReady(Lifecycle::Uninitialized))
        ));

        let (outcome, init) = tokio::join!(harness.run_when_ready(&c.session), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            harness.initialize(&Preload::new()).await
        });

        init.unwrap();
        assert_eq!(outcome.unwrap().status, Status::Ok);
        assert_eq!(c.output.html(), "late");
    }

    #[tokio::test]
    async fn test_run_when_ready_reports_failed_initialize() {
        let harness = Harness::new(Offloaded::new(Scripted::echo().failing_loads(1)));
        let c = cell(0, "1");

        let preload = Preload::new();
        let (outcome, init) = tokio::join!(
            harness.run_when_ready(&c.session),
            harness.initialize(&preload)
        );

        assert!(init.is_err());
        assert!(matches!(
            outcome,
            Err(HarnessError::InitializationFailed(reason)) if reason.contains("sympy")
        ));
    }

    #[tokio::test]
    async fn test_offloaded_sessions_do_not_share_stdout() {
        let harness = Harness::new(Offloaded::new(Scripted::new(|code, ctx| {
            ctx.write_stdout(code);
            Ok(String::new())
        })))
        .with_capture(unwrapped());
        harness.initialize(&Preload::new()).await.unwrap();

        let a = cell(0, "from a\n");
        let b = cell(1, "from b\n");
        let outcomes = harness.run_all(&[a.session.clone(), b.session.clone()]).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(a.output.html(), "from a\n");
        assert_eq!(b.output.html(), "from b\n");
    }
}
