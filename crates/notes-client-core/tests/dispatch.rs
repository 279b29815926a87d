use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use notes_client_core::operation::ALL_OPERATION_KINDS;
use notes_client_core::{
    AiBackend, AiRequest, ApplyOutcome, Availability, AvailabilityState, BackendError,
    CommandDispatcher, DispatchConfig, DispatchError, DraftSlot, OperationKind, OperationParams,
    PLACEHOLDER_MARKER, ResultSource,
};

const NOTE: &str = "Met with the design team. We agreed on the new layout. Launch is next week.";

enum Reply {
    Text(&'static str),
    Fail,
}

struct ScriptedBackend {
    healthy: bool,
    reply: Reply,
    execute_delay: Duration,
    health_calls: AtomicUsize,
    execute_calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(healthy: bool, reply: Reply) -> Arc<Self> {
        Self::delayed(healthy, reply, Duration::ZERO)
    }

    fn delayed(healthy: bool, reply: Reply, execute_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            healthy,
            reply,
            execute_delay,
            health_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        })
    }

    fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiBackend for ScriptedBackend {
    async fn health(&self) -> Result<(), BackendError> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy {
            Ok(())
        } else {
            Err(BackendError::NotConfigured)
        }
    }

    async fn execute(&self, _request: &AiRequest) -> Result<String, BackendError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.execute_delay).await;
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Fail => Err(BackendError::MalformedResponse {
                message: "missing result".to_string(),
            }),
        }
    }
}

fn dispatcher(backend: Arc<ScriptedBackend>) -> CommandDispatcher {
    CommandDispatcher::new(backend, DispatchConfig::default())
}

#[tokio::test]
async fn short_input_is_rejected_before_any_backend_use() {
    let backend = ScriptedBackend::new(true, Reply::Text("unused"));
    let dispatcher = dispatcher(backend.clone());
    dispatcher.probe_availability().await;
    let health_calls = backend.health_calls();

    let error = dispatcher
        .dispatch(OperationKind::Summarize, "hi", &OperationParams::default())
        .await
        .expect_err("too short");
    assert_eq!(
        error,
        DispatchError::InputTooShort {
            required: 10,
            actual: 2
        }
    );
    assert_eq!(error.to_string(), "please write at least 10 characters first");
    assert_eq!(backend.execute_calls(), 0);
    assert_eq!(backend.health_calls(), health_calls);
}

#[tokio::test]
async fn expand_accepts_shorter_input() {
    let dispatcher = dispatcher(ScriptedBackend::new(false, Reply::Fail));
    let params = OperationParams::default();

    assert!(matches!(
        dispatcher.dispatch(OperationKind::Expand, "idea", &params).await,
        Err(DispatchError::InputTooShort { required: 5, .. })
    ));
    assert!(
        dispatcher
            .dispatch(OperationKind::Expand, "ideas", &params)
            .await
            .is_ok()
    );
    assert!(matches!(
        dispatcher.dispatch(OperationKind::Improve, "ideas", &params).await,
        Err(DispatchError::InputTooShort { required: 10, .. })
    ));
}

#[tokio::test]
async fn unavailable_backend_yields_placeholders_for_every_operation() {
    let backend = ScriptedBackend::new(false, Reply::Text("unused"));
    let dispatcher = dispatcher(backend.clone());
    assert_eq!(dispatcher.probe_availability().await, Availability::Unavailable);

    for kind in ALL_OPERATION_KINDS {
        let output = dispatcher
            .dispatch(kind, NOTE, &OperationParams::default())
            .await
            .expect("placeholder result");
        assert_eq!(output.source, ResultSource::Placeholder, "{kind}");
        assert!(output.text.starts_with(PLACEHOLDER_MARKER), "{kind}");
        assert_eq!(output.operation.kind(), kind);
    }
    assert_eq!(backend.execute_calls(), 0);
}

#[tokio::test]
async fn improve_while_unavailable_returns_marked_placeholder() {
    let dispatcher = dispatcher(ScriptedBackend::new(false, Reply::Text("unused")));
    dispatcher.probe_availability().await;

    let output = dispatcher
        .dispatch(
            OperationKind::Improve,
            "this  is my   rough draft",
            &OperationParams::default(),
        )
        .await
        .expect("placeholder result");
    assert!(output.is_placeholder());
    assert_eq!(output.text, "[Demo mode] Improved: this is my rough draft");
}

#[tokio::test]
async fn unknown_availability_uses_placeholder_without_probing() {
    let backend = ScriptedBackend::new(true, Reply::Text("remote"));
    let dispatcher = dispatcher(backend.clone());
    assert_eq!(dispatcher.availability(), AvailabilityState::Unknown);

    let output = dispatcher
        .dispatch(OperationKind::Summarize, NOTE, &OperationParams::default())
        .await
        .expect("placeholder result");
    assert!(output.is_placeholder());
    assert_eq!(backend.health_calls(), 0);
    assert_eq!(backend.execute_calls(), 0);
}

#[tokio::test]
async fn available_backend_result_is_returned() {
    let backend = ScriptedBackend::new(true, Reply::Text("Layout agreed; launch next week."));
    let dispatcher = dispatcher(backend.clone());
    assert_eq!(dispatcher.probe_availability().await, Availability::Available);

    let output = dispatcher
        .dispatch(OperationKind::Summarize, NOTE, &OperationParams::default())
        .await
        .expect("remote result");
    assert_eq!(output.source, ResultSource::Remote);
    assert_eq!(output.text, "Layout agreed; launch next week.");
    assert_eq!(backend.execute_calls(), 1);
}

#[tokio::test]
async fn remote_failure_is_reported_not_replaced() {
    let backend = ScriptedBackend::new(true, Reply::Fail);
    let dispatcher = dispatcher(backend.clone());
    dispatcher.probe_availability().await;

    for kind in ALL_OPERATION_KINDS {
        let error = dispatcher
            .dispatch(kind, NOTE, &OperationParams::default())
            .await
            .expect_err("remote error");
        assert_eq!(
            error,
            DispatchError::RemoteError {
                detail: "malformed response: missing result".to_string()
            }
        );
    }
    assert_eq!(backend.execute_calls(), ALL_OPERATION_KINDS.len());
}

#[tokio::test]
async fn slow_remote_times_out_as_remote_error() {
    let backend = ScriptedBackend::delayed(true, Reply::Text("late"), Duration::from_secs(5));
    let dispatcher = CommandDispatcher::new(
        backend,
        DispatchConfig {
            remote_timeout: Duration::from_millis(50),
            ..DispatchConfig::default()
        },
    );
    dispatcher.probe_availability().await;

    let error = dispatcher
        .dispatch(OperationKind::Improve, NOTE, &OperationParams::default())
        .await
        .expect_err("timeout");
    assert_eq!(
        error,
        DispatchError::RemoteError {
            detail: "timeout".to_string()
        }
    );
}

#[tokio::test]
async fn disabled_placeholders_surface_service_unavailable() {
    let dispatcher = CommandDispatcher::new(
        ScriptedBackend::new(false, Reply::Text("unused")),
        DispatchConfig {
            placeholders_enabled: false,
            ..DispatchConfig::default()
        },
    );
    dispatcher.probe_availability().await;

    assert_eq!(
        dispatcher
            .dispatch(OperationKind::GenerateTags, NOTE, &OperationParams::default())
            .await,
        Err(DispatchError::ServiceUnavailable)
    );
}

#[tokio::test]
async fn invalidated_availability_falls_back_until_reprobed() {
    let backend = ScriptedBackend::new(true, Reply::Text("remote"));
    let dispatcher = dispatcher(backend.clone());
    dispatcher.probe_availability().await;
    dispatcher.invalidate_availability();

    let output = dispatcher
        .dispatch(OperationKind::Summarize, NOTE, &OperationParams::default())
        .await
        .expect("placeholder result");
    assert!(output.is_placeholder());

    dispatcher.probe_availability().await;
    let output = dispatcher
        .dispatch(OperationKind::Summarize, NOTE, &OperationParams::default())
        .await
        .expect("remote result");
    assert_eq!(output.source, ResultSource::Remote);
    assert_eq!(backend.health_calls(), 2);
}

#[tokio::test]
async fn concurrent_first_use_probes_once() {
    let backend = ScriptedBackend::new(true, Reply::Text("remote"));
    let dispatcher = dispatcher(backend.clone());

    let (first, second) = tokio::join!(
        dispatcher.probe_availability(),
        dispatcher.probe_availability()
    );
    assert_eq!(first, Availability::Available);
    assert_eq!(second, Availability::Available);
    assert_eq!(backend.health_calls(), 1);
}

#[tokio::test]
async fn draft_edited_during_dispatch_keeps_user_text() {
    let backend =
        ScriptedBackend::delayed(true, Reply::Text("remote rewrite"), Duration::from_millis(80));
    let dispatcher = dispatcher(backend);
    dispatcher.probe_availability().await;
    let slot = DraftSlot::new(NOTE);

    let edit = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        slot.replace_text("user kept typing while the request ran");
    };
    let params = OperationParams::default();
    let (update, ()) = tokio::join!(
        dispatcher.dispatch_into(&slot, OperationKind::Improve, &params),
        edit
    );

    let update = update.expect("dispatch succeeded");
    assert_eq!(update.outcome, ApplyOutcome::Stale);
    assert_eq!(update.output.text, "remote rewrite");
    assert_eq!(slot.text(), "user kept typing while the request ran");
}

#[tokio::test]
async fn draft_receives_result_when_unchanged() {
    let dispatcher = dispatcher(ScriptedBackend::new(true, Reply::Text("remote rewrite")));
    dispatcher.probe_availability().await;
    let slot = DraftSlot::new(NOTE);

    let update = dispatcher
        .dispatch_into(&slot, OperationKind::Improve, &OperationParams::default())
        .await
        .expect("dispatch succeeded");
    assert_eq!(update.outcome, ApplyOutcome::Applied);
    assert_eq!(slot.text(), "remote rewrite");
}

#[tokio::test]
async fn failed_dispatch_leaves_draft_untouched() {
    let dispatcher = dispatcher(ScriptedBackend::new(true, Reply::Fail));
    dispatcher.probe_availability().await;
    let slot = DraftSlot::new(NOTE);
    let ticket = slot.ticket();

    assert!(
        dispatcher
            .dispatch_into(&slot, OperationKind::Expand, &OperationParams::default())
            .await
            .is_err()
    );
    assert_eq!(slot.text(), NOTE);
    assert_eq!(slot.apply(ticket, "still current"), ApplyOutcome::Applied);
}
