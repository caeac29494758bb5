use super::*;

use std::cell::Cell;
use std::collections::VecDeque;

use async_trait::async_trait;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::block_on;
use snip::overlay::EventSink;
use snip::{OverlayEvent, Point, Snapshot};

use crate::net::types::HistoryEntry;
use crate::state::conversation::{MessageKind, Role};

// =============================================================
// Fakes
// =============================================================

#[derive(Debug, Clone, PartialEq)]
struct SentChat {
    input: String,
    image: Option<String>,
    token: Option<String>,
}

#[derive(Default)]
struct FakeApi {
    replies: RefCell<VecDeque<Result<String, ApiError>>>,
    history: RefCell<Option<Result<Vec<HistoryEntry>, ApiError>>>,
    sent: RefCell<Vec<SentChat>>,
    history_calls: Cell<usize>,
    chat_gate: RefCell<Option<oneshot::Receiver<()>>>,
    history_gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl FakeApi {
    fn reply(&self, reply: Result<&str, ApiError>) {
        self.replies.borrow_mut().push_back(reply.map(str::to_owned));
    }

    fn gate_chat(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.chat_gate.borrow_mut() = Some(rx);
        tx
    }

    fn gate_history(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.history_gate.borrow_mut() = Some(rx);
        tx
    }
}

#[async_trait(?Send)]
impl ChatApi for FakeApi {
    async fn send_chat(
        &self,
        input: &str,
        image: Option<&ImagePayload>,
        token: Option<&str>,
    ) -> Result<String, ApiError> {
        self.sent.borrow_mut().push(SentChat {
            input: input.to_owned(),
            image: image.map(|p| p.file_name.clone()),
            token: token.map(str::to_owned),
        });
        let gate = self.chat_gate.borrow_mut().take();
        if let Some(gate) = gate {
            gate.await.unwrap();
        }
        self.replies.borrow_mut().pop_front().unwrap_or_else(|| Err(ApiError::Network("no scripted reply".to_owned())))
    }

    async fn fetch_history(&self, _token: &str) -> Result<Vec<HistoryEntry>, ApiError> {
        self.history_calls.set(self.history_calls.get() + 1);
        let gate = self.history_gate.borrow_mut().take();
        if let Some(gate) = gate {
            gate.await.unwrap();
        }
        self.history.borrow_mut().take().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct FakeOverlayHost {
    sink: RefCell<Option<EventSink>>,
    mounts: Cell<usize>,
}

impl FakeOverlayHost {
    fn fire(&self, event: OverlayEvent) {
        let sink = self.sink.borrow().clone().expect("overlay not mounted");
        sink(event);
    }

    fn drag(&self, from: (f64, f64), to: (f64, f64)) {
        self.fire(OverlayEvent::PointerDown(Point::new(from.0, from.1)));
        self.fire(OverlayEvent::PointerMove(Point::new(to.0, to.1)));
        self.fire(OverlayEvent::PointerUp(Point::new(to.0, to.1)));
    }
}

impl OverlayHost for FakeOverlayHost {
    type Guard = ();

    fn mount(&self, sink: EventSink) {
        self.mounts.set(self.mounts.get() + 1);
        *self.sink.borrow_mut() = Some(sink);
    }

    fn track_pointer(&self, _sink: EventSink) {}

    fn scroll_offset(&self) -> Point {
        Point::default()
    }
}

#[derive(Default)]
struct FakeSnapshotter {
    failure: RefCell<Option<String>>,
    calls: Cell<usize>,
}

#[async_trait(?Send)]
impl SurfaceSnapshotter for FakeSnapshotter {
    async fn snapshot(&self) -> Result<Snapshot, CaptureError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = self.failure.borrow().clone() {
            return Err(CaptureError::Snapshot(reason));
        }
        Snapshot::from_rgba(100, 100, vec![200; 100 * 100 * 4], 1.0, Point::default())
    }
}

#[derive(Default)]
struct RecordingRegistry {
    minted: Cell<usize>,
    refuse: Cell<bool>,
    released: RefCell<Vec<(String, Duration)>>,
}

impl LocatorRegistry for RecordingRegistry {
    fn register(&self, _payload: &ImagePayload) -> Result<String, AttachmentError> {
        if self.refuse.get() {
            return Err(AttachmentError::Locator("quota".to_owned()));
        }
        self.minted.set(self.minted.get() + 1);
        Ok(format!("blob:{}", self.minted.get()))
    }

    fn release_after(&self, locator: String, grace: Duration) {
        self.released.borrow_mut().push((locator, grace));
    }
}

// =============================================================
// Fixture
// =============================================================

const NOW: f64 = 1_700_000_000_000.0;

fn fixed_clock() -> f64 {
    NOW
}

type TestController = ChatSurfaceController<Rc<FakeApi>, FakeOverlayHost, Rc<FakeSnapshotter>>;

struct Fixture {
    api: Rc<FakeApi>,
    overlay: Rc<FakeOverlayHost>,
    snapshots: Rc<FakeSnapshotter>,
    registry: Rc<RecordingRegistry>,
    session: Rc<RefCell<AuthSession>>,
    store: Rc<RefCell<ConversationStore>>,
    renders: Rc<Cell<usize>>,
    controller: TestController,
}

impl Fixture {
    fn new() -> Self {
        Self::with_session(AuthSession::anonymous())
    }

    fn signed_in() -> Self {
        Self::with_session(AuthSession::with_token("tok-1", None))
    }

    fn with_session(session: AuthSession) -> Self {
        let api = Rc::new(FakeApi::default());
        let overlay = Rc::new(FakeOverlayHost::default());
        let snapshots = Rc::new(FakeSnapshotter::default());
        let registry = Rc::new(RecordingRegistry::default());
        let locators: Rc<dyn LocatorRegistry> = registry.clone();
        let session = Rc::new(RefCell::new(session));
        let store = Rc::new(RefCell::new(ConversationStore::new(20)));
        let controller = ChatSurfaceController::new(
            Rc::clone(&api),
            Rc::clone(&session),
            Rc::clone(&store),
            Rc::clone(&locators),
            SelectionOverlay::new(Rc::clone(&overlay)),
            CapturePipeline::new(Rc::clone(&snapshots), locators),
        )
        .with_clock(fixed_clock)
        .with_release_grace(Duration::from_millis(10));

        let renders = Rc::new(Cell::new(0));
        let counter = Rc::clone(&renders);
        controller.set_on_change(move || counter.set(counter.get() + 1));

        Self { api, overlay, snapshots, registry, session, store, renders, controller }
    }

    fn released(&self) -> Vec<String> {
        self.registry.released.borrow().iter().map(|(l, _)| l.clone()).collect()
    }
}

fn png(name: &str) -> ImagePayload {
    ImagePayload::new(vec![0x89_u8, b'P', b'N', b'G'], "image/png", name)
}

fn entry(role: &str, text: &str) -> HistoryEntry {
    HistoryEntry { role: role.to_owned(), text: text.to_owned(), timestamp: None }
}

// =============================================================
// submit
// =============================================================

#[test]
fn blank_input_is_rejected_without_side_effects() {
    let fx = Fixture::new();
    fx.controller.set_input("   ");

    assert_eq!(block_on(fx.controller.submit()), SubmitOutcome::Rejected);

    assert!(fx.controller.messages().is_empty());
    assert!(fx.api.sent.borrow().is_empty());
    assert!(!fx.controller.composer_view().in_flight);
}

#[test]
fn submit_success_resolves_placeholder_in_place() {
    let fx = Fixture::new();
    fx.api.reply(Ok("<b>Bullish</b>"));
    let gate = fx.api.gate_chat();
    fx.controller.set_input("long BTC setup?");

    let mut submit = Box::pin(fx.controller.submit());
    assert!(submit.as_mut().now_or_never().is_none());

    let optimistic = fx.controller.messages();
    assert_eq!(optimistic.len(), 2);
    assert_eq!(optimistic[0].role, Role::User);
    assert_eq!(optimistic[0].kind, MessageKind::Content);
    assert_eq!(optimistic[0].text, "long BTC setup?");
    assert!(optimistic[1].is_pending());
    assert!(fx.controller.composer_view().in_flight);
    assert!(fx.controller.composer_view().input.is_empty());

    gate.send(()).unwrap();
    assert_eq!(block_on(submit), SubmitOutcome::Answered);

    let log = fx.controller.messages();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].role, Role::Assistant);
    assert_eq!(log[1].kind, MessageKind::Content);
    assert_eq!(log[1].text, "<b>Bullish</b>");
    assert_eq!(log[1].id, optimistic[1].id);
    assert!(!fx.controller.composer_view().in_flight);
}

#[test]
fn submit_failure_discards_placeholder_and_raises_notice() {
    let fx = Fixture::new();
    fx.api.reply(Err(ApiError::Network("offline".to_owned())));
    fx.controller.set_input("long BTC setup?");

    let outcome = block_on(fx.controller.submit());

    assert_eq!(outcome, SubmitOutcome::Failed(ApiError::Network("offline".to_owned())));
    let log = fx.controller.messages();
    assert_eq!(log.len(), 1);
    assert!(log.iter().all(|m| !m.is_pending()));
    let notice = fx.controller.composer_view().notice.unwrap();
    assert_eq!(notice.kind, NoticeKind::Network);
    assert!(notice.message.contains("offline"));
    assert!(!fx.controller.composer_view().in_flight);
}

#[test]
fn dismiss_error_clears_notice() {
    let fx = Fixture::new();
    fx.api.reply(Err(ApiError::Status(500)));
    fx.controller.set_input("hi");
    block_on(fx.controller.submit());

    fx.controller.dismiss_error();

    assert!(fx.controller.composer_view().notice.is_none());
}

#[test]
fn second_submit_while_in_flight_is_busy() {
    let fx = Fixture::new();
    fx.api.reply(Ok("first"));
    let gate = fx.api.gate_chat();
    fx.controller.set_input("one");
    let mut first = Box::pin(fx.controller.submit());
    assert!(first.as_mut().now_or_never().is_none());

    fx.controller.set_input("two");
    assert_eq!(block_on(fx.controller.submit()), SubmitOutcome::Busy);
    assert_eq!(fx.controller.composer_view().input, "two");
    assert_eq!(fx.store.borrow().messages().iter().filter(|m| m.is_pending()).count(), 1);

    gate.send(()).unwrap();
    assert_eq!(block_on(first), SubmitOutcome::Answered);
    assert_eq!(fx.api.sent.borrow().len(), 1);
}

#[test]
fn submit_carries_staged_image_and_keeps_it_shown() {
    let fx = Fixture::new();
    fx.api.reply(Ok("ok"));
    fx.controller.stage_file(png("chart.png")).unwrap();
    fx.controller.set_input("what is this pattern?");

    block_on(fx.controller.submit());

    let sent = fx.api.sent.borrow();
    assert_eq!(sent[0].image.as_deref(), Some("chart.png"));
    assert_eq!(fx.controller.messages()[0].attachment.as_deref(), Some("blob:1"));
    assert!(fx.released().is_empty());
    assert!(fx.controller.composer_view().preview.is_none());
}

#[test]
fn failed_submit_keeps_attachment_on_the_retained_message() {
    let fx = Fixture::new();
    fx.api.reply(Err(ApiError::Status(502)));
    fx.controller.stage_drop(png("drop.png")).unwrap();
    fx.controller.set_input("hi");

    block_on(fx.controller.submit());

    assert_eq!(fx.controller.messages()[0].attachment.as_deref(), Some("blob:1"));
    assert!(fx.released().is_empty());
    assert!(fx.controller.composer_view().preview.is_none());
}

#[test]
fn sent_attachment_is_released_once_its_message_is_evicted() {
    let fx = Fixture::new();
    fx.api.reply(Ok("first"));
    fx.controller.stage_file(png("chart.png")).unwrap();
    fx.controller.set_input("q0");
    block_on(fx.controller.submit());

    for i in 1..10 {
        fx.api.reply(Ok("a"));
        fx.controller.set_input(format!("q{i}"));
        block_on(fx.controller.submit());
    }
    assert!(fx.released().is_empty());

    fx.api.reply(Ok("a"));
    fx.controller.set_input("q10");
    block_on(fx.controller.submit());

    assert!(fx.controller.messages().iter().all(|m| m.attachment.is_none()));
    assert_eq!(fx.released(), vec!["blob:1".to_owned()]);
    assert_eq!(fx.registry.released.borrow()[0].1, Duration::from_millis(10));
}

#[test]
fn sent_attachment_is_released_when_the_log_is_cleared() {
    let fx = Fixture::signed_in();
    fx.api.reply(Ok("ok"));
    fx.controller.stage_file(png("chart.png")).unwrap();
    fx.controller.set_input("hi");
    block_on(fx.controller.submit());

    fx.controller.sign_out();

    assert_eq!(fx.released(), vec!["blob:1".to_owned()]);
}

#[test]
fn sent_attachment_is_released_when_history_replaces_the_log() {
    let fx = Fixture::signed_in();
    fx.api.reply(Ok("ok"));
    fx.controller.stage_file(png("chart.png")).unwrap();
    fx.controller.set_input("hi");
    block_on(fx.controller.submit());
    assert!(fx.released().is_empty());

    *fx.api.history.borrow_mut() = Some(Ok(vec![entry("assistant", "from the server")]));
    assert_eq!(block_on(fx.controller.hydrate_history()), HydrateOutcome::Loaded(1));

    assert_eq!(fx.released(), vec!["blob:1".to_owned()]);
}

#[test]
fn attachment_of_a_reply_landing_after_sign_out_is_released() {
    let fx = Fixture::signed_in();
    fx.api.reply(Ok("late"));
    let gate = fx.api.gate_chat();
    fx.controller.stage_file(png("chart.png")).unwrap();
    fx.controller.set_input("hi");
    let mut submit = Box::pin(fx.controller.submit());
    assert!(submit.as_mut().now_or_never().is_none());

    fx.controller.sign_out();
    assert!(fx.released().is_empty());
    gate.send(()).unwrap();
    block_on(submit);

    assert_eq!(fx.released(), vec!["blob:1".to_owned()]);
}

#[test]
fn submit_sends_bearer_only_when_authenticated() {
    let anon = Fixture::new();
    anon.api.reply(Ok("a"));
    anon.controller.set_input("hi");
    block_on(anon.controller.submit());
    assert_eq!(anon.api.sent.borrow()[0].token, None);

    let authed = Fixture::signed_in();
    authed.api.reply(Ok("a"));
    authed.controller.set_input("hi");
    block_on(authed.controller.submit());
    assert_eq!(authed.api.sent.borrow()[0].token.as_deref(), Some("tok-1"));
}

#[test]
fn submit_trims_input_and_stamps_clock() {
    let fx = Fixture::new();
    fx.api.reply(Ok("a"));
    fx.controller.set_input("  hi  ");
    block_on(fx.controller.submit());
    assert_eq!(fx.api.sent.borrow()[0].input, "hi");
    assert!((fx.controller.messages()[0].timestamp - NOW).abs() < f64::EPSILON);
}

#[test]
fn late_reply_after_sign_out_is_dropped_quietly() {
    let fx = Fixture::signed_in();
    fx.api.reply(Ok("late"));
    let gate = fx.api.gate_chat();
    fx.controller.set_input("hi");
    let mut submit = Box::pin(fx.controller.submit());
    assert!(submit.as_mut().now_or_never().is_none());

    fx.controller.sign_out();
    gate.send(()).unwrap();

    assert_eq!(block_on(submit), SubmitOutcome::Answered);
    assert!(fx.controller.messages().is_empty());
}

#[test]
fn changes_are_announced() {
    let fx = Fixture::new();
    fx.api.reply(Ok("a"));
    let before = fx.renders.get();
    fx.controller.set_input("hi");
    block_on(fx.controller.submit());
    assert!(fx.renders.get() >= before + 3);
}

// =============================================================
// Staging
// =============================================================

#[test]
fn staging_replaces_and_releases_previous() {
    let fx = Fixture::new();
    fx.controller.stage_file(png("a.png")).unwrap();
    fx.controller.stage_drop(png("b.png")).unwrap();

    let preview = fx.controller.composer_view().preview.unwrap();
    assert_eq!(preview.locator, "blob:2");
    assert_eq!(preview.source, AttachmentSource::DragDrop);
    assert_eq!(fx.released(), vec!["blob:1".to_owned()]);
}

#[test]
fn unstage_releases_locator() {
    let fx = Fixture::new();
    fx.controller.stage_file(png("a.png")).unwrap();
    fx.controller.unstage();
    assert!(fx.controller.composer_view().preview.is_none());
    assert_eq!(fx.released(), vec!["blob:1".to_owned()]);

    fx.controller.unstage();
    assert_eq!(fx.released().len(), 1);
}

#[test]
fn staging_failure_raises_attachment_notice() {
    let fx = Fixture::new();
    fx.registry.refuse.set(true);

    let result = fx.controller.stage_file(png("a.png"));

    assert!(matches!(result, Err(AttachmentError::Locator(_))));
    assert!(fx.controller.composer_view().preview.is_none());
    assert_eq!(fx.controller.composer_view().notice.map(|n| n.kind), Some(NoticeKind::Attachment));
}

#[test]
fn rejected_file_keeps_current_attachment() {
    let fx = Fixture::new();
    fx.controller.stage_file(png("a.png")).unwrap();

    fx.controller.reject_attachment(&AttachmentError::NotAnImage("notes.txt".to_owned()));

    let view = fx.controller.composer_view();
    assert_eq!(view.preview.map(|p| p.locator), Some("blob:1".to_owned()));
    assert_eq!(view.notice.map(|n| n.message), Some("notes.txt is not an image".to_owned()));
}

// =============================================================
// snip_and_stage
// =============================================================

#[test]
fn snip_stages_captured_region() {
    let fx = Fixture::new();
    let mut snip = Box::pin(fx.controller.snip_and_stage());
    assert!(snip.as_mut().now_or_never().is_none());
    assert!(fx.controller.composer_view().snipping);

    fx.overlay.drag((10.0, 10.0), (40.0, 30.0));

    assert_eq!(block_on(snip), SnipOutcome::Staged);
    let view = fx.controller.composer_view();
    let preview = view.preview.unwrap();
    assert_eq!(preview.source, AttachmentSource::Capture);
    assert_eq!(preview.file_name, snip::consts::CAPTURE_FILE_NAME);
    assert!(!view.snipping);
    assert_eq!(fx.snapshots.calls.get(), 1);
}

#[test]
fn zero_size_snip_is_cancelled_with_notice() {
    let fx = Fixture::new();
    let mut snip = Box::pin(fx.controller.snip_and_stage());
    assert!(snip.as_mut().now_or_never().is_none());

    fx.overlay.drag((100.0, 100.0), (100.0, 100.0));

    assert_eq!(block_on(snip), SnipOutcome::Cancelled(Cancelled::EmptySelection));
    let view = fx.controller.composer_view();
    assert!(view.preview.is_none());
    assert_eq!(view.notice.map(|n| n.kind), Some(NoticeKind::Selection));
    assert_eq!(fx.snapshots.calls.get(), 0);
}

#[test]
fn escape_cancels_snip_silently() {
    let fx = Fixture::new();
    let mut snip = Box::pin(fx.controller.snip_and_stage());
    assert!(snip.as_mut().now_or_never().is_none());

    fx.overlay.fire(OverlayEvent::Escape);

    assert_eq!(block_on(snip), SnipOutcome::Cancelled(Cancelled::Escape));
    assert!(fx.controller.composer_view().notice.is_none());
}

#[test]
fn snapshot_failure_raises_retryable_capture_notice() {
    let fx = Fixture::new();
    *fx.snapshots.failure.borrow_mut() = Some("permission denied".to_owned());
    let mut snip = Box::pin(fx.controller.snip_and_stage());
    assert!(snip.as_mut().now_or_never().is_none());

    fx.overlay.drag((10.0, 10.0), (40.0, 30.0));

    assert!(matches!(block_on(snip), SnipOutcome::Failed(CaptureError::Snapshot(_))));
    let notice = fx.controller.composer_view().notice.unwrap();
    assert_eq!(notice.kind, NoticeKind::Capture);
    assert!(notice.message.contains("Try again"));
}

#[test]
fn second_snip_while_selecting_is_busy() {
    let fx = Fixture::new();
    let mut first = Box::pin(fx.controller.snip_and_stage());
    assert!(first.as_mut().now_or_never().is_none());

    assert_eq!(block_on(fx.controller.snip_and_stage()), SnipOutcome::Busy);
    assert_eq!(fx.overlay.mounts.get(), 1);

    fx.overlay.fire(OverlayEvent::Escape);
    block_on(first);
}

#[test]
fn abandoned_snip_clears_the_selecting_flag() {
    let fx = Fixture::new();
    let mut snip = Box::pin(fx.controller.snip_and_stage());
    assert!(snip.as_mut().now_or_never().is_none());
    assert!(fx.controller.composer_view().snipping);

    drop(snip);

    assert!(!fx.controller.composer_view().snipping);

    let mut again = Box::pin(fx.controller.snip_and_stage());
    assert!(again.as_mut().now_or_never().is_none());
    assert_eq!(fx.overlay.mounts.get(), 2);
    fx.overlay.fire(OverlayEvent::Escape);
    assert_eq!(block_on(again), SnipOutcome::Cancelled(Cancelled::Escape));
}

#[test]
fn snip_replaces_previously_staged_file() {
    let fx = Fixture::new();
    fx.controller.stage_file(png("a.png")).unwrap();
    let mut snip = Box::pin(fx.controller.snip_and_stage());
    assert!(snip.as_mut().now_or_never().is_none());

    fx.overlay.drag((0.0, 0.0), (20.0, 20.0));
    block_on(snip);

    assert_eq!(fx.released(), vec!["blob:1".to_owned()]);
    assert_eq!(fx.controller.composer_view().preview.map(|p| p.locator), Some("blob:2".to_owned()));
}

// =============================================================
// History hydration
// =============================================================

#[test]
fn anonymous_session_skips_history() {
    let fx = Fixture::new();
    assert_eq!(block_on(fx.controller.hydrate_history()), HydrateOutcome::Skipped);
    assert_eq!(fx.api.history_calls.get(), 0);
}

#[test]
fn hydration_replaces_log_once_per_session() {
    let fx = Fixture::signed_in();
    *fx.api.history.borrow_mut() = Some(Ok(vec![entry("user", "q"), entry("ai", "a"), entry("system", "x")]));

    assert_eq!(block_on(fx.controller.hydrate_history()), HydrateOutcome::Loaded(2));
    let after_first = fx.controller.messages();
    assert_eq!(after_first[1].role, Role::Assistant);
    assert!(fx.session.borrow().history.is_set());

    assert_eq!(block_on(fx.controller.hydrate_history()), HydrateOutcome::Skipped);
    assert_eq!(fx.controller.messages(), after_first);
    assert_eq!(fx.api.history_calls.get(), 1);
}

#[test]
fn hydration_failure_leaves_latch_unset() {
    let fx = Fixture::signed_in();
    *fx.api.history.borrow_mut() = Some(Err(ApiError::Status(500)));

    assert_eq!(block_on(fx.controller.hydrate_history()), HydrateOutcome::Failed(ApiError::Status(500)));

    assert!(!fx.session.borrow().history.is_set());
    assert_eq!(fx.controller.composer_view().notice.map(|n| n.kind), Some(NoticeKind::Network));
    assert!(!fx.controller.composer_view().hydrating);
}

#[test]
fn submit_waits_for_hydration() {
    let fx = Fixture::signed_in();
    let gate = fx.api.gate_history();
    let mut hydrate = Box::pin(fx.controller.hydrate_history());
    assert!(hydrate.as_mut().now_or_never().is_none());

    fx.controller.set_input("hi");
    assert_eq!(block_on(fx.controller.submit()), SubmitOutcome::Busy);

    gate.send(()).unwrap();
    assert_eq!(block_on(hydrate), HydrateOutcome::Loaded(0));
}

#[test]
fn hydration_waits_for_submission() {
    let fx = Fixture::signed_in();
    fx.api.reply(Ok("a"));
    let gate = fx.api.gate_chat();
    fx.controller.set_input("hi");
    let mut submit = Box::pin(fx.controller.submit());
    assert!(submit.as_mut().now_or_never().is_none());

    assert_eq!(block_on(fx.controller.hydrate_history()), HydrateOutcome::Busy);

    gate.send(()).unwrap();
    block_on(submit);
    assert!(!fx.session.borrow().history.is_set());
}

#[test]
fn history_for_a_replaced_session_is_dropped() {
    let fx = Fixture::signed_in();
    *fx.api.history.borrow_mut() = Some(Ok(vec![entry("user", "old account")]));
    let gate = fx.api.gate_history();
    let mut hydrate = Box::pin(fx.controller.hydrate_history());
    assert!(hydrate.as_mut().now_or_never().is_none());

    fx.controller.sign_in("tok-2", None);
    gate.send(()).unwrap();

    assert_eq!(block_on(hydrate), HydrateOutcome::Skipped);
    assert!(fx.controller.messages().is_empty());
    assert!(!fx.session.borrow().history.is_set());
}

#[test]
fn sign_out_clears_log_and_rearms_hydration() {
    let fx = Fixture::signed_in();
    *fx.api.history.borrow_mut() = Some(Ok(vec![entry("user", "q")]));
    block_on(fx.controller.hydrate_history());

    fx.controller.sign_out();

    assert!(fx.controller.messages().is_empty());
    assert!(!fx.session.borrow().is_authenticated());
    assert!(!fx.session.borrow().history.is_set());

    fx.controller.sign_in("tok-2", None);
    *fx.api.history.borrow_mut() = Some(Ok(vec![entry("assistant", "welcome back")]));
    assert_eq!(block_on(fx.controller.hydrate_history()), HydrateOutcome::Loaded(1));
}
