//! mud-wasm 統合テスト
//!
//! transport + input + notify を束ねた Session の完全なパイプラインをテストする。
//! ソケットはフェイク、タイマーは ManualTimer で時刻を外から進める。

use std::cell::RefCell;
use std::rc::Rc;

use mud_codec::{ByteMessage, Frame};
use mud_input::{BufferView, EchoMode, Key};
use mud_notify::{
    Indicator, IndicatorId, IndicatorUpdate, ManualTimer, NoticeShown, NotificationId,
    NotificationItem,
};
use mud_transport::{
    ConnectionId, ConnectionState, Connector, Endpoint, Socket, SocketError, TransportError,
};
use mud_wasm::{MessageTag, Session, SessionConfig, SessionView};

// ==============================================================
// ヘルパー: フェイクソケットと記録用の表示層
// ==============================================================

/// フェイクソケットが送ったフレーム
type Wire = Rc<RefCell<Vec<Frame>>>;

struct FakeSocket {
    wire: Wire,
}

impl Socket for FakeSocket {
    fn send(&mut self, frame: Frame) -> Result<(), SocketError> {
        self.wire.borrow_mut().push(frame);
        Ok(())
    }

    fn close(&mut self) {}
}

struct FakeConnector {
    available: bool,
    wire: Wire,
    urls: Vec<String>,
}

impl FakeConnector {
    fn new() -> Self {
        FakeConnector {
            available: true,
            wire: Rc::new(RefCell::new(Vec::new())),
            urls: Vec::new(),
        }
    }
}

impl Connector for FakeConnector {
    type Socket = FakeSocket;

    fn is_available(&self) -> bool {
        self.available
    }

    fn connect(
        &mut self,
        _id: ConnectionId,
        endpoint: &Endpoint,
    ) -> Result<FakeSocket, SocketError> {
        self.urls.push(endpoint.url());
        Ok(FakeSocket {
            wire: Rc::clone(&self.wire),
        })
    }
}

#[derive(Default)]
struct RecordingView {
    messages: Vec<(String, MessageTag)>,
    received: Vec<Vec<u8>>,
    inputs: Vec<BufferView>,
    notices: Vec<NoticeShown>,
    hidden: Vec<NotificationId>,
    indicators: Vec<(IndicatorId, Indicator)>,
    states: Vec<ConnectionState>,
}

impl SessionView for RecordingView {
    fn message(&mut self, text: &str, tag: MessageTag) {
        self.messages.push((text.to_string(), tag));
    }

    fn received(&mut self, data: &ByteMessage) {
        self.received.push(data.as_bytes().to_vec());
    }

    fn input_changed(&mut self, view: &BufferView) {
        self.inputs.push(view.clone());
    }

    fn notice_shown(&mut self, notice: &NoticeShown) {
        self.notices.push(notice.clone());
    }

    fn notice_hidden(&mut self, id: NotificationId) {
        self.hidden.push(id);
    }

    fn indicator_changed(&mut self, id: IndicatorId, indicator: &Indicator) {
        self.indicators.push((id, indicator.clone()));
    }

    fn connection_changed(&mut self, state: ConnectionState) {
        self.states.push(state);
    }
}

type TestSession = Session<FakeConnector, ManualTimer, fn(&str) -> Vec<String>>;

fn complete_directions(fragment: &str) -> Vec<String> {
    ["north", "northeast", "northwest"]
        .iter()
        .filter(|w| w.starts_with(fragment))
        .map(|w| w.to_string())
        .collect()
}

fn config() -> SessionConfig {
    SessionConfig::from_json(
        r#"{ "host": "mud.example.net", "port": 4000, "socket": { "ws_port": 6200 } }"#,
    )
    .unwrap()
}

fn session() -> TestSession {
    Session::new(
        config(),
        FakeConnector::new(),
        ManualTimer::new(),
        complete_directions as fn(&str) -> Vec<String>,
    )
}

/// 接続して Open まで進める
fn open_session(view: &mut RecordingView) -> (TestSession, ConnectionId) {
    let mut s = session();
    s.setup(view).unwrap();
    let id = s.connect(view).unwrap();
    s.handle_socket_open(id, view);
    assert_eq!(s.state(), ConnectionState::Open);
    (s, id)
}

fn type_text(s: &mut TestSession, text: &str, view: &mut RecordingView) {
    for ch in text.chars() {
        s.handle_key(Key::Char(ch), view).unwrap();
    }
}

fn sent(s: &TestSession) -> Vec<Frame> {
    s.transport().connector().wire.borrow().clone()
}

// ==============================================================
// 接続
// ==============================================================

#[test]
fn test_connect_resolves_endpoint_and_tracks_state() {
    let mut view = RecordingView::default();
    let (s, _) = open_session(&mut view);

    assert_eq!(
        s.transport().connector().urls,
        vec!["ws://mud.example.net:6200/port_4000".to_string()]
    );
    assert_eq!(
        view.states,
        vec![ConnectionState::Connecting, ConnectionState::Open]
    );

    // 接続状態アイコンは初期表示 → connecting → connected
    let connectivity = s.connectivity_indicator();
    let classes: Vec<&str> = view
        .indicators
        .iter()
        .filter(|(id, _)| *id == connectivity)
        .map(|(_, ind)| ind.class.as_str())
        .collect();
    assert_eq!(
        classes,
        vec![
            "connectivity disconnected",
            "connectivity connecting",
            "connectivity connected"
        ]
    );
}

#[test]
fn test_missing_capability_raises_one_error_notice() {
    let mut view = RecordingView::default();
    let mut connector = FakeConnector::new();
    connector.available = false;
    let mut s: TestSession = Session::new(
        config(),
        connector,
        ManualTimer::new(),
        complete_directions as fn(&str) -> Vec<String>,
    );

    assert_eq!(s.setup(&mut view), Err(TransportError::CapabilityUnavailable));
    assert_eq!(s.connect(&mut view), Err(TransportError::CapabilityUnavailable));

    assert_eq!(view.notices.len(), 1);
    assert_eq!(view.notices[0].class, "error");
    assert!(s.transport().connector().urls.is_empty());
}

#[test]
fn test_failed_connect_shows_error_notice() {
    let mut view = RecordingView::default();
    let mut s = session();
    let id = s.connect(&mut view).unwrap();
    s.handle_socket_error(id, &mut view);

    assert_eq!(s.state(), ConnectionState::Failed);
    assert_eq!(view.states.last(), Some(&ConnectionState::Failed));
    assert_eq!(view.notices.len(), 1);
    assert_eq!(view.notices[0].class, "error");
    assert!(view.notices[0].text.contains("mud.example.net"));
}

#[test]
fn test_remote_close_is_reported() {
    let mut view = RecordingView::default();
    let (mut s, id) = open_session(&mut view);
    s.handle_socket_close(id, &mut view);

    assert_eq!(s.state(), ConnectionState::Closed);
    assert!(view
        .messages
        .iter()
        .any(|(_, tag)| *tag == MessageTag::Notice));
}

#[test]
fn test_local_disconnect_is_silent() {
    let mut view = RecordingView::default();
    let (mut s, _) = open_session(&mut view);
    s.disconnect(&mut view);

    assert_eq!(s.state(), ConnectionState::Closed);
    assert!(view.messages.is_empty());
    assert!(view.notices.is_empty());
}

#[test]
fn test_stale_socket_callbacks_are_ignored() {
    let mut view = RecordingView::default();
    let mut s = session();
    let first = s.connect(&mut view).unwrap();
    let second = s.connect(&mut view).unwrap();

    s.handle_socket_open(first, &mut view);
    assert_eq!(s.state(), ConnectionState::Connecting);

    s.handle_socket_open(second, &mut view);
    assert_eq!(s.state(), ConnectionState::Open);
    assert_eq!(s.transport().current_id(), Some(second));
}

// ==============================================================
// 送受信
// ==============================================================

#[test]
fn test_submitted_line_is_sent_and_echoed() {
    let mut view = RecordingView::default();
    let (mut s, _) = open_session(&mut view);

    type_text(&mut s, "look", &mut view);
    s.handle_key(Key::Enter, &mut view).unwrap();

    assert_eq!(sent(&s), vec![Frame::Binary(b"look\r\n".to_vec())]);
    assert_eq!(
        view.messages,
        vec![("look".to_string(), MessageTag::UserInput)]
    );
    assert_eq!(s.stats().messages_sent, 1);
    assert_eq!(s.stats().bytes_sent, 6);
}

#[test]
fn test_multi_line_block_is_one_message() {
    let mut view = RecordingView::default();
    let (mut s, _) = open_session(&mut view);

    type_text(&mut s, "say hi", &mut view);
    s.handle_key(Key::LineBreak, &mut view).unwrap();
    type_text(&mut s, "wave", &mut view);
    s.handle_key(Key::Enter, &mut view).unwrap();

    assert_eq!(sent(&s), vec![Frame::Binary(b"say hi\r\nwave\r\n".to_vec())]);
}

#[test]
fn test_latin1_encoding_is_single_byte() {
    let mut view = RecordingView::default();
    let config = SessionConfig::from_json(
        r#"{ "host": "mud.example.net", "encoding": "iso-8859-1" }"#,
    )
    .unwrap();
    let mut s: TestSession = Session::new(
        config,
        FakeConnector::new(),
        ManualTimer::new(),
        complete_directions as fn(&str) -> Vec<String>,
    );
    let id = s.connect(&mut view).unwrap();
    s.handle_socket_open(id, &mut view);

    type_text(&mut s, "café", &mut view);
    s.handle_key(Key::Enter, &mut view).unwrap();

    assert_eq!(sent(&s), vec![Frame::Binary(b"caf\xe9\r\n".to_vec())]);
}

#[test]
fn test_received_bytes_pass_through_unchanged() {
    let mut view = RecordingView::default();
    let (mut s, id) = open_session(&mut view);

    let payload: Vec<u8> = (0..=255).collect();
    s.handle_socket_message(id, Frame::Binary(payload.clone()), &mut view);
    // テキストフレームは各文字を 1 バイトとして扱う
    s.handle_socket_message(id, Frame::Text("\u{ff}\u{fb}\u{01}".to_string()), &mut view);

    assert_eq!(view.received, vec![payload, vec![0xff, 0xfb, 0x01]]);
    assert_eq!(s.stats().messages_received, 2);
}

#[test]
fn test_send_bytes_is_verbatim() {
    let mut view = RecordingView::default();
    let (mut s, _) = open_session(&mut view);

    s.send_bytes(&ByteMessage::from(vec![0xff, 0xfd, 0x18])).unwrap();
    assert_eq!(sent(&s), vec![Frame::Binary(vec![0xff, 0xfd, 0x18])]);
}

#[test]
fn test_submit_while_disconnected_is_not_connected() {
    let mut view = RecordingView::default();
    let mut s = session();

    type_text(&mut s, "look", &mut view);
    assert_eq!(
        s.handle_key(Key::Enter, &mut view),
        Err(TransportError::NotConnected)
    );
    // 入力欄は空になり、行はエコーされ履歴にも残る
    assert!(s.input().buffer().is_empty());
    assert_eq!(view.messages.len(), 1);
    assert_eq!(s.input().history().len(), 1);
}

// ==============================================================
// 入力
// ==============================================================

#[test]
fn test_masked_entry_never_reaches_the_view() {
    let mut view = RecordingView::default();
    let (mut s, _) = open_session(&mut view);

    s.set_echo_mode(EchoMode::Masked, &mut view).unwrap();
    type_text(&mut s, "hunter2", &mut view);
    s.handle_key(Key::Enter, &mut view).unwrap();

    assert_eq!(sent(&s), vec![Frame::Binary(b"hunter2\r\n".to_vec())]);
    assert!(view.messages.is_empty());
    assert!(view.inputs.iter().all(|v| match v {
        BufferView::Plain { text, .. } => !text.contains("hunter"),
        BufferView::Masked { .. } => true,
    }));
    assert!(s.input().history().is_empty());
}

#[test]
fn test_history_recall_through_session() {
    let mut view = RecordingView::default();
    let (mut s, _) = open_session(&mut view);

    for line in ["north", "look"] {
        type_text(&mut s, line, &mut view);
        s.handle_key(Key::Enter, &mut view).unwrap();
    }
    s.handle_key(Key::Up, &mut view).unwrap();
    assert_eq!(s.input().buffer().text(), "look");
    s.handle_key(Key::Up, &mut view).unwrap();
    assert_eq!(s.input().buffer().text(), "north");

    s.handle_key(Key::Enter, &mut view).unwrap();
    assert_eq!(sent(&s).last(), Some(&Frame::Binary(b"north\r\n".to_vec())));
}

#[test]
fn test_tab_completion_cycles() {
    let mut view = RecordingView::default();
    let (mut s, _) = open_session(&mut view);

    type_text(&mut s, "go nor", &mut view);
    s.handle_key(Key::Tab, &mut view).unwrap();
    assert_eq!(s.input().buffer().text(), "go north");
    s.handle_key(Key::Tab, &mut view).unwrap();
    assert_eq!(s.input().buffer().text(), "go northeast");
    s.handle_key(Key::Tab, &mut view).unwrap();
    assert_eq!(s.input().buffer().text(), "go northwest");
    s.handle_key(Key::Tab, &mut view).unwrap();
    assert_eq!(s.input().buffer().text(), "go north");
}

#[test]
fn test_paste_then_submit() {
    let mut view = RecordingView::default();
    let (mut s, _) = open_session(&mut view);

    s.insert_str("say hello", &mut view).unwrap();
    s.submit(&mut view).unwrap();
    assert_eq!(sent(&s), vec![Frame::Binary(b"say hello\r\n".to_vec())]);
}

#[test]
fn test_paste_and_echo_switch_succeed_while_disconnected() {
    let mut view = RecordingView::default();
    let mut s = session();

    // 送信を伴わない操作は未接続でも成功する
    assert!(s.insert_str("look", &mut view).is_ok());
    assert!(s.set_echo_mode(EchoMode::Masked, &mut view).is_ok());
    assert!(s.set_echo_mode(EchoMode::Plain, &mut view).is_ok());
    assert_eq!(s.input().buffer().text(), "look");
    assert!(matches!(
        view.inputs.last(),
        Some(BufferView::Plain { text, .. }) if text == "look"
    ));

    // 確定すると未接続が返る
    assert!(matches!(
        s.submit(&mut view),
        Err(TransportError::NotConnected)
    ));
}

// ==============================================================
// 通知
// ==============================================================

#[test]
fn test_notice_timeout_through_session() {
    let mut view = RecordingView::default();
    let mut s = session();

    let first = s.notify(NotificationItem::new("first").timeout_ms(1000), &mut view);
    let second = s.notify(NotificationItem::new("second"), &mut view);
    assert_eq!(view.notices.len(), 1);
    assert_eq!(view.notices[0].id, first);

    let due = s.notices_mut().timer_mut().advance_to(1000);
    assert_eq!(due.len(), 1);
    for token in due {
        s.handle_timer(token, &mut view);
    }

    assert_eq!(view.hidden, vec![first]);
    assert_eq!(view.notices.len(), 2);
    assert_eq!(view.notices[1].id, second);
    assert_eq!(view.notices[1].class, "info");
}

#[test]
fn test_notice_callbacks_through_session() {
    let mut view = RecordingView::default();
    let mut s = session();
    let log = Rc::new(RefCell::new(Vec::new()));

    let l = Rc::clone(&log);
    s.notify(
        NotificationItem::new("reconnect?")
            .button("Yes", move || l.borrow_mut().push("yes")),
        &mut view,
    );
    assert_eq!(view.notices[0].buttons, vec!["Yes".to_string()]);
    assert!(s.press_notice_button(3, &mut view).is_err());
    assert_eq!(s.press_notice_button(0, &mut view), Ok(true));
    assert_eq!(*log.borrow(), vec!["yes"]);

    let l = Rc::clone(&log);
    s.notify(
        NotificationItem::new("click me").on_click(move || l.borrow_mut().push("clicked")),
        &mut view,
    );
    assert!(view.notices[1].clickable);
    assert!(s.click_notice(&mut view));
    assert_eq!(*log.borrow(), vec!["yes", "clicked"]);

    assert!(s
        .notify_if_idle(NotificationItem::new("idle"), &mut view)
        .is_some());
    assert_eq!(s.notify_if_idle(NotificationItem::new("busy"), &mut view), None);
    assert!(s.dismiss_notice(&mut view));
}

#[test]
fn test_indicators_through_session() {
    let mut view = RecordingView::default();
    let mut s = session();

    let id = s.add_indicator(
        Indicator {
            text: "MCCP".to_string(),
            glyph: "Z".to_string(),
            class: "compression".to_string(),
            clickable: false,
        },
        &mut view,
    );
    assert_eq!(view.indicators.last().map(|(i, _)| *i), Some(id));

    s.update_indicator(
        id,
        IndicatorUpdate {
            class: Some("compression active".to_string()),
            ..Default::default()
        },
        &mut view,
    )
    .unwrap();
    assert_eq!(
        view.indicators.last().map(|(_, ind)| ind.class.clone()),
        Some("compression active".to_string())
    );

    s.remove_indicator(id, &mut view).unwrap();
    assert!(s.remove_indicator(id, &mut view).is_err());
    assert!(s.tray().get(s.connectivity_indicator()).is_ok());
}

#[test]
fn test_cancel_while_connecting_updates_view() {
    let mut view = RecordingView::default();
    let mut s = session();
    s.connect(&mut view).unwrap();
    s.disconnect(&mut view);

    assert_eq!(s.state(), ConnectionState::Closed);
    assert_eq!(
        view.states,
        vec![ConnectionState::Connecting, ConnectionState::Closed]
    );
}
