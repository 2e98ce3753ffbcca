//! MudClient wasm-bindgen エクスポート
//!
//! `Session` にブラウザ実装を差し込む。
//!
//! ```text
//! MudClient
//!   └── Rc<Shared>
//!         ├── RefCell<Session<WebSocketConnector, BrowserTimer, JsCompletion>>
//!         └── JsHooks   (表示層の JS 関数)
//! ```
//!
//! ソケットとタイマーのコールバックは `Weak<Shared>` 経由でセッションに戻る。
//! 表示層への呼び出しは `ViewBuffer` に溜め、セッションの借用を外してから
//! JS に流す。JS 側のフックから MudClient を呼び直しても借用が衝突しない。

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Array, Function, Object, Reflect, Uint8Array};
use thiserror::Error;
use tracing::{error, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{BinaryType, CloseEvent, Event, MessageEvent, WebSocket};

use mud_codec::{ByteMessage, Frame};
use mud_input::{BufferView, CompletionProvider, EchoMode, Key, ScrollDirection};
use mud_notify::{
    HostTimer, Indicator, IndicatorId, IndicatorUpdate, NoticeShown, NotificationId,
    NotificationItem, TimerToken,
};
use mud_transport::{
    ConnectionId, ConnectionState, Connector, Endpoint, Socket, SocketError, BINARY_SUBPROTOCOL,
};

use crate::config::SessionConfig;
use crate::session::{MessageTag, Session, SessionView};

type BrowserSession = Session<WebSocketConnector, BrowserTimer, JsCompletion>;

/// コールバック実行中にセッションを呼び直された
#[derive(Debug, Error)]
#[error("session is busy: re-entrant call from a completion callback")]
pub struct SessionBusy;

struct Shared {
    session: RefCell<BrowserSession>,
    hooks: JsHooks,
}

/// セッションを借りて `f` を実行し、溜まった表示呼び出しを JS に流す
fn dispatch<R>(
    shared: &Shared,
    f: impl FnOnce(&mut BrowserSession, &mut ViewBuffer) -> R,
) -> Result<R, SessionBusy> {
    let mut view = ViewBuffer::default();
    let result = {
        let mut session = shared.session.try_borrow_mut().map_err(|_| SessionBusy)?;
        f(&mut session, &mut view)
    };
    shared.hooks.replay(view);
    Ok(result)
}

/// ソケット・タイマーのコールバックから呼ぶ
fn dispatch_weak(owner: &Weak<Shared>, f: impl FnOnce(&mut BrowserSession, &mut ViewBuffer)) {
    // MudClient が破棄済みなら何もしない
    let Some(shared) = owner.upgrade() else {
        return;
    };
    if let Err(e) = dispatch(&shared, f) {
        error!(error = %e, "dropped host callback");
    }
}

// ==============================================================
// 表示層
// ==============================================================

enum ViewCall {
    Message(String, MessageTag),
    Received(Vec<u8>),
    Input(BufferView),
    EchoMode(EchoMode),
    Scroll(ScrollDirection),
    NoticeShown(NoticeShown),
    NoticeHidden(NotificationId),
    Indicator(IndicatorId, Indicator),
    IndicatorRemoved(IndicatorId),
    Connection(ConnectionState),
}

/// 表示呼び出しの記録
#[derive(Default)]
struct ViewBuffer {
    calls: Vec<ViewCall>,
}

impl SessionView for ViewBuffer {
    fn message(&mut self, text: &str, tag: MessageTag) {
        self.calls.push(ViewCall::Message(String::from(text), tag));
    }

    fn received(&mut self, data: &ByteMessage) {
        self.calls.push(ViewCall::Received(data.as_bytes().to_vec()));
    }

    fn input_changed(&mut self, view: &BufferView) {
        self.calls.push(ViewCall::Input(view.clone()));
    }

    fn echo_mode_changed(&mut self, mode: EchoMode) {
        self.calls.push(ViewCall::EchoMode(mode));
    }

    fn scroll(&mut self, direction: ScrollDirection) {
        self.calls.push(ViewCall::Scroll(direction));
    }

    fn notice_shown(&mut self, notice: &NoticeShown) {
        self.calls.push(ViewCall::NoticeShown(notice.clone()));
    }

    fn notice_hidden(&mut self, id: NotificationId) {
        self.calls.push(ViewCall::NoticeHidden(id));
    }

    fn indicator_changed(&mut self, id: IndicatorId, indicator: &Indicator) {
        self.calls.push(ViewCall::Indicator(id, indicator.clone()));
    }

    fn indicator_removed(&mut self, id: IndicatorId) {
        self.calls.push(ViewCall::IndicatorRemoved(id));
    }

    fn connection_changed(&mut self, state: ConnectionState) {
        self.calls.push(ViewCall::Connection(state));
    }
}

/// JS 側の表示フック。未設定のフックは呼ばない
struct JsHooks {
    on_message: Option<Function>,
    on_data: Option<Function>,
    on_input: Option<Function>,
    on_echo_mode: Option<Function>,
    on_scroll: Option<Function>,
    on_notice: Option<Function>,
    on_notice_hidden: Option<Function>,
    on_indicator: Option<Function>,
    on_indicator_removed: Option<Function>,
    on_state: Option<Function>,
}

impl JsHooks {
    fn from_object(hooks: &JsValue) -> Self {
        let get = |name: &str| -> Option<Function> {
            Reflect::get(hooks, &JsValue::from_str(name))
                .ok()
                .and_then(|v| v.dyn_into::<Function>().ok())
        };
        JsHooks {
            on_message: get("onMessage"),
            on_data: get("onData"),
            on_input: get("onInput"),
            on_echo_mode: get("onEchoMode"),
            on_scroll: get("onScroll"),
            on_notice: get("onNotice"),
            on_notice_hidden: get("onNoticeHidden"),
            on_indicator: get("onIndicator"),
            on_indicator_removed: get("onIndicatorRemoved"),
            on_state: get("onState"),
        }
    }

    fn replay(&self, view: ViewBuffer) {
        for call in view.calls {
            let (hook, args): (&Option<Function>, Vec<JsValue>) = match call {
                ViewCall::Message(text, tag) => (
                    &self.on_message,
                    vec![JsValue::from_str(&text), JsValue::from_str(tag.as_str())],
                ),
                ViewCall::Received(bytes) => {
                    (&self.on_data, vec![Uint8Array::from(bytes.as_slice()).into()])
                }
                ViewCall::Input(buffer) => (&self.on_input, vec![buffer_to_js(&buffer)]),
                ViewCall::EchoMode(mode) => (
                    &self.on_echo_mode,
                    vec![JsValue::from_bool(mode == EchoMode::Plain)],
                ),
                ViewCall::Scroll(direction) => {
                    let name = match direction {
                        ScrollDirection::Up => "up",
                        ScrollDirection::Down => "down",
                    };
                    (&self.on_scroll, vec![JsValue::from_str(name)])
                }
                ViewCall::NoticeShown(notice) => (&self.on_notice, vec![notice_to_js(&notice)]),
                ViewCall::NoticeHidden(id) => (
                    &self.on_notice_hidden,
                    vec![JsValue::from_f64(id.0 as f64)],
                ),
                ViewCall::Indicator(id, indicator) => {
                    (&self.on_indicator, vec![indicator_to_js(id, &indicator)])
                }
                ViewCall::IndicatorRemoved(id) => (
                    &self.on_indicator_removed,
                    vec![JsValue::from_f64(f64::from(id.0))],
                ),
                ViewCall::Connection(state) => {
                    (&self.on_state, vec![JsValue::from_str(state_name(state))])
                }
            };

            let Some(hook) = hook else {
                continue;
            };
            let args: Array = args.into_iter().collect();
            if let Err(e) = hook.apply(&JsValue::NULL, &args) {
                warn!(error = ?e, "view hook threw");
            }
        }
    }
}

fn state_name(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Idle => "idle",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Open => "open",
        ConnectionState::Closed => "closed",
        ConnectionState::Failed => "failed",
    }
}

/// `{ key: value, ... }` を作る
fn js_object(entries: &[(&str, JsValue)]) -> JsValue {
    let obj = Object::new();
    for (key, value) in entries {
        // 新しい素の Object への set は失敗しない
        let _ = Reflect::set(&obj, &JsValue::from_str(key), value);
    }
    obj.into()
}

fn buffer_to_js(buffer: &BufferView) -> JsValue {
    match buffer {
        BufferView::Plain {
            text,
            cursor,
            lines,
        } => js_object(&[
            ("masked", JsValue::FALSE),
            ("text", JsValue::from_str(text)),
            ("cursor", JsValue::from_f64(*cursor as f64)),
            ("lines", JsValue::from_f64(*lines as f64)),
        ]),
        BufferView::Masked { len } => js_object(&[
            ("masked", JsValue::TRUE),
            ("len", JsValue::from_f64(*len as f64)),
        ]),
    }
}

fn notice_to_js(notice: &NoticeShown) -> JsValue {
    let buttons: Array = notice
        .buttons
        .iter()
        .map(|label| JsValue::from_str(label))
        .collect();
    js_object(&[
        ("id", JsValue::from_f64(notice.id.0 as f64)),
        ("text", JsValue::from_str(&notice.text)),
        ("class", JsValue::from_str(&notice.class)),
        ("clickable", JsValue::from_bool(notice.clickable)),
        ("buttons", buttons.into()),
    ])
}

fn indicator_to_js(id: IndicatorId, indicator: &Indicator) -> JsValue {
    js_object(&[
        ("id", JsValue::from_f64(f64::from(id.0))),
        ("text", JsValue::from_str(&indicator.text)),
        ("glyph", JsValue::from_str(&indicator.glyph)),
        ("class", JsValue::from_str(&indicator.class)),
        ("clickable", JsValue::from_bool(indicator.clickable)),
    ])
}

// ==============================================================
// ソケット
// ==============================================================

/// `web_sys::WebSocket` を生成するコネクタ
pub struct WebSocketConnector {
    owner: Weak<Shared>,
}

impl Connector for WebSocketConnector {
    type Socket = WebSocketHandle;

    fn is_available(&self) -> bool {
        Reflect::has(&js_sys::global(), &JsValue::from_str("WebSocket")).unwrap_or(false)
    }

    fn connect(
        &mut self,
        id: ConnectionId,
        endpoint: &Endpoint,
    ) -> Result<WebSocketHandle, SocketError> {
        let ws = WebSocket::new_with_str(&endpoint.url(), BINARY_SUBPROTOCOL)
            .map_err(socket_error)?;
        ws.set_binary_type(BinaryType::Arraybuffer);
        let handlers = SocketHandlers::attach(&ws, id, &self.owner);
        Ok(WebSocketHandle {
            ws,
            handlers: Some(handlers),
        })
    }
}

fn socket_error(e: JsValue) -> SocketError {
    SocketError(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

/// WebSocket に登録したイベントハンドラ
struct SocketHandlers {
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl SocketHandlers {
    fn attach(ws: &WebSocket, id: ConnectionId, owner: &Weak<Shared>) -> Self {
        let owner_open = owner.clone();
        let on_open = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            dispatch_weak(&owner_open, |s, v| s.handle_socket_open(id, v));
        });

        let owner_message = owner.clone();
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
            let data = ev.data();
            let frame = match data.as_string() {
                Some(text) => Frame::Text(text),
                None => Frame::Binary(Uint8Array::new(&data).to_vec()),
            };
            dispatch_weak(&owner_message, |s, v| s.handle_socket_message(id, frame, v));
        });

        let owner_close = owner.clone();
        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |_: CloseEvent| {
            dispatch_weak(&owner_close, |s, v| s.handle_socket_close(id, v));
        });

        let owner_error = owner.clone();
        let on_error = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            dispatch_weak(&owner_error, |s, v| s.handle_socket_error(id, v));
        });

        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        SocketHandlers {
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        }
    }
}

/// 開いている WebSocket
pub struct WebSocketHandle {
    ws: WebSocket,
    handlers: Option<SocketHandlers>,
}

impl Socket for WebSocketHandle {
    fn send(&mut self, frame: Frame) -> Result<(), SocketError> {
        match frame {
            Frame::Binary(bytes) => self.ws.send_with_u8_array(&bytes),
            Frame::Text(text) => self.ws.send_with_str(&text),
        }
        .map_err(socket_error)
    }

    fn close(&mut self) {
        let Some(handlers) = self.handlers.take() else {
            return;
        };
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        self.ws.set_onerror(None);
        if let Err(e) = self.ws.close() {
            warn!(error = ?e, "WebSocket.close threw");
        }
        // 自分のハンドラの中から閉じることがあるので、破棄は次のタスクで行う
        wasm_bindgen_futures::spawn_local(async move {
            drop(handlers);
        });
    }
}

impl Drop for WebSocketHandle {
    fn drop(&mut self) {
        self.close();
    }
}

// ==============================================================
// タイマー
// ==============================================================

/// `setTimeout` / `clearTimeout` によるタイマー
pub struct BrowserTimer {
    owner: Weak<Shared>,
}

/// 予約済みの `setTimeout`
///
/// コールバックの Closure はハンドルと同じ寿命。取り消しでも発火後の破棄でも解放される。
pub struct TimeoutHandle {
    id: i32,
    // 発火中に破棄された場合、wasm-bindgen は呼び出しが戻ってから解放する
    _callback: Closure<dyn FnMut()>,
}

impl HostTimer for BrowserTimer {
    /// 予約できなかったときは None
    type Handle = Option<TimeoutHandle>;

    fn schedule(&mut self, delay_ms: u32, token: TimerToken) -> Option<TimeoutHandle> {
        let owner = self.owner.clone();
        let callback = Closure::<dyn FnMut()>::new(move || {
            dispatch_weak(&owner, |s, v| s.handle_timer(token, v));
        });

        let Some(window) = web_sys::window() else {
            error!("no window object: notification timeout not armed");
            return None;
        };
        let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            delay,
        ) {
            Ok(id) => Some(TimeoutHandle {
                id,
                _callback: callback,
            }),
            Err(e) => {
                error!(error = ?e, "setTimeout failed");
                None
            }
        }
    }

    fn cancel(&mut self, handle: Option<TimeoutHandle>) {
        let Some(handle) = handle else {
            return;
        };
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(handle.id);
        }
    }
}

// ==============================================================
// 補完
// ==============================================================

/// JS 関数 `(fragment: string) => string[]` による補完
pub struct JsCompletion {
    func: Option<Function>,
}

impl CompletionProvider for JsCompletion {
    fn complete(&mut self, fragment: &str) -> Vec<String> {
        let Some(func) = &self.func else {
            return Vec::new();
        };
        match func.call1(&JsValue::NULL, &JsValue::from_str(fragment)) {
            Ok(result) if Array::is_array(&result) => Array::from(&result)
                .iter()
                .filter_map(|v| v.as_string())
                .collect(),
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(error = ?e, "completion callback threw");
                Vec::new()
            }
        }
    }
}

/// JS コールバックを次のタスクで呼ぶ
///
/// 通知のコールバックはセッションの借用中に実行されるので、そのまま呼ぶと
/// JS 側から MudClient を呼び直したときに借用が衝突する。
fn deferred(func: Function) -> impl FnOnce() + 'static {
    move || {
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = func.call0(&JsValue::NULL) {
                warn!(error = ?e, "notification callback threw");
            }
        });
    }
}

// ==============================================================
// キー
// ==============================================================

/// `KeyboardEvent.key` をキーに変換する。扱わないキーは None
pub fn parse_key(name: &str, shift: bool) -> Option<Key> {
    let key = match name {
        "Enter" if shift => Key::LineBreak,
        "Enter" => Key::Enter,
        "Backspace" => Key::Backspace,
        "Delete" => Key::Delete,
        "ArrowLeft" => Key::Left,
        "ArrowRight" => Key::Right,
        "Home" => Key::Home,
        "End" => Key::End,
        "ArrowUp" => Key::Up,
        "ArrowDown" => Key::Down,
        "Tab" => Key::Tab,
        "PageUp" => Key::PageUp,
        "PageDown" => Key::PageDown,
        "Escape" => Key::Escape,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Key::Char(ch),
                _ => return None,
            }
        }
    };
    Some(key)
}

// ==============================================================
// MudClient
// ==============================================================

/// ブラウザ用 MUD クライアントセッション
///
/// ## スレッド安全性
///
/// WASM はシングルスレッドのため、`!Send + !Sync` を満たす。
/// JS からは単一スレッドで呼び出される前提。
#[wasm_bindgen]
pub struct MudClient {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl MudClient {
    /// クライアントを初期化する（まだ接続しない）
    ///
    /// # 引数
    /// - `config_json`: `SessionConfig` の JSON。`page_host` は省略時にページの
    ///   `location.host` で埋める
    /// - `hooks`: 表示フックを持つオブジェクト
    ///   (`onMessage`, `onData`, `onInput`, `onEchoMode`, `onScroll`, `onNotice`,
    ///   `onNoticeHidden`, `onIndicator`, `onIndicatorRemoved`, `onState`)
    /// - `completion`: `(fragment) => string[]`。省略時は補完なし
    ///
    /// # エラー
    /// - JSON が不正
    /// - 接続先ホストが決まらない
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: &str,
        hooks: JsValue,
        completion: Option<Function>,
    ) -> Result<MudClient, JsError> {
        let mut config = SessionConfig::from_json(config_json)
            .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?;
        if config.page_host.is_empty() {
            if let Some(host) = web_sys::window().and_then(|w| w.location().host().ok()) {
                config.page_host = host;
            }
        }
        config
            .validate()
            .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?;

        let hooks = JsHooks::from_object(&hooks);
        let shared = Rc::new_cyclic(|owner: &Weak<Shared>| Shared {
            session: RefCell::new(Session::new(
                config,
                WebSocketConnector {
                    owner: owner.clone(),
                },
                BrowserTimer {
                    owner: owner.clone(),
                },
                JsCompletion { func: completion },
            )),
            hooks,
        });
        Ok(MudClient { shared })
    }

    /// 初期表示を流し、WebSocket が使えるか確認する
    ///
    /// # エラー
    /// - WebSocket がない（エラー通知も表示される）
    pub fn setup(&self) -> Result<(), JsError> {
        dispatch(&self.shared, |s, v| s.setup(v))?
            .map_err(|e| JsError::new(&format!("Setup failed: {}", e)))
    }

    /// 接続を開始する。接続中なら置き換える
    ///
    /// 接続の成否は `onState` で通知される。
    pub fn connect(&self) -> Result<(), JsError> {
        dispatch(&self.shared, |s, v| s.connect(v))?
            .map(|_| ())
            .map_err(|e| JsError::new(&format!("Connect failed: {}", e)))
    }

    /// 切断する
    pub fn disconnect(&self) -> Result<(), JsError> {
        Ok(dispatch(&self.shared, |s, v| s.disconnect(v))?)
    }

    /// keydown を処理する
    ///
    /// # 引数
    /// - `key`: `KeyboardEvent.key`
    /// - `shift`: `KeyboardEvent.shiftKey`
    ///
    /// # 戻り値
    /// 処理したら true（呼び出し側で `preventDefault()` する）
    ///
    /// # エラー
    /// - 確定した行を送れなかった（未接続）
    #[wasm_bindgen(js_name = "keyDown")]
    pub fn key_down(&self, key: &str, shift: bool) -> Result<bool, JsError> {
        let Some(key) = parse_key(key, shift) else {
            return Ok(false);
        };
        dispatch(&self.shared, |s, v| s.handle_key(key, v))?
            .map_err(|e| JsError::new(&format!("Send failed: {}", e)))?;
        Ok(true)
    }

    /// 貼り付け
    #[wasm_bindgen(js_name = "insertText")]
    pub fn insert_text(&self, text: &str) -> Result<(), JsError> {
        dispatch(&self.shared, |s, v| s.insert_str(text, v))?
            .map_err(|e| JsError::new(&format!("Send failed: {}", e)))
    }

    /// 入力欄の内容を確定して送る
    pub fn submit(&self) -> Result<(), JsError> {
        dispatch(&self.shared, |s, v| s.submit(v))?
            .map_err(|e| JsError::new(&format!("Send failed: {}", e)))
    }

    /// バイト列をそのまま送る
    #[wasm_bindgen(js_name = "sendBytes")]
    pub fn send_bytes(&self, data: &[u8]) -> Result<(), JsError> {
        let message = ByteMessage::from(data);
        dispatch(&self.shared, |s, _| s.send_bytes(&message))?
            .map_err(|e| JsError::new(&format!("Send failed: {}", e)))
    }

    /// ローカルエコーの有無を切り替える（false でパスワード入力）
    #[wasm_bindgen(js_name = "setEcho")]
    pub fn set_echo(&self, echo: bool) -> Result<(), JsError> {
        let mode = if echo { EchoMode::Plain } else { EchoMode::Masked };
        dispatch(&self.shared, |s, v| s.set_echo_mode(mode, v))?
            .map_err(|e| JsError::new(&format!("Send failed: {}", e)))
    }

    /// 入力欄がフォーカスを得た
    pub fn focus(&self) -> Result<(), JsError> {
        Ok(dispatch(&self.shared, |s, _| s.focus())?)
    }

    /// 入力欄がフォーカスを失った
    pub fn blur(&self) -> Result<(), JsError> {
        Ok(dispatch(&self.shared, |s, _| s.blur())?)
    }

    /// 入力欄にフォーカスがあるか。コールバック実行中は false
    #[wasm_bindgen(js_name = "hasFocus")]
    pub fn has_focus(&self) -> bool {
        self.shared
            .session
            .try_borrow()
            .map(|s| s.has_focus())
            .unwrap_or(false)
    }

    /// 通知を積む
    ///
    /// # 引数
    /// - `text`: 本文
    /// - `class`: 分類（省略時 "info"）
    /// - `timeout_ms`: 自動で閉じるまでの時間（省略時または 0 で無期限）
    /// - `on_click`: クリック時のコールバック。指定するとクリック可能になる
    /// - `on_dismiss`: 閉じたとき（明示 / タイムアウト）のコールバック
    /// - `buttons`: `[label, callback]` の配列
    ///
    /// # 戻り値
    /// 通知 ID
    #[allow(clippy::too_many_arguments)]
    pub fn notify(
        &self,
        text: &str,
        class: Option<String>,
        timeout_ms: Option<u32>,
        on_click: Option<Function>,
        on_dismiss: Option<Function>,
        buttons: Option<Array>,
    ) -> Result<f64, JsError> {
        let item = build_notice(text, class, timeout_ms, on_click, on_dismiss, buttons)?;
        let id = dispatch(&self.shared, |s, v| s.notify(item, v))?;
        Ok(id.0 as f64)
    }

    /// 何も表示していないときだけ通知を積む
    ///
    /// # 戻り値
    /// 積んだら通知 ID、積まなかったら undefined
    #[wasm_bindgen(js_name = "notifyIfIdle")]
    #[allow(clippy::too_many_arguments)]
    pub fn notify_if_idle(
        &self,
        text: &str,
        class: Option<String>,
        timeout_ms: Option<u32>,
        on_click: Option<Function>,
        on_dismiss: Option<Function>,
        buttons: Option<Array>,
    ) -> Result<Option<f64>, JsError> {
        let item = build_notice(text, class, timeout_ms, on_click, on_dismiss, buttons)?;
        let id = dispatch(&self.shared, |s, v| s.notify_if_idle(item, v))?;
        Ok(id.map(|id| id.0 as f64))
    }

    /// 表示中の通知を閉じる
    #[wasm_bindgen(js_name = "dismissNotice")]
    pub fn dismiss_notice(&self) -> Result<bool, JsError> {
        Ok(dispatch(&self.shared, |s, v| s.dismiss_notice(v))?)
    }

    /// 表示中の通知本体がクリックされた
    #[wasm_bindgen(js_name = "clickNotice")]
    pub fn click_notice(&self) -> Result<bool, JsError> {
        Ok(dispatch(&self.shared, |s, v| s.click_notice(v))?)
    }

    /// 表示中の通知のボタンが押された
    ///
    /// # エラー
    /// - 範囲外のボタン番号
    #[wasm_bindgen(js_name = "pressNoticeButton")]
    pub fn press_notice_button(&self, index: u32) -> Result<bool, JsError> {
        dispatch(&self.shared, |s, v| s.press_notice_button(index as usize, v))?
            .map_err(|e| JsError::new(&format!("{}", e)))
    }

    /// インジケータを追加する
    ///
    /// # 戻り値
    /// インジケータ ID
    #[wasm_bindgen(js_name = "addIndicator")]
    pub fn add_indicator(
        &self,
        text: &str,
        glyph: &str,
        class: Option<String>,
        clickable: Option<bool>,
    ) -> Result<u32, JsError> {
        let indicator = Indicator {
            text: String::from(text),
            glyph: String::from(glyph),
            class: class.unwrap_or_default(),
            clickable: clickable.unwrap_or(false),
        };
        let id = dispatch(&self.shared, |s, v| s.add_indicator(indicator, v))?;
        Ok(id.0)
    }

    /// インジケータを部分更新する
    ///
    /// # エラー
    /// - 存在しない ID
    #[wasm_bindgen(js_name = "updateIndicator")]
    pub fn update_indicator(
        &self,
        id: u32,
        text: Option<String>,
        glyph: Option<String>,
        class: Option<String>,
    ) -> Result<(), JsError> {
        let update = IndicatorUpdate { text, glyph, class };
        dispatch(&self.shared, |s, v| {
            s.update_indicator(IndicatorId(id), update, v)
        })?
        .map_err(|e| JsError::new(&format!("{}", e)))
    }

    /// インジケータを削除する
    ///
    /// # エラー
    /// - 存在しない ID
    #[wasm_bindgen(js_name = "removeIndicator")]
    pub fn remove_indicator(&self, id: u32) -> Result<(), JsError> {
        dispatch(&self.shared, |s, v| s.remove_indicator(IndicatorId(id), v))?
            .map_err(|e| JsError::new(&format!("{}", e)))
    }

    /// 接続状態（"idle" / "connecting" / "open" / "closed" / "failed"）
    pub fn state(&self) -> Result<String, JsError> {
        let state = self
            .shared
            .session
            .try_borrow()
            .map_err(|_| SessionBusy)?
            .state();
        Ok(String::from(state_name(state)))
    }

    /// 送受信統計を JSON 文字列で返す
    ///
    /// ```json
    /// { "bytes_sent": 12, "bytes_received": 4096, "messages_sent": 2, "messages_received": 31 }
    /// ```
    #[wasm_bindgen(js_name = "getStats")]
    pub fn get_stats(&self) -> Result<String, JsError> {
        let stats = self
            .shared
            .session
            .try_borrow()
            .map_err(|_| SessionBusy)?
            .stats();
        serde_json::to_string(&stats)
            .map_err(|e| JsError::new(&format!("Stats serialization failed: {}", e)))
    }
}

fn build_notice(
    text: &str,
    class: Option<String>,
    timeout_ms: Option<u32>,
    on_click: Option<Function>,
    on_dismiss: Option<Function>,
    buttons: Option<Array>,
) -> Result<NotificationItem, JsError> {
    let mut item = NotificationItem::new(text).timeout_ms(timeout_ms.unwrap_or(0));
    if let Some(class) = class {
        item = item.class(class);
    }
    if let Some(f) = on_click {
        item = item.on_click(deferred(f));
    }
    if let Some(f) = on_dismiss {
        item = item.on_dismiss(deferred(f));
    }
    for (i, entry) in buttons.iter().flat_map(|a| a.iter()).enumerate() {
        let pair = Array::from(&entry);
        let label = pair
            .get(0)
            .as_string()
            .ok_or_else(|| JsError::new(&format!("button {}: label must be a string", i)))?;
        let action = pair
            .get(1)
            .dyn_into::<Function>()
            .map_err(|_| JsError::new(&format!("button {}: action must be a function", i)))?;
        item = item.button(label, deferred(action));
    }
    Ok(item)
}
