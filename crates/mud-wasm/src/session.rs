//! Session: トランスポート・入力・通知を束ねるホスト非依存の本体
//!
//! ブラウザ API には触れない。ソケット・タイマー・補完候補は型引数で注入し、
//! 表示は各操作に渡す `SessionView` に流す。
//!
//! ```text
//! Session
//!   ├── TransportChannel<C>   (mud-transport) - WebSocket 接続
//!   ├── InputController<P>    (mud-input)     - 入力欄
//!   ├── NotificationQueue<T>  (mud-notify)    - 通知バー
//!   └── IndicatorTray         (mud-notify)    - 接続状態アイコンほか
//! ```

use mud_codec::{ByteMessage, Frame, TextEncoding, LINE_TERMINATOR};
use mud_input::{
    BufferView, CompletionProvider, EchoMode, InputController, InputEvent, Key, ScrollDirection,
};
use mud_notify::{
    HostTimer, Indicator, IndicatorId, IndicatorTray, IndicatorUpdate, NoticeEvent, NoticeShown,
    NotificationId, NotificationItem, NotificationQueue, NotifyError, TimerToken,
};
use mud_transport::{
    CloseInitiator, ConnectionId, ConnectionState, Connector, Endpoint, TransportChannel,
    TransportError, TransportEvent, TransportStats,
};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;

/// 接続できなかったときの通知の分類
pub const ERROR_CLASS: &str = "error";

/// 表示メッセージの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTag {
    /// ローカルエコーした入力行
    UserInput,
    /// クライアントからのお知らせ
    Notice,
}

impl MessageTag {
    /// 表示層で使うタグ名
    pub fn as_str(self) -> &'static str {
        match self {
            MessageTag::UserInput => "user-input",
            MessageTag::Notice => "notice",
        }
    }
}

/// 表示層
///
/// `message` と `received` 以外は既定で何もしない。
pub trait SessionView {
    /// クライアント側の行を表示する
    fn message(&mut self, text: &str, tag: MessageTag);

    /// サーバーから届いたバイト列（解釈は表示層に任せる）
    fn received(&mut self, data: &ByteMessage);

    /// 入力欄の内容が変わった
    fn input_changed(&mut self, _view: &BufferView) {}

    /// エコーモードが変わった
    fn echo_mode_changed(&mut self, _mode: EchoMode) {}

    /// 出力欄のスクロール要求（PageUp / PageDown）
    fn scroll(&mut self, _direction: ScrollDirection) {}

    /// 通知バーに表示する
    fn notice_shown(&mut self, _notice: &NoticeShown) {}

    /// 通知バーを閉じる
    fn notice_hidden(&mut self, _id: NotificationId) {}

    /// インジケータの追加・更新
    fn indicator_changed(&mut self, _id: IndicatorId, _indicator: &Indicator) {}

    /// インジケータの削除
    fn indicator_removed(&mut self, _id: IndicatorId) {}

    /// 接続状態が変わった
    fn connection_changed(&mut self, _state: ConnectionState) {}
}

/// 接続状態アイコンの見た目
fn connectivity_update(state: ConnectionState) -> IndicatorUpdate {
    let (text, class) = match state {
        ConnectionState::Connecting => ("Connecting to the server.", "connectivity connecting"),
        ConnectionState::Open => ("Connected to the server.", "connectivity connected"),
        ConnectionState::Idle | ConnectionState::Closed | ConnectionState::Failed => {
            ("Not connected to the server.", "connectivity disconnected")
        }
    };
    IndicatorUpdate {
        text: Some(String::from(text)),
        glyph: None,
        class: Some(String::from(class)),
    }
}

/// クライアントセッション
///
/// シングルスレッド前提。ホストのイベントループから 1 イベントずつ呼ばれ、
/// 各操作の最後に全コンポーネントのイベントを `view` に流す。
pub struct Session<C: Connector, T: HostTimer, P: CompletionProvider> {
    config: SessionConfig,
    encoding: TextEncoding,
    transport: TransportChannel<C>,
    input: InputController<P>,
    notices: NotificationQueue<T>,
    tray: IndicatorTray,
    connectivity: IndicatorId,
    /// ケイパビリティ不足を通知済みか
    capability_reported: bool,
}

impl<C: Connector, T: HostTimer, P: CompletionProvider> Session<C, T, P> {
    /// セッションを生成する（未接続）
    pub fn new(config: SessionConfig, connector: C, timer: T, provider: P) -> Self {
        let mut tray = IndicatorTray::new();
        let initial = connectivity_update(ConnectionState::Idle);
        let connectivity = tray.add(Indicator {
            text: initial.text.unwrap_or_default(),
            glyph: String::from("\u{25cf}"),
            class: initial.class.unwrap_or_default(),
            clickable: false,
        });

        Session {
            encoding: config.encoding.into(),
            input: InputController::new(config.input, provider),
            transport: TransportChannel::new(connector),
            notices: NotificationQueue::new(timer),
            tray,
            connectivity,
            capability_reported: false,
            config,
        }
    }

    /// 初期化: ケイパビリティを確認し、インジケータを表示層に出す
    pub fn setup(&mut self, view: &mut impl SessionView) -> Result<(), TransportError> {
        for (id, indicator) in self.tray.iter() {
            view.indicator_changed(id, indicator);
        }
        view.input_changed(&self.input.buffer().view());

        let result = self.transport.check_capability();
        if result.is_err() {
            self.report_missing_capability();
        }
        self.drain(view);
        result
    }

    /// 設定の接続先に接続する。接続中なら置き換える
    pub fn connect(&mut self, view: &mut impl SessionView) -> Result<ConnectionId, TransportError> {
        let endpoint = Endpoint::resolve(
            &self.config.socket,
            self.config.port,
            self.config.host.as_deref(),
            &self.config.page_host,
        );
        info!(url = %endpoint.url(), "connecting");

        let result = self.transport.open(endpoint);
        if let Err(TransportError::CapabilityUnavailable) = result {
            self.report_missing_capability();
        }
        self.drain(view);
        result
    }

    /// 切断する
    pub fn disconnect(&mut self, view: &mut impl SessionView) {
        let before = self.transport.state();
        self.transport.close();
        self.drain(view);
        // 接続試行中の取り消しはイベントにならない
        if before == ConnectionState::Connecting {
            self.show_state(ConnectionState::Closed, view);
        }
    }

    /// キー入力を処理する
    ///
    /// 確定した行はエンコードして送信する。未接続なら `NotConnected` を返すが、
    /// 入力欄はすでに空になっている。
    pub fn handle_key(
        &mut self,
        key: Key,
        view: &mut impl SessionView,
    ) -> Result<(), TransportError> {
        self.input.handle_key(key);
        self.pump(view)
    }

    /// 貼り付け
    pub fn insert_str(
        &mut self,
        text: &str,
        view: &mut impl SessionView,
    ) -> Result<(), TransportError> {
        self.input.insert_str(text);
        self.pump(view)
    }

    /// 入力欄の内容をそのまま確定する
    pub fn submit(&mut self, view: &mut impl SessionView) -> Result<(), TransportError> {
        self.input.submit();
        self.pump(view)
    }

    /// エコーモードを切り替える（サーバーのパスワード要求など）
    pub fn set_echo_mode(
        &mut self,
        mode: EchoMode,
        view: &mut impl SessionView,
    ) -> Result<(), TransportError> {
        self.input.set_echo_mode(mode);
        self.pump(view)
    }

    /// 入力欄がフォーカスを得た
    pub fn focus(&mut self) {
        self.input.focus();
    }

    /// 入力欄がフォーカスを失った
    pub fn blur(&mut self) {
        self.input.blur();
    }

    /// 入力欄にフォーカスがあるか
    pub fn has_focus(&self) -> bool {
        self.input.has_focus()
    }

    /// バイト列をそのまま送る（テルネット応答など）
    pub fn send_bytes(&mut self, data: &ByteMessage) -> Result<(), TransportError> {
        self.transport.send(data)
    }

    /// 通知を積む
    pub fn notify(
        &mut self,
        item: NotificationItem,
        view: &mut impl SessionView,
    ) -> NotificationId {
        let id = self.notices.enqueue(item);
        self.drain(view);
        id
    }

    /// 何も表示していないときだけ通知を積む
    pub fn notify_if_idle(
        &mut self,
        item: NotificationItem,
        view: &mut impl SessionView,
    ) -> Option<NotificationId> {
        let id = self.notices.enqueue_if_idle(item);
        self.drain(view);
        id
    }

    /// 表示中の通知を閉じる
    pub fn dismiss_notice(&mut self, view: &mut impl SessionView) -> bool {
        let dismissed = self.notices.dismiss();
        self.drain(view);
        dismissed
    }

    /// 表示中の通知をクリックする
    pub fn click_notice(&mut self, view: &mut impl SessionView) -> bool {
        let clicked = self.notices.click();
        self.drain(view);
        clicked
    }

    /// 表示中の通知のボタンを押す
    pub fn press_notice_button(
        &mut self,
        index: usize,
        view: &mut impl SessionView,
    ) -> Result<bool, NotifyError> {
        let result = self.notices.press_button(index);
        self.drain(view);
        result
    }

    /// 通知タイマーの発火
    pub fn handle_timer(&mut self, token: TimerToken, view: &mut impl SessionView) {
        self.notices.handle_timer(token);
        self.drain(view);
    }

    /// インジケータを追加する
    pub fn add_indicator(
        &mut self,
        indicator: Indicator,
        view: &mut impl SessionView,
    ) -> IndicatorId {
        let id = self.tray.add(indicator);
        if let Ok(added) = self.tray.get(id) {
            view.indicator_changed(id, added);
        }
        id
    }

    /// インジケータを部分更新する
    pub fn update_indicator(
        &mut self,
        id: IndicatorId,
        update: IndicatorUpdate,
        view: &mut impl SessionView,
    ) -> Result<(), NotifyError> {
        let updated = self.tray.update(id, update)?;
        view.indicator_changed(id, updated);
        Ok(())
    }

    /// インジケータを削除する
    pub fn remove_indicator(
        &mut self,
        id: IndicatorId,
        view: &mut impl SessionView,
    ) -> Result<(), NotifyError> {
        self.tray.remove(id)?;
        view.indicator_removed(id);
        Ok(())
    }

    // ----------------------------------------------------------
    // ソケットコールバック
    // ----------------------------------------------------------

    /// ソケットが開いた
    pub fn handle_socket_open(&mut self, id: ConnectionId, view: &mut impl SessionView) {
        self.transport.handle_open(id);
        self.drain(view);
    }

    /// フレームを受信した
    pub fn handle_socket_message(
        &mut self,
        id: ConnectionId,
        frame: Frame,
        view: &mut impl SessionView,
    ) {
        self.transport.handle_message(id, frame);
        self.drain(view);
    }

    /// ソケットが閉じた
    pub fn handle_socket_close(&mut self, id: ConnectionId, view: &mut impl SessionView) {
        self.transport.handle_close(id);
        self.drain(view);
    }

    /// ソケットのエラー。接続中なら失敗扱いになる
    pub fn handle_socket_error(&mut self, id: ConnectionId, view: &mut impl SessionView) {
        self.transport.handle_error(id);
        self.drain(view);
    }

    // ----------------------------------------------------------
    // 参照
    // ----------------------------------------------------------

    /// 接続状態
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// 送受信の統計
    pub fn stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// 設定
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// トランスポートへの参照
    pub fn transport(&self) -> &TransportChannel<C> {
        &self.transport
    }

    /// トランスポートへの可変参照
    pub fn transport_mut(&mut self) -> &mut TransportChannel<C> {
        &mut self.transport
    }

    /// 入力コントローラへの参照
    pub fn input(&self) -> &InputController<P> {
        &self.input
    }

    /// 通知キューへの参照
    pub fn notices(&self) -> &NotificationQueue<T> {
        &self.notices
    }

    /// 通知キューへの可変参照
    pub fn notices_mut(&mut self) -> &mut NotificationQueue<T> {
        &mut self.notices
    }

    /// インジケータ一覧
    pub fn tray(&self) -> &IndicatorTray {
        &self.tray
    }

    /// 接続状態アイコンの ID
    pub fn connectivity_indicator(&self) -> IndicatorId {
        self.connectivity
    }

    // ----------------------------------------------------------
    // 内部
    // ----------------------------------------------------------

    fn report_missing_capability(&mut self) {
        if self.capability_reported {
            return;
        }
        self.capability_reported = true;
        warn!("WebSocket is not available in this environment");
        self.notices.enqueue(
            NotificationItem::new("This browser does not support WebSocket connections.")
                .class(ERROR_CLASS),
        );
    }

    /// 確定行を送信バイト列にする
    ///
    /// 改行は CRLF に揃え、末尾にも CRLF を付ける。
    fn encode_line(&self, line: &str) -> ByteMessage {
        let mut bytes = ByteMessage::new();
        for (i, part) in line.split('\n').enumerate() {
            if i > 0 {
                bytes.extend_from_slice(LINE_TERMINATOR);
            }
            let part = part.strip_suffix('\r').unwrap_or(part);
            bytes.extend_from_slice(self.encoding.encode_text(part).as_bytes());
        }
        bytes.extend_from_slice(LINE_TERMINATOR);
        bytes
    }

    /// 全コンポーネントのイベントを表示層に流す
    ///
    /// 送信失敗は最初の 1 件を返す。
    fn pump(&mut self, view: &mut impl SessionView) -> Result<(), TransportError> {
        let mut first_error = None;

        while let Some(event) = self.input.poll_event() {
            match event {
                InputEvent::Submit(line) => {
                    let bytes = self.encode_line(&line);
                    if let Err(e) = self.transport.send(&bytes) {
                        debug!(error = %e, "submitted line was not sent");
                        first_error.get_or_insert(e);
                    }
                }
                InputEvent::Echo(line) => view.message(&line, MessageTag::UserInput),
                InputEvent::Changed(buffer) => view.input_changed(&buffer),
                InputEvent::EchoModeChanged(mode) => view.echo_mode_changed(mode),
                InputEvent::Scroll(direction) => view.scroll(direction),
            }
        }

        // 送信失敗で接続が落ちた場合のイベントもここで拾う
        self.drain(view);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// トランスポートと通知のイベントを表示層に流す
    fn drain(&mut self, view: &mut impl SessionView) {
        while let Some(event) = self.transport.poll_event() {
            self.apply_transport_event(event, view);
        }

        while let Some(event) = self.notices.poll_event() {
            match event {
                NoticeEvent::Shown(notice) => view.notice_shown(&notice),
                NoticeEvent::Hidden { id, .. } => view.notice_hidden(id),
            }
        }
    }

    fn apply_transport_event(&mut self, event: TransportEvent, view: &mut impl SessionView) {
        let state = match event {
            TransportEvent::Data(message) => {
                view.received(&message);
                return;
            }
            TransportEvent::Connecting { .. } => ConnectionState::Connecting,
            TransportEvent::Connected { .. } => ConnectionState::Open,
            TransportEvent::Closed { id, initiator } => {
                info!(%id, ?initiator, "connection closed");
                if initiator == CloseInitiator::Remote {
                    view.message("The connection was closed by the server.", MessageTag::Notice);
                }
                ConnectionState::Closed
            }
            TransportEvent::Failed { id, error } => {
                warn!(%id, %error, "connection failed");
                self.notices
                    .enqueue(NotificationItem::new(error.to_string()).class(ERROR_CLASS));
                ConnectionState::Failed
            }
        };

        self.show_state(state, view);
    }

    fn show_state(&mut self, state: ConnectionState, view: &mut impl SessionView) {
        if let Ok(indicator) = self.tray.update(self.connectivity, connectivity_update(state)) {
            view.indicator_changed(self.connectivity, indicator);
        }
        view.connection_changed(state);
    }
}
