//! TransportChannel: 接続 1 本を所有する状態機械

use alloc::collections::VecDeque;
use alloc::string::String;

use mud_codec::{decode, encode, ByteMessage, Frame};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::connector::{Connector, Socket};
use crate::endpoint::Endpoint;
use crate::error::TransportError;

/// 接続試行ごとに振られる識別子
///
/// 置き換え済みのソケットから遅れて届いたコールバックを見分けるのに使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 接続状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// まだ open されていない
    Idle,
    /// 接続試行中
    Connecting,
    /// 送受信可能
    Open,
    /// 閉じた（ローカル / リモートいずれも）
    Closed,
    /// Open に到達しなかった
    Failed,
}

/// 切断を起こした側
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseInitiator {
    /// `close()` や再接続による置き換え
    Local,
    /// サーバー側からの切断
    Remote,
}

/// チャンネルから上位層への通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// 接続試行を開始した
    Connecting {
        /// 試行の識別子
        id: ConnectionId,
        /// 接続先 URL
        url: String,
    },
    /// Open に到達した
    Connected {
        /// 試行の識別子
        id: ConnectionId,
    },
    /// 受信データ（受信メッセージ 1 個につき 1 個）
    Data(ByteMessage),
    /// Open だった接続が閉じた
    Closed {
        /// 試行の識別子
        id: ConnectionId,
        /// 切断した側
        initiator: CloseInitiator,
    },
    /// 接続試行が失敗した
    Failed {
        /// 試行の識別子
        id: ConnectionId,
        /// 失敗理由（常に `ConnectFailed`）
        error: TransportError,
    },
}

/// 送受信統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStats {
    /// 送信したバイト数
    pub bytes_sent: u64,
    /// 受信したバイト数
    pub bytes_received: u64,
    /// 送信したメッセージ数
    pub messages_sent: u64,
    /// 受信したメッセージ数
    pub messages_received: u64,
}

/// 現在の接続
struct Connection<S> {
    id: ConnectionId,
    endpoint: Endpoint,
    socket: S,
}

/// バイト透過な双方向チャンネル
///
/// ## 責任
/// - 接続状態機械の管理（Idle / Connecting / Open / Closed / Failed）
/// - `ByteMessage` ⇔ `Frame` の変換（`mud-codec`）
/// - ソケットコールバックの世代チェック（古い接続のイベントは捨てる）
///
/// シングルスレッド前提。ホストのイベントループから 1 イベントずつ呼ばれる。
pub struct TransportChannel<C: Connector> {
    connector: C,
    /// ケイパビリティ判定の結果（初回判定までは None）
    capability: Option<bool>,
    state: ConnectionState,
    current: Option<Connection<C::Socket>>,
    next_id: u64,
    events: VecDeque<TransportEvent>,
    stats: TransportStats,
}

impl<C: Connector> TransportChannel<C> {
    /// 新しいチャンネルを生成する（状態は Idle）
    pub fn new(connector: C) -> Self {
        TransportChannel {
            connector,
            capability: None,
            state: ConnectionState::Idle,
            current: None,
            next_id: 1,
            events: VecDeque::new(),
            stats: TransportStats::default(),
        }
    }

    /// ソケットプリミティブが使えるか判定する
    ///
    /// 判定は最初の 1 回だけ行い、結果を覚えておく。
    ///
    /// # エラー
    /// - 使えなければ `TransportError::CapabilityUnavailable`
    pub fn check_capability(&mut self) -> Result<(), TransportError> {
        let available = match self.capability {
            Some(available) => available,
            None => {
                let available = self.connector.is_available();
                if available {
                    debug!("socket primitive available");
                } else {
                    warn!("socket primitive unavailable");
                }
                self.capability = Some(available);
                available
            }
        };

        if available {
            Ok(())
        } else {
            Err(TransportError::CapabilityUnavailable)
        }
    }

    /// 接続を開始する
    ///
    /// Connecting / Open の接続があれば先に閉じる（キューイングはしない）。
    /// 接続結果は `poll_event()` で通知する。
    ///
    /// # エラー
    /// - `TransportError::CapabilityUnavailable`（接続試行前に判定）
    pub fn open(&mut self, endpoint: Endpoint) -> Result<ConnectionId, TransportError> {
        self.check_capability()?;

        if self.current.is_some() {
            debug!(state = ?self.state, "superseding previous connection");
            self.release(CloseInitiator::Local);
        }

        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        let url = endpoint.url();
        info!(%id, %url, "connecting");
        self.state = ConnectionState::Connecting;
        self.events.push_back(TransportEvent::Connecting {
            id,
            url: url.clone(),
        });

        match self.connector.connect(id, &endpoint) {
            Ok(socket) => {
                self.current = Some(Connection {
                    id,
                    endpoint,
                    socket,
                });
            }
            Err(e) => {
                warn!(%id, error = %e, "socket creation failed");
                self.state = ConnectionState::Failed;
                self.events.push_back(TransportEvent::Failed {
                    id,
                    error: TransportError::ConnectFailed { endpoint: url },
                });
            }
        }

        Ok(id)
    }

    /// バイト列を送る
    ///
    /// メッセージ 1 個はそのままフレーム 1 個になる。
    ///
    /// # エラー
    /// - Open でなければ `TransportError::NotConnected`
    /// - ソケットが送信を拒否した場合は接続を閉じ、`NotConnected`
    pub fn send(&mut self, message: &ByteMessage) -> Result<(), TransportError> {
        if self.state != ConnectionState::Open {
            return Err(TransportError::NotConnected);
        }
        let conn = self.current.as_mut().ok_or(TransportError::NotConnected)?;

        match conn.socket.send(encode(message)) {
            Ok(()) => {
                self.stats.bytes_sent += message.len() as u64;
                self.stats.messages_sent += 1;
                trace!(len = message.len(), "sent");
                Ok(())
            }
            Err(e) => {
                warn!(id = %conn.id, error = %e, "send failed, dropping connection");
                self.release(CloseInitiator::Remote);
                self.state = ConnectionState::Closed;
                Err(TransportError::NotConnected)
            }
        }
    }

    /// 接続を閉じる。どの状態からでも呼べて、常に成功する
    pub fn close(&mut self) {
        if self.current.is_some() {
            info!(state = ?self.state, "closing connection");
        }
        self.release(CloseInitiator::Local);
        self.state = ConnectionState::Closed;
    }

    /// ソケットの open コールバック
    pub fn handle_open(&mut self, id: ConnectionId) {
        if !self.is_current(id) {
            trace!(%id, "ignoring open from stale socket");
            return;
        }
        if self.state == ConnectionState::Connecting {
            info!(%id, "connected");
            self.state = ConnectionState::Open;
            self.events.push_back(TransportEvent::Connected { id });
        }
    }

    /// ソケットの message コールバック
    ///
    /// フレームごとに独立してデコードし、`Data` を 1 個積む。
    pub fn handle_message(&mut self, id: ConnectionId, frame: Frame) {
        if !self.is_current(id) {
            trace!(%id, "ignoring message from stale socket");
            return;
        }
        if self.state != ConnectionState::Open {
            warn!(%id, state = ?self.state, "message outside open state dropped");
            return;
        }

        match decode(frame) {
            Ok(message) => {
                self.stats.bytes_received += message.len() as u64;
                self.stats.messages_received += 1;
                trace!(len = message.len(), "received");
                self.events.push_back(TransportEvent::Data(message));
            }
            Err(e) => {
                warn!(%id, error = %e, "undecodable frame dropped");
            }
        }
    }

    /// ソケットの close コールバック
    pub fn handle_close(&mut self, id: ConnectionId) {
        if !self.is_current(id) {
            trace!(%id, "ignoring close from stale socket");
            return;
        }
        match self.state {
            ConnectionState::Open => {
                info!(%id, "closed by remote");
                self.release(CloseInitiator::Remote);
                self.state = ConnectionState::Closed;
            }
            ConnectionState::Connecting => self.fail(),
            _ => {}
        }
    }

    /// ソケットの error コールバック
    ///
    /// Open 中のエラーの後には必ず close が来るので、ここでは何もしない。
    pub fn handle_error(&mut self, id: ConnectionId) {
        if !self.is_current(id) {
            return;
        }
        match self.state {
            ConnectionState::Connecting => self.fail(),
            state => debug!(%id, ?state, "socket error"),
        }
    }

    /// 溜まっているイベントを 1 個取り出す
    pub fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }

    /// 現在の状態
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Open か
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// 現在の接続の識別子
    pub fn current_id(&self) -> Option<ConnectionId> {
        self.current.as_ref().map(|c| c.id)
    }

    /// 現在の接続先
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.current.as_ref().map(|c| &c.endpoint)
    }

    /// 送受信統計
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// コネクタへの参照
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// コネクタへの可変参照
    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    // ===== Private メソッド =====

    fn is_current(&self, id: ConnectionId) -> bool {
        self.current.as_ref().map(|c| c.id) == Some(id)
    }

    /// ハンドルを解放する。Open だった場合だけ Closed を通知する
    fn release(&mut self, initiator: CloseInitiator) {
        if let Some(mut conn) = self.current.take() {
            conn.socket.close();
            if self.state == ConnectionState::Open {
                self.events.push_back(TransportEvent::Closed {
                    id: conn.id,
                    initiator,
                });
            }
        }
    }

    /// Connecting から Failed へ
    fn fail(&mut self) {
        if let Some(mut conn) = self.current.take() {
            conn.socket.close();
            let endpoint = conn.endpoint.url();
            warn!(id = %conn.id, %endpoint, "connection attempt failed");
            self.state = ConnectionState::Failed;
            self.events.push_back(TransportEvent::Failed {
                id: conn.id,
                error: TransportError::ConnectFailed { endpoint },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::SocketError;
    use crate::endpoint::SocketSettings;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    /// ソケットへの操作を記録するフェイク
    #[derive(Default)]
    struct Log {
        sent: Vec<Frame>,
        closed: Vec<ConnectionId>,
        connects: Vec<ConnectionId>,
    }

    struct FakeConnector {
        available: bool,
        refuse: bool,
        log: Rc<RefCell<Log>>,
    }

    struct FakeSocket {
        id: ConnectionId,
        fail_send: bool,
        log: Rc<RefCell<Log>>,
    }

    impl Connector for FakeConnector {
        type Socket = FakeSocket;

        fn is_available(&self) -> bool {
            self.available
        }

        fn connect(
            &mut self,
            id: ConnectionId,
            _endpoint: &Endpoint,
        ) -> Result<FakeSocket, SocketError> {
            if self.refuse {
                return Err(SocketError(String::from("refused")));
            }
            self.log.borrow_mut().connects.push(id);
            Ok(FakeSocket {
                id,
                fail_send: false,
                log: self.log.clone(),
            })
        }
    }

    impl Socket for FakeSocket {
        fn send(&mut self, frame: Frame) -> Result<(), SocketError> {
            if self.fail_send {
                return Err(SocketError(String::from("broken pipe")));
            }
            self.log.borrow_mut().sent.push(frame);
            Ok(())
        }

        fn close(&mut self) {
            self.log.borrow_mut().closed.push(self.id);
        }
    }

    fn channel() -> (TransportChannel<FakeConnector>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let connector = FakeConnector {
            available: true,
            refuse: false,
            log: log.clone(),
        };
        (TransportChannel::new(connector), log)
    }

    fn endpoint() -> Endpoint {
        Endpoint::resolve(&SocketSettings::default(), 4000, None, "localhost")
    }

    fn drain(ch: &mut TransportChannel<FakeConnector>) -> Vec<TransportEvent> {
        core::iter::from_fn(|| ch.poll_event()).collect()
    }

    #[test]
    fn test_open_then_ready() {
        let (mut ch, _) = channel();
        let id = ch.open(endpoint()).unwrap();
        assert_eq!(ch.state(), ConnectionState::Connecting);

        ch.handle_open(id);
        assert!(ch.is_open());
        assert_eq!(
            drain(&mut ch),
            alloc::vec![
                TransportEvent::Connecting {
                    id,
                    url: String::from("ws://localhost:843/port_4000"),
                },
                TransportEvent::Connected { id },
            ]
        );
    }

    #[test]
    fn test_send_requires_open() {
        let (mut ch, log) = channel();
        let msg = ByteMessage::from(&b"look"[..]);
        assert_eq!(ch.send(&msg), Err(TransportError::NotConnected));

        let id = ch.open(endpoint()).unwrap();
        assert_eq!(ch.send(&msg), Err(TransportError::NotConnected));

        ch.handle_open(id);
        ch.send(&msg).unwrap();
        assert_eq!(log.borrow().sent, alloc::vec![Frame::Binary(b"look".to_vec())]);
        assert_eq!(ch.stats().bytes_sent, 4);
    }

    #[test]
    fn test_each_send_is_one_frame() {
        let (mut ch, log) = channel();
        let id = ch.open(endpoint()).unwrap();
        ch.handle_open(id);

        ch.send(&ByteMessage::from(alloc::vec![0xFFu8, 0xFD, 0x01])).unwrap();
        ch.send(&ByteMessage::new()).unwrap();
        let sent = &log.borrow().sent;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], Frame::Binary(alloc::vec![0xFF, 0xFD, 0x01]));
        assert_eq!(sent[1], Frame::Binary(alloc::vec![]));
    }

    #[test]
    fn test_inbound_messages_are_not_merged() {
        let (mut ch, _) = channel();
        let id = ch.open(endpoint()).unwrap();
        ch.handle_open(id);
        drain(&mut ch);

        ch.handle_message(id, Frame::Binary(b"part1".to_vec()));
        ch.handle_message(id, Frame::Binary(b"part2".to_vec()));
        assert_eq!(
            drain(&mut ch),
            alloc::vec![
                TransportEvent::Data(ByteMessage::from(&b"part1"[..])),
                TransportEvent::Data(ByteMessage::from(&b"part2"[..])),
            ]
        );
        assert_eq!(ch.stats().messages_received, 2);
    }

    #[test]
    fn test_remote_close_after_open_reports_closed() {
        let (mut ch, _) = channel();
        let id = ch.open(endpoint()).unwrap();
        ch.handle_open(id);
        drain(&mut ch);

        ch.handle_close(id);
        assert_eq!(ch.state(), ConnectionState::Closed);
        assert_eq!(
            drain(&mut ch),
            alloc::vec![TransportEvent::Closed {
                id,
                initiator: CloseInitiator::Remote,
            }]
        );
    }

    #[test]
    fn test_close_before_open_is_failure_not_disconnect() {
        let (mut ch, _) = channel();
        let id = ch.open(endpoint()).unwrap();
        drain(&mut ch);

        ch.handle_close(id);
        assert_eq!(ch.state(), ConnectionState::Failed);
        let events = drain(&mut ch);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            TransportEvent::Failed {
                error: TransportError::ConnectFailed { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_error_while_connecting_fails() {
        let (mut ch, log) = channel();
        let id = ch.open(endpoint()).unwrap();
        ch.handle_error(id);
        assert_eq!(ch.state(), ConnectionState::Failed);
        assert_eq!(log.borrow().closed, alloc::vec![id]);

        // Failed からは新しい open が必要
        ch.handle_open(id);
        assert_eq!(ch.state(), ConnectionState::Failed);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut ch, log) = channel();
        ch.close();
        assert_eq!(ch.state(), ConnectionState::Closed);

        let id = ch.open(endpoint()).unwrap();
        ch.handle_open(id);
        drain(&mut ch);

        ch.close();
        ch.close();
        assert_eq!(ch.state(), ConnectionState::Closed);
        assert_eq!(log.borrow().closed, alloc::vec![id]);
        assert_eq!(
            drain(&mut ch),
            alloc::vec![TransportEvent::Closed {
                id,
                initiator: CloseInitiator::Local,
            }]
        );
    }

    #[test]
    fn test_second_open_supersedes_first() {
        let (mut ch, log) = channel();
        let first = ch.open(endpoint()).unwrap();
        ch.handle_open(first);
        let second = ch.open(endpoint()).unwrap();
        assert_ne!(first, second);
        assert_eq!(log.borrow().closed, alloc::vec![first]);
        assert_eq!(ch.state(), ConnectionState::Connecting);

        // 古いソケットのイベントは無視される
        ch.handle_close(first);
        ch.handle_message(first, Frame::Binary(b"stale".to_vec()));
        assert_eq!(ch.state(), ConnectionState::Connecting);

        ch.handle_open(second);
        assert!(ch.is_open());
        let events = drain(&mut ch);
        assert!(events.contains(&TransportEvent::Closed {
            id: first,
            initiator: CloseInitiator::Local,
        }));
        assert!(!events.iter().any(|e| matches!(e, TransportEvent::Data(_))));
    }

    #[test]
    fn test_capability_checked_once() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut ch = TransportChannel::new(FakeConnector {
            available: false,
            refuse: false,
            log: log.clone(),
        });
        assert_eq!(ch.open(endpoint()), Err(TransportError::CapabilityUnavailable));

        // 判定結果はキャッシュされる
        ch.connector_mut().available = true;
        assert_eq!(ch.check_capability(), Err(TransportError::CapabilityUnavailable));
        assert!(log.borrow().connects.is_empty());
        assert_eq!(ch.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_refused_socket_creation_fails_attempt() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut ch = TransportChannel::new(FakeConnector {
            available: true,
            refuse: true,
            log,
        });
        let id = ch.open(endpoint()).unwrap();
        assert_eq!(ch.state(), ConnectionState::Failed);
        let events = drain(&mut ch);
        assert!(matches!(events[1], TransportEvent::Failed { id: failed, .. } if failed == id));
    }

    #[test]
    fn test_send_failure_drops_connection() {
        let (mut ch, _) = channel();
        let id = ch.open(endpoint()).unwrap();
        ch.handle_open(id);
        drain(&mut ch);

        if let Some(conn) = ch.current.as_mut() {
            conn.socket.fail_send = true;
        }
        assert_eq!(
            ch.send(&ByteMessage::from(&b"x"[..])),
            Err(TransportError::NotConnected)
        );
        assert_eq!(ch.state(), ConnectionState::Closed);
        assert_eq!(
            drain(&mut ch),
            alloc::vec![TransportEvent::Closed {
                id,
                initiator: CloseInitiator::Remote,
            }]
        );
    }
}
