//! ホスト環境のソケットプリミティブ
//!
//! ブラウザでは `web_sys::WebSocket`、テストではフェイク実装が入る。
//! open / message / close / error のコールバックは実装側が受け取り、
//! `TransportChannel::handle_*` に `ConnectionId` 付きで渡す。

use alloc::string::String;

use mud_codec::Frame;

use crate::channel::ConnectionId;
use crate::endpoint::Endpoint;

/// ソケットプリミティブが返すエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketError(pub String);

impl core::fmt::Display for SocketError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 接続を生成するファクトリ
pub trait Connector {
    /// 生成されるソケットハンドル
    type Socket: Socket;

    /// このホスト環境でプリミティブが使えるか
    fn is_available(&self) -> bool;

    /// 接続を開始する（ノンブロッキング）
    ///
    /// 以後のコールバックには `id` を添えてチャンネルに通知すること。
    fn connect(&mut self, id: ConnectionId, endpoint: &Endpoint)
        -> Result<Self::Socket, SocketError>;
}

/// 開いている（または開きかけの）ソケット
pub trait Socket {
    /// フレームを 1 個送る
    fn send(&mut self, frame: Frame) -> Result<(), SocketError>;

    /// 閉じる。何度呼んでもよい
    fn close(&mut self);
}
