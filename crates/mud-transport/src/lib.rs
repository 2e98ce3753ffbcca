//! # mud-transport
//!
//! MUD サーバーへのバイト透過な双方向チャンネル。
//!
//! WebSocket のようなメッセージ指向のプリミティブ（`Connector` / `Socket`）の上に、
//! 接続状態機械と 8-bit-clean なバイト列の送受信を載せる。
//!
//! ## 状態遷移
//!
//! ```text
//! Idle ──open──▶ Connecting ──ready──▶ Open ──close / remote close──▶ Closed
//!                    │
//!                    └──failure──▶ Failed（終端。再度 open が必要）
//! ```
//!
//! - `Closed` イベントは直前の状態が `Open` のときだけ発火する
//! - Connecting / Open 中の `open` は前の接続を閉じてから新しく始める
//! - 結果は戻り値ではなく `poll_event()` で取り出すイベントとして通知する
//!
//! ## 受信フロー
//!
//! ```text
//! Socket コールバック (host)
//!   → channel.handle_message(id, frame)
//!   → mud_codec::decode(frame)
//!   → TransportEvent::Data(ByteMessage)  ← 受信メッセージ 1 個につき 1 個
//! ```

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod channel;
pub mod connector;
pub mod endpoint;
mod error;

pub use channel::{
    CloseInitiator, ConnectionId, ConnectionState, TransportChannel, TransportEvent,
    TransportStats,
};
pub use connector::{Connector, Socket, SocketError};
pub use endpoint::{Endpoint, SocketSettings, BINARY_SUBPROTOCOL, DEFAULT_POLICY_PORT};
pub use error::TransportError;
