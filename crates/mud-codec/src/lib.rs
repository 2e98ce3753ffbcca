//! # mud-codec
//!
//! 8-bit-clean バイト列と WebSocket フレームの相互変換。
//!
//! ## 設計の背景
//!
//! MUD サーバーは telnet 由来のプロトコルで 0〜255 のすべてのバイト値を使う
//! (IAC = 0xFF など)。テキストとして安全ではないため、WebSocket の
//! テキストフレームで UTF-8 として運ぶと値が化ける。
//! このクレートは論理バイト 1 個を必ず生オクテット 1 個に対応させる。
//!
//! ```text
//! 送信:
//!   ByteMessage ──encode──▶ Frame::Binary (1 メッセージ = 1 フレーム)
//!
//! 受信:
//!   Frame::Binary ──decode──▶ ByteMessage (そのまま)
//!   Frame::Text   ──decode──▶ ByteMessage (U+0000..U+00FF を 1 バイトに)
//! ```
//!
//! フレームの結合・分割は一切しない。

#![cfg_attr(not(test), no_std)]
extern crate alloc;

mod error;
pub mod frame;
pub mod message;

pub use error::CodecError;
pub use frame::{decode, encode, Frame, TextEncoding};
pub use message::ByteMessage;

/// 行末に付ける改行シーケンス（telnet の NVT 規約）
pub const LINE_TERMINATOR: &[u8] = b"\r\n";
