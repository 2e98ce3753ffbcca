//! トランスポートフレームとの変換
//!
//! ## 不変条件
//! - `decode(encode(x)) == x`（すべての x について）
//! - 1 ByteMessage ⇔ 1 Frame。結合も分割もしない

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::CodecError;
use crate::message::ByteMessage;

/// トランスポート（WebSocket）上のメッセージ 1 個
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// バイナリフレーム
    Binary(Vec<u8>),
    /// テキストフレーム（古いゲートウェイが送ってくる場合がある）
    Text(String),
}

impl Frame {
    /// フレームのペイロード長（テキストは文字数）
    pub fn len(&self) -> usize {
        match self {
            Frame::Binary(bytes) => bytes.len(),
            Frame::Text(text) => text.chars().count(),
        }
    }

    /// 空フレームか
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// ByteMessage を送信フレームに変換する
///
/// 常に `Frame::Binary`。各バイトはそのまま 1 オクテットになる。
pub fn encode(message: &ByteMessage) -> Frame {
    Frame::Binary(message.as_bytes().to_vec())
}

/// 受信フレームを ByteMessage に変換する
///
/// # エラー
/// - テキストフレームに U+00FF 超の文字があれば `CodecError::NonOctetChar`
pub fn decode(frame: Frame) -> Result<ByteMessage, CodecError> {
    match frame {
        Frame::Binary(bytes) => Ok(ByteMessage::from(bytes)),
        Frame::Text(text) => ByteMessage::from_binary_str(&text),
    }
}

/// 入力行をバイト列にするときの文字エンコーディング
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8
    #[default]
    Utf8,
    /// ISO-8859-1。表現できない文字は `?` に置き換える
    Latin1,
}

impl TextEncoding {
    /// 文字列をエンコードする
    pub fn encode_text(self, text: &str) -> ByteMessage {
        match self {
            TextEncoding::Utf8 => ByteMessage::from(text.as_bytes()),
            TextEncoding::Latin1 => text
                .chars()
                .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
                .collect::<Vec<u8>>()
                .into(),
        }
    }
}
