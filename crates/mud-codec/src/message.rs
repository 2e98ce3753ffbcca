//! ByteMessage: 0〜255 の値の並び

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::CodecError;

/// 8-bit-clean なバイト列
///
/// リモートセッションとの間でやり取りする最小単位。中身は常に生オクテットで、
/// 文字コードとしての解釈は一切しない。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteMessage(Vec<u8>);

impl ByteMessage {
    /// 空のメッセージ
    pub fn new() -> Self {
        ByteMessage(Vec::new())
    }

    /// バイナリ文字列（各文字が U+0000..U+00FF）から変換する
    ///
    /// JS 側の「1 文字 = 1 バイト」文字列表現との橋渡し用。
    ///
    /// # エラー
    /// - U+00FF を超える文字があれば `CodecError::NonOctetChar`
    pub fn from_binary_str(s: &str) -> Result<Self, CodecError> {
        let mut bytes = Vec::with_capacity(s.len());
        for (offset, ch) in s.chars().enumerate() {
            let code = u32::from(ch);
            if code > 0xFF {
                return Err(CodecError::NonOctetChar { ch, offset });
            }
            bytes.push(code as u8);
        }
        Ok(ByteMessage(bytes))
    }

    /// バイナリ文字列に変換する（`from_binary_str` の逆変換）
    pub fn to_binary_string(&self) -> String {
        self.0.iter().map(|&b| char::from(b)).collect()
    }

    /// バイト列への参照
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// 内部の Vec を取り出す
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// バイト数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 末尾にバイト列を追加する
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }
}

impl From<Vec<u8>> for ByteMessage {
    fn from(bytes: Vec<u8>) -> Self {
        ByteMessage(bytes)
    }
}

impl From<&[u8]> for ByteMessage {
    fn from(bytes: &[u8]) -> Self {
        ByteMessage(bytes.to_vec())
    }
}

impl AsRef<[u8]> for ByteMessage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
