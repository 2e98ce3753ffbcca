//! コーデックのエラー型

use thiserror::Error;

/// バイト列変換のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// 1 オクテットで表せない文字（U+00FF 超）が含まれていた
    #[error("character {ch:?} at offset {offset} does not fit in one octet")]
    NonOctetChar {
        /// 問題の文字
        ch: char,
        /// 文字単位のオフセット
        offset: usize,
    },
}
