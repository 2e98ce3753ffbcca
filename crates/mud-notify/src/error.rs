//! 通知まわりのエラー型

use thiserror::Error;

/// 呼び出し側の誤りを表すエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// 存在しない ID / 添字を指定した
    #[error("invalid reference: no {kind} with id {id}")]
    InvalidReference {
        /// 対象の種類（"indicator", "button" など）
        kind: &'static str,
        /// 指定された ID
        id: u64,
    },
}
