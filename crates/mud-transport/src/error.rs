//! mud-transport エラー型

use alloc::string::String;

use thiserror::Error;

/// トランスポート層のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Open 以外の状態で send が呼ばれた
    #[error("not connected")]
    NotConnected,
    /// ホスト環境にソケットプリミティブがない（接続試行前に一度だけ判定）
    #[error("socket primitive is not available in this environment")]
    CapabilityUnavailable,
    /// 接続を試みたが Open に到達しなかった
    #[error("unable to connect to {endpoint}")]
    ConnectFailed {
        /// 接続先 URL
        endpoint: String,
    },
}
