//! 入力まわりの設定

use serde::Deserialize;

use crate::buffer::EchoMode;
use crate::DEFAULT_HISTORY_SIZE;

/// 入力コントローラの設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// 履歴に保持する行数
    pub history_size: usize,
    /// 起動時のエコーモード
    pub echo: EchoMode,
}

impl Default for InputSettings {
    fn default() -> Self {
        InputSettings {
            history_size: DEFAULT_HISTORY_SIZE,
            echo: EchoMode::Plain,
        }
    }
}
