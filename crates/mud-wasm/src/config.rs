//! セッション設定
//!
//! JS 側から JSON 文字列で渡される。省略した項目は既定値になる。
//!
//! ```json
//! {
//!   "host": "mud.example.net",
//!   "port": 4000,
//!   "encoding": "utf-8",
//!   "socket": { "ws_port": 6200, "ssl": true },
//!   "input": { "history_size": 30 }
//! }
//! ```

use mud_codec::TextEncoding;
use mud_input::InputSettings;
use mud_transport::SocketSettings;
use serde::Deserialize;
use thiserror::Error;

/// ゲームサーバーのポートの既定値
pub const DEFAULT_GAME_PORT: u16 = 4000;

/// 設定の読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON として解釈できない
    #[error("invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// 接続先ホストがない
    #[error("no host to connect to: set `host` or serve the page from the game host")]
    MissingHost,
    /// ポートが 0
    #[error("game port must be non-zero")]
    InvalidPort,
}

/// 送信行の文字エンコーディング名
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Charset {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "iso-8859-1", alias = "latin1")]
    Latin1,
}

impl From<Charset> for TextEncoding {
    fn from(charset: Charset) -> Self {
        match charset {
            Charset::Utf8 => TextEncoding::Utf8,
            Charset::Latin1 => TextEncoding::Latin1,
        }
    }
}

/// セッション全体の設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 接続先ホスト。None ならページのホスト
    pub host: Option<String>,
    /// ゲームサーバーのポート（WebSocket パスの既定値に使う）
    pub port: u16,
    /// ページを配信しているホスト。ブラウザでは自動で埋める
    pub page_host: String,
    /// 送信行の文字エンコーディング
    pub encoding: Charset,
    /// ソケット設定
    pub socket: SocketSettings,
    /// 入力設定
    pub input: InputSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            host: None,
            port: DEFAULT_GAME_PORT,
            page_host: String::new(),
            encoding: Charset::default(),
            socket: SocketSettings::default(),
            input: InputSettings::default(),
        }
    }
}

impl SessionConfig {
    /// JSON 文字列から読み込む
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// 接続に必要な項目が揃っているか確認する
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        let has_host = self.host.as_deref().is_some_and(|h| !h.is_empty());
        if !has_host && self.page_host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        Ok(())
    }
}
