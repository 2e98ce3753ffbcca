//! 接続先の解決
//!
//! 設定値から WebSocket の URL を組み立てる。解決は `open` 呼び出し時に行う。
//!
//! ```text
//! ws[s]://{host}:{port}/{path}
//!
//! port: ws_port (1..=65535) → policy_port → 843
//! path: ws_path → "port_{game_port}"
//! host: 設定の host → ページのホスト
//! ```

use alloc::format;
use alloc::string::String;

use serde::Deserialize;

/// WebSocket ゲートウェイのデフォルトポート（Flash ポリシーポートと共用）
pub const DEFAULT_POLICY_PORT: u16 = 843;

/// WebSocket のサブプロトコル名
pub const BINARY_SUBPROTOCOL: &str = "binary";

/// ソケットまわりの設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SocketSettings {
    /// WebSocket ゲートウェイのポート（範囲外なら無視）
    pub ws_port: Option<u32>,
    /// ws_port が使えないときのポート
    pub policy_port: Option<u16>,
    /// URL のパス（先頭の `/` は不要）
    pub ws_path: Option<String>,
    /// wss を使うか
    pub ssl: bool,
}

/// 解決済みの接続先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// ホスト名
    pub host: String,
    /// ゲートウェイのポート
    pub port: u16,
    /// TLS を使うか
    pub secure: bool,
    /// URL パス
    pub path: String,
}

impl Endpoint {
    /// 設定から接続先を解決する
    ///
    /// # 引数
    /// - `settings`: ソケット設定
    /// - `game_port`: MUD サーバー本体のポート（パスの既定値に使う）
    /// - `host`: 明示的な接続先ホスト。空なら `page_host` を使う
    /// - `page_host`: ページを配信しているホスト（`document.location.host`）
    pub fn resolve(
        settings: &SocketSettings,
        game_port: u16,
        host: Option<&str>,
        page_host: &str,
    ) -> Self {
        let port = settings
            .ws_port
            .filter(|p| (1..=65535).contains(p))
            .map(|p| p as u16)
            .or(settings.policy_port)
            .unwrap_or(DEFAULT_POLICY_PORT);

        let path = settings
            .ws_path
            .clone()
            .unwrap_or_else(|| format!("port_{}", game_port));

        let host = match host {
            Some(h) if !h.is_empty() => String::from(h),
            _ => String::from(page_host),
        };

        Endpoint {
            host,
            port,
            secure: settings.ssl,
            path,
        }
    }

    /// WebSocket URL
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!(
            "{}://{}:{}/{}",
            scheme,
            self.host,
            self.port,
            self.path.trim_start_matches('/')
        )
    }
}
