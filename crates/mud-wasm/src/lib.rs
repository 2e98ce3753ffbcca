//! # mud-wasm
//!
//! wasm-bindgen エクスポート：ブラウザの MUD クライアント画面から呼び出す公開 API。
//!
//! ## 使用方法（TypeScript）
//!
//! ```typescript
//! import { MudClient, init_panic_hook, initLogging } from './pkg/mud_wasm';
//!
//! init_panic_hook();
//! initLogging("info");
//!
//! const client = new MudClient(JSON.stringify({ host: "mud.example.net", port: 4000 }), {
//!     onMessage: (text, tag) => output.appendLine(text, tag),
//!     onData: (bytes) => terminal.write(bytes),
//!     onInput: (view) => inputBox.render(view),
//!     onNotice: (notice) => infoBar.show(notice),
//!     onNoticeHidden: (id) => infoBar.hide(id),
//!     onIndicator: (indicator) => tray.render(indicator),
//!     onState: (state) => statusLine.set(state),
//! }, (fragment) => knownWords.filter(w => w.startsWith(fragment)));
//!
//! client.setup();
//! client.connect();
//!
//! inputBox.addEventListener("keydown", (ev) => {
//!     if (client.keyDown(ev.key, ev.shiftKey)) ev.preventDefault();
//! });
//! ```

use wasm_bindgen::prelude::*;

pub mod client;
pub mod config;
pub mod logging;
pub mod session;

pub use client::MudClient;
pub use config::{Charset, ConfigError, SessionConfig};
pub use session::{MessageTag, Session, SessionView};

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 開発時に必ず呼び出すこと。本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// tracing のログをブラウザコンソールに出す
///
/// # 引数
/// - `level`: "error" / "warn" / "info" / "debug" / "trace"。省略時は "info"
///
/// # 戻り値
/// 今回設定できたら true（2 回目以降は false）
#[wasm_bindgen(js_name = "initLogging")]
pub fn init_logging(level: Option<String>) -> bool {
    logging::init(logging::parse_level(level.as_deref()))
}
