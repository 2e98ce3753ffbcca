//! tracing の出力先をブラウザコンソールにする
//!
//! `tracing-subscriber` の fmt レイヤーで 1 行に整形し、レベルに応じて
//! `console.error` / `console.warn` / `console.info` / `console.debug` に流す。
//! WASM には時計も ANSI 端末もないので、時刻と色は出さない。

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;

/// 1 イベント分をバッファし、drop 時にコンソールへ書き出す
pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        let line = JsValue::from_str(line);
        match self.level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            Level::INFO => web_sys::console::info_1(&line),
            _ => web_sys::console::debug_1(&line),
        }
    }
}

/// `ConsoleWriter` を生成する
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buf: Vec::new(),
        }
    }
}

/// レベル名（"error" / "warn" / "info" / "debug" / "trace"）を解釈する
///
/// 不明な名前や None は INFO。
pub fn parse_level(name: Option<&str>) -> Level {
    name.and_then(|n| n.parse().ok()).unwrap_or(Level::INFO)
}

/// グローバル subscriber を設定する。設定済みなら false
pub fn init(max_level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_writer(ConsoleMakeWriter)
        .with_ansi(false)
        .without_time()
        .with_max_level(max_level)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(Some("warn")), Level::WARN);
        assert_eq!(parse_level(Some("DEBUG")), Level::DEBUG);
        assert_eq!(parse_level(Some("loud")), Level::INFO);
        assert_eq!(parse_level(None), Level::INFO);
    }
}
