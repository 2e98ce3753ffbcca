//! 入力中の行バッファ

use alloc::string::String;

use serde::Deserialize;

/// エコーモード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EchoMode {
    /// 入力をローカルに表示する
    #[default]
    Plain,
    /// 入力を一切表示しない（パスワード）
    Masked,
}

/// 表示層に渡すバッファの見え方
///
/// Masked のときは文字数しか含まない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferView {
    /// 通常入力
    Plain {
        /// 入力中のテキスト
        text: String,
        /// カーソル位置（文字単位）
        cursor: usize,
        /// 行数（改行数 + 1）
        lines: usize,
    },
    /// パスワード入力
    Masked {
        /// 入力済みの文字数
        len: usize,
    },
}

/// 行バッファ
///
/// カーソル位置は文字（`char`）単位で持つ。
/// Masked に切り替えると Plain の内容を退避し、Plain に戻すと復元する。
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    text: String,
    cursor: usize,
    mode: EchoMode,
    /// Masked 中に退避している Plain の内容
    plain_stash: Option<String>,
}

impl LineBuffer {
    /// 空のバッファ
    pub fn new(mode: EchoMode) -> Self {
        LineBuffer {
            mode,
            ..Default::default()
        }
    }

    /// 現在のテキスト
    pub fn text(&self) -> &str {
        &self.text
    }

    /// エコーモード
    pub fn mode(&self) -> EchoMode {
        self.mode
    }

    /// カーソル位置（文字単位）
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 文字数
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// 空か
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// 行数（常に 1 以上）
    pub fn line_count(&self) -> usize {
        self.text.matches('\n').count() + 1
    }

    /// 表示層向けのビュー
    pub fn view(&self) -> BufferView {
        match self.mode {
            EchoMode::Plain => BufferView::Plain {
                text: self.text.clone(),
                cursor: self.cursor,
                lines: self.line_count(),
            },
            EchoMode::Masked => BufferView::Masked {
                len: self.char_len(),
            },
        }
    }

    /// カーソル位置に 1 文字挿入する
    pub fn insert_char(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
    }

    /// カーソル位置に文字列を挿入する
    pub fn insert_str(&mut self, s: &str) {
        let at = self.byte_index(self.cursor);
        self.text.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    /// カーソル直前の 1 文字を消す
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let at = self.byte_index(self.cursor - 1);
        self.text.remove(at);
        self.cursor -= 1;
        true
    }

    /// カーソル位置の 1 文字を消す
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        true
    }

    /// カーソルを左へ
    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// カーソルを右へ
    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// カーソルを先頭へ
    pub fn move_home(&mut self) -> bool {
        let moved = self.cursor != 0;
        self.cursor = 0;
        moved
    }

    /// カーソルを末尾へ
    pub fn move_end(&mut self) -> bool {
        let end = self.char_len();
        let moved = self.cursor != end;
        self.cursor = end;
        moved
    }

    /// テキストを丸ごと置き換え、カーソルを末尾に置く
    pub fn set_text(&mut self, text: String) {
        self.cursor = text.chars().count();
        self.text = text;
    }

    /// テキストを取り出して空にする
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        core::mem::take(&mut self.text)
    }

    /// カーソル直前の補完対象断片の開始位置（文字単位）
    ///
    /// カーソルから空白の直後まで遡った位置。
    pub fn fragment_start(&self) -> usize {
        let before: alloc::vec::Vec<char> = self.text.chars().take(self.cursor).collect();
        before
            .iter()
            .rposition(|c| c.is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// `start..start + len`（文字単位）を `replacement` で置き換える
    ///
    /// カーソルは置き換えた文字列の直後に移る。
    pub fn replace_range(&mut self, start: usize, len: usize, replacement: &str) {
        let from = self.byte_index(start);
        let to = self.byte_index(start + len);
        self.text.replace_range(from..to, replacement);
        self.cursor = start + replacement.chars().count();
    }

    /// エコーモードを切り替える
    ///
    /// - Plain → Masked: 現在の内容を退避して空の Masked バッファにする
    /// - Masked → Plain: Masked の内容は捨て、退避していた内容を戻す
    ///
    /// 変化がなければ false。
    pub fn set_mode(&mut self, mode: EchoMode) -> bool {
        if mode == self.mode {
            return false;
        }
        match mode {
            EchoMode::Masked => {
                let plain = self.take();
                self.plain_stash = Some(plain);
            }
            EchoMode::Plain => {
                let restored = self.plain_stash.take().unwrap_or_default();
                self.set_text(restored);
            }
        }
        self.mode = mode;
        true
    }

    // ===== Private メソッド =====

    fn byte_index(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}
