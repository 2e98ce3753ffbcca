//! InputController: キー入力を送信行に変える状態機械

use alloc::collections::VecDeque;
use alloc::string::String;

use tracing::{debug, trace};

use crate::buffer::{BufferView, EchoMode, LineBuffer};
use crate::completion::{CompletionProvider, CompletionRequest};
use crate::history::HistoryList;
use crate::settings::InputSettings;

/// コントローラが扱うキー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// 文字入力
    Char(char),
    /// 送信
    Enter,
    /// 改行の挿入（Shift+Enter）。複数行ブロックを作る
    LineBreak,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    /// 履歴を遡る
    Up,
    /// 履歴を進む
    Down,
    /// 補完
    Tab,
    PageUp,
    PageDown,
    Escape,
}

/// スクロール方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// コントローラから外への通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// 行が送信された（空行を含む）
    Submit(String),
    /// ローカルエコー（Plain のときだけ発生する）
    Echo(String),
    /// バッファの見え方が変わった
    Changed(BufferView),
    /// エコーモードが変わった
    EchoModeChanged(EchoMode),
    /// 出力ペインのスクロール要求
    Scroll(ScrollDirection),
}

/// 入力コントローラ
///
/// ## 内部構成
///
/// ```text
/// InputController
///   ├── LineBuffer         入力中テキスト + エコーモード
///   ├── HistoryList        送信済み行 + 一時退避スロット
///   ├── CompletionRequest  進行中の Tab 補完（Tab 以外のキーで破棄）
///   └── CompletionProvider 補完候補の提供元（外部）
/// ```
pub struct InputController<P> {
    buffer: LineBuffer,
    history: HistoryList,
    completion: Option<CompletionRequest>,
    provider: P,
    focused: bool,
    events: VecDeque<InputEvent>,
}

impl<P: CompletionProvider> InputController<P> {
    /// 設定と補完プロバイダからコントローラを生成する
    pub fn new(settings: InputSettings, provider: P) -> Self {
        InputController {
            buffer: LineBuffer::new(settings.echo),
            history: HistoryList::new(settings.history_size),
            completion: None,
            provider,
            focused: false,
            events: VecDeque::new(),
        }
    }

    /// キーを 1 個処理する
    pub fn handle_key(&mut self, key: Key) {
        if key != Key::Tab {
            self.completion = None;
        }

        let changed = match key {
            Key::Char(ch) => {
                self.buffer.insert_char(ch);
                true
            }
            Key::Enter => {
                self.submit();
                false
            }
            Key::LineBreak => match self.buffer.mode() {
                EchoMode::Plain => {
                    self.buffer.insert_char('\n');
                    true
                }
                EchoMode::Masked => false,
            },
            Key::Backspace => self.buffer.backspace(),
            Key::Delete => self.buffer.delete(),
            Key::Left => self.buffer.move_left(),
            Key::Right => self.buffer.move_right(),
            Key::Home => self.buffer.move_home(),
            Key::End => self.buffer.move_end(),
            Key::Up => self.recall_previous(),
            Key::Down => self.recall_next(),
            Key::Tab => self.complete(),
            Key::PageUp => {
                self.events.push_back(InputEvent::Scroll(ScrollDirection::Up));
                false
            }
            Key::PageDown => {
                self.events
                    .push_back(InputEvent::Scroll(ScrollDirection::Down));
                false
            }
            Key::Escape => false,
        };

        if changed {
            self.emit_changed();
        }
    }

    /// 文字列をまとめて挿入する（貼り付け）
    pub fn insert_str(&mut self, text: &str) {
        self.completion = None;
        if text.is_empty() {
            return;
        }
        self.buffer.insert_str(text);
        self.emit_changed();
    }

    /// 現在の内容を送信する
    ///
    /// 空でも `Submit` は必ず発生する。履歴に入るのは Plain の空でない行だけ。
    pub fn submit(&mut self) {
        self.completion = None;
        let line = self.buffer.take();

        match self.buffer.mode() {
            EchoMode::Plain => {
                self.history.push(&line);
                self.events.push_back(InputEvent::Submit(line.clone()));
                self.events.push_back(InputEvent::Echo(line));
            }
            EchoMode::Masked => {
                self.history.reset();
                self.events.push_back(InputEvent::Submit(line));
            }
        }
        self.emit_changed();
    }

    /// エコーモードを切り替える。同じモードなら何もしない
    ///
    /// Masked に入ると Plain の内容は退避され、履歴と補完は無効になる。
    /// Plain に戻ると退避していた内容が戻る。
    pub fn set_echo_mode(&mut self, mode: EchoMode) {
        if !self.buffer.set_mode(mode) {
            return;
        }
        debug!(?mode, "echo mode changed");
        self.completion = None;
        self.events.push_back(InputEvent::EchoModeChanged(mode));
        self.emit_changed();
    }

    /// フォーカスを得た
    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// フォーカスを失った
    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// フォーカスがあるか
    pub fn has_focus(&self) -> bool {
        self.focused
    }

    /// 現在のエコーモード
    pub fn echo_mode(&self) -> EchoMode {
        self.buffer.mode()
    }

    /// 行バッファ
    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    /// 履歴
    pub fn history(&self) -> &HistoryList {
        &self.history
    }

    /// 補完が進行中か
    pub fn is_completing(&self) -> bool {
        self.completion.is_some()
    }

    /// 補完プロバイダへの可変参照
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// 溜まっているイベントを 1 個取り出す
    pub fn poll_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    // ===== Private メソッド =====

    fn recall_previous(&mut self) -> bool {
        if self.buffer.mode() != EchoMode::Plain {
            return false;
        }
        match self.history.previous(self.buffer.text()) {
            Some(line) => {
                self.buffer.set_text(line);
                true
            }
            None => false,
        }
    }

    fn recall_next(&mut self) -> bool {
        if self.buffer.mode() != EchoMode::Plain {
            return false;
        }
        match self.history.next() {
            Some(line) => {
                self.buffer.set_text(line);
                true
            }
            None => false,
        }
    }

    /// Tab 補完
    ///
    /// 進行中でなければ断片を取り出してプロバイダに問い合わせ、先頭候補で置き換える。
    /// 進行中なら次の候補で前回の置き換えを差し替える。
    fn complete(&mut self) -> bool {
        if self.buffer.mode() != EchoMode::Plain {
            return false;
        }

        if let Some(req) = self.completion.as_mut() {
            let replaced = req.current().chars().count();
            req.advance();
            trace!(index = req.index, fragment = %req.fragment, "cycling completion");
            self.buffer.replace_range(req.start, replaced, req.current());
            return true;
        }

        let start = self.buffer.fragment_start();
        let fragment: String = self
            .buffer
            .text()
            .chars()
            .skip(start)
            .take(self.buffer.cursor() - start)
            .collect();
        if fragment.is_empty() {
            return false;
        }

        let candidates = self.provider.complete(&fragment);
        if candidates.is_empty() {
            trace!(%fragment, "no completion candidates");
            return false;
        }

        let req = CompletionRequest::new(start, fragment, candidates);
        self.buffer
            .replace_range(req.start, req.fragment.chars().count(), req.current());
        self.completion = Some(req);
        true
    }

    fn emit_changed(&mut self) {
        self.events.push_back(InputEvent::Changed(self.buffer.view()));
    }
}
