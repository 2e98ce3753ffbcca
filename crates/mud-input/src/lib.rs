//! # mud-input
//!
//! 入力行エディタの状態機械。
//!
//! キー入力 1 個ずつを受け取り、送信行（複数行ブロックを含む）を組み立てる。
//!
//! ### キーコンセプト
//!
//! - **EchoMode**: Plain（ローカル表示あり）と Masked（パスワード入力、表示しない）
//! - **HistoryList**: 送信済み行の履歴。上下キーで遡る。遡る直前の入力は一時退避する
//! - **CompletionRequest**: Tab による補完。同じ断片に対して候補を巡回する
//!
//! ## モードと機能の関係
//!
//! ```text
//!            履歴   補完   ローカルエコー   表示への内容通知
//! Plain       ○     ○        ○              テキストそのもの
//! Masked      ×     ×        ×              文字数のみ
//! ```
//!
//! マスクはレンダリング時ではなくコントローラの出口で保証する。
//! Masked 中のテキストは `InputEvent::Submit` 以外で外に出ない。

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod buffer;
pub mod completion;
pub mod controller;
pub mod history;
pub mod settings;

pub use buffer::{BufferView, EchoMode, LineBuffer};
pub use completion::{CompletionProvider, NoCompletion};
pub use controller::{InputController, InputEvent, Key, ScrollDirection};
pub use history::HistoryList;
pub use settings::InputSettings;

/// 履歴に保持する行数の既定値
pub const DEFAULT_HISTORY_SIZE: usize = 15;
