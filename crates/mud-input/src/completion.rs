//! Tab 補完

use alloc::string::String;
use alloc::vec::Vec;

/// 補完候補の提供元
///
/// 同期的に呼ばれる。ブロックしてはいけない。
pub trait CompletionProvider {
    /// `fragment` に対する候補を優先順で返す
    fn complete(&mut self, fragment: &str) -> Vec<String>;
}

impl<F> CompletionProvider for F
where
    F: FnMut(&str) -> Vec<String>,
{
    fn complete(&mut self, fragment: &str) -> Vec<String> {
        self(fragment)
    }
}

/// 候補を返さないプロバイダ
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompletion;

impl CompletionProvider for NoCompletion {
    fn complete(&mut self, _fragment: &str) -> Vec<String> {
        Vec::new()
    }
}

/// 進行中の補完
///
/// 置き換え範囲は常に元の断片の開始位置から数える。
/// 直前に挿入した候補の文字数だけを覚えておき、次の候補で丸ごと置き換える。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompletionRequest {
    /// 断片の開始位置（文字単位）
    pub(crate) start: usize,
    /// 補完を始めたときの断片
    pub(crate) fragment: String,
    /// 候補（空にはならない）
    pub(crate) candidates: Vec<String>,
    /// 現在挿入している候補の添字
    pub(crate) index: usize,
}

impl CompletionRequest {
    pub(crate) fn new(start: usize, fragment: String, candidates: Vec<String>) -> Self {
        CompletionRequest {
            start,
            fragment,
            candidates,
            index: 0,
        }
    }

    /// 現在の候補
    pub(crate) fn current(&self) -> &str {
        &self.candidates[self.index]
    }

    /// 次の候補へ（最後の次は先頭）
    pub(crate) fn advance(&mut self) {
        self.index = (self.index + 1) % self.candidates.len();
    }
}
