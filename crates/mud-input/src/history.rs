//! 送信行の履歴（MRU）
//!
//! ```text
//! entries:  [oldest, ..., newest]
//! cursor:   None = 「現在」（履歴を見ていない）
//!           Some(i) = entries[i] を表示中
//! stash:    履歴に入る直前の入力。cursor が Some の間だけ存在する
//! ```

use alloc::collections::VecDeque;
use alloc::string::String;

use tracing::trace;

/// 履歴リスト
#[derive(Debug, Clone)]
pub struct HistoryList {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: Option<usize>,
    stash: Option<String>,
}

impl HistoryList {
    /// 最大 `capacity` 行を保持する履歴を生成する
    ///
    /// 領域は行の追加に合わせて確保する。
    pub fn new(capacity: usize) -> Self {
        HistoryList {
            entries: VecDeque::new(),
            capacity,
            cursor: None,
            stash: None,
        }
    }

    /// 行を追加する
    ///
    /// 空行と、直前の 1 件と同じ行は追加しない。容量を超えたら古いものから捨てる。
    /// カーソルは「現在」に戻る。
    ///
    /// # 戻り値
    /// 追加したら true
    pub fn push(&mut self, line: &str) -> bool {
        self.reset();

        if line.is_empty() || self.capacity == 0 {
            return false;
        }
        if self.entries.back().map(String::as_str) == Some(line) {
            trace!("duplicate of most recent entry, not recorded");
            return false;
        }

        self.entries.push_back(String::from(line));
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        true
    }

    /// 一つ古い行へ移動する
    ///
    /// 「現在」から最初に遡るときは `current` を退避する。
    /// 最古の行より先へは進まない。
    ///
    /// # 戻り値
    /// 新しく表示すべき行。移動しなかった場合は None
    pub fn previous(&mut self, current: &str) -> Option<String> {
        let next_cursor = match self.cursor {
            None => {
                if self.entries.is_empty() {
                    return None;
                }
                self.stash = Some(String::from(current));
                self.entries.len() - 1
            }
            Some(0) => return None,
            Some(i) => i - 1,
        };
        self.cursor = Some(next_cursor);
        self.entries.get(next_cursor).cloned()
    }

    /// 一つ新しい行へ移動する
    ///
    /// 最新の行より先へ進むと退避していた入力を返して「現在」に戻る。
    /// 「現在」でさらに進もうとしても何もしない。
    pub fn next(&mut self) -> Option<String> {
        let i = self.cursor?;
        if i + 1 < self.entries.len() {
            self.cursor = Some(i + 1);
            self.entries.get(i + 1).cloned()
        } else {
            self.cursor = None;
            Some(self.stash.take().unwrap_or_default())
        }
    }

    /// カーソルを「現在」に戻し、退避内容を捨てる
    pub fn reset(&mut self) {
        self.cursor = None;
        self.stash = None;
    }

    /// 履歴を見ていない状態か
    pub fn at_present(&self) -> bool {
        self.cursor.is_none()
    }

    /// 保持している行数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 空か
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 古い順のイテレータ
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// 最大保持行数
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn history(lines: &[&str]) -> HistoryList {
        let mut h = HistoryList::new(15);
        for line in lines {
            h.push(line);
        }
        h
    }

    #[test]
    fn test_non_adjacent_duplicates_kept() {
        let h = history(&["look", "north", "look"]);
        assert_eq!(h.iter().collect::<Vec<_>>(), ["look", "north", "look"]);
    }

    #[test]
    fn test_adjacent_duplicates_collapse() {
        let h = history(&["look", "look"]);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_empty_line_not_recorded() {
        let mut h = HistoryList::new(15);
        assert!(!h.push(""));
        assert!(h.is_empty());
    }

    #[test]
    fn test_oldest_evicted() {
        let mut h = HistoryList::new(2);
        h.push("a");
        h.push("b");
        h.push("c");
        assert_eq!(h.iter().collect::<Vec<_>>(), ["b", "c"]);
    }

    #[test]
    fn test_huge_capacity_does_not_preallocate() {
        let mut h = HistoryList::new(usize::MAX);
        assert_eq!(h.capacity(), usize::MAX);
        assert!(h.push("look"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_recall_walk() {
        let mut h = history(&["a", "b", "c"]);
        assert_eq!(h.previous("d").as_deref(), Some("c"));
        assert_eq!(h.previous("c").as_deref(), Some("b"));
        assert_eq!(h.next().as_deref(), Some("c"));
        assert_eq!(h.next().as_deref(), Some("d"));
        assert!(h.at_present());
        assert_eq!(h.next(), None);
    }

    #[test]
    fn test_previous_clamps_at_oldest() {
        let mut h = history(&["a", "b"]);
        h.previous("");
        assert_eq!(h.previous("b").as_deref(), Some("a"));
        assert_eq!(h.previous("a"), None);
        assert!(!h.at_present());
    }

    #[test]
    fn test_previous_on_empty_history() {
        let mut h = HistoryList::new(15);
        assert_eq!(h.previous("typed"), None);
        assert!(h.at_present());
        assert_eq!(h.next(), None);
    }

    #[test]
    fn test_stash_only_while_off_present() {
        let mut h = history(&["a"]);
        h.previous("draft");
        assert!(h.stash.is_some());
        h.next();
        assert!(h.stash.is_none());

        h.previous("draft");
        h.push("new");
        assert!(h.stash.is_none());
        assert!(h.at_present());
    }
}
