//! ステータスインジケータ（入力欄横のアイコン列）
//!
//! ID は削除しても詰めない。存在しない ID の操作は呼び出し側の誤りとして
//! `NotifyError::InvalidReference` を返す。

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::error::NotifyError;

/// インジケータの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndicatorId(pub u32);

/// インジケータ 1 個
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indicator {
    /// ツールチップ / aria-label
    pub text: String,
    /// アイコンの中身（HTML 断片または文字）
    pub glyph: String,
    /// スタイル用クラス
    pub class: String,
    /// クリック可能か
    pub clickable: bool,
}

/// 部分更新。None の項目は変更しない
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorUpdate {
    pub text: Option<String>,
    pub glyph: Option<String>,
    pub class: Option<String>,
}

/// インジケータの集合
#[derive(Debug, Default)]
pub struct IndicatorTray {
    entries: BTreeMap<IndicatorId, Indicator>,
    next_id: u32,
}

impl IndicatorTray {
    /// 空のトレイ
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加して ID を返す
    pub fn add(&mut self, indicator: Indicator) -> IndicatorId {
        let id = IndicatorId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, indicator);
        id
    }

    /// 部分更新する
    pub fn update(
        &mut self,
        id: IndicatorId,
        update: IndicatorUpdate,
    ) -> Result<&Indicator, NotifyError> {
        let entry = self.entries.get_mut(&id).ok_or(invalid(id))?;
        if let Some(text) = update.text {
            entry.text = text;
        }
        if let Some(glyph) = update.glyph {
            entry.glyph = glyph;
        }
        if let Some(class) = update.class {
            entry.class = class;
        }
        Ok(entry)
    }

    /// 削除する
    pub fn remove(&mut self, id: IndicatorId) -> Result<Indicator, NotifyError> {
        self.entries.remove(&id).ok_or(invalid(id))
    }

    /// 参照する
    pub fn get(&self, id: IndicatorId) -> Result<&Indicator, NotifyError> {
        self.entries.get(&id).ok_or(invalid(id))
    }

    /// 左から何番目か（配置計算用）
    pub fn position(&self, id: IndicatorId) -> Result<usize, NotifyError> {
        self.entries
            .keys()
            .position(|k| *k == id)
            .ok_or(invalid(id))
    }

    /// ID 順のイテレータ
    pub fn iter(&self) -> impl Iterator<Item = (IndicatorId, &Indicator)> {
        self.entries.iter().map(|(id, ind)| (*id, ind))
    }

    /// 個数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 空か
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn invalid(id: IndicatorId) -> NotifyError {
    NotifyError::InvalidReference {
        kind: "indicator",
        id: u64::from(id.0),
    }
}
