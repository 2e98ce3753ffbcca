//! ホストのタイマープリミティブ

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::queue::NotificationId;

/// タイマー発火時にキューへ渡す識別子
///
/// どの通知のために張られたタイマーかを持つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub NotificationId);

/// 一定時間後にコールバックするタイマー
///
/// 発火したらホストは `NotificationQueue::handle_timer(token)` を呼ぶこと。
pub trait HostTimer {
    /// 取り消しに使うハンドル
    type Handle;

    /// `delay_ms` ミリ秒後に `token` を届ける
    fn schedule(&mut self, delay_ms: u32, token: TimerToken) -> Self::Handle;

    /// 予約を取り消す。発火済みなら何もしない
    fn cancel(&mut self, handle: Self::Handle);
}

/// 時刻を外から進める仮想タイマー
///
/// ホストが `now_ms` を注入するイベントループ（テストを含む）向け。
#[derive(Debug, Default)]
pub struct ManualTimer {
    now_ms: u64,
    next_handle: u64,
    /// handle → (発火時刻, token)
    pending: BTreeMap<u64, (u64, TimerToken)>,
}

impl ManualTimer {
    /// 時刻 0 のタイマー
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在時刻
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// 未発火の予約数
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// 時刻を `now_ms` まで進め、期限を迎えた token を発火順に返す
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<TimerToken> {
        self.now_ms = self.now_ms.max(now_ms);

        let mut due: Vec<(u64, u64, TimerToken)> = self
            .pending
            .iter()
            .filter(|(_, (at, _))| *at <= self.now_ms)
            .map(|(handle, (at, token))| (*at, *handle, *token))
            .collect();
        due.sort_unstable_by_key(|(at, handle, _)| (*at, *handle));

        for (_, handle, _) in &due {
            self.pending.remove(handle);
        }
        due.into_iter().map(|(_, _, token)| token).collect()
    }
}

impl HostTimer for ManualTimer {
    type Handle = u64;

    fn schedule(&mut self, delay_ms: u32, token: TimerToken) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.pending
            .insert(handle, (self.now_ms + u64::from(delay_ms), token));
        handle
    }

    fn cancel(&mut self, handle: u64) {
        self.pending.remove(&handle);
    }
}
