//! # mud-notify
//!
//! 一度に 1 件だけ表示する通知バーのキューと、ステータスインジケータの管理。
//!
//! ## 通知キュー
//!
//! ```text
//! enqueue(A) ──▶ [A*]          * = 表示中
//! enqueue(B) ──▶ [A*, B]
//! dismiss()  ──▶ [B*]          A のタイマーは取り消される
//! ```
//!
//! - 厳密な FIFO。表示中は常に最大 1 件
//! - タイムアウトは表示開始時点から数える（enqueue 時点ではない）
//! - タイマー発火時は対象 ID を確認してから閉じる（古いタイマーは無視）
//!
//! タイマーはホスト環境のもの（ブラウザなら `setTimeout`）を `HostTimer` 経由で使う。

#![cfg_attr(not(test), no_std)]
extern crate alloc;

mod error;
pub mod queue;
pub mod timer;
pub mod tray;

pub use error::NotifyError;
pub use queue::{
    Callback, DismissReason, NoticeEvent, NoticeShown, NotificationId, NotificationItem,
    NotificationQueue,
};
pub use timer::{HostTimer, ManualTimer, TimerToken};
pub use tray::{Indicator, IndicatorId, IndicatorTray, IndicatorUpdate};

/// 通知の既定の分類
pub const DEFAULT_CLASS: &str = "info";
