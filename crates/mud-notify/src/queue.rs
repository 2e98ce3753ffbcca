//! NotificationQueue: 通知バーの FIFO キュー

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use tracing::{debug, trace};

use crate::error::NotifyError;
use crate::timer::{HostTimer, TimerToken};
use crate::DEFAULT_CLASS;

/// 通知の識別子（キューごとに単調増加）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotificationId(pub u64);

/// 通知に付けるコールバック
pub type Callback = Box<dyn FnOnce()>;

/// 通知バーのボタン
struct NoticeButton {
    label: String,
    action: Callback,
}

/// キューに積む通知
///
/// ```ignore
/// let item = NotificationItem::new("Connection lost.")
///     .class("error")
///     .timeout_ms(5000)
///     .on_dismiss(|| { /* ... */ });
/// ```
pub struct NotificationItem {
    text: String,
    class: String,
    /// 0 = タイムアウトなし
    timeout_ms: u32,
    on_click: Option<Callback>,
    on_dismiss: Option<Callback>,
    buttons: Vec<NoticeButton>,
}

impl NotificationItem {
    /// 分類 "info"、タイムアウトなしの通知
    pub fn new(text: impl Into<String>) -> Self {
        NotificationItem {
            text: text.into(),
            class: String::from(DEFAULT_CLASS),
            timeout_ms: 0,
            on_click: None,
            on_dismiss: None,
            buttons: Vec::new(),
        }
    }

    /// 分類タグ（"info", "error" など）
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    /// 表示開始から自動で閉じるまでの時間。0 ならタイムアウトなし
    pub fn timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// クリックされたときのコールバック。設定するとクリック可能になる
    pub fn on_click(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_click = Some(Box::new(f));
        self
    }

    /// 閉じられたとき（明示的な dismiss / タイムアウト）のコールバック
    pub fn on_dismiss(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_dismiss = Some(Box::new(f));
        self
    }

    /// ボタンを追加する
    pub fn button(mut self, label: impl Into<String>, action: impl FnOnce() + 'static) -> Self {
        self.buttons.push(NoticeButton {
            label: label.into(),
            action: Box::new(action),
        });
        self
    }

    /// 本文
    pub fn text(&self) -> &str {
        &self.text
    }

    fn shown(&self, id: NotificationId) -> NoticeShown {
        NoticeShown {
            id,
            text: self.text.clone(),
            class: self.class.clone(),
            clickable: self.on_click.is_some(),
            buttons: self.buttons.iter().map(|b| b.label.clone()).collect(),
        }
    }
}

impl core::fmt::Debug for NotificationItem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationItem")
            .field("text", &self.text)
            .field("class", &self.class)
            .field("timeout_ms", &self.timeout_ms)
            .field("clickable", &self.on_click.is_some())
            .field("buttons", &self.buttons.len())
            .finish()
    }
}

/// 表示層に渡す、表示中の通知の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeShown {
    /// 識別子
    pub id: NotificationId,
    /// 本文
    pub text: String,
    /// 分類タグ
    pub class: String,
    /// クリック可能か
    pub clickable: bool,
    /// ボタンのラベル（添字が `press_button` の引数になる）
    pub buttons: Vec<String>,
}

/// 通知が閉じた理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    /// `dismiss()` による
    Dismissed,
    /// タイムアウト
    TimedOut,
    /// 本体がクリックされた
    Clicked,
    /// ボタンが押された
    Button(usize),
}

/// キューから表示層への通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeEvent {
    /// 通知を表示する
    Shown(NoticeShown),
    /// 通知を消す
    Hidden {
        /// 識別子
        id: NotificationId,
        /// 閉じた理由
        reason: DismissReason,
    },
}

/// 表示中の通知
struct Active<H> {
    id: NotificationId,
    item: NotificationItem,
    timer: Option<H>,
}

/// 通知キュー
///
/// 表示スロットは 1 つ。残りは `pending` で待つ。
pub struct NotificationQueue<T: HostTimer> {
    timer: T,
    pending: VecDeque<(NotificationId, NotificationItem)>,
    active: Option<Active<T::Handle>>,
    next_id: u64,
    events: VecDeque<NoticeEvent>,
}

impl<T: HostTimer> NotificationQueue<T> {
    /// 空のキューを生成する
    pub fn new(timer: T) -> Self {
        NotificationQueue {
            timer,
            pending: VecDeque::new(),
            active: None,
            next_id: 1,
            events: VecDeque::new(),
        }
    }

    /// 末尾に積む。表示中のものがなければすぐに表示する
    pub fn enqueue(&mut self, item: NotificationItem) -> NotificationId {
        let id = NotificationId(self.next_id);
        self.next_id += 1;
        trace!(id = id.0, text = %item.text, "notification enqueued");

        self.pending.push_back((id, item));
        if self.active.is_none() {
            self.activate_next();
        }
        id
    }

    /// すぐに表示できる場合だけ積む
    ///
    /// # 戻り値
    /// 積んだら Some(id)、表示中のものがあって積まなかったら None
    pub fn enqueue_if_idle(&mut self, item: NotificationItem) -> Option<NotificationId> {
        if self.active.is_some() {
            return None;
        }
        Some(self.enqueue(item))
    }

    /// 表示中の通知を閉じる（dismiss コールバックを呼ぶ）
    ///
    /// # 戻り値
    /// 閉じるものがなければ false
    pub fn dismiss(&mut self) -> bool {
        match self.deactivate(DismissReason::Dismissed) {
            Some(item) => {
                if let Some(f) = item.on_dismiss {
                    f();
                }
                self.activate_next();
                true
            }
            None => false,
        }
    }

    /// 表示中の通知がクリックされた
    ///
    /// クリック可能な通知だけが閉じ、click コールバックを呼ぶ。
    /// dismiss コールバックは呼ばない。
    pub fn click(&mut self) -> bool {
        let clickable = self
            .active
            .as_ref()
            .map(|a| a.item.on_click.is_some())
            .unwrap_or(false);
        if !clickable {
            return false;
        }

        if let Some(item) = self.deactivate(DismissReason::Clicked) {
            if let Some(f) = item.on_click {
                f();
            }
        }
        self.activate_next();
        true
    }

    /// 表示中の通知の `index` 番目のボタンが押された
    ///
    /// 通知を閉じてからボタンのアクションを呼ぶ。dismiss コールバックは呼ばない。
    ///
    /// # 戻り値
    /// 表示中の通知がなければ Ok(false)
    ///
    /// # エラー
    /// - ボタンの添字が範囲外なら `NotifyError::InvalidReference`
    pub fn press_button(&mut self, index: usize) -> Result<bool, NotifyError> {
        let Some(active) = self.active.as_ref() else {
            return Ok(false);
        };
        if index >= active.item.buttons.len() {
            return Err(NotifyError::InvalidReference {
                kind: "button",
                id: index as u64,
            });
        }

        if let Some(mut item) = self.deactivate(DismissReason::Button(index)) {
            let button = item.buttons.swap_remove(index);
            (button.action)();
        }
        self.activate_next();
        Ok(true)
    }

    /// タイマー発火
    ///
    /// token が表示中の通知を指しているときだけ閉じる。
    /// 既に閉じた通知のタイマーは何もしない。
    pub fn handle_timer(&mut self, token: TimerToken) -> bool {
        match self.active.as_mut() {
            Some(active) if active.id == token.0 => {
                // 発火済みなので取り消しは不要
                active.timer = None;
            }
            _ => {
                trace!(id = (token.0).0, "stale notification timer ignored");
                return false;
            }
        }

        if let Some(item) = self.deactivate(DismissReason::TimedOut) {
            if let Some(f) = item.on_dismiss {
                f();
            }
        }
        self.activate_next();
        true
    }

    /// 表示中の通知の ID
    pub fn active_id(&self) -> Option<NotificationId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// 表示中の通知
    pub fn active(&self) -> Option<NoticeShown> {
        self.active.as_ref().map(|a| a.item.shown(a.id))
    }

    /// 表示待ちの件数（表示中を除く）
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 何も表示していないか
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// タイマーへの参照
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// タイマーへの可変参照
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// 溜まっているイベントを 1 個取り出す
    pub fn poll_event(&mut self) -> Option<NoticeEvent> {
        self.events.pop_front()
    }

    // ===== Private メソッド =====

    /// 表示中の通知を外す。タイマーは取り消す
    fn deactivate(&mut self, reason: DismissReason) -> Option<NotificationItem> {
        let active = self.active.take()?;
        if let Some(handle) = active.timer {
            self.timer.cancel(handle);
        }
        debug!(id = active.id.0, ?reason, "notification closed");
        self.events.push_back(NoticeEvent::Hidden {
            id: active.id,
            reason,
        });
        Some(active.item)
    }

    /// 先頭を表示する。タイムアウトがあればここでタイマーを張る
    fn activate_next(&mut self) {
        if self.active.is_some() {
            return;
        }
        let Some((id, item)) = self.pending.pop_front() else {
            return;
        };

        let timer = if item.timeout_ms > 0 {
            Some(self.timer.schedule(item.timeout_ms, TimerToken(id)))
        } else {
            None
        };
        debug!(id = id.0, timeout_ms = item.timeout_ms, "notification shown");
        self.events.push_back(NoticeEvent::Shown(item.shown(id)));
        self.active = Some(Active { id, item, timer });
    }
}
