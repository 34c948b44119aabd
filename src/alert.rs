//! Alert system for displaying success and error messages to users.
//!
//! Toasts are rendered into the `#alert-container` element of the base layout,
//! either directly or as out-of-band swaps. A process-wide [ToastQueue] bounds
//! how many toasts are on screen at once: pushing past capacity evicts the
//! oldest toast, and the eviction is carried to the page as an out-of-band
//! delete of the evicted element.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use maud::{Markup, html};

/// Alert message types for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    Success,
    Error,
}

impl AlertType {
    fn container_style(self) -> &'static str {
        match self {
            AlertType::Success => {
                "flex items-start gap-3 w-full p-4 mb-2 rounded border \
                border-green-300 bg-green-50 text-green-800 \
                dark:border-green-800 dark:bg-gray-800 dark:text-green-400"
            }
            AlertType::Error => {
                "flex items-start gap-3 w-full p-4 mb-2 rounded border \
                border-red-300 bg-red-50 text-red-800 \
                dark:border-red-800 dark:bg-gray-800 dark:text-red-400"
            }
        }
    }
}

/// Renders alert messages with appropriate styling.
#[derive(Debug, Clone)]
pub struct AlertTemplate<'a> {
    pub alert_type: AlertType,
    pub message: &'a str,
    pub details: &'a str,
}

impl<'a> AlertTemplate<'a> {
    /// Create a new error alert.
    pub fn error(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Error,
            message,
            details,
        }
    }

    /// Render the alert without registering it in the toast queue.
    ///
    /// Used for fragments that replace form content rather than stacking in
    /// the toast container.
    pub fn into_markup(self) -> Markup {
        alert_body(self.alert_type, None, self.message, self.details)
    }
}

fn alert_body(alert_type: AlertType, toast_id: Option<u64>, message: &str, details: &str) -> Markup {
    html! {
        div
            id=[toast_id.map(|id| format!("toast-{id}"))]
            role="alert"
            class=(alert_type.container_style())
        {
            div class="flex-1"
            {
                p class="font-medium" { (message) }

                @if !details.is_empty() {
                    p class="text-sm" { (details) }
                }
            }

            button
                type="button"
                aria-label="Dismiss"
                class="font-bold bg-transparent border-none cursor-pointer"
                hx-on:click="this.closest('[role=alert]').remove()"
            {
                "\u{00d7}"
            }
        }
    }
}

/// One queued notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    /// Identifier used for the toast's DOM id.
    pub id: u64,
    pub alert_type: AlertType,
    pub message: String,
    pub details: String,
}

/// The result of pushing a toast: the new entry plus any evicted toast ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ToastPush {
    pub toast: Toast,
    /// Toasts dropped to stay within capacity, oldest first.
    pub evicted: Vec<u64>,
}

/// A bounded FIFO of the toasts currently on screen.
///
/// The queue never grows past its capacity: pushing a new toast when full
/// drops the oldest entry. The queue is an explicit object owned by the
/// application state rather than module-level mutable state.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    entries: VecDeque<u64>,
    capacity: usize,
    next_id: u64,
}

/// How many toasts may be on screen at once.
pub const MAX_TOASTS: usize = 2;

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(MAX_TOASTS)
    }
}

impl ToastQueue {
    /// Create a queue that holds at most `capacity` toasts.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            next_id: 0,
        }
    }

    /// Queue a toast, evicting the oldest entries beyond capacity.
    pub fn push(&mut self, alert_type: AlertType, message: &str, details: &str) -> ToastPush {
        let mut evicted = Vec::new();

        while self.entries.len() >= self.capacity {
            if let Some(oldest) = self.entries.pop_front() {
                evicted.push(oldest);
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(id);

        ToastPush {
            toast: Toast {
                id,
                alert_type,
                message: message.to_owned(),
                details: details.to_owned(),
            },
            evicted,
        }
    }

    /// The ids currently held by the queue, oldest first.
    #[cfg(test)]
    pub fn active(&self) -> impl Iterator<Item = u64> {
        self.entries.iter().copied()
    }
}

/// Queue a toast and render it as an out-of-band swap into `#alert-container`.
///
/// Evicted toasts are removed from the page with out-of-band deletes. If the
/// queue lock is poisoned the toast is still rendered, just without eviction
/// bookkeeping.
pub fn push_toast_oob(
    queue: &Arc<Mutex<ToastQueue>>,
    alert_type: AlertType,
    message: &str,
    details: &str,
) -> Markup {
    match queue.lock() {
        Ok(mut queue) => {
            let push = queue.push(alert_type, message, details);
            html! {
                div hx-swap-oob="beforeend:#alert-container"
                {
                    (alert_body(push.toast.alert_type, Some(push.toast.id), message, details))
                }

                @for evicted_id in &push.evicted {
                    div id=(format!("toast-{evicted_id}")) hx-swap-oob="delete" {}
                }
            }
        }
        Err(error) => {
            tracing::error!("could not acquire toast queue lock: {error}");
            html! {
                div hx-swap-oob="beforeend:#alert-container"
                {
                    (alert_body(alert_type, None, message, details))
                }
            }
        }
    }
}

/// Queue a toast and render it for a response that is swapped directly into
/// `#alert-container` (e.g. via `hx-target-error` with a `beforeend` swap).
///
/// Evicted toasts still leave the page through out-of-band deletes, which
/// HTMX processes from any response body.
pub fn push_toast_inline(
    queue: &Arc<Mutex<ToastQueue>>,
    alert_type: AlertType,
    message: &str,
    details: &str,
) -> Markup {
    match queue.lock() {
        Ok(mut queue) => {
            let push = queue.push(alert_type, message, details);
            html! {
                (alert_body(push.toast.alert_type, Some(push.toast.id), message, details))

                @for evicted_id in &push.evicted {
                    div id=(format!("toast-{evicted_id}")) hx-swap-oob="delete" {}
                }
            }
        }
        Err(error) => {
            tracing::error!("could not acquire toast queue lock: {error}");
            alert_body(alert_type, None, message, details)
        }
    }
}

#[cfg(test)]
mod toast_queue_tests {
    use super::{AlertType, MAX_TOASTS, ToastQueue};

    #[test]
    fn push_assigns_increasing_ids() {
        let mut queue = ToastQueue::default();

        let first = queue.push(AlertType::Success, "one", "");
        let second = queue.push(AlertType::Success, "two", "");

        assert!(second.toast.id > first.toast.id);
    }

    #[test]
    fn push_within_capacity_evicts_nothing() {
        let mut queue = ToastQueue::new(2);

        let first = queue.push(AlertType::Success, "one", "");
        let second = queue.push(AlertType::Error, "two", "");

        assert!(first.evicted.is_empty());
        assert!(second.evicted.is_empty());
        assert_eq!(queue.active().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn push_past_capacity_drops_the_oldest() {
        let mut queue = ToastQueue::new(2);
        let first = queue.push(AlertType::Success, "one", "");
        queue.push(AlertType::Success, "two", "");

        let third = queue.push(AlertType::Success, "three", "");

        assert_eq!(third.evicted, vec![first.toast.id]);
        assert_eq!(queue.active().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn default_capacity_matches_max_toasts() {
        let mut queue = ToastQueue::default();

        for i in 0..MAX_TOASTS {
            let push = queue.push(AlertType::Success, &format!("toast {i}"), "");
            assert!(push.evicted.is_empty());
        }

        let push = queue.push(AlertType::Success, "overflow", "");
        assert_eq!(push.evicted.len(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut queue = ToastQueue::new(0);

        let first = queue.push(AlertType::Success, "one", "");
        let second = queue.push(AlertType::Success, "two", "");

        assert!(first.evicted.is_empty());
        assert_eq!(second.evicted, vec![first.toast.id]);
    }
}
