// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use futures_util::lock::Mutex;
use log::info;
use tokio::time::Instant;

use super::Notification;

pub(crate) const LIFETIME: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Toast {
    pub(crate) id: u64,
    pub(crate) notification: Notification,
    pub(crate) expires_at: Instant,
}

impl Toast {
    pub(crate) fn render(&self) -> String {
        format!(
            "({}) {}: {}",
            self.notification.kind.icon(),
            self.notification.title,
            self.notification.message
        )
    }
}

#[derive(Default)]
struct Shelf {
    next_id: u64,
    toasts: Vec<Toast>,
}

/// Notifications currently on screen. Each one disappears on its own after
/// its lifetime, or earlier when dismissed.
pub(crate) struct Tray {
    lifetime: Duration,
    shelf: Mutex<Shelf>,
}

impl Tray {
    pub(crate) fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            shelf: Mutex::new(Shelf::default()),
        }
    }

    pub(crate) async fn show(&self, notification: Notification) -> u64 {
        let now = Instant::now();
        let mut shelf = self.shelf.lock().await;
        shelf.toasts.retain(|toast| toast.expires_at > now);

        shelf.next_id += 1;
        let toast = Toast {
            id: shelf.next_id,
            notification,
            expires_at: now + self.lifetime,
        };
        info!("{}", toast.render());
        let id = toast.id;
        shelf.toasts.push(toast);
        id
    }

    pub(crate) async fn dismiss(&self, id: u64) -> bool {
        let mut shelf = self.shelf.lock().await;
        let before = shelf.toasts.len();
        shelf.toasts.retain(|toast| toast.id != id);
        shelf.toasts.len() != before
    }

    pub(crate) async fn active(&self) -> Vec<Toast> {
        let now = Instant::now();
        let mut shelf = self.shelf.lock().await;
        shelf.toasts.retain(|toast| toast.expires_at > now);
        shelf.toasts.clone()
    }
}

impl Default for Tray {
    fn default() -> Self {
        Self::new(LIFETIME)
    }
}
