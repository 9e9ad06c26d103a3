// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{
    error::Result,
    http::api::{self, Executor as _},
    notification,
    shell::Shell,
};

/// List stored notifications, newest first, mark one as read, or send one.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The zero-based page to show.
    #[arg(long, default_value_t = 0)]
    page: u32,

    /// How many notifications to show per page.
    #[arg(long, default_value_t = 20)]
    size: u32,

    /// Mark the notification with this ID as read instead of listing.
    #[arg(long, value_name = "ID", conflicts_with = "send")]
    read: Option<i64>,

    /// Send a notification with this title to every subscriber.
    #[arg(long, value_name = "TITLE")]
    send: Option<String>,

    /// The body of the notification to send.
    #[arg(long, requires = "send", default_value = "")]
    message: String,

    /// The kind of notification to send.
    #[arg(long, value_enum, requires = "send", default_value_t = notification::Kind::Info)]
    kind: notification::Kind,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        if let Some(title) = self.send {
            let result = api::SendNotification {
                kind: self.kind,
                title: title.clone(),
                message: self.message,
            }
            .execute(&shell.pipeline)
            .await
            .map(|()| println!("Sent {} notification \"{}\"", self.kind, title));
            _ = shell.report_redirect().await;
            return result;
        }

        let result = match self.read {
            Some(id) => api::MarkRead { id }.execute(&shell.pipeline).await.map(|()| {
                println!("Marked notification {id} as read");
            }),
            None => api::ListNotifications {
                page: self.page,
                size: self.size,
            }
            .execute(&shell.pipeline)
            .await
            .map(|page| {
                let shown = page.content.len();
                super::print_table(page.content);
                println!(
                    "Page {} ({} shown, {} total)",
                    page.number, shown, page.total_elements
                );
            }),
        };

        _ = shell.report_redirect().await;
        result
    }
}
