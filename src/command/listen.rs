// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use core::num;

use async_trait::async_trait;
use clap::Parser;
use futures_util::StreamExt as _;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    error::{self, Result},
    shell::Shell,
};

/// Stay connected to the notification stream and print what arrives.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Stop after this many notifications.
    #[clap(short, long)]
    count: Option<num::NonZeroUsize>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        if !shell.session.is_authenticated().await? {
            warn!("Not signed in; the server may refuse the notification stream");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        shell
            .channel
            .on_notification(move |notification| {
                if tx.send(notification.clone()).is_err() {
                    debug!("Dropping notification; nobody is printing anymore");
                }
            })
            .await;
        shell.channel.connect().await;

        let wanted = self.count.map_or(usize::MAX, num::NonZeroUsize::get);
        let mut received = UnboundedReceiverStream::new(rx).take(wanted);
        let mut printed = 0;
        while let Some(notification) = received.next().await {
            let toast = shell
                .channel
                .tray()
                .active()
                .await
                .into_iter()
                .rev()
                .find(|toast| toast.notification == notification);
            match toast {
                Some(toast) => {
                    println!("{}", toast.render());
                    _ = shell.channel.tray().dismiss(toast.id).await;
                }
                None => println!("{notification}"),
            }
            printed += 1;
        }

        shell.channel.disconnect().await;
        if printed < wanted && self.count.is_some() {
            return Err(error::Internal::ChannelClosed.into());
        }
        Ok(())
    }
}
