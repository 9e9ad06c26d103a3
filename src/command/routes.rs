// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{error::Result, router::Location, shell::Shell};

/// List the route table, including routes generated from the menu.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        if shell.session.is_authenticated().await? {
            let _resolution = shell.router.navigate(&Location::landing().full_path()).await?;
            _ = shell.report_redirect().await;
        }

        super::print_table(shell.router.routes().await);
        Ok(())
    }
}
