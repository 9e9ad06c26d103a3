// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{error::Result, shell::Shell};

/// Resolve a path the way the portal would, following guard redirects.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The path to navigate to, optionally with a query string.
    #[clap()]
    path: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        let resolution = shell.router.navigate(&self.path).await?;
        super::print_resolution(&resolution);
        _ = shell.report_redirect().await;
        Ok(())
    }
}
