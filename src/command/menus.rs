// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use tabled::Tabled;

use crate::{error::Result, menu, shell::Shell};

/// Show the menu the server offers to the current user.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Print the records as delivered instead of as a tree.
    #[arg(long)]
    flat: bool,
}

#[derive(Debug, PartialEq, Eq, Tabled)]
struct Row {
    #[tabled(rename = "Menu")]
    label: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Icon")]
    icon: String,
}

fn rows(tree: &[menu::Node]) -> Vec<Row> {
    tree.iter()
        .flat_map(menu::Node::walk)
        .map(|(depth, node)| Row {
            label: format!("{}{}", "  ".repeat(depth), node.record.name),
            path: node.record.path.clone(),
            icon: node.record.icon.clone().unwrap_or_default(),
        })
        .collect()
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        let result = shell.session.fetch_menus(&shell.pipeline).await;
        if shell.report_redirect().await {
            return result.map(|_| ());
        }

        let raw = result?;
        if self.flat {
            super::print_table(raw);
        } else {
            super::print_table(rows(&shell.session.snapshot().await.menus));
        }
        Ok(())
    }
}
