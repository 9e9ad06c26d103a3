// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::warn;

use crate::{
    error::Result,
    http::api::{self, Executor as _},
    shell::Shell,
};

/// End the session on the server and forget the local credential.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        if shell.session.is_authenticated().await? {
            if let Err(e) = api::Logout.execute(&shell.pipeline).await {
                warn!("The server did not accept the logout: {}", e);
            }
        }

        shell.session.logout().await?;
        println!("Signed out");
        Ok(())
    }
}
