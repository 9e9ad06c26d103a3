// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::debug;

use crate::{
    error::Result,
    http::api::{self, Executor as _},
    shell::Shell,
};

/// Finish a social sign-in with the code the provider redirected back with.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The provider that issued the code.
    #[arg(value_enum)]
    provider: api::Provider,

    /// The authorization code from the redirect.
    code: String,

    /// Where to navigate once signed in.
    #[arg(long, value_name = "PATH")]
    redirect: Option<String>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        debug!("Exchanging {} authorization code", self.provider);
        let tokens = api::OAuthExchange {
            provider: self.provider,
            code: self.code,
        }
        .execute_unintercepted(shell.pipeline.transport())
        .await?;

        let fallback = format!("{} user", self.provider);
        super::login::start_session(shell, tokens, &fallback, self.redirect).await
    }
}
