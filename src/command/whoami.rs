// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use tabled::Tabled;

use crate::{error::Result, shell::Shell};

/// Show who the current session belongs to.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[derive(Tabled)]
struct Identity {
    #[tabled(rename = "User")]
    id: String,
    #[tabled(rename = "Name")]
    username: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Session expires")]
    expires: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        if !shell.session.is_authenticated().await? {
            println!("Not signed in");
            return Ok(());
        }

        shell.session.load_profile(&shell.pipeline).await;
        if shell.report_redirect().await {
            return Ok(());
        }

        let expires = shell
            .session
            .credentials()
            .get()
            .await?
            .map(|credential| {
                credential
                    .expires_at()
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string()
            })
            .unwrap_or_default();
        let state = shell.session.snapshot().await;
        if let Some(user) = state.user {
            super::print_table([Identity {
                id: user.id,
                username: state.username.unwrap_or_default(),
                role: user.role.unwrap_or_default(),
                expires,
            }]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use reqwest::StatusCode;
    use secrecy::SecretString;

    use super::*;
    use crate::{
        command::Command as _,
        credential::tests::token_expiring_in,
        shell::tests::{shell, Answers},
    };

    #[tokio::test]
    async fn shows_profile_of_live_session() -> Result<()> {
        let (transport, shell) = shell(Answers::default());
        shell
            .session
            .login(SecretString::new(token_expiring_in("alice", Duration::minutes(10))))
            .await?;
        transport
            .answer("/auth/me", StatusCode::OK, r#"{"username":"Alice"}"#)
            .await;

        Command {}.execute(&shell).await?;

        assert_eq!(transport.count("/auth/me").await, 1);
        let state = shell.session.snapshot().await;
        assert_eq!(state.username.as_deref(), Some("Alice"));
        Ok(())
    }

    #[tokio::test]
    async fn signed_out_skips_the_server() -> Result<()> {
        let (transport, shell) = shell(Answers::default());
        Command {}.execute(&shell).await?;
        assert!(transport.sent.lock().await.is_empty());
        Ok(())
    }
}
