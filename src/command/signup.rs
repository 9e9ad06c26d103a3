// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::info;

use crate::{
    error::{self, Result},
    http::api::{self, Executor as _},
    password,
    shell::Shell,
};

/// Create a portal account.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The account to create. Asked for interactively when missing.
    #[arg(short, long, env = "PORTICO_USERNAME")]
    username: Option<String>,

    /// Sign in to the new account right away.
    #[arg(long)]
    login: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        let username = match self.username {
            Some(username) => username,
            None => super::login::read_username().await?,
        };

        let password = shell
            .prompt
            .prompt(password::Request::new(&username, 1))
            .await?
            .ok_or(error::Password::NoPrompt)?;

        api::Signup {
            username: username.clone(),
            password: password.clone(),
        }
        .execute_unintercepted(shell.pipeline.transport())
        .await?;
        info!("Created account {}", username);
        println!("Created account {username}");

        if !self.login {
            return Ok(());
        }

        let tokens = api::Login {
            username: username.clone(),
            password,
        }
        .execute_unintercepted(shell.pipeline.transport())
        .await?;
        super::login::start_session(shell, tokens, &username, None).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use reqwest::StatusCode;

    use super::*;
    use crate::{
        command::Command as _,
        credential::tests::token_expiring_in,
        shell::tests::{shell, Answers},
    };

    fn command(login: bool) -> Command {
        Command {
            username: Some("carol".to_owned()),
            login,
        }
    }

    #[tokio::test]
    async fn creates_account_without_signing_in() -> Result<()> {
        let (transport, shell) = shell(Answers::from(["s3cret"]));
        transport
            .answer("/auth/signup", StatusCode::OK, "welcome")
            .await;

        command(false).execute(&shell).await?;

        assert_eq!(
            transport.last_body("/auth/signup").await,
            Some(serde_json::json!({ "username": "carol", "password": "s3cret" }))
        );
        assert_eq!(transport.bearers("/auth/signup").await, vec![None]);
        assert_eq!(transport.count("/auth/login").await, 0);
        assert!(!shell.session.is_authenticated().await?);
        Ok(())
    }

    #[tokio::test]
    async fn signs_in_after_creating() -> Result<()> {
        let (transport, shell) = shell(Answers::from(["s3cret"]));
        let token = token_expiring_in("carol", Duration::minutes(10));
        transport
            .answer("/auth/signup", StatusCode::OK, "welcome")
            .await;
        transport
            .answer(
                "/auth/login",
                StatusCode::OK,
                &serde_json::json!({ "accessToken": token }).to_string(),
            )
            .await;
        transport
            .answer("/auth/me", StatusCode::OK, r#"{"username":"Carol"}"#)
            .await;
        transport.answer("/menus", StatusCode::OK, "[]").await;

        command(true).execute(&shell).await?;

        assert_eq!(
            transport.last_body("/auth/login").await,
            Some(serde_json::json!({ "username": "carol", "password": "s3cret" }))
        );
        assert!(shell.session.is_authenticated().await?);
        assert!(shell.session.routes_generated());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_signup_is_an_error() -> Result<()> {
        let (transport, shell) = shell(Answers::from(["s3cret"]));
        transport
            .answer("/auth/signup", StatusCode::CONFLICT, "taken")
            .await;

        let result = command(true).execute(&shell).await;

        assert!(matches!(
            result,
            Err(error::Error::Api(error::Api::Status { status, .. }))
                if status == StatusCode::CONFLICT
        ));
        assert_eq!(transport.count("/auth/signup").await, 1);
        assert_eq!(transport.count("/auth/login").await, 0);
        Ok(())
    }
}
