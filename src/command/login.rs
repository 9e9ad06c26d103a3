// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, BufRead as _, Write as _};

use async_trait::async_trait;
use clap::Parser;
use log::{error, info, warn};
use tokio::task;

use crate::{
    error::{self, Result},
    http::api::{self, Executor as _},
    password,
    router::Location,
    shell::Shell,
};

const ATTEMPTS: usize = 3;

/// Sign in to the portal and start a session.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The account to sign in as. Asked for interactively when missing.
    #[arg(short, long, env = "PORTICO_USERNAME")]
    username: Option<String>,

    /// Where to navigate once signed in.
    #[arg(long, value_name = "PATH")]
    redirect: Option<String>,
}

/// Adopt freshly issued tokens: store the credential, load the profile and
/// navigate to `redirect`, or the landing page.
pub(super) async fn start_session(
    shell: &Shell,
    tokens: api::Tokens,
    fallback_name: &str,
    redirect: Option<String>,
) -> Result<()> {
    shell.session.login(tokens.access_token).await?;
    shell.session.load_profile(&shell.pipeline).await;

    let state = shell.session.snapshot().await;
    let name = state.username.as_deref().unwrap_or(fallback_name);
    info!("Signed in as {}", name);
    println!("Signed in as {name}");

    let target = redirect.unwrap_or_else(|| Location::landing().full_path());
    let resolution = shell.router.navigate(&target).await?;
    super::print_resolution(&resolution);
    Ok(())
}

pub(super) async fn read_username() -> Result<String> {
    let username = task::spawn_blocking(|| -> io::Result<String> {
        eprint!("Username: ");
        io::stderr().flush()?;
        let mut line = String::new();
        _ = io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_owned())
    })
    .await??;

    if username.is_empty() {
        return Err(error::Error::Cancelled);
    }
    Ok(username)
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, shell: &Shell) -> Result<()> {
        let username = match self.username {
            Some(username) => username,
            None => read_username().await?,
        };

        let mut rejection = None;
        for attempt in 1..=ATTEMPTS {
            let mut req = password::Request::new(&username, attempt);
            if let Some(reason) = rejection.take() {
                req = req.rejected(reason);
            }

            let password = shell
                .prompt
                .prompt(req)
                .await?
                .ok_or(error::Password::NoPrompt)?;

            let login = api::Login {
                username: username.clone(),
                password,
            };
            match login.execute_unintercepted(shell.pipeline.transport()).await {
                Ok(tokens) => {
                    return start_session(shell, tokens, &username, self.redirect).await;
                }
                Err(e) if e.is_unauthorized() => {
                    warn!("Sign-in for {} was rejected", username);
                    rejection = Some("The username or password is incorrect.");
                }
                Err(e) => return Err(e),
            }
        }

        error!("Giving up after {} attempts", ATTEMPTS);
        Err(error::Error::Command)
    }
}
