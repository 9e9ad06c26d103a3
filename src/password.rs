// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;
use secrecy::SecretString;
use tokio::task;

use crate::{error::Result, metadata};

/// A request for the password of a portal account.
#[derive(Clone, Debug)]
pub(crate) struct Request {
    username: String,
    attempt: usize,
    rejection: Option<String>,
}

impl Request {
    pub(crate) fn new(username: &str, attempt: usize) -> Self {
        Self {
            username: username.to_owned(),
            attempt,
            rejection: None,
        }
    }

    /// Tell the user why the previous answer was not accepted.
    pub(crate) fn rejected(mut self, reason: &str) -> Self {
        self.rejection = Some(reason.to_owned());
        self
    }

    fn description(&self) -> String {
        if self.attempt > 1 {
            format!("Password for {} (attempt {})", self.username, self.attempt)
        } else {
            format!("Password for {}", self.username)
        }
    }
}

#[async_trait]
pub(crate) trait Prompt: Send + Sync {
    /// Ask for a password. `None` means this prompt is unavailable.
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>>;
}

#[async_trait]
impl<P: Prompt + ?Sized> Prompt for Box<P> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        (**self).prompt(req).await
    }
}

/// Tries each prompt in turn until one answers or fails.
#[async_trait]
impl<P: Prompt> Prompt for Vec<P> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        for prompt in self {
            if let Some(password) = prompt.prompt(req.clone()).await? {
                return Ok(Some(password));
            }
        }
        Ok(None)
    }
}

/// Asks through a Pinentry dialog. Unavailable when no Pinentry program
/// can be found.
pub(crate) struct Pinentry {
    program: Option<PathBuf>,
}

impl Pinentry {
    pub(crate) fn new(program: Option<PathBuf>) -> Self {
        Self { program }
    }
}

fn ask<'input>(
    mut input: pinentry::PassphraseInput<'input>,
    title: &'input str,
    description: &'input str,
    rejection: Option<&'input str>,
) -> Result<SecretString> {
    _ = input
        .required("A password is required to sign in to the portal.")
        .with_title(title)
        .with_prompt(description);
    if let Some(rejection) = rejection {
        _ = input.with_error(rejection);
    }
    Ok(input.interact()?)
}

#[async_trait]
impl Prompt for Pinentry {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        let input = match self.program.as_ref() {
            Some(program) => pinentry::PassphraseInput::with_binary(program),
            None => pinentry::PassphraseInput::with_default_binary(),
        };
        let Some(input) = input else {
            debug!("No Pinentry program available");
            return Ok(None);
        };

        let password = task::spawn_blocking(move || {
            let title = format!("Sign in - {}", *metadata::CLIENT_DISPLAY_NAME);
            let description = req.description();
            ask(input, &title, &description, req.rejection.as_deref())
        })
        .await??;

        Ok(Some(password))
    }
}

/// Asks on the controlling terminal.
pub(crate) struct Terminal;

#[async_trait]
impl Prompt for Terminal {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        if let Some(rejection) = req.rejection.as_deref() {
            eprintln!("{rejection}");
        }

        let label = format!("{}: ", req.description());
        let password =
            task::spawn_blocking(move || rpassword::prompt_password(label)).await??;
        Ok(Some(SecretString::new(password)))
    }
}
