// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod command;
mod credential;
mod error;
mod http;
mod menu;
mod metadata;
mod notification;
mod password;
mod route;
mod router;
mod session;
mod shell;
mod storage;
mod view;

use std::{path::PathBuf, process, sync::Arc, time::Duration};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use log::{error, info};
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Login(command::login::Command),
    Signup(command::signup::Command),
    #[command(name = "oauth")]
    OAuth(command::oauth::Command),
    Logout(command::logout::Command),
    Whoami(command::whoami::Command),
    Menus(command::menus::Command),
    Navigate(command::navigate::Command),
    Routes(command::routes::Command),
    Notifications(command::notifications::Command),
    Listen(command::listen::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, shell: &shell::Shell) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(shell).await,
            Self::Signup(cmd) => cmd.execute(shell).await,
            Self::OAuth(cmd) => cmd.execute(shell).await,
            Self::Logout(cmd) => cmd.execute(shell).await,
            Self::Whoami(cmd) => cmd.execute(shell).await,
            Self::Menus(cmd) => cmd.execute(shell).await,
            Self::Navigate(cmd) => cmd.execute(shell).await,
            Self::Routes(cmd) => cmd.execute(shell).await,
            Self::Notifications(cmd) => cmd.execute(shell).await,
            Self::Listen(cmd) => cmd.execute(shell).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the portal API.
    #[arg(long, env = "PORTICO_URL", default_value = "http://localhost:8081/api", value_parser = Url::parse)]
    url: Url,

    /// Keep the access token in memory only, so that every invocation starts
    /// signed out.
    #[arg(long)]
    no_persist: bool,

    /// An additional view module that menu entries may refer to, such as
    /// `views/reports/Monthly.vue`. May be given more than once.
    #[arg(long = "view", value_name = "COMPONENT")]
    views: Vec<String>,

    /// How long to wait before reconnecting a dropped notification stream.
    #[arg(
        long,
        default_value_t = notification::RECONNECT_DELAY.as_secs(),
        value_name = "SECONDS"
    )]
    reconnect_delay_secs: u64,

    /// The path to the Pinentry program to use when asking for the password.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

fn get_credential_storage(
    args: &Args,
    domain: &str,
) -> Box<dyn storage::Storage<credential::Cookie>> {
    if !args.no_persist {
        if let Some(file_storage) = storage::File::for_domain(credential::RECORD_NAME, domain) {
            return Box::new(file_storage);
        }
    }

    Box::new(storage::Memory::<credential::Cookie>::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(password::Pinentry::new(args.pinentry_program.clone())),
        Box::new(password::Terminal),
    ];

    let domain = args.url.host_str().unwrap_or("local").to_owned();
    let session = Arc::new(session::Context::new(credential::Store::new(
        &domain,
        get_credential_storage(&args, &domain),
    )));
    if session.restore().await? {
        info!("Resumed the previous session");
    }

    let shell = shell::Shell::connect(
        session,
        http::Reqwest::new(&args.url)?,
        view::Registry::new(&args.views),
        Box::new(prompt),
        Duration::from_secs(args.reconnect_delay_secs),
    )?;

    command::Command::execute(args.command, &shell).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("PORTICO_LOG", "warn")
        .write_style("PORTICO_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
