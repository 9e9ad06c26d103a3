// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use tabled::{
    settings::{object::Segment, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::{error::Result, router::Resolution, shell::Shell};

pub(crate) mod listen;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod menus;
pub(crate) mod navigate;
pub(crate) mod notifications;
pub(crate) mod oauth;
pub(crate) mod routes;
pub(crate) mod signup;
pub(crate) mod whoami;

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, shell: &Shell) -> Result<()>;
}

fn print_table<T: Tabled>(rows: impl IntoIterator<Item = T>) {
    println!(
        "{}",
        Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Segment::all()).with(Alignment::left()))
    );
}

fn print_resolution(resolution: &Resolution) {
    for hop in &resolution.redirects {
        println!("Redirected to {hop}");
    }
    if let Some(next) = resolution.location.query_value("redirect") {
        println!("Sign in to continue to {next}");
    }
    for (name, value) in &resolution.params {
        println!("{name} = {value}");
    }
    print_table([resolution.entry.clone()]);
}
