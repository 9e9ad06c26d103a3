// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod file;
mod memory;

use std::{fmt, path::PathBuf};

use async_trait::async_trait;

use crate::error::Result;

pub(crate) use file::File;
pub(crate) use memory::Memory;

/// Where a record ends up once it is saved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    Process,
    Disk(PathBuf),
}

impl Placement {
    pub(crate) fn survives_exit(&self) -> bool {
        matches!(self, Self::Disk(_))
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => write!(f, "process memory"),
            Self::Disk(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A slot for a single record.
///
/// `save` replaces whatever the slot held. `discard` empties it and
/// succeeds even if it was already empty.
#[async_trait]
pub(crate) trait Storage<T>: Send + Sync {
    fn placement(&self) -> Placement;
    async fn load(&mut self) -> Result<Option<T>>;
    async fn save(&mut self, record: &T) -> Result<()>;
    async fn discard(&mut self) -> Result<()>;
}

#[async_trait]
impl<R: Sync, S: Storage<R> + ?Sized> Storage<R> for Box<S> {
    fn placement(&self) -> Placement {
        (**self).placement()
    }

    async fn load(&mut self) -> Result<Option<R>> {
        (**self).load().await
    }

    async fn save(&mut self, record: &R) -> Result<()> {
        (**self).save(record).await
    }

    async fn discard(&mut self) -> Result<()> {
        (**self).discard().await
    }
}
