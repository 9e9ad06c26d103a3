// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{error::Result, metadata};

use super::{Placement, Storage};

/// JSON record kept in the project data directory.
pub(crate) struct File {
    path: PathBuf,
}

impl File {
    fn new<P: AsRef<Path>>(file: P) -> Option<Self> {
        metadata::PROJECT_DIRS.as_ref().map(|dirs| Self {
            path: dirs.data_dir().to_owned().join(file),
        })
    }

    /// Storage scoped to a single API host, so that sessions against
    /// different servers never see each other's records.
    pub(crate) fn for_domain(name: &str, domain: &str) -> Option<Self> {
        let sanitized: String = domain
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        Self::new(format!("{name}@{sanitized}.json"))
    }

    #[cfg(test)]
    pub(crate) fn at<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }
}

#[async_trait]
impl<T: Send + Serialize + Sync + for<'de> Deserialize<'de>> Storage<T> for File {
    fn placement(&self) -> Placement {
        Placement::Disk(self.path.clone())
    }

    async fn load(&mut self) -> Result<Option<T>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&mut self, record: &T) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        fs::write(&self.path, serde_json::to_vec(record)?).await?;
        debug!("Wrote record to {}", self.path.display());
        Ok(())
    }

    async fn discard(&mut self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
