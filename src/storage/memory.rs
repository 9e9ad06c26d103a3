// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::lock::Mutex;

use crate::error::Result;

use super::{Placement, Storage};

/// Keeps the record for the lifetime of the process. Clones share one slot.
pub(crate) struct Memory<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Memory<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T> Clone for Memory<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> Storage<T> for Memory<T> {
    fn placement(&self) -> Placement {
        Placement::Process
    }

    async fn load(&mut self) -> Result<Option<T>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&mut self, record: &T) -> Result<()> {
        *self.slot.lock().await = Some(record.clone());
        Ok(())
    }

    async fn discard(&mut self) -> Result<()> {
        *self.slot.lock().await = None;
        Ok(())
    }
}
