// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use log::warn;
use tokio::sync::watch;

use crate::{
    error::Result,
    http::{self, Pipeline, Transport},
    notification, password,
    router::Router,
    session, view,
};

/// Everything a command needs, wired together once per invocation.
pub(crate) struct Shell {
    pub(crate) session: Arc<session::Context>,
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) router: Router,
    pub(crate) channel: notification::Channel,
    pub(crate) prompt: Box<dyn password::Prompt>,
}

impl Shell {
    pub(crate) fn new(
        session: Arc<session::Context>,
        transport: Arc<dyn Transport>,
        subscriber: Arc<dyn notification::Subscribe>,
        views: view::Registry,
        prompt: Box<dyn password::Prompt>,
        reconnect_delay: Duration,
    ) -> Self {
        let (redirect_tx, redirect_rx) = watch::channel(None);
        let pipeline = Arc::new(Pipeline::new(transport, Arc::clone(&session), redirect_tx));
        let router = Router::new(
            Arc::clone(&session),
            Arc::clone(&pipeline),
            views,
            redirect_rx,
        );
        let channel = notification::Channel::new(subscriber, Arc::clone(&session), reconnect_delay);

        Self {
            session,
            pipeline,
            router,
            channel,
            prompt,
        }
    }

    /// Build a shell that talks to a real server.
    pub(crate) fn connect(
        session: Arc<session::Context>,
        transport: http::Reqwest,
        views: view::Registry,
        prompt: Box<dyn password::Prompt>,
        reconnect_delay: Duration,
    ) -> Result<Self> {
        let subscriber = notification::Subscriber::new(&transport)?;
        Ok(Self::new(
            session,
            Arc::new(transport),
            Arc::new(subscriber),
            views,
            prompt,
            reconnect_delay,
        ))
    }

    /// Report a forced logout that happened while a command ran.
    pub(crate) async fn report_redirect(&self) -> bool {
        match self.router.take_redirect().await {
            Some(location) => {
                warn!("The session has ended; sign in again (continue at {})", location);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{collections::VecDeque, sync::Mutex as StdMutex};

    use async_trait::async_trait;
    use futures_util::{stream, StreamExt as _};
    use secrecy::SecretString;

    use super::*;
    use crate::{credential, http::tests::Scripted, notification::Events};

    /// Answers password prompts from a fixed list, then gives up.
    #[derive(Default)]
    pub(crate) struct Answers(StdMutex<VecDeque<&'static str>>);

    impl<const N: usize> From<[&'static str; N]> for Answers {
        fn from(answers: [&'static str; N]) -> Self {
            Self(StdMutex::new(answers.into()))
        }
    }

    #[async_trait]
    impl password::Prompt for Answers {
        async fn prompt(&self, _req: password::Request) -> Result<Option<SecretString>> {
            let next = self.0.lock().unwrap().pop_front();
            Ok(next.map(|answer| SecretString::new(answer.to_owned())))
        }
    }

    /// An event stream that never says anything.
    pub(crate) struct Silent;

    #[async_trait]
    impl notification::Subscribe for Silent {
        async fn subscribe(&self, _bearer: Option<SecretString>) -> Result<Events> {
            Ok(stream::pending().boxed())
        }
    }

    pub(crate) fn shell(answers: Answers) -> (Arc<Scripted>, Shell) {
        let transport = Arc::new(Scripted::default());
        let wire: Arc<dyn Transport> = Arc::<Scripted>::clone(&transport);
        let shell = Shell::new(
            Arc::new(session::Context::new(credential::tests::memory_store())),
            wire,
            Arc::new(Silent),
            view::Registry::default(),
            Box::new(answers),
            notification::RECONNECT_DELAY,
        );
        (transport, shell)
    }
}
