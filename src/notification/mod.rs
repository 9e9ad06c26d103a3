// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod event;
mod model;
mod toast;

use std::{io, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::{lock::Mutex, stream::BoxStream, StreamExt as _, TryStreamExt as _};
use log::{debug, info, warn};
use reqwest::header;
use secrecy::{ExposeSecret as _, SecretString};
use tokio::{sync::RwLock, task::JoinHandle};
use tokio_util::{codec::FramedRead, io::StreamReader};
use url::Url;

use crate::{
    error::{self, Result},
    http, session,
};

pub(crate) use event::RawEvent;
pub(crate) use model::{Event, Kind, Notification};
pub(crate) use toast::Tray;

pub(crate) const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub(crate) type Events = BoxStream<'static, Result<RawEvent>>;

/// Opens the server's event stream.
#[async_trait]
pub(crate) trait Subscribe: Send + Sync {
    async fn subscribe(&self, bearer: Option<SecretString>) -> Result<Events>;
}

/// Subscribes over HTTP to `GET /notifications/subscribe`.
pub(crate) struct Subscriber {
    url: Url,
    client: reqwest::Client,
}

impl Subscriber {
    pub(crate) fn new(transport: &http::Reqwest) -> Result<Self> {
        Ok(Self {
            url: transport.endpoint("/notifications/subscribe")?,
            client: transport.client().clone(),
        })
    }
}

#[async_trait]
impl Subscribe for Subscriber {
    async fn subscribe(&self, bearer: Option<SecretString>) -> Result<Events> {
        debug!("Subscribing to {}", self.url);
        let mut builder = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, "text/event-stream");
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(error::Api::Status {
                status,
                body: resp.text().await.unwrap_or_default(),
            }
            .into());
        }

        let body = resp
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        Ok(FramedRead::new(StreamReader::new(body), event::EventCodec::default()).boxed())
    }
}

pub(crate) type Listener = Box<dyn Fn(&Notification) + Send + Sync>;

struct Inner {
    subscriber: Arc<dyn Subscribe>,
    session: Arc<session::Context>,
    listeners: RwLock<Vec<Listener>>,
    tray: Tray,
    reconnect_delay: Duration,
}

impl Inner {
    async fn consume(self: Arc<Self>) {
        loop {
            if let Err(e) = self.listen().await {
                warn!(
                    "Notification stream dropped ({}); reconnecting in {}s",
                    e,
                    self.reconnect_delay.as_secs()
                );
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn listen(&self) -> Result<()> {
        let bearer = self
            .session
            .credentials()
            .get()
            .await?
            .map(|credential| credential.token().clone());

        let mut events = self.subscriber.subscribe(bearer).await?;
        while let Some(raw) = events.try_next().await? {
            self.dispatch(raw).await;
        }
        Err(error::Api::StreamEnded.into())
    }

    async fn dispatch(&self, raw: RawEvent) {
        match Event::classify(raw) {
            Some(Event::Open(data)) => info!("Notification stream open: {}", data),
            Some(Event::Message(data)) => debug!("Notification stream message: {}", data),
            Some(Event::Notification(notification)) => {
                let _id = self.tray.show(notification.clone()).await;
                for listener in self.listeners.read().await.iter() {
                    listener(&notification);
                }
            }
            None => {}
        }
    }
}

/// A long-lived subscription to server notifications. There is at most one
/// consumer, and it reconnects after a fixed delay for as long as it runs.
pub(crate) struct Channel {
    inner: Arc<Inner>,
    connection: Mutex<Option<JoinHandle<()>>>,
}

impl Channel {
    pub(crate) fn new(
        subscriber: Arc<dyn Subscribe>,
        session: Arc<session::Context>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscriber,
                session,
                listeners: RwLock::new(Vec::new()),
                tray: Tray::default(),
                reconnect_delay,
            }),
            connection: Mutex::new(None),
        }
    }

    pub(crate) async fn connect(&self) {
        let mut connection = self.connection.lock().await;
        if connection.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Notification channel is already connected");
            return;
        }

        info!("Connecting notification channel");
        *connection = Some(tokio::spawn(Arc::clone(&self.inner).consume()));
    }

    pub(crate) async fn disconnect(&self) {
        let handle = self.connection.lock().await.take();
        if let Some(handle) = handle {
            info!("Disconnecting notification channel");
            handle.abort();
            // Wait for the stream to actually be dropped.
            _ = handle.await;
        }
    }

    #[cfg(test)]
    pub(crate) async fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Register a listener. Listeners run in registration order after the
    /// notification is shown.
    pub(crate) async fn on_notification<F>(&self, listener: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner.listeners.write().await.push(Box::new(listener));
    }

    pub(crate) fn tray(&self) -> &Tray {
        &self.inner.tray
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex as StdMutex,
        },
    };

    use chrono::Duration as ChronoDuration;
    use futures_util::stream;

    use super::*;
    use crate::credential;

    enum Script {
        Fail,
        Events(Vec<RawEvent>),
    }

    struct LiveGuard(Arc<AtomicUsize>);

    impl Drop for LiveGuard {
        fn drop(&mut self) {
            let _previous = self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Plays back scripted connections. Once the script runs out, streams
    /// stay open without producing anything.
    #[derive(Default)]
    struct Fake {
        script: StdMutex<VecDeque<Script>>,
        opened: AtomicUsize,
        live: Arc<AtomicUsize>,
        max_live: AtomicUsize,
        bearers: StdMutex<Vec<Option<String>>>,
    }

    impl Fake {
        fn with_script(script: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(script.into()),
                ..Self::default()
            })
        }

        fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Subscribe for Fake {
        async fn subscribe(&self, bearer: Option<SecretString>) -> Result<Events> {
            let _previous = self.opened.fetch_add(1, Ordering::SeqCst);
            self.bearers
                .lock()
                .unwrap()
                .push(bearer.map(|token| token.expose_secret().clone()));

            let next = self.script.lock().unwrap().pop_front();
            let (events, ends) = match next {
                Some(Script::Fail) => return Err(error::Api::StreamEnded.into()),
                Some(Script::Events(events)) => (events, true),
                None => (Vec::new(), false),
            };

            let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            let _previous = self.max_live.fetch_max(live, Ordering::SeqCst);
            let guard = LiveGuard(Arc::clone(&self.live));

            let tail: Events = if ends {
                stream::empty().boxed()
            } else {
                stream::pending().boxed()
            };
            Ok(stream::iter(events.into_iter().map(Ok))
                .chain(tail)
                .map(move |event| {
                    let _held = &guard;
                    event
                })
                .boxed())
        }
    }

    fn raw(name: &str, data: &str) -> RawEvent {
        RawEvent {
            name: name.to_owned(),
            data: data.to_owned(),
            ..RawEvent::default()
        }
    }

    fn channel(fake: &Arc<Fake>) -> (Channel, Arc<session::Context>) {
        let session = Arc::new(session::Context::new(credential::tests::memory_store()));
        let subscriber: Arc<dyn Subscribe> = Arc::<Fake>::clone(fake);
        let channel = Channel::new(
            subscriber,
            Arc::clone(&session),
            RECONNECT_DELAY,
        );
        (channel, session)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_connects_share_one_connection() {
        let fake = Fake::with_script(Vec::new());
        let (channel, _session) = channel(&fake);

        for _ in 0..10 {
            channel.connect().await;
        }
        settle().await;
        assert_eq!(fake.opened(), 1);
        assert_eq!(fake.live(), 1);
        assert!(channel.is_connected().await);

        channel.disconnect().await;
        assert_eq!(fake.live(), 0);
        assert!(!channel.is_connected().await);

        channel.connect().await;
        channel.connect().await;
        settle().await;
        assert_eq!(fake.opened(), 2);
        assert_eq!(fake.max_live.load(Ordering::SeqCst), 1);
        channel.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_fixed_delay() {
        let fake = Fake::with_script(vec![
            Script::Fail,
            Script::Events(vec![
                raw("open", "connected"),
                raw("notification", r#"{"title":"First"}"#),
            ]),
        ]);
        let (channel, _session) = channel(&fake);
        channel.connect().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fake.opened(), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fake.opened(), 1);

        // Second attempt at 5s delivers one notification, then ends.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fake.opened(), 2);
        assert_eq!(channel.tray().active().await.len(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fake.opened(), 3);
        assert_eq!(fake.live(), 1);
        assert!(channel.tray().active().await.is_empty());
        channel.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn listeners_run_in_order() {
        let fake = Fake::with_script(vec![Script::Events(vec![
            raw("open", "connected"),
            raw("message", "hello"),
            raw("notification", ""),
            raw(
                "notification",
                &serde_json::to_string(r#"{"type":"error","title":"Broken"}"#)
                    .unwrap_or_default(),
            ),
            raw("notification", "plain words"),
        ])]);
        let (channel, _session) = channel(&fake);

        let seen = Arc::new(StdMutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            channel
                .on_notification(move |n: &Notification| {
                    seen.lock().unwrap().push(format!("{tag}:{}:{}", n.kind, n.title));
                })
                .await;
        }

        channel.connect().await;
        settle().await;
        channel.disconnect().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "a:error:Broken",
                "b:error:Broken",
                "a:info:Notification",
                "b:info:Notification",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connects_with_current_credential() -> Result<()> {
        let fake = Fake::with_script(Vec::new());
        let (channel, session) = channel(&fake);
        let token = credential::tests::token_expiring_in("alice", ChronoDuration::minutes(10));
        session.login(SecretString::new(token.clone())).await?;

        channel.connect().await;
        settle().await;
        channel.disconnect().await;

        assert_eq!(*fake.bearers.lock().unwrap(), vec![Some(token)]);
        Ok(())
    }
}
