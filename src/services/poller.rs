use crate::models::Message;
use crate::services::marketplace::{MarketplaceClient, MarketplaceError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle for a running poller
///
/// `stop` signals shutdown and waits for the task to exit. Dropping the
/// handle aborts the task. Either way no tick runs after teardown.
pub struct PollHandle {
    name: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Signal the poller to stop and wait until its task exits
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        tracing::debug!("Poller {} stopped", self.name);
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Fixed-interval background work on a tokio task
pub struct Poller;

impl Poller {
    /// Run `task` now and then every `period` until the handle is torn down
    ///
    /// A tick that is still running when shutdown is signalled is cut short.
    pub fn spawn<F, Fut>(name: &str, period: Duration, mut task: F) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            biased;
                            _ = &mut shutdown_rx => break,
                            _ = task() => {}
                        }
                    }
                }
            }
            tracing::trace!("Poller {} exiting", task_name);
        });

        tracing::debug!("Poller {} started (every {:?})", name, period);

        PollHandle {
            name: name.to_string(),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

/// Keeps a chat thread fresh while it is open
///
/// Every tick fetches the thread, marks it read when it holds an unread
/// message addressed to `me`, then publishes it on a watch channel.
pub struct ThreadSync {
    messages: watch::Receiver<Vec<Message>>,
    handle: PollHandle,
}

impl ThreadSync {
    pub fn start(client: Arc<MarketplaceClient>, me: String, peer: String, period: Duration) -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        let tx = Arc::new(tx);
        let name = format!("thread-sync:{}", peer);

        let handle = Poller::spawn(&name, period, move || {
            let client = client.clone();
            let me = me.clone();
            let peer = peer.clone();
            let tx = tx.clone();
            async move {
                if let Err(e) = sync_thread(&client, &me, &peer, &tx).await {
                    tracing::warn!("Chat sync {} <-> {} failed: {}", me, peer, e);
                }
            }
        });

        Self {
            messages: rx,
            handle,
        }
    }

    /// Subscribe to thread updates
    pub fn messages(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.clone()
    }

    pub async fn stop(self) {
        self.handle.stop().await;
    }
}

async fn sync_thread(
    client: &MarketplaceClient,
    me: &str,
    peer: &str,
    tx: &watch::Sender<Vec<Message>>,
) -> Result<(), MarketplaceError> {
    let thread = client.fetch_thread(me, peer).await?;

    if thread.iter().any(|m| !m.is_read && m.receiver_email == me) {
        if let Err(e) = client.mark_thread_read(me, peer).await {
            tracing::warn!("Failed to mark thread {} <- {} read: {}", me, peer, e);
        }
    }

    tx.send_replace(thread);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_poller(period: Duration) -> (PollHandle, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let ticks = counter.clone();
        let handle = Poller::spawn("counter", period, move || {
            let ticks = ticks.clone();
            async move {
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        });
        (handle, counter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_immediately_then_every_period() {
        let (handle, counter) = counting_poller(Duration::from_secs(4));

        tokio::time::sleep(Duration::from_millis(8_500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop() {
        let (handle, counter) = counting_poller(Duration::from_secs(4));

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        handle.stop().await;
        let at_stop = counter.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_drop() {
        let (handle, counter) = counting_poller(Duration::from_secs(4));

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        drop(handle);
        let at_drop = counter.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), at_drop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_slow_tick() {
        let finished = Arc::new(AtomicUsize::new(0));
        let done = finished.clone();
        let handle = Poller::spawn("slow", Duration::from_secs(1), move || {
            let done = done.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                done.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_thread_sync_marks_unread_and_publishes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/messages/thread/me%40x.com/peer%40x.com")
            .with_status(200)
            .with_body(
                r#"[{"senderEmail":"peer@x.com","receiverEmail":"me@x.com","text":"Is the drill free?","isRead":false}]"#,
            )
            .create_async()
            .await;
        let read = server
            .mock("PATCH", "/messages/read-thread/me%40x.com/peer%40x.com")
            .with_status(200)
            .expect_at_least(1)
            .create_async()
            .await;

        let client = Arc::new(MarketplaceClient::new(server.url(), Duration::from_secs(5)).unwrap());
        let sync = ThreadSync::start(
            client,
            "me@x.com".to_string(),
            "peer@x.com".to_string(),
            Duration::from_secs(3600),
        );

        let mut rx = sync.messages();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("thread was not published")
            .unwrap();

        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(rx.borrow()[0].text, "Is the drill free?");
        read.assert_async().await;

        sync.stop().await;
    }
}
