//! Convergence worker tying the badge manager to its update sources.
//!
//! Three sources feed the same manager: gateway push events, in-process bus
//! events from components that already know the new count, and a periodic
//! REST reconcile that corrects anything push delivery missed. The service
//! owns the manager outright; there is exactly one writer, so surfaces can
//! never observe two sources racing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::events::{CoreEvent, EventBus};
use crate::gateway::{GatewayEvent, GatewayHandle};

use super::{UnreadBadgeManager, UnreadCountSource};

pub struct UnreadSyncService {
    manager: UnreadBadgeManager,
    source: Arc<dyn UnreadCountSource>,
    gateway: GatewayHandle,
    bus: EventBus,
    poll_interval: Duration,
    count_tx: watch::Sender<i64>,
}

impl UnreadSyncService {
    pub fn new(
        manager: UnreadBadgeManager,
        source: Arc<dyn UnreadCountSource>,
        gateway: GatewayHandle,
        bus: EventBus,
        poll_interval: Duration,
    ) -> Self {
        let (count_tx, _) = watch::channel(manager.count());
        Self {
            manager,
            source,
            gateway,
            bus,
            poll_interval,
            count_tx,
        }
    }

    /// Observe the converged count without touching the manager.
    pub fn counts(&self) -> watch::Receiver<i64> {
        self.count_tx.subscribe()
    }

    /// Run until the task is dropped. The first poll tick fires at once, so
    /// startup begins with a reconcile rather than waiting a full interval.
    pub async fn run(mut self) {
        let mut push = self.gateway.subscribe();
        let mut bus = self.bus.subscribe();
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut push_open = true;
        let mut push_live = false;

        info!(poll_interval = ?self.poll_interval, "unread sync started");
        loop {
            tokio::select! {
                _ = poll.tick() => {
                    self.manager.refresh(self.source.as_ref()).await;
                }
                // Resolves once per service lifetime; until then, and again
                // whenever the transport drops, polling carries delivery.
                _ = self.gateway.ready(), if !push_live => {
                    push_live = true;
                    info!("gateway ready, push delivery live");
                }
                event = push.recv(), if push_open => match event {
                    Ok(GatewayEvent::UnreadUpdate { count }) => {
                        self.manager.update_all(count);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        // Absolute counts were missed; the store knows the
                        // true value, so reconcile instead of guessing.
                        warn!(skipped, "gateway stream lagged, reconciling");
                        self.manager.refresh(self.source.as_ref()).await;
                    }
                    Err(RecvError::Closed) => {
                        warn!("gateway stream closed, continuing on polling only");
                        push_open = false;
                    }
                },
                event = bus.recv() => match event {
                    Ok(CoreEvent::UnreadCountUpdated { count }) => {
                        self.manager.update_all(count);
                    }
                    Ok(_) => {}
                    Err(_) => {}
                },
            }
            self.count_tx.send_replace(self.manager.count());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::gateway::GatewayClient;
    use crate::unread::BadgeView;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct AdjustableSource(AtomicI64);

    #[async_trait]
    impl UnreadCountSource for AdjustableSource {
        async fn fetch_unread_count(&self) -> Result<i64> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    fn manager_with_log(log: &Arc<Mutex<Vec<BadgeView>>>) -> UnreadBadgeManager {
        let log = Arc::clone(log);
        let mut manager = UnreadBadgeManager::new();
        manager.register(
            "navbar",
            Box::new(move |view: &BadgeView| log.lock().push(view.clone())),
        );
        manager
    }

    #[tokio::test]
    async fn test_startup_reconcile_applies_source_count() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (_gateway_client, handle) = GatewayClient::new("ws://127.0.0.1:1", "u1");
        let service = UnreadSyncService::new(
            manager_with_log(&log),
            Arc::new(AdjustableSource(AtomicI64::new(8))),
            handle,
            EventBus::new(),
            Duration::from_secs(60),
        );
        let mut counts = service.counts();

        let task = tokio::spawn(service.run());
        counts.wait_for(|count| *count == 8).await.unwrap();
        task.abort();

        assert_eq!(log.lock().last().unwrap().text, "8");
    }

    #[tokio::test]
    async fn test_bus_events_update_without_network() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (_gateway_client, handle) = GatewayClient::new("ws://127.0.0.1:1", "u1");
        let bus = EventBus::new();
        let service = UnreadSyncService::new(
            manager_with_log(&log),
            Arc::new(AdjustableSource(AtomicI64::new(0))),
            handle,
            bus.clone(),
            Duration::from_secs(60),
        );
        let mut counts = service.counts();
        let task = tokio::spawn(service.run());
        counts.wait_for(|count| *count == 0).await.unwrap();

        bus.publish(CoreEvent::UnreadCountUpdated { count: 3 });
        counts.wait_for(|count| *count == 3).await.unwrap();
        task.abort();

        assert_eq!(log.lock().last().unwrap().text, "3");
    }

    #[tokio::test]
    async fn test_poll_picks_up_changed_source_count() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (_gateway_client, handle) = GatewayClient::new("ws://127.0.0.1:1", "u1");
        let source = Arc::new(AdjustableSource(AtomicI64::new(1)));
        let service = UnreadSyncService::new(
            manager_with_log(&log),
            Arc::clone(&source) as Arc<dyn UnreadCountSource>,
            handle,
            EventBus::new(),
            Duration::from_millis(20),
        );
        let mut counts = service.counts();
        let task = tokio::spawn(service.run());
        counts.wait_for(|count| *count == 1).await.unwrap();

        source.0.store(5, Ordering::SeqCst);
        counts.wait_for(|count| *count == 5).await.unwrap();
        task.abort();
    }
}
