//! Settlement event plumbing
//!
//! A settled order fans out to interested hooks (confirmation mail, fulfilment, a metric)
//! through a bounded mpsc channel per event type. Producers are cheap clones handed to each
//! reconciliation channel; the handler side runs every hook on its own task so one slow hook
//! never holds up the channel.

use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

/// An async hook. Stateless: all it gets is the event itself.
pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    hook: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, hook: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { receiver, sender, hook }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer { sender: self.sender.clone() }
    }

    /// Consumes the handler and services the channel until the last producer is dropped, then
    /// waits for in-flight hook invocations to finish before returning.
    pub async fn start_handler(mut self) {
        debug!("📬️ Event handler running");
        // without this, the handler's own sender would keep the channel open forever
        drop(self.sender);
        let mut in_flight = JoinSet::new();
        while let Some(event) = self.receiver.recv().await {
            trace!("📬️ Dispatching settlement event to its hook");
            in_flight.spawn((self.hook)(event));
        }
        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                warn!("📬️ A settlement hook panicked: {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

/// The publishing half of the channel. Cloned into every reconciliation channel that needs to
/// announce settlements.
#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Dropped a settlement event, the handler is gone. {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    // A webhook and a poller publish settlements concurrently; the hook must see all of them.
    #[tokio::test]
    async fn every_published_settlement_reaches_the_hook() {
        let _ = env_logger::try_init();
        let total_paise = Arc::new(AtomicU64::new(0));
        let tally = total_paise.clone();
        let hook = Arc::new(move |amount: u64| {
            let tally = tally.clone();
            Box::pin(async move {
                tally.fetch_add(amount, Ordering::SeqCst);
                tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let handler = EventHandler::new(2, hook);
        let webhook_channel = handler.subscribe();
        let poller_channel = handler.subscribe();
        tokio::spawn(async move {
            for amount in [142_000, 250_000, 98_500] {
                webhook_channel.publish_event(amount).await;
            }
        });
        tokio::spawn(async move {
            for amount in [300_000, 45_000] {
                poller_channel.publish_event(amount).await;
            }
        });

        handler.start_handler().await;
        assert_eq!(total_paise.load(Ordering::SeqCst), 835_500);
    }
}
