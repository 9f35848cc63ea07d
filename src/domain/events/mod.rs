//! Product-update events and their fan-out channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::aggregates::product::Base;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_code: String, slug: String, base: Base },
    Updated { product_code: String, slug: String, base: Base },
    Deleted { product_code: String },
}

/// Fan-out hub for product updates. Subscribers register explicitly via
/// [`ProductFeed::subscribe`]; dropping the receiver tears the subscription
/// down. When a NATS client is attached, every event is mirrored as JSON on
/// `storefront.products`.
#[derive(Clone)]
pub struct ProductFeed {
    tx: broadcast::Sender<ProductEvent>,
    nats: Option<async_nats::Client>,
}

pub const NATS_SUBJECT: &str = "storefront.products";

impl ProductFeed {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx, nats }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProductEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publishes to all in-process subscribers and, when configured, to NATS.
    /// A feed with no subscribers is not an error.
    pub async fn publish(&self, event: ProductEvent) {
        let _ = self.tx.send(event.clone());
        if let Some(nats) = &self.nats {
            match serde_json::to_vec(&event) {
                Ok(payload) => {
                    if let Err(e) = nats.publish(NATS_SUBJECT, payload.into()).await {
                        tracing::warn!(error = %e, "failed to mirror product event to NATS");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to serialize product event"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feed_delivers_to_subscribers() {
        let feed = ProductFeed::new(None);
        let mut rx = feed.subscribe();
        feed.publish(ProductEvent::Deleted { product_code: "WEFT01".into() }).await;
        match rx.recv().await.unwrap() {
            ProductEvent::Deleted { product_code } => assert_eq!(product_code, "WEFT01"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_receiver_unsubscribes() {
        let feed = ProductFeed::new(None);
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        drop(rx);
        feed.publish(ProductEvent::Deleted { product_code: "GONE".into() }).await;
        assert_eq!(feed.subscriber_count(), 0);
    }
}
