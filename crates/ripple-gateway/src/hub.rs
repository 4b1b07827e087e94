use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use ripple_types::events::{ChangeEvent, ChangeOp, Table};
use ripple_types::filter::Filter;

/// A refresh signal delivered to a subscriber. Carries no row data on
/// purpose: the consumer re-runs its fetch against the store.
#[derive(Debug, Clone)]
pub struct Notification {
    pub subscription_id: Uuid,
    pub table: Table,
    pub op: ChangeOp,
}

struct Subscription {
    table: Table,
    filter: Filter,
    tx: mpsc::UnboundedSender<Notification>,
}

/// Routes committed mutations to subscriptions.
///
/// Every mutation handler publishes a [`ChangeEvent`] after its write lands;
/// each subscription whose table and filter match receives one notification
/// per event. Overlapping filters each fire, and a subscription that is never
/// unsubscribed keeps receiving. Teardown is the consumer's responsibility.
#[derive(Clone)]
pub struct ChangeHub {
    inner: Arc<RwLock<HashMap<Uuid, Subscription>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a subscription. Notifications are sent through `tx`, so one
    /// connection can multiplex several subscriptions over one channel.
    pub async fn subscribe(
        &self,
        table: Table,
        filter: Filter,
        tx: mpsc::UnboundedSender<Notification>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .write()
            .await
            .insert(id, Subscription { table, filter, tx });
        id
    }

    pub async fn unsubscribe(&self, subscription_id: Uuid) {
        self.inner.write().await.remove(&subscription_id);
    }

    /// Tear down a whole connection's subscriptions at once.
    pub async fn unsubscribe_all(&self, subscription_ids: &[Uuid]) {
        let mut subs = self.inner.write().await;
        for id in subscription_ids {
            subs.remove(id);
        }
    }

    /// Fan a committed mutation out to matching subscriptions. Returns the
    /// number of notifications sent (used by tests; callers ignore it).
    pub async fn publish(&self, event: &ChangeEvent) -> usize {
        let subs = self.inner.read().await;
        let mut sent = 0;

        for (id, sub) in subs.iter() {
            if sub.table != event.table || !sub.filter.matches(&event.row) {
                continue;
            }
            let _ = sub.tx.send(Notification {
                subscription_id: *id,
                table: event.table,
                op: event.op,
            });
            sent += 1;
        }

        sent
    }

    pub async fn subscription_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_types::filter::row;

    fn message_event(sender: &str, receiver: &str) -> ChangeEvent {
        ChangeEvent {
            table: Table::Messages,
            op: ChangeOp::Insert,
            row: row([
                ("sender_id", sender.into()),
                ("receiver_id", receiver.into()),
            ]),
        }
    }

    fn pair_filter(a: &str, b: &str) -> Filter {
        Filter::or([
            Filter::and([Filter::eq("sender_id", a), Filter::eq("receiver_id", b)]),
            Filter::and([Filter::eq("sender_id", b), Filter::eq("receiver_id", a)]),
        ])
    }

    #[tokio::test]
    async fn matching_mutation_delivers_exactly_once() {
        let hub = ChangeHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub_id = hub
            .subscribe(Table::Messages, pair_filter("u1", "u2"), tx)
            .await;

        assert_eq!(hub.publish(&message_event("u1", "u2")).await, 1);

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.subscription_id, sub_id);
        assert_eq!(notification.table, Table::Messages);
        assert_eq!(notification.op, ChangeOp::Insert);
        // Exactly one signal per mutation
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_matching_mutation_delivers_nothing() {
        let hub = ChangeHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        hub.subscribe(Table::Messages, pair_filter("u1", "u2"), tx)
            .await;

        // Different pair
        assert_eq!(hub.publish(&message_event("u3", "u2")).await, 0);
        // Different table entirely
        let like = ChangeEvent {
            table: Table::Likes,
            op: ChangeOp::Insert,
            row: row([("post_id", "p1".into()), ("user_id", "u1".into())]),
        };
        assert_eq!(hub.publish(&like).await, 0);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let hub = ChangeHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub_id = hub
            .subscribe(Table::Posts, Filter::All, tx)
            .await;
        hub.unsubscribe(sub_id).await;

        let event = ChangeEvent {
            table: Table::Posts,
            op: ChangeOp::Insert,
            row: row([("id", "p1".into())]),
        };
        assert_eq!(hub.publish(&event).await, 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn leaked_subscription_double_delivers() {
        let hub = ChangeHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        // A consumer that remounts without tearing down its old subscription
        // ends up with two live subscriptions and duplicate refresh signals.
        hub.subscribe(Table::Comments, Filter::eq("post_id", "p1"), tx.clone())
            .await;
        hub.subscribe(Table::Comments, Filter::eq("post_id", "p1"), tx)
            .await;

        let event = ChangeEvent {
            table: Table::Comments,
            op: ChangeOp::Insert,
            row: row([("post_id", "p1".into())]),
        };
        assert_eq!(hub.publish(&event).await, 2);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn update_and_delete_ops_also_signal() {
        let hub = ChangeHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        hub.subscribe(Table::Messages, Filter::eq("receiver_id", "u2"), tx)
            .await;

        for op in [ChangeOp::Update, ChangeOp::Delete] {
            let event = ChangeEvent {
                table: Table::Messages,
                op,
                row: row([("receiver_id", "u2".into())]),
            };
            assert_eq!(hub.publish(&event).await, 1);
            assert_eq!(rx.try_recv().unwrap().op, op);
        }
    }
}
