use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{KitchenEvent, KitchenOrderSnapshot};

/// 厨房推送通道；只管发出，不等待确认
pub trait KitchenNotifier: Send + Sync {
    fn notify_new_order(&self, company_id: Uuid, order: KitchenOrderSnapshot);
    fn notify_order_update(&self, company_id: Uuid, order: KitchenOrderSnapshot);
    fn notify_order_cancelled(&self, company_id: Uuid, order_id: Uuid);
}

pub type SharedKitchenNotifier = Arc<dyn KitchenNotifier>;

/// 基于 tokio broadcast 的进程内实现，SSE 连接各自订阅
#[derive(Clone)]
pub struct BroadcastKitchenNotifier {
    sender: broadcast::Sender<KitchenEvent>,
}

impl BroadcastKitchenNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KitchenEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, event: KitchenEvent) {
        let name = event.event_name();
        match self.sender.send(event) {
            Ok(receivers) => log::debug!("Kitchen event {name} delivered to {receivers} screens"),
            // 没有在线的厨房屏幕
            Err(_) => log::debug!("Kitchen event {name} dropped: no subscribers"),
        }
    }
}

impl KitchenNotifier for BroadcastKitchenNotifier {
    fn notify_new_order(&self, company_id: Uuid, order: KitchenOrderSnapshot) {
        self.publish(KitchenEvent::NewOrder { company_id, order });
    }

    fn notify_order_update(&self, company_id: Uuid, order: KitchenOrderSnapshot) {
        self.publish(KitchenEvent::OrderUpdated { company_id, order });
    }

    fn notify_order_cancelled(&self, company_id: Uuid, order_id: Uuid) {
        self.publish(KitchenEvent::OrderCancelled {
            company_id,
            order_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_events() {
        let notifier = BroadcastKitchenNotifier::new(8);
        let mut rx = notifier.subscribe();
        let company_id = Uuid::new_v4();
        let order_id = Uuid::new_v4();

        notifier.notify_order_cancelled(company_id, order_id);

        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            KitchenEvent::OrderCancelled {
                company_id,
                order_id
            }
        );
    }

    #[test]
    fn test_publish_without_subscribers_does_not_fail() {
        let notifier = BroadcastKitchenNotifier::new(0);
        notifier.notify_order_cancelled(Uuid::new_v4(), Uuid::new_v4());
        let mut rx = notifier.subscribe();
        assert!(rx.try_recv().is_err());
    }
}
