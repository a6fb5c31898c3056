use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Domain events emitted by the planning and execution services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderIngested {
        order_id: i32,
        target_purchase_date: Option<NaiveDate>,
    },
    DayPlanned {
        date: NaiveDate,
        assigned_count: u64,
        route_count: u64,
    },
    RouteGenerated {
        route_id: i32,
    },
    StopStatusChanged {
        route_id: i32,
        stop_id: i32,
        new_status: String,
    },
    PurchaseFailureRecorded {
        failure_id: i32,
        item_id: i32,
        store_id: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event; event delivery is best-effort and never fails the
    /// originating operation.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!(error = %e, "event channel closed, dropping event");
        }
    }
}

/// Background consumer. Today this only logs; notification fan-out hangs off
/// this loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "domain event");
    }
}
