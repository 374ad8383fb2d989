use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    channel::{EventHandler, EventProducer, Handler},
    CreditRestoredEvent,
    OrderFlaggedEvent,
    OrderPaidEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_flagged_producer: Vec<EventProducer<OrderFlaggedEvent>>,
    pub credit_restored_producer: Vec<EventProducer<CreditRestoredEvent>>,
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_flagged: Option<EventHandler<OrderFlaggedEvent>>,
    pub on_credit_restored: Option<EventHandler<CreditRestoredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_order_flagged = hooks.on_order_flagged.map(|f| EventHandler::new(buffer_size, f));
        let on_credit_restored = hooks.on_credit_restored.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_order_flagged, on_credit_restored }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_flagged {
            result.order_flagged_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_credit_restored {
            result.credit_restored_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_flagged {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_credit_restored {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_flagged: Option<Handler<OrderFlaggedEvent>>,
    pub on_credit_restored: Option<Handler<CreditRestoredEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_flagged<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderFlaggedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_flagged = Some(Arc::new(f));
        self
    }

    pub fn on_credit_restored<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CreditRestoredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_credit_restored = Some(Arc::new(f));
        self
    }
}
