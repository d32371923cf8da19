use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{BrokerEvent, EventHandler, EventProducer, Handler};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub broker_producer: Vec<EventProducer<BrokerEvent>>,
}

pub struct EventHandlers {
    pub on_broker_event: Option<EventHandler<BrokerEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_broker_event = hooks.on_broker_event.map(|f| EventHandler::new(buffer_size, f));
        Self { on_broker_event }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_broker_event {
            result.broker_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_broker_event {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_broker_event: Option<Handler<BrokerEvent>>,
}

impl EventHooks {
    pub fn on_broker_event<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BrokerEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_broker_event = Some(Arc::new(f));
        self
    }
}
