use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    ActiveRideChangedEvent,
    EventHandler,
    EventProducer,
    Handler,
    PendingRideChangedEvent,
    RequestExpiredEvent,
    RequestMatchedEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The producer ends of every registered hook. Events with no registered hook go nowhere.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub request_matched_producer: Vec<EventProducer<RequestMatchedEvent>>,
    pub request_expired_producer: Vec<EventProducer<RequestExpiredEvent>>,
    pub pending_ride_changed_producer: Vec<EventProducer<PendingRideChangedEvent>>,
    pub active_ride_changed_producer: Vec<EventProducer<ActiveRideChangedEvent>>,
}

impl EventProducers {
    pub async fn publish_request_matched(&self, event: RequestMatchedEvent) {
        for producer in &self.request_matched_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_request_expired(&self, event: RequestExpiredEvent) {
        for producer in &self.request_expired_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_pending_ride_changed(&self, event: PendingRideChangedEvent) {
        for producer in &self.pending_ride_changed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_active_ride_changed(&self, event: ActiveRideChangedEvent) {
        for producer in &self.active_ride_changed_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_request_matched: Option<EventHandler<RequestMatchedEvent>>,
    pub on_request_expired: Option<EventHandler<RequestExpiredEvent>>,
    pub on_pending_ride_changed: Option<EventHandler<PendingRideChangedEvent>>,
    pub on_active_ride_changed: Option<EventHandler<ActiveRideChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_request_matched: hooks.on_request_matched.map(|f| EventHandler::new(buffer_size, f)),
            on_request_expired: hooks.on_request_expired.map(|f| EventHandler::new(buffer_size, f)),
            on_pending_ride_changed: hooks.on_pending_ride_changed.map(|f| EventHandler::new(buffer_size, f)),
            on_active_ride_changed: hooks.on_active_ride_changed.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_request_matched {
            result.request_matched_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_request_expired {
            result.request_expired_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_pending_ride_changed {
            result.pending_ride_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_active_ride_changed {
            result.active_ride_changed_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for every registered handler. Each one stops when its last producer is dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_request_matched {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_request_expired {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_pending_ride_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_active_ride_changed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_request_matched: Option<Handler<RequestMatchedEvent>>,
    pub on_request_expired: Option<Handler<RequestExpiredEvent>>,
    pub on_pending_ride_changed: Option<Handler<PendingRideChangedEvent>>,
    pub on_active_ride_changed: Option<Handler<ActiveRideChangedEvent>>,
}

impl EventHooks {
    pub fn on_request_matched<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestMatchedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_request_matched = Some(Arc::new(f));
        self
    }

    pub fn on_request_expired<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestExpiredEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_request_expired = Some(Arc::new(f));
        self
    }

    pub fn on_pending_ride_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PendingRideChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_pending_ride_changed = Some(Arc::new(f));
        self
    }

    pub fn on_active_ride_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ActiveRideChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_active_ride_changed = Some(Arc::new(f));
        self
    }
}
