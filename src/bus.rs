// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Observation Bus - in-process fan-out of captured requests
//!
//! Every subscriber owns an unbounded FIFO queue; publishing pushes a clone
//! of the event into each of them, so subscribers never lose or reorder
//! events and never block the publisher. A tester draining a subscription
//! sees requests in the order they were published.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

use crate::errors::AuthzResult;
use crate::session::{AuthSession, Session};
use crate::tester::AuthzTester;
use crate::types::{RequestData, ResourceLocator};

/// One captured request as produced by the capture pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedRequest {
    pub username: String,
    pub role: String,
    pub request: RequestData,
    #[serde(default)]
    pub resource_locators: Vec<ResourceLocator>,
    /// Credentials captured with the request
    #[serde(default)]
    pub session: Option<AuthSession>,
}

impl ObservedRequest {
    pub fn new(username: &str, role: &str, request: RequestData) -> Self {
        Self {
            username: username.to_string(),
            role: role.to_string(),
            request,
            resource_locators: Vec::new(),
            session: None,
        }
    }

    pub fn with_locator(mut self, locator: ResourceLocator) -> Self {
        self.resource_locators.push(locator);
        self
    }

    pub fn with_session(mut self, session: AuthSession) -> Self {
        self.session = Some(session);
        self
    }
}

#[derive(Debug, Default)]
pub struct ObservationBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ObservedRequest>>>,
}

impl ObservationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().push(sender);
        Subscription { receiver }
    }

    /// Deliver `event` to every live subscriber, returning how many got it.
    /// Dropped subscriptions are pruned.
    pub fn publish(&self, event: ObservedRequest) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
        debug!(
            "[Bus] {} {} by {}:{} -> {} subscriber(s)",
            event.request.method,
            event.request.url,
            event.username,
            event.role,
            subscribers.len()
        );
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// Receiving end of one subscriber's queue
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<ObservedRequest>,
}

impl Subscription {
    /// Next event, or `None` once the bus is gone and the queue is drained
    pub async fn next(&mut self) -> Option<ObservedRequest> {
        self.receiver.recv().await
    }
}

/// Feed every event of `subscription` into `tester`, in arrival order.
///
/// Returns the number of events ingested once the bus is dropped, or the
/// first hard failure, after which the tester must not be used further.
pub async fn run_tester(
    tester: &mut AuthzTester,
    subscription: &mut Subscription,
) -> AuthzResult<usize> {
    drain(tester, subscription, None).await
}

/// Like [`run_tester`], but stops dequeuing as soon as `stop` turns `true`.
///
/// The flag is checked between events; an ingest already in progress runs
/// to completion and queued events are left unread.
pub async fn run_tester_until(
    tester: &mut AuthzTester,
    subscription: &mut Subscription,
    stop: watch::Receiver<bool>,
) -> AuthzResult<usize> {
    drain(tester, subscription, Some(stop)).await
}

async fn drain(
    tester: &mut AuthzTester,
    subscription: &mut Subscription,
    mut stop: Option<watch::Receiver<bool>>,
) -> AuthzResult<usize> {
    let mut ingested = 0;

    loop {
        if stop.as_ref().is_some_and(|rx| *rx.borrow()) {
            debug!("[Bus] Stop requested after {} event(s)", ingested);
            break;
        }

        // Err(sender_alive) means the stop flag changed or its sender is gone
        let next = match stop.as_mut() {
            Some(rx) => tokio::select! {
                biased;
                changed = rx.changed() => Err(changed.is_ok()),
                event = subscription.next() => Ok(event),
            },
            None => Ok(subscription.next().await),
        };

        let event = match next {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("[Bus] Subscription closed after {} event(s)", ingested);
                break;
            }
            Err(true) => continue,
            Err(false) => {
                stop = None;
                continue;
            }
        };

        let session = event
            .session
            .map(|session| Box::new(session) as Box<dyn Session>);

        if let Err(e) = tester
            .ingest(
                &event.username,
                &event.role,
                event.request,
                event.resource_locators,
                session,
            )
            .await
        {
            error!("[Bus] Tester halted after {} event(s): {}", ingested, e);
            return Err(e);
        }
        ingested += 1;
    }

    Ok(ingested)
}
