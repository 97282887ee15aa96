//! Native sensor platform seam.
//!
//! The platform owns the OS-level watches (geolocation watch, device
//! orientation listener). The core only asks for permission and opens or
//! cancels subscriptions; events flow back through an unbounded channel.
//!
//! Every open watch is represented by a [`Subscription`] handle. Cancelling
//! is idempotent and dropping the handle cancels it, so a watch can never
//! outlive its owner.

use std::collections::HashMap;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::{SensorEvent, SensorKind};

/// Handle to one open sensor watch.
#[derive(Debug)]
pub struct Subscription {
    kind: SensorKind,
    token: CancellationToken,
}

impl Subscription {
    pub fn new(kind: SensorKind) -> Self {
        Self {
            kind,
            token: CancellationToken::new(),
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Token the platform watches to stop delivering events.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the watch. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(sensor = %self.kind, "Sensor subscription cancelled");
            self.token.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// OS sensor APIs as seen by the core.
///
/// Uses `BoxFuture` so the trait stays dyn-compatible.
pub trait SensorPlatform: Send + Sync {
    /// Prompt for access. Resolves `true` when granted.
    fn request_permission(&self, kind: SensorKind) -> BoxFuture<'static, bool>;

    /// Open a watch delivering events to `events` until the returned
    /// subscription is cancelled.
    fn subscribe(
        &self,
        kind: SensorKind,
        events: mpsc::UnboundedSender<SensorEvent>,
    ) -> Subscription;
}

/// How [`ManualSensorPlatform`] answers permission prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAnswer {
    Grant,
    Deny,
    /// Never resolve, as a prompt the user ignores.
    Ignore,
}

#[derive(Debug)]
struct OpenWatch {
    kind: SensorKind,
    token: CancellationToken,
    events: mpsc::UnboundedSender<SensorEvent>,
}

#[derive(Debug, Default)]
struct ManualInner {
    answers: HashMap<SensorKind, PermissionAnswer>,
    watches: Vec<OpenWatch>,
    opened: HashMap<SensorKind, usize>,
    prompts: HashMap<SensorKind, usize>,
}

/// Platform whose events are pushed in by the host.
///
/// Used when the host receives sensor callbacks itself (or replays a recorded
/// track) and forwards them. Events are only delivered while a matching
/// subscription is open.
#[derive(Debug, Default)]
pub struct ManualSensorPlatform {
    inner: Mutex<ManualInner>,
}

impl ManualSensorPlatform {
    /// Platform that grants both sensors.
    pub fn granting() -> Self {
        let platform = Self::default();
        platform.set_answer(SensorKind::Location, PermissionAnswer::Grant);
        platform.set_answer(SensorKind::Compass, PermissionAnswer::Grant);
        platform
    }

    pub fn set_answer(&self, kind: SensorKind, answer: PermissionAnswer) {
        self.inner.lock().answers.insert(kind, answer);
    }

    /// Deliver an event to the open watch of its kind.
    ///
    /// Returns `false` when no watch is open for it.
    pub fn push(&self, event: SensorEvent) -> bool {
        let kind = match event {
            SensorEvent::Location(_) => SensorKind::Location,
            SensorEvent::Orientation(_) => SensorKind::Compass,
        };

        let mut inner = self.inner.lock();
        inner.watches.retain(|w| !w.token.is_cancelled());
        inner
            .watches
            .iter()
            .filter(|w| w.kind == kind)
            .fold(false, |delivered, w| w.events.send(event).is_ok() || delivered)
    }

    /// Number of watches of `kind` that are still open.
    pub fn active_subscriptions(&self, kind: SensorKind) -> usize {
        self.inner
            .lock()
            .watches
            .iter()
            .filter(|w| w.kind == kind && !w.token.is_cancelled())
            .count()
    }

    /// Number of watches of `kind` ever opened.
    pub fn opened_subscriptions(&self, kind: SensorKind) -> usize {
        self.inner.lock().opened.get(&kind).copied().unwrap_or(0)
    }

    /// Number of permission prompts shown for `kind`.
    pub fn permission_prompts(&self, kind: SensorKind) -> usize {
        self.inner.lock().prompts.get(&kind).copied().unwrap_or(0)
    }
}

impl SensorPlatform for ManualSensorPlatform {
    fn request_permission(&self, kind: SensorKind) -> BoxFuture<'static, bool> {
        let answer = {
            let mut inner = self.inner.lock();
            *inner.prompts.entry(kind).or_default() += 1;
            inner.answers.get(&kind).copied().unwrap_or(PermissionAnswer::Deny)
        };

        match answer {
            PermissionAnswer::Grant => Box::pin(async { true }),
            PermissionAnswer::Deny => Box::pin(async { false }),
            PermissionAnswer::Ignore => Box::pin(futures::future::pending()),
        }
    }

    fn subscribe(
        &self,
        kind: SensorKind,
        events: mpsc::UnboundedSender<SensorEvent>,
    ) -> Subscription {
        let subscription = Subscription::new(kind);
        let mut inner = self.inner.lock();
        *inner.opened.entry(kind).or_default() += 1;
        inner.watches.push(OpenWatch {
            kind,
            token: subscription.token(),
            events,
        });
        tracing::debug!(sensor = %kind, "Sensor subscription opened");
        subscription
    }
}
