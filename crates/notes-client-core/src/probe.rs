//! AI backend availability probe.
//!
//! At most one probe is in flight: concurrent callers share the same future
//! and receive its single result. The result is cached until
//! [`AvailabilityProbe::invalidate`] is called; a probe started before an
//! invalidation never writes its (stale) result into the cache.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, warn};

use crate::backend::AiBackend;

pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
}

impl Availability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityState {
    Unknown,
    Probing,
    Available,
    Unavailable,
}

impl AvailabilityState {
    #[must_use]
    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

impl From<Availability> for AvailabilityState {
    fn from(availability: Availability) -> Self {
        match availability {
            Availability::Available => Self::Available,
            Availability::Unavailable => Self::Unavailable,
        }
    }
}

type ProbeFuture = Shared<BoxFuture<'static, Availability>>;

enum ProbeSlot {
    Idle(Option<Availability>),
    InFlight(ProbeFuture),
}

struct ProbeInner {
    generation: u64,
    slot: ProbeSlot,
}

pub struct AvailabilityProbe {
    backend: Arc<dyn AiBackend>,
    timeout: Duration,
    inner: Mutex<ProbeInner>,
}

impl std::fmt::Debug for AvailabilityProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityProbe")
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl AvailabilityProbe {
    #[must_use]
    pub fn new(backend: Arc<dyn AiBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            inner: Mutex::new(ProbeInner {
                generation: 0,
                slot: ProbeSlot::Idle(None),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> AvailabilityState {
        let inner = self.lock();
        match &inner.slot {
            ProbeSlot::Idle(None) => AvailabilityState::Unknown,
            ProbeSlot::Idle(Some(availability)) => (*availability).into(),
            ProbeSlot::InFlight(_) => AvailabilityState::Probing,
        }
    }

    /// Returns the cached result, joins an in-flight probe, or starts one.
    /// Never fails: errors and timeouts map to `Unavailable`.
    pub async fn probe(&self) -> Availability {
        let (generation, probe) = {
            let mut inner = self.lock();
            let probe = match &inner.slot {
                ProbeSlot::Idle(Some(availability)) => return *availability,
                ProbeSlot::InFlight(probe) => probe.clone(),
                ProbeSlot::Idle(None) => self.start_probe(),
            };
            if matches!(inner.slot, ProbeSlot::Idle(None)) {
                inner.slot = ProbeSlot::InFlight(probe.clone());
            }
            (inner.generation, probe)
        };

        let availability = probe.await;

        let mut inner = self.lock();
        if inner.generation == generation && matches!(inner.slot, ProbeSlot::InFlight(_)) {
            inner.slot = ProbeSlot::Idle(Some(availability));
        }
        availability
    }

    /// Drops the cached result and detaches any in-flight probe.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.slot = ProbeSlot::Idle(None);
        debug!(generation = inner.generation, "Availability cache invalidated");
    }

    fn start_probe(&self) -> ProbeFuture {
        let backend = Arc::clone(&self.backend);
        let timeout = self.timeout;
        async move {
            match tokio::time::timeout(timeout, backend.health()).await {
                Ok(Ok(())) => {
                    debug!("AI backend reachable");
                    Availability::Available
                }
                Ok(Err(error)) => {
                    warn!(error = %error, "AI backend unavailable; using placeholder results");
                    Availability::Unavailable
                }
                Err(_) => {
                    warn!(
                        timeout_ms = timeout.as_millis(),
                        "AI backend probe timed out; using placeholder results"
                    );
                    Availability::Unavailable
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProbeInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
