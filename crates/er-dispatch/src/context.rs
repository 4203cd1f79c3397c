//! Context acquisition with bounded latency.
//!
//! [`ContextGatherer::gather`] runs the three upstream calls (weather,
//! traffic, incidents) on their own threads and waits on each result with a
//! deadline shared by all three.  A call that errors or misses the deadline
//! is replaced by its documented default and reported as a
//! [`Degradation::DataUnavailable`]; the gatherer never fails.  A late call
//! keeps running detached and its result is discarded.
//!
//! Calendar context is derived locally from the clock and cannot fail.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use log::warn;

use er_core::{CityBounds, ContextSnapshot, ContextualInfo, GeoPoint, Incident, TrafficLeg, WeatherSnapshot};

use crate::recommendation::Degradation;
use crate::{DispatchError, DispatchResult};

/// Upstream provider of live conditions.
pub trait ContextSource: Send + Sync + 'static {
    fn weather(&self, at: GeoPoint) -> DispatchResult<WeatherSnapshot>;

    fn traffic(&self, origin: GeoPoint, destination: GeoPoint) -> DispatchResult<Vec<TrafficLeg>>;

    fn incidents(&self, area: &CityBounds) -> DispatchResult<Vec<Incident>>;

    /// Calendar context for "now".
    fn contextual(&self) -> ContextualInfo;
}

// ── Static source ─────────────────────────────────────────────────────────────

/// Fixed conditions, optionally slow or failing per call.  Used by the demo
/// and by tests.
#[derive(Clone, Debug, Default)]
pub struct StaticContextSource {
    pub weather: Option<WeatherSnapshot>,
    pub traffic: Option<Vec<TrafficLeg>>,
    pub incidents: Option<Vec<Incident>>,
    pub contextual: ContextualInfo,
    /// Added to every upstream call.
    pub delay: Duration,
}

impl StaticContextSource {
    pub fn new(contextual: ContextualInfo) -> Self {
        Self {
            weather: Some(WeatherSnapshot::default()),
            traffic: Some(Vec::new()),
            incidents: Some(Vec::new()),
            contextual,
            delay: Duration::ZERO,
        }
    }

    pub fn at(at: NaiveDateTime) -> Self {
        Self::new(ContextualInfo::from_datetime(at, false))
    }

    pub fn with_weather(mut self, weather: WeatherSnapshot) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_traffic(mut self, legs: Vec<TrafficLeg>) -> Self {
        self.traffic = Some(legs);
        self
    }

    pub fn with_incidents(mut self, incidents: Vec<Incident>) -> Self {
        self.incidents = Some(incidents);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn respond<T: Clone>(&self, provider: &'static str, value: &Option<T>) -> DispatchResult<T> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        value.clone().ok_or(DispatchError::DataUnavailable {
            provider,
            reason: "no data configured".into(),
        })
    }
}

impl ContextSource for StaticContextSource {
    fn weather(&self, _at: GeoPoint) -> DispatchResult<WeatherSnapshot> {
        self.respond("weather", &self.weather)
    }

    fn traffic(&self, _origin: GeoPoint, _destination: GeoPoint) -> DispatchResult<Vec<TrafficLeg>> {
        self.respond("traffic", &self.traffic)
    }

    fn incidents(&self, _area: &CityBounds) -> DispatchResult<Vec<Incident>> {
        self.respond("incidents", &self.incidents)
    }

    fn contextual(&self) -> ContextualInfo {
        self.contextual.clone()
    }
}

// ── Gatherer ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ContextGatherer {
    source: Arc<dyn ContextSource>,
    timeout: Duration,
}

impl ContextGatherer {
    pub fn new(source: Arc<dyn ContextSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Best-effort snapshot for a trip from `origin` to `destination`.
    /// Incidents are searched in a box around both points.
    pub fn gather(&self, origin: GeoPoint, destination: GeoPoint) -> (ContextSnapshot, Vec<Degradation>) {
        let deadline = Instant::now() + self.timeout;
        let area = CityBounds::around(origin, destination, 0.05);

        let weather = spawn_call(&self.source, move |s| s.weather(origin));
        let traffic = spawn_call(&self.source, move |s| s.traffic(origin, destination));
        let incidents = spawn_call(&self.source, move |s| s.incidents(&area));

        let mut degradations = Vec::new();
        let snapshot = ContextSnapshot {
            weather: settle("weather", weather, deadline, self.timeout, &mut degradations),
            traffic_legs: settle("traffic", traffic, deadline, self.timeout, &mut degradations),
            incidents: settle("incidents", incidents, deadline, self.timeout, &mut degradations),
            contextual: self.source.contextual(),
        };
        (snapshot, degradations)
    }
}

fn spawn_call<T, F>(source: &Arc<dyn ContextSource>, call: F) -> mpsc::Receiver<DispatchResult<T>>
where
    T: Send + 'static,
    F: FnOnce(&dyn ContextSource) -> DispatchResult<T> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    let source = Arc::clone(source);
    thread::spawn(move || {
        // The receiver is gone if the caller already gave up.
        let _ = tx.send(call(source.as_ref()));
    });
    rx
}

fn settle<T: Default>(
    provider: &'static str,
    rx: mpsc::Receiver<DispatchResult<T>>,
    deadline: Instant,
    timeout: Duration,
    degradations: &mut Vec<Degradation>,
) -> T {
    let wait = deadline.saturating_duration_since(Instant::now());
    let err = match rx.recv_timeout(wait) {
        Ok(Ok(value)) => return value,
        Ok(Err(e)) => e,
        Err(mpsc::RecvTimeoutError::Timeout) => DispatchError::Timeout { what: provider, after: timeout },
        Err(mpsc::RecvTimeoutError::Disconnected) => DispatchError::DataUnavailable {
            provider,
            reason: "provider thread exited without a result".into(),
        },
    };
    warn!("{provider} unavailable, using defaults: {err}");
    degradations.push(Degradation::DataUnavailable { provider: provider.to_string(), reason: err.to_string() });
    T::default()
}
