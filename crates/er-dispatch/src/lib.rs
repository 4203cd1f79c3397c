//! `er-dispatch` — per-call orchestration for the emergency routing workspace.
//!
//! # Crate layout
//!
//! | Module             | Contents                                                      |
//! |--------------------|---------------------------------------------------------------|
//! | [`request`]        | `EmergencyRequest`, boundary validation                       |
//! | [`context`]        | `ContextSource` trait, `ContextGatherer` (bounded latency)    |
//! | [`route`]          | `RouteOptimizer`: traffic-aware candidates and route stats    |
//! | [`recommendation`] | Response types, `RequestState`, `Degradation`                 |
//! | [`orchestrator`]   | `DispatchOrchestrator`, `OrchestratorBuilder`                 |
//! | [`simulation`]     | Generated-call batch runs                                     |
//! | [`analytics`]      | `DispatchSink`, in-memory and CSV dispatch logs, reports      |
//! | [`config`]         | `DispatchConfig` (JSON)                                       |
//! | [`error`]          | `DispatchError`, `DispatchResult<T>`                          |
//!
//! # Quick start
//!
//! ```rust,ignore
//! let orchestrator = DispatchOrchestrator::builder(network, engine)
//!     .hospitals(hospitals)
//!     .build()?;
//! let response = orchestrator.handle_emergency(&request)?;
//! ```

pub mod analytics;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod recommendation;
pub mod request;
pub mod route;
pub mod simulation;


pub use analytics::{CsvDispatchLog, DispatchLog, DispatchLogEntry, DispatchSink, PerformanceReport};
pub use config::DispatchConfig;
pub use context::{ContextGatherer, ContextSource, StaticContextSource};
pub use error::{DispatchError, DispatchResult};
pub use orchestrator::{DispatchOrchestrator, OrchestratorBuilder, SystemStatus, TrafficOutlook};
pub use recommendation::{
    AlternativeOption, ConditionsSummary, Degradation, DispatchRecommendation, DispatchResponse,
    DispatchStatus, FallbackRecommendation, HospitalSummary, PerformanceMetrics, RequestState,
    RouteSummary,
};
pub use request::{EmergencyRequest, PatientInfo, ValidatedRequest};
pub use route::{RouteOptimizer, RouteStats};
pub use simulation::{SimulatedCall, SimulationSummary, generate_requests};
