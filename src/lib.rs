//! Sensor analytics backend for the smart farming dashboard.
//!
//! The [`analytics`] engine is synchronous and I/O free. The remaining modules
//! are its collaborators: [`upstream`] fetches readings and thresholds,
//! [`poller`] drives the engine on a timer, [`store`] persists alerts,
//! [`dashboard`] keeps presentation state and [`routes`] serves it over HTTP.

pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod poller;
pub mod routes;
pub mod schema;
pub mod store;
pub mod upstream;

pub use config::Config;
pub use models::{AlertEvent, AlertType, SensorReading, Threshold};
