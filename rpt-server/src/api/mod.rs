//! HTTP API handlers for rpt-server

pub mod analytics;
pub mod daily_actuals;
pub mod health;
pub mod options;
pub mod params;
pub mod problem_tags;
pub mod reference;

pub use analytics::analytics_routes;
pub use daily_actuals::daily_actual_routes;
pub use health::health_routes;
pub use options::option_routes;
pub use problem_tags::problem_tag_routes;
pub use reference::reference_routes;
