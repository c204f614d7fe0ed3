//! Dashboard orchestration
//!
//! Ties the weather, market and feed crates to a scheduler, the persisted
//! to-do and subscription lists, and a render sink.

pub mod clock;
pub mod dashboard;
pub mod error;
pub mod scheduler;
pub mod sink;
pub mod subscriptions;
pub mod todo;

pub use clock::{Clock, ClockSnapshot, LocationTime};
pub use dashboard::Dashboard;
pub use error::{ListError, ListResult};
pub use scheduler::{Domain, Scheduler};
pub use sink::{LogSink, RenderSink};
pub use subscriptions::FeedSubscriptions;
pub use todo::{TodoList, TodoTask, VisibleTask};
