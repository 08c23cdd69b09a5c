pub mod client;
pub mod error;
pub mod poller;
pub mod schedule;

pub use client::FppClient;
pub use error::FppError;
pub use poller::StatusPoller;
pub use schedule::SchedulePoller;
