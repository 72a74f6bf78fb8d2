pub mod availability;
pub mod contract;
pub mod job;
pub mod reschedule;
pub mod session;
pub mod user;
pub mod weekday;
