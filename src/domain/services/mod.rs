pub mod availability;
pub mod conflict;
pub mod distance;
pub mod matcher;
pub mod outbox;
pub mod reschedule;
pub mod schedule;
