pub mod factory;
pub mod notification;
pub mod payment;
pub mod repositories;
