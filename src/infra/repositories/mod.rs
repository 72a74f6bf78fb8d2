pub mod sqlite_availability_repo;
pub mod sqlite_contract_repo;
pub mod sqlite_job_repo;
pub mod sqlite_reschedule_repo;
pub mod sqlite_session_repo;
pub mod sqlite_user_repo;

pub(crate) mod sqlite_tx;
