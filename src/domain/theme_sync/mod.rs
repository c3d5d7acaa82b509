pub mod change_event;
pub mod custom_errors;
pub mod scheduled_job;
pub mod sync_job;
pub mod value_objects;
