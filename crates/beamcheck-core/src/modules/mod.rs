pub mod beam_time;
pub mod crosscheck;
pub mod decay;
pub mod plan_report;
pub mod source_tracking;
pub mod verify;
