pub mod logging;
pub mod time;

pub use logging::{agent_log_path, log_run_event};
pub use time::now_secs;
