pub mod event_log;
pub mod monitor_session;
pub mod session_config;
pub mod session_state;
pub mod session_stats;
pub mod status_readout;
