//! Structured, leveled logging init (C13, §4.13), gated by `log_level`.

pub fn init(log_level: &str) {
    let env = env_logger::Env::default().default_filter_or(log_level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init();
}
