use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Praxia";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/Praxia/ on all platforms (user-visible by design)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Praxia")
}

/// Path of the practice database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("praxia.db")
}

/// Listen address for the REST API. `PRAXIA_ADDR` overrides the default
/// loopback binding.
pub fn listen_addr() -> String {
    std::env::var("PRAXIA_ADDR").unwrap_or_else(|_| "127.0.0.1:8710".to_string())
}

/// Default tracing filter when RUST_LOG is not set
pub fn default_log_filter() -> &'static str {
    "info,praxia=debug"
}
