pub mod checkpoint;
pub mod config;
pub mod image;
pub mod models;
pub mod predict;
pub mod report;
pub mod utils;

// 重新导出主要类型
pub use config::Config;
pub use predict::{ClassLabel, Detection, Prediction};
pub use utils::error::VisionError;

pub type Result<T> = std::result::Result<T, VisionError>;

/// 初始化日志，输出到 stderr，RUST_LOG 优先
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
