pub mod api;
pub mod core;
pub mod frame_extractor;

/// 初始化日志（可重复调用）
pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("vision_lib_rust"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // 已初始化时忽略错误
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
    }
}
