use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging once for the integration suite, warnings and up
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Warn)
            .try_init();
    });
}
