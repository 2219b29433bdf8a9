//! Property-based tests for configuration module
//!
//! Generated configurations must validate exactly when their values are in
//! range, and survive a trip through TOML text.

use super::*;
use proptest::prelude::*;

prop_compose! {
    fn valid_window_config()(
        fullscreen in any::<bool>(),
        maximized in any::<bool>(),
        opaque in any::<bool>(),
        frame_sync in any::<bool>(),
    ) -> WindowConfig {
        WindowConfig { fullscreen, maximized, opaque, frame_sync }
    }
}

prop_compose! {
    fn valid_egl_config()(
        context_client_version in prop_oneof![Just(2), Just(3)],
        swap_interval_when_unsynced in 0i32..4,
    ) -> EglConfig {
        EglConfig { context_client_version, swap_interval_when_unsynced }
    }
}

prop_compose! {
    fn valid_cursor_config()(
        theme in proptest::option::of("[A-Za-z][A-Za-z0-9_-]{0,15}"),
        size in 1u32..=256,
        name in prop_oneof![Just("left_ptr".to_string()), Just("default".to_string())],
    ) -> CursorConfig {
        CursorConfig { theme, size, name }
    }
}

prop_compose! {
    fn valid_config()(
        window in valid_window_config(),
        egl in valid_egl_config(),
        cursor in valid_cursor_config(),
        level in proptest::sample::select(LOG_LEVELS.to_vec()),
    ) -> HarnessConfig {
        HarnessConfig {
            window,
            egl,
            cursor,
            logging: LoggingConfig { level: level.to_string() },
        }
    }
}

proptest! {
    #[test]
    fn test_valid_configs_validate(config in valid_config()) {
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn test_valid_configs_survive_toml(config in valid_config()) {
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: HarnessConfig = toml::from_str(&text).unwrap();
        prop_assert_eq!(parsed, config);
    }

    #[test]
    fn test_context_version_outside_range_fails(version in any::<i32>()) {
        prop_assume!(version != 2 && version != 3);
        let mut config = HarnessConfig::default();
        config.egl.context_client_version = version;
        prop_assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_cursor_fails(size in 257u32..100_000) {
        let mut config = HarnessConfig::default();
        config.cursor.size = size;
        prop_assert!(config.validate().is_err());
    }
}
