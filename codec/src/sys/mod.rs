//! Platform-specific codec services.

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        /// Android platform implementation.
        pub mod android;

        pub use android::JniCodecService;
    }
}
