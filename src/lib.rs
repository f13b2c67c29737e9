//! # Droidcodec
//!
//! Hardware decoding on Android through the platform `MediaCodec` API.
//!
//! The binding picks a hardware decoder component for a MIME type (and,
//! for H.264, a profile), configures it for video or audio, and exposes the
//! input/output buffer queues as a small synchronous API.
//!
//! ## Features
//!
//! - `codec`: the decoder binding, re-exported as [`codec`]. On by default.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! droidcodec = { version = "0.1", features = ["codec"] }
//! ```
//!
//! ```rust
//! use droidcodec::codec::{Blacklist, PlatformCodecService, decoder_name_for};
//!
//! fn hardware_avc<S: PlatformCodecService>(service: &S) -> Option<String> {
//!     decoder_name_for(service, "video/avc", None, &Blacklist::default())
//!         .ok()
//!         .flatten()
//! }
//! ```

#[cfg(feature = "codec")]
pub use droidcodec_codec as codec;
