//! Hardware decoder binding for Android `MediaCodec`.
//!
//! This crate drives the platform decoder through its buffer-queue protocol:
//! pick a decoder component for a MIME type, open a session, feed encoded
//! input, drain decoded output and hand buffers back to the codec.
//!
//! The session logic is written against [`PlatformCodecService`], so the same
//! state machine runs on top of the JNI backend on Android
//! (`sys::android::JniCodecService`) or any other implementation of the
//! trait.
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use droidcodec_codec::{Blacklist, MediaCodecSession, StartArgs, VideoArgs, decoder_name_for};
//!
//! let service = Arc::new(droidcodec_codec::sys::android::JniCodecService::from_android_context()?);
//! let name = decoder_name_for(&*service, "video/avc", Some(100), &Blacklist::default())?
//!     .ok_or_else(|| droidcodec_codec::CodecError::Unsupported("video/avc".into()))?;
//!
//! let mut session = MediaCodecSession::new(service);
//! session.start(&name, "video/avc", StartArgs::Video(VideoArgs::new(1280, 720)))?;
//! session.put_input(&packet, pts, false, Duration::from_millis(10))?;
//! ```

#![warn(missing_docs)]

mod buffers;
pub mod handles;
pub mod platform;
pub mod profile;
mod select;
mod session;

/// Platform-specific implementations.
pub mod sys;

#[cfg(test)]
mod fake;

use std::fmt;
use std::ptr::NonNull;

pub use platform::{
    BufferAccessMode, BufferInfoFields, CodecInfo, DequeuedOutput, PlatformCodecService,
    PlatformError, PlatformResult,
};
pub use select::{Blacklist, decoder_name_for};
pub use session::MediaCodecSession;

/// Common error type for codec operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// The platform handle table could not be resolved. Cached for the
    /// lifetime of the process.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// No usable Java environment for the calling thread.
    #[error("java environment unavailable: {0}")]
    EnvironmentUnavailable(String),
    /// The session has no live codec.
    #[error("codec not started")]
    NotStarted,
    /// The session already owns a live codec.
    #[error("codec already started")]
    AlreadyStarted,
    /// The platform handed back a buffer that cannot be used.
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),
    /// The codec or format is not supported.
    #[error("unsupported codec or format: {0}")]
    Unsupported(String),
    /// A platform call raised.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Kind of elementary stream a session decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Video stream.
    Video,
    /// Audio stream.
    Audio,
}

/// Video parameters used to configure a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoArgs<Surface> {
    /// Coded width in pixels.
    pub width: i32,
    /// Coded height in pixels.
    pub height: i32,
    /// Display rotation in degrees.
    pub angle: i32,
    /// Rendering surface for direct rendering.
    pub surface: Option<Surface>,
}

impl<Surface> VideoArgs<Surface> {
    /// Video parameters without rotation or surface.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            angle: 0,
            surface: None,
        }
    }

    /// Set the display rotation.
    #[must_use]
    pub fn with_angle(mut self, angle: i32) -> Self {
        self.angle = angle;
        self
    }

    /// Render decoded pictures straight to `surface`.
    #[must_use]
    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = Some(surface);
        self
    }
}

/// Audio parameters used to configure a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioArgs {
    /// Sample rate in Hz.
    pub sample_rate: i32,
    /// Number of channels.
    pub channel_count: i32,
}

/// Format parameters passed to [`MediaCodecSession::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartArgs<Surface> {
    /// Open a video decoder.
    Video(VideoArgs<Surface>),
    /// Open an audio decoder.
    Audio(AudioArgs),
}

impl<Surface> StartArgs<Surface> {
    /// Stream kind these parameters describe.
    #[must_use]
    pub const fn kind(&self) -> MediaKind {
        match self {
            Self::Video(_) => MediaKind::Video,
            Self::Audio(_) => MediaKind::Audio,
        }
    }
}

/// Result of [`MediaCodecSession::put_input`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    /// The data was copied and queued.
    Queued,
    /// No input buffer became free within the timeout.
    NotReady,
}

/// Result of [`MediaCodecSession::get_output`].
#[derive(Debug)]
pub enum OutputEvent {
    /// A decoded buffer is ready.
    Buffer(OutputBuffer),
    /// The output format changed.
    FormatChanged(OutputFormat),
    /// The codec replaced its output buffer set.
    BuffersChanged,
    /// Nothing happened within the timeout.
    NotReady,
}

/// A decoded buffer owned by the codec until it is released.
#[derive(Debug)]
pub struct OutputBuffer {
    /// Index to pass to [`MediaCodecSession::release_output`].
    pub index: usize,
    /// Presentation timestamp in microseconds.
    pub timestamp_us: i64,
    /// Decoded bytes. `None` when the session renders directly to a surface.
    pub data: Option<RawBuffer>,
}

/// Pointer into codec-owned memory.
///
/// Valid until the buffer index it came from is released back to the codec.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl RawBuffer {
    pub(crate) const fn new(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Start of the decoded data.
    #[must_use]
    pub const fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Number of decoded bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no data.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the decoded bytes.
    ///
    /// # Safety
    ///
    /// The buffer index this came from must not have been released, and the
    /// session must not have been flushed or stopped since it was drained.
    #[must_use]
    pub const unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        // SAFETY: caller guarantees the codec still owns the memory for us.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Output format reported by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Video output layout.
    Video(VideoFormat),
    /// Audio output layout.
    Audio(AudioFormat),
}

/// Decoded picture layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoFormat {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Row stride in bytes.
    pub stride: i32,
    /// Rows per plane.
    pub slice_height: i32,
    /// OMX color format.
    pub pixel_format: i32,
    /// Left crop edge.
    pub crop_left: i32,
    /// Top crop edge.
    pub crop_top: i32,
    /// Right crop edge.
    pub crop_right: i32,
    /// Bottom crop edge.
    pub crop_bottom: i32,
}

/// Decoded audio layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioFormat {
    /// Number of channels.
    pub channel_count: i32,
    /// Android channel mask, `0` when the codec does not report one.
    pub channel_mask: i32,
    /// Sample rate in Hz.
    pub sample_rate: i32,
}
