//! Interface to the platform decoder service.
//!
//! Every operation the binding needs from `MediaCodec` and its companion
//! classes is a method here. Implementations translate pending platform
//! exceptions into [`PlatformError`] at the call site, so callers only ever
//! see tagged results.

use std::ptr::NonNull;
use std::time::Duration;

/// `MediaCodec.BUFFER_FLAG_CODEC_CONFIG`.
pub const BUFFER_FLAG_CODEC_CONFIG: i32 = 2;
/// `MediaCodec.INFO_TRY_AGAIN_LATER`.
pub const INFO_TRY_AGAIN_LATER: i32 = -1;
/// `MediaCodec.INFO_OUTPUT_FORMAT_CHANGED`.
pub const INFO_OUTPUT_FORMAT_CHANGED: i32 = -2;
/// `MediaCodec.INFO_OUTPUT_BUFFERS_CHANGED`.
pub const INFO_OUTPUT_BUFFERS_CHANGED: i32 = -3;

/// A platform call failed or raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("exception in {operation}: {detail}")]
pub struct PlatformError {
    /// Platform method that failed, e.g. `MediaCodec.start`.
    pub operation: &'static str,
    /// Whatever the platform told us.
    pub detail: String,
}

impl PlatformError {
    /// Create an error for `operation`.
    pub fn new(operation: &'static str, detail: impl Into<String>) -> Self {
        Self {
            operation,
            detail: detail.into(),
        }
    }
}

/// Result of a platform call.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// How a session reaches codec-owned buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferAccessMode {
    /// `getInputBuffers()`/`getOutputBuffers()` arrays fetched once and
    /// cached (API < 21).
    Arrays,
    /// `getInputBuffer(int)`/`getOutputBuffer(int)` per index (API >= 21).
    PerIndex,
}

/// Registered codec component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecInfo {
    /// Component name, e.g. `OMX.qcom.video.decoder.avc`.
    pub name: String,
    /// Whether the component encodes.
    pub is_encoder: bool,
    /// MIME types the component declares.
    pub supported_types: Vec<String>,
}

/// Outcome of `dequeueOutputBuffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DequeuedOutput {
    /// A data buffer at this index.
    Buffer(usize),
    /// The output format changed.
    FormatChanged,
    /// The output buffer set was replaced.
    BuffersChanged,
    /// Nothing within the timeout.
    TryAgainLater,
}

impl DequeuedOutput {
    /// Decode the status returned by `dequeueOutputBuffer`.
    ///
    /// Unknown negative codes are treated as try-again-later.
    #[must_use]
    pub fn from_status(status: i32) -> Self {
        match status {
            INFO_OUTPUT_FORMAT_CHANGED => Self::FormatChanged,
            INFO_OUTPUT_BUFFERS_CHANGED => Self::BuffersChanged,
            index => usize::try_from(index).map_or(Self::TryAgainLater, Self::Buffer),
        }
    }
}

/// Fields of a `MediaCodec.BufferInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferInfoFields {
    /// Start of the data in the buffer.
    pub offset: i32,
    /// Number of valid bytes.
    pub size: i32,
    /// Presentation timestamp in microseconds.
    pub presentation_time_us: i64,
}

/// Convert a timeout to the microsecond count `MediaCodec` expects.
#[must_use]
pub fn timeout_micros(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_micros()).unwrap_or(i64::MAX)
}

/// The platform decoder service.
///
/// Handles are opaque to the binding. A session never calls two methods
/// concurrently.
pub trait PlatformCodecService {
    /// Codec instance.
    type Codec;
    /// `MediaFormat` object.
    type Format;
    /// `MediaCodec.BufferInfo` record.
    type BufferInfo;
    /// Cached `ByteBuffer[]`.
    type BufferArray;
    /// Single `ByteBuffer`.
    type Buffer;
    /// Rendering surface.
    type Surface;

    /// Buffer access strategy the platform supports.
    fn buffer_access(&self) -> BufferAccessMode;

    /// Number of registered components.
    fn codec_count(&self) -> PlatformResult<usize>;
    /// Describe the component at `index`.
    fn codec_info_at(&self, index: usize) -> PlatformResult<CodecInfo>;
    /// Raw OMX profile values the component at `index` declares for `mime`.
    fn profile_levels(&self, index: usize, mime: &str) -> PlatformResult<Vec<i32>>;

    /// Instantiate the component called `name`.
    fn create_by_codec_name(&self, name: &str) -> PlatformResult<Self::Codec>;
    /// `MediaFormat.createVideoFormat`.
    fn create_video_format(&self, mime: &str, width: i32, height: i32)
    -> PlatformResult<Self::Format>;
    /// `MediaFormat.createAudioFormat`.
    fn create_audio_format(
        &self,
        mime: &str,
        sample_rate: i32,
        channel_count: i32,
    ) -> PlatformResult<Self::Format>;
    /// `MediaFormat.setInteger`.
    fn set_integer(&self, format: &Self::Format, key: &str, value: i32) -> PlatformResult<()>;
    /// `MediaFormat.getInteger`.
    fn get_integer(&self, format: &Self::Format, key: &str) -> PlatformResult<i32>;
    /// `MediaFormat.toString`.
    fn format_to_string(&self, format: &Self::Format) -> PlatformResult<String>;

    /// `MediaCodec.configure`, without crypto or flags.
    fn configure(
        &self,
        codec: &Self::Codec,
        format: &Self::Format,
        surface: Option<&Self::Surface>,
    ) -> PlatformResult<()>;
    /// `MediaCodec.start`.
    fn start(&self, codec: &Self::Codec) -> PlatformResult<()>;
    /// `MediaCodec.stop`.
    fn stop(&self, codec: &Self::Codec) -> PlatformResult<()>;
    /// `MediaCodec.flush`.
    fn flush(&self, codec: &Self::Codec) -> PlatformResult<()>;
    /// `MediaCodec.release`.
    fn release(&self, codec: &Self::Codec) -> PlatformResult<()>;
    /// `MediaCodec.getOutputFormat`.
    fn output_format(&self, codec: &Self::Codec) -> PlatformResult<Self::Format>;

    /// Allocate a `BufferInfo` record.
    fn new_buffer_info(&self) -> PlatformResult<Self::BufferInfo>;
    /// Read back a `BufferInfo` record.
    fn read_buffer_info(&self, info: &Self::BufferInfo) -> PlatformResult<BufferInfoFields>;

    /// `MediaCodec.getInputBuffers`.
    fn input_buffers(&self, codec: &Self::Codec) -> PlatformResult<Self::BufferArray>;
    /// `MediaCodec.getOutputBuffers`.
    fn output_buffers(&self, codec: &Self::Codec) -> PlatformResult<Self::BufferArray>;
    /// Element `index` of a cached buffer array.
    fn array_element(&self, array: &Self::BufferArray, index: usize)
    -> PlatformResult<Self::Buffer>;
    /// `MediaCodec.getInputBuffer`.
    fn input_buffer(&self, codec: &Self::Codec, index: usize) -> PlatformResult<Self::Buffer>;
    /// `MediaCodec.getOutputBuffer`.
    fn output_buffer(&self, codec: &Self::Codec, index: usize) -> PlatformResult<Self::Buffer>;

    /// Capacity of a direct buffer. Negative means the platform could not
    /// report one.
    fn buffer_capacity(&self, buffer: &Self::Buffer) -> PlatformResult<i64>;
    /// Copy `data` to the start of a direct buffer. `data` never exceeds the
    /// reported capacity.
    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]) -> PlatformResult<()>;
    /// Base address of a direct buffer.
    fn buffer_address(&self, buffer: &Self::Buffer) -> PlatformResult<NonNull<u8>>;

    /// `MediaCodec.dequeueInputBuffer`. `None` when no slot freed up.
    fn dequeue_input_buffer(
        &self,
        codec: &Self::Codec,
        timeout: Duration,
    ) -> PlatformResult<Option<usize>>;
    /// `MediaCodec.queueInputBuffer`.
    fn queue_input_buffer(
        &self,
        codec: &Self::Codec,
        index: usize,
        size: usize,
        presentation_time_us: i64,
        flags: i32,
    ) -> PlatformResult<()>;
    /// `MediaCodec.dequeueOutputBuffer`, filling `info` when a buffer is
    /// returned.
    fn dequeue_output_buffer(
        &self,
        codec: &Self::Codec,
        info: &Self::BufferInfo,
        timeout: Duration,
    ) -> PlatformResult<DequeuedOutput>;
    /// `MediaCodec.releaseOutputBuffer`.
    fn release_output_buffer(
        &self,
        codec: &Self::Codec,
        index: usize,
        render: bool,
    ) -> PlatformResult<()>;
}
