//! Decoder session: start, feed, drain, release, flush and stop.

use crate::buffers::{BufferSet, report};
use crate::platform::{
    BUFFER_FLAG_CODEC_CONFIG, BufferAccessMode, BufferInfoFields, DequeuedOutput,
    PlatformCodecService,
};
use crate::{
    AudioFormat, CodecError, InputStatus, MediaKind, OutputBuffer, OutputEvent, OutputFormat,
    RawBuffer, StartArgs, VideoFormat,
};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::time::Duration;

/// Whether a session renders straight to its surface.
///
/// Rotation can only be applied by the platform through the per-index
/// accessors, so rotated video falls back to buffer output without them.
#[must_use]
pub const fn direct_rendering(has_surface: bool, angle: i32, access: BufferAccessMode) -> bool {
    has_surface && (angle == 0 || matches!(access, BufferAccessMode::PerIndex))
}

struct Live<S: PlatformCodecService> {
    kind: MediaKind,
    codec: S::Codec,
    buffer_info: S::BufferInfo,
    buffers: BufferSet<S>,
}

/// One decoder instance.
///
/// Driven from a single decode thread: every call takes `&mut self`.
/// Dropping the session stops and releases the codec.
pub struct MediaCodecSession<S: PlatformCodecService> {
    service: Arc<S>,
    live: Option<Live<S>>,
    direct_rendering: bool,
}

impl<S: PlatformCodecService> MediaCodecSession<S> {
    /// A session that has not been started.
    pub const fn new(service: Arc<S>) -> Self {
        Self {
            service,
            live: None,
            direct_rendering: false,
        }
    }

    /// Service this session talks to.
    pub const fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Whether a codec is open and started.
    pub const fn is_started(&self) -> bool {
        self.live.is_some()
    }

    /// Stream kind of the open codec.
    pub fn kind(&self) -> Option<MediaKind> {
        self.live.as_ref().map(|live| live.kind)
    }

    /// Whether decoded pictures go straight to the surface.
    pub const fn direct_rendering(&self) -> bool {
        self.direct_rendering
    }

    /// Buffer access strategy of the open codec.
    pub fn buffer_access(&self) -> Option<BufferAccessMode> {
        self.live.as_ref().map(|live| live.buffers.mode())
    }

    /// Whether interlaced pictures can be handed out. Requires the per-index
    /// accessors.
    pub fn supports_interlaced(&self) -> bool {
        self.service.buffer_access() == BufferAccessMode::PerIndex
    }

    /// Open, configure and start the component `name`.
    ///
    /// On failure everything opened so far is torn down again.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::AlreadyStarted` if a codec is open, or the
    /// platform error of the first step that failed.
    pub fn start(
        &mut self,
        name: &str,
        mime: &str,
        args: StartArgs<S::Surface>,
    ) -> Result<(), CodecError> {
        if self.live.is_some() {
            return Err(CodecError::AlreadyStarted);
        }
        self.direct_rendering = false;

        let service = Arc::clone(&self.service);
        let kind = args.kind();
        let codec = service.create_by_codec_name(name).map_err(|e| {
            log::warn!("{e}");
            CodecError::Platform(e)
        })?;

        let mut started = false;
        match bring_up(&*service, &codec, mime, args, &mut started) {
            Ok((buffer_info, buffers, direct)) => {
                self.live = Some(Live {
                    kind,
                    codec,
                    buffer_info,
                    buffers,
                });
                self.direct_rendering = direct;
                log::debug!("MediaCodec {name} opened");
                Ok(())
            }
            Err(e) => {
                close_codec(&*service, &codec, started);
                Err(e)
            }
        }
    }

    /// Stop and release the codec. Does nothing if none is open.
    ///
    /// # Errors
    ///
    /// Never fails: platform faults during teardown are logged.
    pub fn stop(&mut self) -> Result<(), CodecError> {
        self.direct_rendering = false;
        if let Some(live) = self.live.take() {
            close_codec(&*self.service, &live.codec, true);
            log::debug!("MediaCodec closed");
        }
        Ok(())
    }

    /// Discard every queued and dequeued buffer. Indices handed out before
    /// the flush are invalid afterwards.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::NotStarted` without a codec, or the platform
    /// error.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        let live = self.live.as_ref().ok_or(CodecError::NotStarted)?;
        self.service.flush(&live.codec).map_err(|e| {
            log::warn!("{e}");
            CodecError::Platform(e)
        })
    }

    /// Copy `data` into the next free input buffer and queue it.
    ///
    /// Data beyond the buffer capacity is dropped.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidBuffer` if the platform reports a
    /// negative capacity, or the platform error.
    pub fn put_input(
        &mut self,
        data: &[u8],
        timestamp_us: i64,
        is_config: bool,
        timeout: Duration,
    ) -> Result<InputStatus, CodecError> {
        let live = self.live.as_ref().ok_or(CodecError::NotStarted)?;
        let service = &*self.service;

        let Some(index) = service
            .dequeue_input_buffer(&live.codec, timeout)
            .map_err(report)?
        else {
            return Ok(InputStatus::NotReady);
        };

        let buffer = live.buffers.source().input_buffer(service, &live.codec, index)?;
        let raw_capacity = service.buffer_capacity(&buffer).map_err(report)?;
        let Ok(capacity) = usize::try_from(raw_capacity) else {
            log::error!("Java buffer has invalid size {raw_capacity}");
            return Err(CodecError::InvalidBuffer(format!(
                "input buffer capacity {raw_capacity}"
            )));
        };

        let len = data.len().min(capacity);
        service.write_buffer(&buffer, &data[..len]).map_err(report)?;

        let flags = if is_config { BUFFER_FLAG_CODEC_CONFIG } else { 0 };
        service
            .queue_input_buffer(&live.codec, index, len, timestamp_us, flags)
            .map_err(report)?;
        Ok(InputStatus::Queued)
    }

    /// Wait for the next output event.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::NotStarted` without a codec, or the platform
    /// error.
    pub fn get_output(&mut self, timeout: Duration) -> Result<OutputEvent, CodecError> {
        let service = &*self.service;
        let live = self.live.as_mut().ok_or(CodecError::NotStarted)?;

        match service
            .dequeue_output_buffer(&live.codec, &live.buffer_info, timeout)
            .map_err(report)?
        {
            DequeuedOutput::Buffer(index) => {
                let info = service.read_buffer_info(&live.buffer_info).map_err(report)?;
                let data = if self.direct_rendering {
                    None
                } else {
                    Some(output_data(service, live, index, info)?)
                };
                Ok(OutputEvent::Buffer(OutputBuffer {
                    index,
                    timestamp_us: info.presentation_time_us,
                    data,
                }))
            }
            DequeuedOutput::FormatChanged => {
                let format = service.output_format(&live.codec).map_err(report)?;
                match service.format_to_string(&format) {
                    Ok(description) => log::debug!("output format changed: {description}"),
                    Err(e) => log::debug!("output format changed ({e})"),
                }
                Ok(OutputEvent::FormatChanged(read_format(
                    service, &format, live.kind,
                )))
            }
            DequeuedOutput::BuffersChanged => {
                log::debug!("output buffers changed");
                live.buffers
                    .source_mut()
                    .refresh_output(service, &live.codec)?;
                Ok(OutputEvent::BuffersChanged)
            }
            DequeuedOutput::TryAgainLater => Ok(OutputEvent::NotReady),
        }
    }

    /// Hand a drained buffer back to the codec, rendering it to the surface
    /// if `render` is set.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::NotStarted` without a codec, or the platform
    /// error.
    pub fn release_output(&mut self, index: usize, render: bool) -> Result<(), CodecError> {
        let live = self.live.as_ref().ok_or(CodecError::NotStarted)?;
        self.service
            .release_output_buffer(&live.codec, index, render)
            .map_err(report)
    }
}

impl<S: PlatformCodecService> Drop for MediaCodecSession<S> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl<S: PlatformCodecService> fmt::Debug for MediaCodecSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaCodecSession")
            .field("kind", &self.kind())
            .field("direct_rendering", &self.direct_rendering)
            .field("buffer_access", &self.buffer_access())
            .finish_non_exhaustive()
    }
}

/// Configure and start `codec`. Returns the buffer info record, the buffer
/// access strategy and whether direct rendering is on.
fn bring_up<S: PlatformCodecService>(
    service: &S,
    codec: &S::Codec,
    mime: &str,
    args: StartArgs<S::Surface>,
    started: &mut bool,
) -> Result<(S::BufferInfo, BufferSet<S>, bool), CodecError> {
    let (format, surface) = match args {
        StartArgs::Video(video) => {
            let format = service
                .create_video_format(mime, video.width, video.height)
                .map_err(report)?;
            let direct = direct_rendering(
                video.surface.is_some(),
                video.angle,
                service.buffer_access(),
            );
            if direct && video.angle != 0 {
                service
                    .set_integer(&format, "rotation-degrees", video.angle)
                    .map_err(report)?;
            }
            (format, video.surface.filter(|_| direct))
        }
        StartArgs::Audio(audio) => {
            let format = service
                .create_audio_format(mime, audio.sample_rate, audio.channel_count)
                .map_err(report)?;
            (format, None)
        }
    };

    service
        .configure(codec, &format, surface.as_ref())
        .map_err(|e| {
            if surface.is_some() {
                log::warn!("{e} (with an output surface)");
            } else {
                log::warn!("{e}");
            }
            CodecError::Platform(e)
        })?;

    service.start(codec).map_err(|e| {
        log::warn!("{e}");
        CodecError::Platform(e)
    })?;
    *started = true;

    let buffers = BufferSet::open(service, codec)?;
    let buffer_info = service.new_buffer_info().map_err(report)?;
    Ok((buffer_info, buffers, surface.is_some()))
}

fn close_codec<S: PlatformCodecService>(service: &S, codec: &S::Codec, started: bool) {
    if started {
        if let Err(e) = service.stop(codec) {
            log::error!("{e}");
        }
    }
    if let Err(e) = service.release(codec) {
        log::error!("{e}");
    }
}

fn output_data<S: PlatformCodecService>(
    service: &S,
    live: &Live<S>,
    index: usize,
    info: BufferInfoFields,
) -> Result<RawBuffer, CodecError> {
    let buffer = live
        .buffers
        .source()
        .output_buffer(service, &live.codec, index)?;
    let capacity = service.buffer_capacity(&buffer).map_err(report)?;
    let base = service.buffer_address(&buffer).map_err(report)?;

    let invalid = || {
        CodecError::InvalidBuffer(format!(
            "output buffer {index}: offset {} size {} capacity {capacity}",
            info.offset, info.size
        ))
    };
    let (Ok(offset), Ok(len), Ok(capacity)) = (
        usize::try_from(info.offset),
        usize::try_from(info.size),
        usize::try_from(capacity),
    ) else {
        return Err(invalid());
    };
    if !offset.checked_add(len).is_some_and(|end| end <= capacity) {
        return Err(invalid());
    }
    let ptr = NonNull::new(base.as_ptr().wrapping_add(offset))
        .ok_or_else(|| CodecError::InvalidBuffer("null output buffer".to_string()))?;
    Ok(RawBuffer::new(ptr, len))
}

/// Missing keys read as `0`: `getInteger` throws for absent entries such as
/// `channel-mask`.
fn read_integer<S: PlatformCodecService>(service: &S, format: &S::Format, key: &str) -> i32 {
    service.get_integer(format, key).unwrap_or_else(|e| {
        log::debug!("{key}: {e}");
        0
    })
}

fn read_format<S: PlatformCodecService>(
    service: &S,
    format: &S::Format,
    kind: MediaKind,
) -> OutputFormat {
    let get = |key| read_integer(service, format, key);
    match kind {
        MediaKind::Video => OutputFormat::Video(VideoFormat {
            width: get("width"),
            height: get("height"),
            stride: get("stride"),
            slice_height: get("slice-height"),
            pixel_format: get("color-format"),
            crop_left: get("crop-left"),
            crop_top: get("crop-top"),
            crop_right: get("crop-right"),
            crop_bottom: get("crop-bottom"),
        }),
        MediaKind::Audio => OutputFormat::Audio(AudioFormat {
            channel_count: get("channel-count"),
            channel_mask: get("channel-mask"),
            sample_rate: get("sample-rate"),
        }),
    }
}
