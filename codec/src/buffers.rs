//! Access to codec-owned input and output buffers.

use crate::CodecError;
use crate::platform::{BufferAccessMode, PlatformCodecService, PlatformError};

pub(crate) fn report(err: PlatformError) -> CodecError {
    log::error!("{err}");
    CodecError::Platform(err)
}

/// Where a session gets its buffers from.
pub(crate) trait BufferSource<S: PlatformCodecService> {
    fn input_buffer(
        &self,
        service: &S,
        codec: &S::Codec,
        index: usize,
    ) -> Result<S::Buffer, CodecError>;

    fn output_buffer(
        &self,
        service: &S,
        codec: &S::Codec,
        index: usize,
    ) -> Result<S::Buffer, CodecError>;

    /// React to `INFO_OUTPUT_BUFFERS_CHANGED`.
    fn refresh_output(&mut self, service: &S, codec: &S::Codec) -> Result<(), CodecError>;
}

/// Buffer arrays fetched after `start` and kept until the codec replaces
/// its output set.
pub(crate) struct CachedArrays<S: PlatformCodecService> {
    input: S::BufferArray,
    output: Option<S::BufferArray>,
}

impl<S: PlatformCodecService> BufferSource<S> for CachedArrays<S> {
    fn input_buffer(
        &self,
        service: &S,
        _codec: &S::Codec,
        index: usize,
    ) -> Result<S::Buffer, CodecError> {
        service.array_element(&self.input, index).map_err(report)
    }

    fn output_buffer(
        &self,
        service: &S,
        _codec: &S::Codec,
        index: usize,
    ) -> Result<S::Buffer, CodecError> {
        let output = self.output.as_ref().ok_or_else(|| {
            CodecError::InvalidBuffer("output buffer array unavailable".to_string())
        })?;
        service.array_element(output, index).map_err(report)
    }

    fn refresh_output(&mut self, service: &S, codec: &S::Codec) -> Result<(), CodecError> {
        // The stale array is dropped even when the refetch fails.
        self.output = None;
        self.output = Some(service.output_buffers(codec).map_err(report)?);
        Ok(())
    }
}

/// `getInputBuffer(int)` and `getOutputBuffer(int)` on every access.
pub(crate) struct PerIndex;

impl<S: PlatformCodecService> BufferSource<S> for PerIndex {
    fn input_buffer(
        &self,
        service: &S,
        codec: &S::Codec,
        index: usize,
    ) -> Result<S::Buffer, CodecError> {
        service.input_buffer(codec, index).map_err(report)
    }

    fn output_buffer(
        &self,
        service: &S,
        codec: &S::Codec,
        index: usize,
    ) -> Result<S::Buffer, CodecError> {
        service.output_buffer(codec, index).map_err(report)
    }

    fn refresh_output(&mut self, _service: &S, _codec: &S::Codec) -> Result<(), CodecError> {
        Ok(())
    }
}

/// The buffer access strategy of a started session.
pub(crate) enum BufferSet<S: PlatformCodecService> {
    Arrays(CachedArrays<S>),
    PerIndex(PerIndex),
}

impl<S: PlatformCodecService> BufferSet<S> {
    /// Set up access for a freshly started codec.
    pub(crate) fn open(service: &S, codec: &S::Codec) -> Result<Self, CodecError> {
        Ok(match service.buffer_access() {
            BufferAccessMode::PerIndex => Self::PerIndex(PerIndex),
            BufferAccessMode::Arrays => {
                let input = service.input_buffers(codec).map_err(report)?;
                let output = service.output_buffers(codec).map_err(report)?;
                Self::Arrays(CachedArrays {
                    input,
                    output: Some(output),
                })
            }
        })
    }

    pub(crate) const fn mode(&self) -> BufferAccessMode {
        match self {
            Self::Arrays(_) => BufferAccessMode::Arrays,
            Self::PerIndex(_) => BufferAccessMode::PerIndex,
        }
    }

    pub(crate) fn source(&self) -> &dyn BufferSource<S> {
        match self {
            Self::Arrays(arrays) => arrays,
            Self::PerIndex(per_index) => per_index,
        }
    }

    pub(crate) fn source_mut(&mut self) -> &mut dyn BufferSource<S> {
        match self {
            Self::Arrays(arrays) => arrays,
            Self::PerIndex(per_index) => per_index,
        }
    }
}
