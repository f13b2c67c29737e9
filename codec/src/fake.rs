//! Scripted in-memory codec service for tests.

use crate::platform::{
    BufferAccessMode, BufferInfoFields, CodecInfo, DequeuedOutput, PlatformCodecService,
    PlatformError, PlatformResult,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeComponent {
    pub name: String,
    pub is_encoder: bool,
    pub types: Vec<String>,
    pub profiles: Option<Vec<i32>>,
}

impl FakeComponent {
    pub fn decoder(name: &str, mime: &str) -> Self {
        Self {
            name: name.to_string(),
            is_encoder: false,
            types: vec![mime.to_string()],
            profiles: Some(Vec::new()),
        }
    }

    pub fn encoder(name: &str, mime: &str) -> Self {
        Self {
            is_encoder: true,
            ..Self::decoder(name, mime)
        }
    }

    pub fn with_profiles(mut self, profiles: &[i32]) -> Self {
        self.profiles = Some(profiles.to_vec());
        self
    }

    pub fn failing_capabilities(mut self) -> Self {
        self.profiles = None;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeArray {
    pub side: Side,
    pub generation: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeBuffer {
    pub side: Side,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configured {
    pub format: BTreeMap<String, i32>,
    pub surface: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedInput {
    pub index: usize,
    pub data: Vec<u8>,
    pub presentation_time_us: i64,
    pub flags: i32,
}

#[derive(Debug)]
pub struct FakeState {
    pub components: Vec<FakeComponent>,
    pub calls: Vec<&'static str>,
    pub failing: HashSet<&'static str>,
    pub input_slots: VecDeque<usize>,
    pub input_capacity: i64,
    pub written: HashMap<usize, Vec<u8>>,
    pub queued: Vec<QueuedInput>,
    pub output_events: VecDeque<DequeuedOutput>,
    pub output_info: BufferInfoFields,
    pub output_memory: Vec<Box<[u8]>>,
    pub output_format: BTreeMap<String, i32>,
    pub formats: Vec<BTreeMap<String, i32>>,
    pub configured: Option<Configured>,
    pub released: Vec<(usize, bool)>,
    pub output_generation: usize,
    next_codec: u32,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            calls: Vec::new(),
            failing: HashSet::new(),
            input_slots: VecDeque::new(),
            input_capacity: 8192,
            written: HashMap::new(),
            queued: Vec::new(),
            output_events: VecDeque::new(),
            output_info: BufferInfoFields::default(),
            output_memory: (0..4).map(|i| vec![i; 64].into_boxed_slice()).collect(),
            output_format: BTreeMap::new(),
            formats: Vec::new(),
            configured: None,
            released: Vec::new(),
            output_generation: 0,
            next_codec: 0,
        }
    }
}

#[derive(Debug)]
pub struct FakeService {
    mode: BufferAccessMode,
    state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new(mode: BufferAccessMode) -> Self {
        Self::with_components(mode, Vec::new())
    }

    pub fn with_components(mode: BufferAccessMode, components: Vec<FakeComponent>) -> Self {
        Self {
            mode,
            state: Mutex::new(FakeState {
                components,
                ..FakeState::default()
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fail(&self, operation: &'static str) {
        self.state().failing.insert(operation);
    }

    pub fn count(&self, operation: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == operation).count()
    }

    pub fn push_input_slot(&self, index: usize) {
        self.state().input_slots.push_back(index);
    }

    pub fn push_output(&self, event: DequeuedOutput) {
        self.state().output_events.push_back(event);
    }

    fn call(&self, operation: &'static str) -> PlatformResult<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        state.calls.push(operation);
        if state.failing.contains(operation) {
            return Err(PlatformError::new(operation, "java.lang.IllegalStateException"));
        }
        Ok(state)
    }

    fn new_format(&self, operation: &'static str, values: [(&str, i32); 2]) -> PlatformResult<usize> {
        let mut state = self.call(operation)?;
        state
            .formats
            .push(values.iter().map(|(k, v)| ((*k).to_string(), *v)).collect());
        Ok(state.formats.len() - 1)
    }
}

impl PlatformCodecService for FakeService {
    type Codec = u32;
    type Format = usize;
    type BufferInfo = ();
    type BufferArray = FakeArray;
    type Buffer = FakeBuffer;
    type Surface = u32;

    fn buffer_access(&self) -> BufferAccessMode {
        self.mode
    }

    fn codec_count(&self) -> PlatformResult<usize> {
        Ok(self.call("MediaCodecList.getCodecCount")?.components.len())
    }

    fn codec_info_at(&self, index: usize) -> PlatformResult<CodecInfo> {
        let state = self.call("MediaCodecList.getCodecInfoAt")?;
        let component = &state.components[index];
        Ok(CodecInfo {
            name: component.name.clone(),
            is_encoder: component.is_encoder,
            supported_types: component.types.clone(),
        })
    }

    fn profile_levels(&self, index: usize, _mime: &str) -> PlatformResult<Vec<i32>> {
        let operation = "MediaCodecInfo.getCapabilitiesForType";
        self.call(operation)?.components[index]
            .profiles
            .clone()
            .ok_or_else(|| PlatformError::new(operation, "java.lang.IllegalArgumentException"))
    }

    fn create_by_codec_name(&self, _name: &str) -> PlatformResult<u32> {
        let mut state = self.call("MediaCodec.createByCodecName")?;
        state.next_codec += 1;
        Ok(state.next_codec)
    }

    fn create_video_format(&self, _mime: &str, width: i32, height: i32) -> PlatformResult<usize> {
        self.new_format(
            "MediaFormat.createVideoFormat",
            [("width", width), ("height", height)],
        )
    }

    fn create_audio_format(
        &self,
        _mime: &str,
        sample_rate: i32,
        channel_count: i32,
    ) -> PlatformResult<usize> {
        self.new_format(
            "MediaFormat.createAudioFormat",
            [("sample-rate", sample_rate), ("channel-count", channel_count)],
        )
    }

    fn set_integer(&self, format: &usize, key: &str, value: i32) -> PlatformResult<()> {
        self.call("MediaFormat.setInteger")?.formats[*format].insert(key.to_string(), value);
        Ok(())
    }

    fn get_integer(&self, format: &usize, key: &str) -> PlatformResult<i32> {
        let operation = "MediaFormat.getInteger";
        self.call(operation)?.formats[*format]
            .get(key)
            .copied()
            .ok_or_else(|| PlatformError::new(operation, "java.lang.NullPointerException"))
    }

    fn format_to_string(&self, format: &usize) -> PlatformResult<String> {
        let state = self.call("MediaFormat.toString")?;
        Ok(format!("{:?}", state.formats[*format]))
    }

    fn configure(&self, _codec: &u32, format: &usize, surface: Option<&u32>) -> PlatformResult<()> {
        let mut state = self.call("MediaCodec.configure")?;
        let format = state.formats[*format].clone();
        state.configured = Some(Configured {
            format,
            surface: surface.copied(),
        });
        Ok(())
    }

    fn start(&self, _codec: &u32) -> PlatformResult<()> {
        self.call("MediaCodec.start").map(drop)
    }

    fn stop(&self, _codec: &u32) -> PlatformResult<()> {
        self.call("MediaCodec.stop").map(drop)
    }

    fn flush(&self, _codec: &u32) -> PlatformResult<()> {
        self.call("MediaCodec.flush").map(drop)
    }

    fn release(&self, _codec: &u32) -> PlatformResult<()> {
        self.call("MediaCodec.release").map(drop)
    }

    fn output_format(&self, _codec: &u32) -> PlatformResult<usize> {
        let mut state = self.call("MediaCodec.getOutputFormat")?;
        let format = state.output_format.clone();
        state.formats.push(format);
        Ok(state.formats.len() - 1)
    }

    fn new_buffer_info(&self) -> PlatformResult<()> {
        self.call("MediaCodec$BufferInfo.<init>").map(drop)
    }

    fn read_buffer_info(&self, _info: &()) -> PlatformResult<BufferInfoFields> {
        Ok(self.state().output_info)
    }

    fn input_buffers(&self, _codec: &u32) -> PlatformResult<FakeArray> {
        drop(self.call("MediaCodec.getInputBuffers")?);
        Ok(FakeArray {
            side: Side::Input,
            generation: 0,
        })
    }

    fn output_buffers(&self, _codec: &u32) -> PlatformResult<FakeArray> {
        let mut state = self.call("MediaCodec.getOutputBuffers")?;
        state.output_generation += 1;
        Ok(FakeArray {
            side: Side::Output,
            generation: state.output_generation,
        })
    }

    fn array_element(&self, array: &FakeArray, index: usize) -> PlatformResult<FakeBuffer> {
        if array.side == Side::Output && array.generation != self.state().output_generation {
            return Err(PlatformError::new("ByteBuffer[]", "stale output buffer array"));
        }
        Ok(FakeBuffer {
            side: array.side,
            index,
        })
    }

    fn input_buffer(&self, _codec: &u32, index: usize) -> PlatformResult<FakeBuffer> {
        drop(self.call("MediaCodec.getInputBuffer")?);
        Ok(FakeBuffer {
            side: Side::Input,
            index,
        })
    }

    fn output_buffer(&self, _codec: &u32, index: usize) -> PlatformResult<FakeBuffer> {
        drop(self.call("MediaCodec.getOutputBuffer")?);
        Ok(FakeBuffer {
            side: Side::Output,
            index,
        })
    }

    fn buffer_capacity(&self, buffer: &FakeBuffer) -> PlatformResult<i64> {
        let state = self.state();
        Ok(match buffer.side {
            Side::Input => state.input_capacity,
            Side::Output => i64::try_from(state.output_memory[buffer.index].len()).unwrap(),
        })
    }

    fn write_buffer(&self, buffer: &FakeBuffer, data: &[u8]) -> PlatformResult<()> {
        assert_eq!(buffer.side, Side::Input);
        assert!(i64::try_from(data.len()).unwrap() <= self.state().input_capacity);
        self.state().written.insert(buffer.index, data.to_vec());
        Ok(())
    }

    fn buffer_address(&self, buffer: &FakeBuffer) -> PlatformResult<NonNull<u8>> {
        assert_eq!(buffer.side, Side::Output);
        let mut state = self.state();
        Ok(NonNull::new(state.output_memory[buffer.index].as_mut_ptr()).unwrap())
    }

    fn dequeue_input_buffer(&self, _codec: &u32, _timeout: Duration) -> PlatformResult<Option<usize>> {
        Ok(self.call("MediaCodec.dequeueInputBuffer")?.input_slots.pop_front())
    }

    fn queue_input_buffer(
        &self,
        _codec: &u32,
        index: usize,
        size: usize,
        presentation_time_us: i64,
        flags: i32,
    ) -> PlatformResult<()> {
        let mut state = self.call("MediaCodec.queueInputBuffer")?;
        let mut data = state.written.remove(&index).unwrap_or_default();
        data.truncate(size);
        state.queued.push(QueuedInput {
            index,
            data,
            presentation_time_us,
            flags,
        });
        Ok(())
    }

    fn dequeue_output_buffer(
        &self,
        _codec: &u32,
        _info: &(),
        _timeout: Duration,
    ) -> PlatformResult<DequeuedOutput> {
        Ok(self
            .call("MediaCodec.dequeueOutputBuffer")?
            .output_events
            .pop_front()
            .unwrap_or(DequeuedOutput::TryAgainLater))
    }

    fn release_output_buffer(&self, _codec: &u32, index: usize, render: bool) -> PlatformResult<()> {
        self.call("MediaCodec.releaseOutputBuffer")?
            .released
            .push((index, render));
        Ok(())
    }
}
