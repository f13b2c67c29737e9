//! Class, method and field handles for the `MediaCodec` API.
//!
//! The table is resolved once per process. Lookups of members marked
//! critical must succeed; the buffer accessors are optional individually but
//! at least one complete access strategy must be present.

use crate::CodecError;
use crate::platform::{BufferAccessMode, PlatformResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use MemberId as M;
use MemberKind::{Field, Method, StaticMethod};

/// Classes kept for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassId {
    /// `android.media.MediaCodecList`
    MediaCodecList,
    /// `android.media.MediaCodec`
    MediaCodec,
    /// `android.media.MediaFormat`
    MediaFormat,
    /// `android.media.MediaCodec$BufferInfo`
    BufferInfo,
    /// `java.nio.ByteBuffer`
    ByteBuffer,
}

/// Classes resolved before any member.
pub const CLASSES: &[(ClassId, &str)] = &[
    (ClassId::MediaCodecList, "android/media/MediaCodecList"),
    (ClassId::MediaCodec, "android/media/MediaCodec"),
    (ClassId::MediaFormat, "android/media/MediaFormat"),
    (ClassId::BufferInfo, "android/media/MediaCodec$BufferInfo"),
    (ClassId::ByteBuffer, "java/nio/ByteBuffer"),
];

/// Symbolic name of every member the binding calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MemberId {
    ToString,
    GetCodecCount,
    GetCodecInfoAt,
    IsEncoder,
    GetSupportedTypes,
    GetName,
    GetCapabilitiesForType,
    ProfileLevels,
    Profile,
    Level,
    CreateByCodecName,
    Configure,
    Start,
    Stop,
    Flush,
    Release,
    GetOutputFormat,
    GetInputBuffers,
    GetInputBuffer,
    GetOutputBuffers,
    GetOutputBuffer,
    DequeueInputBuffer,
    DequeueOutputBuffer,
    QueueInputBuffer,
    ReleaseOutputBuffer,
    CreateVideoFormat,
    CreateAudioFormat,
    SetInteger,
    GetInteger,
    SetByteBuffer,
    BufferInfoCtor,
    Size,
    Offset,
    PresentationTimeUs,
}

/// What kind of member a lookup yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Instance method.
    Method,
    /// Static method.
    StaticMethod,
    /// Instance field.
    Field,
}

/// A member to look up.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    /// Symbolic name.
    pub id: MemberId,
    /// Java name.
    pub name: &'static str,
    /// JNI signature.
    pub signature: &'static str,
    /// Declaring class.
    pub class: &'static str,
    /// Lookup kind.
    pub kind: MemberKind,
    /// Whether a failed lookup aborts initialization.
    pub critical: bool,
}

const fn member(
    id: MemberId,
    name: &'static str,
    signature: &'static str,
    class: &'static str,
    kind: MemberKind,
    critical: bool,
) -> Member {
    Member {
        id,
        name,
        signature,
        class,
        kind,
        critical,
    }
}

const OBJECT: &str = "java/lang/Object";
const CODEC_LIST: &str = "android/media/MediaCodecList";
const CODEC_INFO: &str = "android/media/MediaCodecInfo";
const CAPABILITIES: &str = "android/media/MediaCodecInfo$CodecCapabilities";
const PROFILE_LEVEL: &str = "android/media/MediaCodecInfo$CodecProfileLevel";
const CODEC: &str = "android/media/MediaCodec";
const FORMAT: &str = "android/media/MediaFormat";
const BUFFER_INFO: &str = "android/media/MediaCodec$BufferInfo";

/// Members grouped by declaring class.
pub const MEMBERS: &[Member] = &[
    member(M::ToString, "toString", "()Ljava/lang/String;", OBJECT, Method, true),
    member(M::GetCodecCount, "getCodecCount", "()I", CODEC_LIST, StaticMethod, true),
    member(
        M::GetCodecInfoAt,
        "getCodecInfoAt",
        "(I)Landroid/media/MediaCodecInfo;",
        CODEC_LIST,
        StaticMethod,
        true,
    ),
    member(M::IsEncoder, "isEncoder", "()Z", CODEC_INFO, Method, true),
    member(
        M::GetSupportedTypes,
        "getSupportedTypes",
        "()[Ljava/lang/String;",
        CODEC_INFO,
        Method,
        true,
    ),
    member(M::GetName, "getName", "()Ljava/lang/String;", CODEC_INFO, Method, true),
    member(
        M::GetCapabilitiesForType,
        "getCapabilitiesForType",
        "(Ljava/lang/String;)Landroid/media/MediaCodecInfo$CodecCapabilities;",
        CODEC_INFO,
        Method,
        true,
    ),
    member(
        M::ProfileLevels,
        "profileLevels",
        "[Landroid/media/MediaCodecInfo$CodecProfileLevel;",
        CAPABILITIES,
        Field,
        true,
    ),
    member(M::Profile, "profile", "I", PROFILE_LEVEL, Field, true),
    member(M::Level, "level", "I", PROFILE_LEVEL, Field, true),
    member(
        M::CreateByCodecName,
        "createByCodecName",
        "(Ljava/lang/String;)Landroid/media/MediaCodec;",
        CODEC,
        StaticMethod,
        true,
    ),
    member(
        M::Configure,
        "configure",
        "(Landroid/media/MediaFormat;Landroid/view/Surface;Landroid/media/MediaCrypto;I)V",
        CODEC,
        Method,
        true,
    ),
    member(M::Start, "start", "()V", CODEC, Method, true),
    member(M::Stop, "stop", "()V", CODEC, Method, true),
    member(M::Flush, "flush", "()V", CODEC, Method, true),
    member(M::Release, "release", "()V", CODEC, Method, true),
    member(
        M::GetOutputFormat,
        "getOutputFormat",
        "()Landroid/media/MediaFormat;",
        CODEC,
        Method,
        true,
    ),
    member(
        M::GetInputBuffers,
        "getInputBuffers",
        "()[Ljava/nio/ByteBuffer;",
        CODEC,
        Method,
        false,
    ),
    member(
        M::GetInputBuffer,
        "getInputBuffer",
        "(I)Ljava/nio/ByteBuffer;",
        CODEC,
        Method,
        false,
    ),
    member(
        M::GetOutputBuffers,
        "getOutputBuffers",
        "()[Ljava/nio/ByteBuffer;",
        CODEC,
        Method,
        false,
    ),
    member(
        M::GetOutputBuffer,
        "getOutputBuffer",
        "(I)Ljava/nio/ByteBuffer;",
        CODEC,
        Method,
        false,
    ),
    member(M::DequeueInputBuffer, "dequeueInputBuffer", "(J)I", CODEC, Method, true),
    member(
        M::DequeueOutputBuffer,
        "dequeueOutputBuffer",
        "(Landroid/media/MediaCodec$BufferInfo;J)I",
        CODEC,
        Method,
        true,
    ),
    member(M::QueueInputBuffer, "queueInputBuffer", "(IIIJI)V", CODEC, Method, true),
    member(M::ReleaseOutputBuffer, "releaseOutputBuffer", "(IZ)V", CODEC, Method, true),
    member(
        M::CreateVideoFormat,
        "createVideoFormat",
        "(Ljava/lang/String;II)Landroid/media/MediaFormat;",
        FORMAT,
        StaticMethod,
        true,
    ),
    member(
        M::CreateAudioFormat,
        "createAudioFormat",
        "(Ljava/lang/String;II)Landroid/media/MediaFormat;",
        FORMAT,
        StaticMethod,
        true,
    ),
    member(M::SetInteger, "setInteger", "(Ljava/lang/String;I)V", FORMAT, Method, true),
    member(M::GetInteger, "getInteger", "(Ljava/lang/String;)I", FORMAT, Method, true),
    member(
        M::SetByteBuffer,
        "setByteBuffer",
        "(Ljava/lang/String;Ljava/nio/ByteBuffer;)V",
        FORMAT,
        Method,
        true,
    ),
    member(M::BufferInfoCtor, "<init>", "()V", BUFFER_INFO, Method, true),
    member(M::Size, "size", "I", BUFFER_INFO, Field, true),
    member(M::Offset, "offset", "I", BUFFER_INFO, Field, true),
    member(M::PresentationTimeUs, "presentationTimeUs", "J", BUFFER_INFO, Field, true),
];

/// Concrete handle types of a runtime.
pub trait HandleTypes {
    /// Class reference that outlives the lookup.
    type Class;
    /// Instance method id.
    type Method: Copy;
    /// Static method id.
    type StaticMethod: Copy;
    /// Field id.
    type Field: Copy;
}

/// Looks handles up in a running runtime.
pub trait HandleResolver<T: HandleTypes> {
    /// Find a class by its binary name.
    ///
    /// # Errors
    ///
    /// Fails when the class does not exist.
    fn find_class(&mut self, name: &str) -> PlatformResult<T::Class>;
    /// Find an instance method.
    ///
    /// # Errors
    ///
    /// Fails when the method does not exist.
    fn method(&mut self, class: &T::Class, name: &str, signature: &str)
    -> PlatformResult<T::Method>;
    /// Find a static method.
    ///
    /// # Errors
    ///
    /// Fails when the method does not exist.
    fn static_method(
        &mut self,
        class: &T::Class,
        name: &str,
        signature: &str,
    ) -> PlatformResult<T::StaticMethod>;
    /// Find an instance field.
    ///
    /// # Errors
    ///
    /// Fails when the field does not exist.
    fn field(&mut self, class: &T::Class, name: &str, signature: &str)
    -> PlatformResult<T::Field>;
}

/// Resolved handles. Read-only once built.
pub struct HandleTable<T: HandleTypes> {
    classes: HashMap<ClassId, T::Class>,
    methods: HashMap<MemberId, T::Method>,
    static_methods: HashMap<MemberId, T::StaticMethod>,
    fields: HashMap<MemberId, T::Field>,
    buffer_access: BufferAccessMode,
}

impl<T: HandleTypes> HandleTable<T> {
    /// Class handle.
    #[must_use]
    pub fn class(&self, id: ClassId) -> Option<&T::Class> {
        self.classes.get(&id)
    }

    /// Instance method handle.
    #[must_use]
    pub fn method(&self, id: MemberId) -> Option<T::Method> {
        self.methods.get(&id).copied()
    }

    /// Static method handle.
    #[must_use]
    pub fn static_method(&self, id: MemberId) -> Option<T::StaticMethod> {
        self.static_methods.get(&id).copied()
    }

    /// Field handle.
    #[must_use]
    pub fn field(&self, id: MemberId) -> Option<T::Field> {
        self.fields.get(&id).copied()
    }

    /// Selected buffer access strategy.
    #[must_use]
    pub const fn buffer_access(&self) -> BufferAccessMode {
        self.buffer_access
    }

    fn has_method(&self, id: MemberId) -> bool {
        self.methods.contains_key(&id)
    }
}

impl<T: HandleTypes> fmt::Debug for HandleTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleTable")
            .field("classes", &self.classes.len())
            .field("methods", &self.methods.len())
            .field("static_methods", &self.static_methods.len())
            .field("fields", &self.fields.len())
            .field("buffer_access", &self.buffer_access)
            .finish()
    }
}

/// Pick the buffer access strategy, preferring per-index accessors.
#[must_use]
pub const fn select_buffer_access(per_index: bool, arrays: bool) -> Option<BufferAccessMode> {
    if per_index {
        Some(BufferAccessMode::PerIndex)
    } else if arrays {
        Some(BufferAccessMode::Arrays)
    } else {
        None
    }
}

fn init_failed(reason: String) -> CodecError {
    log::error!("MediaCodec jni init failed: {reason}");
    CodecError::InitializationFailed(reason)
}

/// Resolve every class and member.
///
/// # Errors
///
/// Returns `CodecError::InitializationFailed` when a class, a critical
/// member, or both buffer access strategies are missing.
pub fn resolve<T, R>(resolver: &mut R) -> Result<HandleTable<T>, CodecError>
where
    T: HandleTypes,
    R: HandleResolver<T>,
{
    let mut table = HandleTable {
        classes: HashMap::new(),
        methods: HashMap::new(),
        static_methods: HashMap::new(),
        fields: HashMap::new(),
        buffer_access: BufferAccessMode::PerIndex,
    };

    for &(id, name) in CLASSES {
        let class = resolver.find_class(name).map_err(|e| {
            log::warn!("Unable to find class {name}: {e}");
            init_failed(format!("missing class {name}"))
        })?;
        table.classes.insert(id, class);
    }

    let mut current: Option<(&str, T::Class)> = None;
    for member in MEMBERS {
        let class = match current.take() {
            Some((name, class)) if name == member.class => class,
            _ => resolver.find_class(member.class).map_err(|e| {
                log::warn!("Unable to find class {}: {e}", member.class);
                init_failed(format!("missing class {}", member.class))
            })?,
        };

        let found = match member.kind {
            MemberKind::Method => resolver
                .method(&class, member.name, member.signature)
                .map(|m| {
                    table.methods.insert(member.id, m);
                }),
            MemberKind::StaticMethod => resolver
                .static_method(&class, member.name, member.signature)
                .map(|m| {
                    table.static_methods.insert(member.id, m);
                }),
            MemberKind::Field => resolver
                .field(&class, member.name, member.signature)
                .map(|f| {
                    table.fields.insert(member.id, f);
                }),
        };
        if let Err(e) = found {
            log::warn!(
                "Unable to find the member {} in {}: {e}",
                member.name,
                member.class
            );
            if member.critical {
                return Err(init_failed(format!(
                    "missing member {}.{}",
                    member.class, member.name
                )));
            }
        }
        current = Some((member.class, class));
    }

    let per_index =
        table.has_method(MemberId::GetInputBuffer) && table.has_method(MemberId::GetOutputBuffer);
    let arrays =
        table.has_method(MemberId::GetInputBuffers) && table.has_method(MemberId::GetOutputBuffers);
    table.buffer_access = select_buffer_access(per_index, arrays).ok_or_else(|| {
        init_failed("Unable to find get Output/Input Buffer/Buffers".to_string())
    })?;

    // getInputBuffers and getOutputBuffers are deprecated once the
    // per-index accessors exist.
    if table.buffer_access == BufferAccessMode::PerIndex {
        table.methods.remove(&MemberId::GetInputBuffers);
        table.methods.remove(&MemberId::GetOutputBuffers);
    }

    Ok(table)
}

/// Initialization state of a process-wide cache.
#[derive(Debug)]
pub enum InitState<T> {
    /// Nobody tried yet.
    Uninit,
    /// A previous attempt failed. Never retried.
    Failed(String),
    /// Initialized.
    Ready(Arc<T>),
}

/// Mutex-guarded, first-caller-wins initialization that also caches failure.
#[derive(Debug)]
pub struct InitCell<T> {
    state: Mutex<InitState<T>>,
}

impl<T> InitCell<T> {
    /// An uninitialized cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(InitState::Uninit),
        }
    }

    /// Return the cached value, running `init` if nobody has tried yet.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InitializationFailed` if this or any earlier
    /// attempt failed to initialize. Any other error from `init` is returned
    /// as is and leaves the cell uninitialized.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<T>, CodecError>
    where
        F: FnOnce() -> Result<T, CodecError>,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            InitState::Ready(value) => return Ok(Arc::clone(value)),
            InitState::Failed(reason) => {
                return Err(CodecError::InitializationFailed(reason.clone()));
            }
            InitState::Uninit => {}
        }

        match init() {
            Ok(value) => {
                let value = Arc::new(value);
                *state = InitState::Ready(Arc::clone(&value));
                Ok(value)
            }
            Err(CodecError::InitializationFailed(reason)) => {
                *state = InitState::Failed(reason.clone());
                Err(CodecError::InitializationFailed(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the cell reached a final state.
    pub fn is_settled(&self) -> bool {
        !matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            InitState::Uninit
        )
    }
}

impl<T> Default for InitCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
