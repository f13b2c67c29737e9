//! `MediaCodec` through JNI.
//!
//! Class and member handles are resolved once per process and shared by
//! every [`JniCodecService`]. Each call attaches the current thread if needed
//! and runs inside its own local reference frame, so nothing but global
//! references escapes.

use crate::CodecError;
use crate::handles::{
    self, ClassId, HandleResolver, HandleTable, HandleTypes, InitCell, MemberId,
};
use crate::platform::{
    BufferAccessMode, BufferInfoFields, CodecInfo, DequeuedOutput, PlatformCodecService,
    PlatformError, PlatformResult, timeout_micros,
};
use jni::objects::{
    GlobalRef, JByteBuffer, JClass, JFieldID, JMethodID, JObject, JObjectArray,
    JStaticMethodID, JString, JThrowable, JValue, JValueOwned,
};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{jboolean, jint, jvalue};
use jni::{JNIEnv, JavaVM};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::time::Duration;

const LOCAL_FRAME_CAPACITY: i32 = 32;

static HANDLES: InitCell<HandleTable<JniHandles>> = InitCell::new();

/// Handle types of the JNI backend.
#[derive(Debug, Clone, Copy)]
pub struct JniHandles;

impl HandleTypes for JniHandles {
    type Class = GlobalRef;
    type Method = JMethodID;
    type StaticMethod = JStaticMethodID;
    type Field = JFieldID;
}

impl From<jni::errors::Error> for PlatformError {
    fn from(err: jni::errors::Error) -> Self {
        Self::new("JNI", err.to_string())
    }
}

impl From<jni::errors::Error> for CodecError {
    fn from(err: jni::errors::Error) -> Self {
        Self::Platform(err.into())
    }
}

/// Clear an exception still pending after `result` failed. Errors that went
/// through [`raised`] have none left; `?` on a raw `jni` error may.
fn clear_pending<T, E>(env: &mut JNIEnv<'_>, operation: &str, result: Result<T, E>) -> Result<T, E> {
    if result.is_err() && env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
        log::warn!("{operation}: cleared a pending Java exception");
    }
    result
}

/// Turn a failed call into a [`PlatformError`], clearing the pending
/// exception if there is one.
fn raised(env: &mut JNIEnv<'_>, operation: &'static str, err: jni::errors::Error) -> PlatformError {
    let detail = match env.exception_occurred() {
        Ok(throwable) if !throwable.is_null() => {
            let _ = env.exception_clear();
            describe(env, &throwable).unwrap_or_else(|| err.to_string())
        }
        _ => err.to_string(),
    };
    PlatformError::new(operation, detail)
}

fn describe(env: &mut JNIEnv<'_>, throwable: &JThrowable<'_>) -> Option<String> {
    let text = match env.call_method(throwable, "toString", "()Ljava/lang/String;", &[]) {
        Ok(text) => text.l().ok()?,
        Err(_) => {
            let _ = env.exception_clear();
            return None;
        }
    };
    java_string(env, text).ok()
}

fn unresolved(operation: &'static str) -> PlatformError {
    PlatformError::new(operation, "handle not resolved")
}

fn to_jint(value: usize, operation: &'static str) -> PlatformResult<jint> {
    jint::try_from(value).map_err(|_| PlatformError::new(operation, format!("{value} out of range")))
}

fn class(
    handles: &HandleTable<JniHandles>,
    id: ClassId,
    operation: &'static str,
) -> PlatformResult<&JClass<'static>> {
    handles
        .class(id)
        .map(|class| <&JClass>::from(class.as_obj()))
        .ok_or_else(|| unresolved(operation))
}

fn invoke<'local>(
    env: &mut JNIEnv<'local>,
    handles: &HandleTable<JniHandles>,
    operation: &'static str,
    target: &JObject<'_>,
    id: MemberId,
    ret: ReturnType,
    args: &[jvalue],
) -> PlatformResult<JValueOwned<'local>> {
    let method = handles.method(id).ok_or_else(|| unresolved(operation))?;
    // SAFETY: method ids are resolved against the signatures their
    // arguments are built for.
    let result = unsafe { env.call_method_unchecked(target, method, ret, args) };
    result.map_err(|e| raised(env, operation, e))
}

fn invoke_static<'local>(
    env: &mut JNIEnv<'local>,
    handles: &HandleTable<JniHandles>,
    operation: &'static str,
    class_id: ClassId,
    id: MemberId,
    ret: ReturnType,
    args: &[jvalue],
) -> PlatformResult<JValueOwned<'local>> {
    let class = class(handles, class_id, operation)?;
    let method = handles
        .static_method(id)
        .ok_or_else(|| unresolved(operation))?;
    // SAFETY: see `invoke`.
    let result = unsafe { env.call_static_method_unchecked(class, method, ret, args) };
    result.map_err(|e| raised(env, operation, e))
}

fn non_null<'local>(
    operation: &'static str,
    value: JValueOwned<'local>,
) -> PlatformResult<JObject<'local>> {
    let object = value.l()?;
    if object.is_null() {
        return Err(PlatformError::new(operation, "null result"));
    }
    Ok(object)
}

fn object<'local>(
    env: &mut JNIEnv<'local>,
    handles: &HandleTable<JniHandles>,
    operation: &'static str,
    target: &JObject<'_>,
    id: MemberId,
    args: &[jvalue],
) -> PlatformResult<JObject<'local>> {
    let value = invoke(env, handles, operation, target, id, ReturnType::Object, args)?;
    non_null(operation, value)
}

fn static_object<'local>(
    env: &mut JNIEnv<'local>,
    handles: &HandleTable<JniHandles>,
    operation: &'static str,
    class_id: ClassId,
    id: MemberId,
    args: &[jvalue],
) -> PlatformResult<JObject<'local>> {
    let value = invoke_static(env, handles, operation, class_id, id, ReturnType::Object, args)?;
    non_null(operation, value)
}

fn field<'local>(
    env: &mut JNIEnv<'local>,
    handles: &HandleTable<JniHandles>,
    operation: &'static str,
    target: &JObject<'_>,
    id: MemberId,
    ty: ReturnType,
) -> PlatformResult<JValueOwned<'local>> {
    let field = handles.field(id).ok_or_else(|| unresolved(operation))?;
    // SAFETY: field ids are resolved with the type read here.
    let result = unsafe { env.get_field_unchecked(target, field, ty) };
    result.map_err(|e| raised(env, operation, e))
}

fn java_string(env: &mut JNIEnv<'_>, object: JObject<'_>) -> PlatformResult<String> {
    let string = JString::from(object);
    let value = String::from(env.get_string(&string)?);
    env.delete_local_ref(string)?;
    Ok(value)
}

fn codec_info<'local>(
    env: &mut JNIEnv<'local>,
    handles: &HandleTable<JniHandles>,
    index: usize,
) -> PlatformResult<JObject<'local>> {
    const OP: &str = "MediaCodecList.getCodecInfoAt";
    let index = to_jint(index, OP)?;
    static_object(
        env,
        handles,
        OP,
        ClassId::MediaCodecList,
        MemberId::GetCodecInfoAt,
        &[JValue::Int(index).as_jni()],
    )
}

fn int() -> ReturnType {
    ReturnType::Primitive(Primitive::Int)
}

fn void() -> ReturnType {
    ReturnType::Primitive(Primitive::Void)
}

struct JniResolver<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
}

impl HandleResolver<JniHandles> for JniResolver<'_, '_> {
    fn find_class(&mut self, name: &str) -> PlatformResult<GlobalRef> {
        let class = self
            .env
            .find_class(name)
            .map_err(|e| raised(self.env, "FindClass", e))?;
        Ok(self.env.new_global_ref(class)?)
    }

    fn method(
        &mut self,
        class: &GlobalRef,
        name: &str,
        signature: &str,
    ) -> PlatformResult<JMethodID> {
        self.env
            .get_method_id(<&JClass>::from(class.as_obj()), name, signature)
            .map_err(|e| raised(self.env, "GetMethodID", e))
    }

    fn static_method(
        &mut self,
        class: &GlobalRef,
        name: &str,
        signature: &str,
    ) -> PlatformResult<JStaticMethodID> {
        self.env
            .get_static_method_id(<&JClass>::from(class.as_obj()), name, signature)
            .map_err(|e| raised(self.env, "GetStaticMethodID", e))
    }

    fn field(&mut self, class: &GlobalRef, name: &str, signature: &str) -> PlatformResult<JFieldID> {
        self.env
            .get_field_id(<&JClass>::from(class.as_obj()), name, signature)
            .map_err(|e| raised(self.env, "GetFieldID", e))
    }
}

/// [`PlatformCodecService`] backed by the Java `MediaCodec` API.
///
/// All handles returned by this service are global references and may be
/// used from any attached thread.
pub struct JniCodecService {
    vm: JavaVM,
    handles: Arc<HandleTable<JniHandles>>,
}

impl JniCodecService {
    /// Create a service on `vm`, resolving the process-wide handle table on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::EnvironmentUnavailable` if the current thread
    /// cannot be attached, and `CodecError::InitializationFailed` if the
    /// handle table could not be resolved, now or by an earlier caller.
    pub fn new(vm: JavaVM) -> Result<Self, CodecError> {
        let mut env = vm
            .attach_current_thread_permanently()
            .map_err(|e| CodecError::EnvironmentUnavailable(e.to_string()))?;
        let handles = HANDLES.get_or_try_init(|| {
            env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| {
                let table = handles::resolve::<JniHandles, _>(&mut JniResolver { env });
                clear_pending(env, "MediaCodec handle lookup", table)
            })
        })?;
        log::debug!(
            "MediaCodec handles ready, {:?} buffer access",
            handles.buffer_access()
        );
        Ok(Self { vm, handles })
    }

    /// Create a service on the VM published by `ndk-context`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::EnvironmentUnavailable` if no VM is published,
    /// or any error of [`JniCodecService::new`].
    pub fn from_android_context() -> Result<Self, CodecError> {
        let context = ndk_context::android_context();
        // SAFETY: ndk-context hands out the process JavaVM pointer.
        let vm = unsafe { JavaVM::from_raw(context.vm().cast()) }
            .map_err(|e| CodecError::EnvironmentUnavailable(e.to_string()))?;
        Self::new(vm)
    }

    /// The resolved handle table.
    #[must_use]
    pub fn handles(&self) -> &HandleTable<JniHandles> {
        &self.handles
    }

    fn with_env<T, F>(&self, operation: &'static str, f: F) -> PlatformResult<T>
    where
        F: FnOnce(&mut JNIEnv<'_>, &HandleTable<JniHandles>) -> PlatformResult<T>,
    {
        let mut env = self
            .vm
            .attach_current_thread_permanently()
            .map_err(|e| PlatformError::new(operation, format!("attach failed: {e}")))?;
        let handles = &*self.handles;
        env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| {
            let result = f(env, handles);
            clear_pending(env, operation, result)
        })
    }

    fn call_void(&self, operation: &'static str, target: &GlobalRef, id: MemberId) -> PlatformResult<()> {
        self.with_env(operation, |env, h| {
            invoke(env, h, operation, target.as_obj(), id, void(), &[])?.v()?;
            Ok(())
        })
    }

    fn call_object(
        &self,
        operation: &'static str,
        target: &GlobalRef,
        id: MemberId,
    ) -> PlatformResult<GlobalRef> {
        self.with_env(operation, |env, h| {
            let object = object(env, h, operation, target.as_obj(), id, &[])?;
            Ok(env.new_global_ref(object)?)
        })
    }

    fn create_format(
        &self,
        operation: &'static str,
        id: MemberId,
        mime: &str,
        a: i32,
        b: i32,
    ) -> PlatformResult<GlobalRef> {
        self.with_env(operation, |env, h| {
            let mime = env.new_string(mime)?;
            let format = static_object(
                env,
                h,
                operation,
                ClassId::MediaFormat,
                id,
                &[
                    JValue::Object(&mime).as_jni(),
                    JValue::Int(a).as_jni(),
                    JValue::Int(b).as_jni(),
                ],
            )?;
            Ok(env.new_global_ref(format)?)
        })
    }

    fn buffer_at(
        &self,
        operation: &'static str,
        codec: &GlobalRef,
        id: MemberId,
        index: usize,
    ) -> PlatformResult<GlobalRef> {
        self.with_env(operation, |env, h| {
            let index = to_jint(index, operation)?;
            let buffer = object(
                env,
                h,
                operation,
                codec.as_obj(),
                id,
                &[JValue::Int(index).as_jni()],
            )?;
            Ok(env.new_global_ref(buffer)?)
        })
    }
}

impl fmt::Debug for JniCodecService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JniCodecService")
            .field("handles", &self.handles)
            .finish_non_exhaustive()
    }
}

impl PlatformCodecService for JniCodecService {
    type Codec = GlobalRef;
    type Format = GlobalRef;
    type BufferInfo = GlobalRef;
    type BufferArray = GlobalRef;
    type Buffer = GlobalRef;
    type Surface = GlobalRef;

    fn buffer_access(&self) -> BufferAccessMode {
        self.handles.buffer_access()
    }

    fn codec_count(&self) -> PlatformResult<usize> {
        const OP: &str = "MediaCodecList.getCodecCount";
        self.with_env(OP, |env, h| {
            let count = invoke_static(
                env,
                h,
                OP,
                ClassId::MediaCodecList,
                MemberId::GetCodecCount,
                int(),
                &[],
            )?
            .i()?;
            usize::try_from(count).map_err(|_| PlatformError::new(OP, format!("count {count}")))
        })
    }

    fn codec_info_at(&self, index: usize) -> PlatformResult<CodecInfo> {
        const OP: &str = "MediaCodecInfo";
        self.with_env(OP, |env, h| {
            let info = codec_info(env, h, index)?;

            let name = object(env, h, "MediaCodecInfo.getName", &info, MemberId::GetName, &[])?;
            let name = java_string(env, name)?;

            let is_encoder = invoke(
                env,
                h,
                "MediaCodecInfo.isEncoder",
                &info,
                MemberId::IsEncoder,
                ReturnType::Primitive(Primitive::Boolean),
                &[],
            )?
            .z()?;

            let types = object(
                env,
                h,
                "MediaCodecInfo.getSupportedTypes",
                &info,
                MemberId::GetSupportedTypes,
                &[],
            )?;
            let types = JObjectArray::from(types);
            let len = env.get_array_length(&types)?;
            let mut supported_types = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
            for i in 0..len {
                let element = env.get_object_array_element(&types, i)?;
                supported_types.push(java_string(env, element)?);
            }

            Ok(CodecInfo {
                name,
                is_encoder,
                supported_types,
            })
        })
    }

    fn profile_levels(&self, index: usize, mime: &str) -> PlatformResult<Vec<i32>> {
        const OP: &str = "MediaCodecInfo.getCapabilitiesForType";
        self.with_env(OP, |env, h| {
            let info = codec_info(env, h, index)?;
            let mime = env.new_string(mime)?;
            let capabilities = object(
                env,
                h,
                OP,
                &info,
                MemberId::GetCapabilitiesForType,
                &[JValue::Object(&mime).as_jni()],
            )?;

            let levels = field(env, h, OP, &capabilities, MemberId::ProfileLevels, ReturnType::Array)?.l()?;
            if levels.is_null() {
                return Ok(Vec::new());
            }
            let levels = JObjectArray::from(levels);
            let len = env.get_array_length(&levels)?;
            let mut profiles = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
            for i in 0..len {
                let level = env.get_object_array_element(&levels, i)?;
                profiles.push(field(env, h, OP, &level, MemberId::Profile, int())?.i()?);
                env.delete_local_ref(level)?;
            }
            Ok(profiles)
        })
    }

    fn create_video_format(&self, mime: &str, width: i32, height: i32) -> PlatformResult<GlobalRef> {
        self.create_format(
            "MediaFormat.createVideoFormat",
            MemberId::CreateVideoFormat,
            mime,
            width,
            height,
        )
    }

    fn create_audio_format(
        &self,
        mime: &str,
        sample_rate: i32,
        channel_count: i32,
    ) -> PlatformResult<GlobalRef> {
        self.create_format(
            "MediaFormat.createAudioFormat",
            MemberId::CreateAudioFormat,
            mime,
            sample_rate,
            channel_count,
        )
    }

    fn set_integer(&self, format: &GlobalRef, key: &str, value: i32) -> PlatformResult<()> {
        const OP: &str = "MediaFormat.setInteger";
        self.with_env(OP, |env, h| {
            let key = env.new_string(key)?;
            invoke(
                env,
                h,
                OP,
                format.as_obj(),
                MemberId::SetInteger,
                void(),
                &[JValue::Object(&key).as_jni(), JValue::Int(value).as_jni()],
            )?
            .v()?;
            Ok(())
        })
    }

    fn get_integer(&self, format: &GlobalRef, key: &str) -> PlatformResult<i32> {
        const OP: &str = "MediaFormat.getInteger";
        self.with_env(OP, |env, h| {
            let key = env.new_string(key)?;
            Ok(invoke(
                env,
                h,
                OP,
                format.as_obj(),
                MemberId::GetInteger,
                int(),
                &[JValue::Object(&key).as_jni()],
            )?
            .i()?)
        })
    }

    fn format_to_string(&self, format: &GlobalRef) -> PlatformResult<String> {
        const OP: &str = "MediaFormat.toString";
        self.with_env(OP, |env, h| {
            let text = object(env, h, OP, format.as_obj(), MemberId::ToString, &[])?;
            java_string(env, text)
        })
    }

    fn create_by_codec_name(&self, name: &str) -> PlatformResult<GlobalRef> {
        const OP: &str = "MediaCodec.createByCodecName";
        self.with_env(OP, |env, h| {
            let name = env.new_string(name)?;
            let codec = static_object(
                env,
                h,
                OP,
                ClassId::MediaCodec,
                MemberId::CreateByCodecName,
                &[JValue::Object(&name).as_jni()],
            )?;
            Ok(env.new_global_ref(codec)?)
        })
    }

    fn configure(
        &self,
        codec: &GlobalRef,
        format: &GlobalRef,
        surface: Option<&GlobalRef>,
    ) -> PlatformResult<()> {
        const OP: &str = "MediaCodec.configure";
        self.with_env(OP, |env, h| {
            let null = JObject::null();
            let surface = surface.map_or(&null, GlobalRef::as_obj);
            invoke(
                env,
                h,
                OP,
                codec.as_obj(),
                MemberId::Configure,
                void(),
                &[
                    JValue::Object(format.as_obj()).as_jni(),
                    JValue::Object(surface).as_jni(),
                    JValue::Object(&null).as_jni(),
                    JValue::Int(0).as_jni(),
                ],
            )?
            .v()?;
            Ok(())
        })
    }

    fn start(&self, codec: &GlobalRef) -> PlatformResult<()> {
        self.call_void("MediaCodec.start", codec, MemberId::Start)
    }

    fn stop(&self, codec: &GlobalRef) -> PlatformResult<()> {
        self.call_void("MediaCodec.stop", codec, MemberId::Stop)
    }

    fn flush(&self, codec: &GlobalRef) -> PlatformResult<()> {
        self.call_void("MediaCodec.flush", codec, MemberId::Flush)
    }

    fn release(&self, codec: &GlobalRef) -> PlatformResult<()> {
        self.call_void("MediaCodec.release", codec, MemberId::Release)
    }

    fn output_format(&self, codec: &GlobalRef) -> PlatformResult<GlobalRef> {
        self.call_object("MediaCodec.getOutputFormat", codec, MemberId::GetOutputFormat)
    }

    fn new_buffer_info(&self) -> PlatformResult<GlobalRef> {
        const OP: &str = "MediaCodec$BufferInfo.<init>";
        self.with_env(OP, |env, h| {
            let class = class(h, ClassId::BufferInfo, OP)?;
            let ctor = h
                .method(MemberId::BufferInfoCtor)
                .ok_or_else(|| unresolved(OP))?;
            // SAFETY: the constructor takes no arguments.
            let result = unsafe { env.new_object_unchecked(class, ctor, &[]) };
            let info = result.map_err(|e| raised(env, OP, e))?;
            Ok(env.new_global_ref(info)?)
        })
    }

    fn read_buffer_info(&self, info: &GlobalRef) -> PlatformResult<BufferInfoFields> {
        const OP: &str = "MediaCodec$BufferInfo";
        self.with_env(OP, |env, h| {
            let info = info.as_obj();
            Ok(BufferInfoFields {
                offset: field(env, h, OP, info, MemberId::Offset, int())?.i()?,
                size: field(env, h, OP, info, MemberId::Size, int())?.i()?,
                presentation_time_us: field(
                    env,
                    h,
                    OP,
                    info,
                    MemberId::PresentationTimeUs,
                    ReturnType::Primitive(Primitive::Long),
                )?
                .j()?,
            })
        })
    }

    fn input_buffers(&self, codec: &GlobalRef) -> PlatformResult<GlobalRef> {
        self.call_object("MediaCodec.getInputBuffers", codec, MemberId::GetInputBuffers)
    }

    fn output_buffers(&self, codec: &GlobalRef) -> PlatformResult<GlobalRef> {
        self.call_object("MediaCodec.getOutputBuffers", codec, MemberId::GetOutputBuffers)
    }

    fn array_element(&self, array: &GlobalRef, index: usize) -> PlatformResult<GlobalRef> {
        const OP: &str = "ByteBuffer[]";
        self.with_env(OP, |env, _| {
            let array = <&JObjectArray>::from(array.as_obj());
            let element = env
                .get_object_array_element(array, to_jint(index, OP)?)
                .map_err(|e| raised(env, OP, e))?;
            if element.is_null() {
                return Err(PlatformError::new(OP, format!("no buffer at {index}")));
            }
            Ok(env.new_global_ref(element)?)
        })
    }

    fn input_buffer(&self, codec: &GlobalRef, index: usize) -> PlatformResult<GlobalRef> {
        self.buffer_at("MediaCodec.getInputBuffer", codec, MemberId::GetInputBuffer, index)
    }

    fn output_buffer(&self, codec: &GlobalRef, index: usize) -> PlatformResult<GlobalRef> {
        self.buffer_at("MediaCodec.getOutputBuffer", codec, MemberId::GetOutputBuffer, index)
    }

    fn buffer_capacity(&self, buffer: &GlobalRef) -> PlatformResult<i64> {
        const OP: &str = "GetDirectBufferCapacity";
        self.with_env(OP, |env, _| {
            let buffer = <&JByteBuffer>::from(buffer.as_obj());
            match env.get_direct_buffer_capacity(buffer) {
                Ok(capacity) => Ok(i64::try_from(capacity).unwrap_or(i64::MAX)),
                // jni reports the -1 of a non-direct buffer as a failed call.
                Err(jni::errors::Error::JniCall(_)) => Ok(-1),
                Err(e) => Err(raised(env, OP, e)),
            }
        })
    }

    fn write_buffer(&self, buffer: &GlobalRef, data: &[u8]) -> PlatformResult<()> {
        const OP: &str = "GetDirectBufferAddress";
        self.with_env(OP, |env, _| {
            let buffer = <&JByteBuffer>::from(buffer.as_obj());
            let capacity = env.get_direct_buffer_capacity(buffer)?;
            if data.len() > capacity {
                return Err(PlatformError::new(
                    OP,
                    format!("{} bytes into a buffer of {capacity}", data.len()),
                ));
            }
            let address = env.get_direct_buffer_address(buffer)?;
            // SAFETY: the direct buffer holds `capacity` writable bytes and
            // the global reference keeps it alive for the copy.
            unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), address, data.len()) };
            Ok(())
        })
    }

    fn buffer_address(&self, buffer: &GlobalRef) -> PlatformResult<NonNull<u8>> {
        const OP: &str = "GetDirectBufferAddress";
        self.with_env(OP, |env, _| {
            let buffer = <&JByteBuffer>::from(buffer.as_obj());
            let address = env
                .get_direct_buffer_address(buffer)
                .map_err(|e| raised(env, OP, e))?;
            NonNull::new(address).ok_or_else(|| PlatformError::new(OP, "not a direct buffer"))
        })
    }

    fn dequeue_input_buffer(
        &self,
        codec: &GlobalRef,
        timeout: Duration,
    ) -> PlatformResult<Option<usize>> {
        const OP: &str = "MediaCodec.dequeueInputBuffer";
        self.with_env(OP, |env, h| {
            let index = invoke(
                env,
                h,
                OP,
                codec.as_obj(),
                MemberId::DequeueInputBuffer,
                int(),
                &[JValue::Long(timeout_micros(timeout)).as_jni()],
            )?
            .i()?;
            Ok(usize::try_from(index).ok())
        })
    }

    fn queue_input_buffer(
        &self,
        codec: &GlobalRef,
        index: usize,
        size: usize,
        presentation_time_us: i64,
        flags: i32,
    ) -> PlatformResult<()> {
        const OP: &str = "MediaCodec.queueInputBuffer";
        self.with_env(OP, |env, h| {
            invoke(
                env,
                h,
                OP,
                codec.as_obj(),
                MemberId::QueueInputBuffer,
                void(),
                &[
                    JValue::Int(to_jint(index, OP)?).as_jni(),
                    JValue::Int(0).as_jni(),
                    JValue::Int(to_jint(size, OP)?).as_jni(),
                    JValue::Long(presentation_time_us).as_jni(),
                    JValue::Int(flags).as_jni(),
                ],
            )?
            .v()?;
            Ok(())
        })
    }

    fn dequeue_output_buffer(
        &self,
        codec: &GlobalRef,
        info: &GlobalRef,
        timeout: Duration,
    ) -> PlatformResult<DequeuedOutput> {
        const OP: &str = "MediaCodec.dequeueOutputBuffer";
        self.with_env(OP, |env, h| {
            let status = invoke(
                env,
                h,
                OP,
                codec.as_obj(),
                MemberId::DequeueOutputBuffer,
                int(),
                &[
                    JValue::Object(info.as_obj()).as_jni(),
                    JValue::Long(timeout_micros(timeout)).as_jni(),
                ],
            )?
            .i()?;
            Ok(DequeuedOutput::from_status(status))
        })
    }

    fn release_output_buffer(
        &self,
        codec: &GlobalRef,
        index: usize,
        render: bool,
    ) -> PlatformResult<()> {
        const OP: &str = "MediaCodec.releaseOutputBuffer";
        self.with_env(OP, |env, h| {
            invoke(
                env,
                h,
                OP,
                codec.as_obj(),
                MemberId::ReleaseOutputBuffer,
                void(),
                &[
                    JValue::Int(to_jint(index, OP)?).as_jni(),
                    JValue::Bool(jboolean::from(render)).as_jni(),
                ],
            )?
            .v()?;
            Ok(())
        })
    }
}
