//! Android JNI test harness for droidcodec.
//!
//! This crate is only compiled for Android targets.
//! To build: cargo ndk -t arm64-v8a build -p droidcodec-test-android
//!
//! Add new tests by:
//! 1. Adding a JNI function here
//! 2. Adding the matching native declaration in MainActivity.kt

#![cfg(target_os = "android")]
#![allow(non_snake_case)]

use droidcodec_codec::sys::android::JniCodecService;
use droidcodec_codec::{
    Blacklist, CodecError, InputStatus, MediaCodecSession, OutputEvent, PlatformCodecService,
    PlatformResult, StartArgs, VideoArgs, decoder_name_for,
};
use jni::JNIEnv;
use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jint, jstring};
use log::LevelFilter;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(10);
const DRAIN_ATTEMPTS: usize = 100;

fn service(env: &JNIEnv) -> Result<Arc<JniCodecService>, CodecError> {
    let vm = env
        .get_java_vm()
        .map_err(|e| CodecError::EnvironmentUnavailable(e.to_string()))?;
    JniCodecService::new(vm).map(Arc::new)
}

fn error_code(err: &CodecError) -> jint {
    log::error!("{err}");
    match err {
        CodecError::InitializationFailed(_) => -1,
        CodecError::EnvironmentUnavailable(_) => -2,
        CodecError::NotStarted | CodecError::AlreadyStarted => -3,
        CodecError::InvalidBuffer(_) => -4,
        CodecError::Unsupported(_) => -5,
        CodecError::Platform(_) => -6,
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Route `log` output to logcat.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_droidcodec_test_MainActivity_initLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("droidcodec"),
    );
}

// ============================================================================
// Decoder Selection Tests
// ============================================================================

/// Name of the hardware decoder for `mime`, or null.
/// `profile` is an H.264 `profile_idc`, 0 for any.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_droidcodec_test_MainActivity_testFindDecoder(
    mut env: JNIEnv,
    _class: JClass,
    mime: JString,
    profile: jint,
) -> jstring {
    let Ok(mime) = env.get_string(&mime).map(String::from) else {
        return std::ptr::null_mut();
    };

    let found = service(&env).and_then(|service| {
        decoder_name_for(
            &*service,
            &mime,
            u32::try_from(profile).ok(),
            &Blacklist::default(),
        )
    });

    match found {
        Ok(Some(name)) => env
            .new_string(name)
            .map_or(std::ptr::null_mut(), |name| name.into_raw()),
        Ok(None) => std::ptr::null_mut(),
        Err(e) => {
            error_code(&e);
            std::ptr::null_mut()
        }
    }
}

/// Run calls that make Java throw and check that none leaves an exception
/// pending. Returns the number of failed calls, or a negative error code if a
/// call succeeded or an exception was left behind.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_droidcodec_test_MainActivity_testFailuresClearExceptions(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    let service = match service(&env) {
        Ok(service) => service,
        Err(e) => return error_code(&e),
    };
    let count = match service.codec_count() {
        Ok(count) => count,
        Err(e) => return error_code(&CodecError::from(e)),
    };

    let outcomes: [(&str, PlatformResult<()>); 3] = [
        (
            "createByCodecName",
            service.create_by_codec_name("droidcodec.missing").map(drop),
        ),
        ("getCodecInfoAt", service.codec_info_at(count).map(drop)),
        (
            "getCapabilitiesForType",
            service.profile_levels(count, "video/avc").map(drop),
        ),
    ];

    let mut failed = 0;
    for (name, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                log::error!("{name} unexpectedly succeeded");
                return -7;
            }
            Err(e) => log::info!("{name} failed as expected: {e}"),
        }
        if env.exception_check().unwrap_or(true) {
            log::error!("{name} left a Java exception pending");
            let _ = env.exception_clear();
            return -8;
        }
        failed += 1;
    }
    failed
}

// ============================================================================
// Decode Tests
// ============================================================================

/// Open a video decoder without a surface, feed `config` as codec config and
/// `frame` as the first access unit, then drain.
/// Returns the number of decoded buffers, or a negative error code.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_droidcodec_test_MainActivity_testDecodeVideo(
    mut env: JNIEnv,
    _class: JClass,
    mime: JString,
    width: jint,
    height: jint,
    config: JByteArray,
    frame: JByteArray,
) -> jint {
    let Ok(mime) = env.get_string(&mime).map(String::from) else {
        return -2;
    };
    let (Ok(config), Ok(frame)) = (
        env.convert_byte_array(&config),
        env.convert_byte_array(&frame),
    ) else {
        return -2;
    };

    match decode_video(&env, &mime, width, height, &config, &frame) {
        Ok(decoded) => jint::try_from(decoded).unwrap_or(jint::MAX),
        Err(e) => error_code(&e),
    }
}

fn decode_video(
    env: &JNIEnv,
    mime: &str,
    width: i32,
    height: i32,
    config: &[u8],
    frame: &[u8],
) -> Result<usize, CodecError> {
    let service = service(env)?;
    let name = decoder_name_for(&*service, mime, None, &Blacklist::default())?
        .ok_or_else(|| CodecError::Unsupported(mime.to_string()))?;
    log::info!("decoding {mime} with {name}");

    let mut session = MediaCodecSession::new(service);
    session.start(&name, mime, StartArgs::Video(VideoArgs::new(width, height)))?;

    let mut pending: Vec<(&[u8], bool)> = vec![(config, true), (frame, false)];
    pending.retain(|(data, _)| !data.is_empty());
    pending.reverse();

    let mut decoded = 0;
    for _ in 0..DRAIN_ATTEMPTS {
        if let Some(&(data, is_config)) = pending.last() {
            if session.put_input(data, 0, is_config, TIMEOUT)? == InputStatus::Queued {
                pending.pop();
            }
        }

        match session.get_output(TIMEOUT)? {
            OutputEvent::Buffer(buffer) => {
                log::info!(
                    "decoded buffer {} ({} bytes)",
                    buffer.index,
                    buffer.data.map_or(0, |data| data.len())
                );
                session.release_output(buffer.index, false)?;
                decoded += 1;
            }
            OutputEvent::FormatChanged(format) => log::info!("output format {format:?}"),
            OutputEvent::BuffersChanged | OutputEvent::NotReady => {}
        }

        if pending.is_empty() && decoded > 0 {
            break;
        }
    }

    session.stop()?;
    Ok(decoded)
}
