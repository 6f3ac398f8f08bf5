//! JNI bindings for Android

use std::sync::Arc;

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{jfloat, jfloatArray, jlong, jstring};
use jni::{JNIEnv, JavaVM};
use tracing::warn;

use motion_core::{Direction, GestureEvent, MotionObserver, Movement};

use crate::error::PlatformError;
use crate::session::MotionSession;

/// Borrow the session behind a handle returned by `nativeInit`.
///
/// # Safety
///
/// `handle` must be zero or a live pointer from `nativeInit` that has not
/// been passed to `nativeDestroy`.
unsafe fn session<'a>(handle: jlong) -> Result<&'a MotionSession, PlatformError> {
    if handle == 0 {
        return Err(PlatformError::InvalidParameter("Invalid handle".to_string()));
    }
    Ok(&*(handle as *const MotionSession))
}

fn throw(env: &mut JNIEnv, e: &PlatformError) {
    let _ = env.throw_new(e.exception_class(), e.to_string());
}

fn new_jstring(env: &mut JNIEnv, value: Result<String, PlatformError>) -> jstring {
    let result = value.and_then(|s| Ok(env.new_string(s)?.into_raw()));
    match result {
        Ok(s) => s,
        Err(e) => {
            throw(env, &e);
            std::ptr::null_mut()
        }
    }
}

// ============================================================================
// Event Handler
// ============================================================================

/// Calls back into a Java `MotionLibEventHandler` from the processing thread.
struct JniObserver {
    vm: JavaVM,
    handler: GlobalRef,
}

impl JniObserver {
    fn call(&self, method: &str, label: &str) {
        // The processing thread stays attached for its lifetime.
        let mut env = match self.vm.attach_current_thread_as_daemon() {
            Ok(env) => env,
            Err(e) => {
                warn!(error = %e, "cannot attach processing thread to the JVM");
                return;
            }
        };
        let result = env.new_string(label).and_then(|value| {
            env.call_method(
                &self.handler,
                method,
                "(Ljava/lang/String;)V",
                &[JValue::Object(&value)],
            )
        });
        if let Err(e) = result {
            warn!(method, error = %e, "event handler call failed");
            if env.exception_check().unwrap_or(false) {
                let _ = env.exception_clear();
            }
        }
    }
}

impl MotionObserver for JniObserver {
    fn on_direction_changed(&self, direction: Direction) {
        self.call("onDirectionChanged", direction.label());
    }

    fn on_movement_detected(&self, movement: Movement) {
        self.call("onMovementDetected", movement.label());
    }

    fn on_gesture_detected(&self, gesture: &GestureEvent) {
        self.call("onGestureDetected", &gesture.name);
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Create the engine; returns a handle to the MotionSession instance.
#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativeInit(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
    gesture_toml: JString,
) -> jlong {
    let result = || -> Result<jlong, PlatformError> {
        let config: String = env.get_string(&config_json)?.into();
        let gestures: String = env.get_string(&gesture_toml)?.into();
        let session = MotionSession::new(&config, &gestures)?;
        Ok(Box::into_raw(Box::new(session)) as jlong)
    }();

    match result {
        Ok(handle) => handle,
        Err(e) => {
            throw(&mut env, &e);
            0
        }
    }
}

/// Terminate the engine and free the MotionSession instance.
#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativeDestroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        unsafe {
            let _ = Box::from_raw(handle as *mut MotionSession);
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativeResume(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    let result = unsafe { session(handle) }.and_then(MotionSession::resume);
    if let Err(e) = result {
        throw(&mut env, &e);
    }
}

#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativePause(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    let result = unsafe { session(handle) }.and_then(MotionSession::pause);
    if let Err(e) = result {
        throw(&mut env, &e);
    }
}

// ============================================================================
// Samples and Queries
// ============================================================================

/// Forward one accelerometer event from the Java sensor listener.
#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativeFeedSample(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    x: jfloat,
    y: jfloat,
    z: jfloat,
) {
    let result = unsafe { session(handle) }.and_then(|s| s.feed(x, y, z));
    if let Err(e) = result {
        throw(&mut env, &e);
    }
}

/// Returns the filtered reading as `float[3]`.
#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativeGetLastMeterReadings(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jfloatArray {
    let result = || -> Result<jfloatArray, PlatformError> {
        let readings = unsafe { session(handle) }?.last_readings()?;
        let array = env.new_float_array(3)?;
        env.set_float_array_region(&array, 0, &readings)?;
        Ok(array.into_raw())
    }();

    match result {
        Ok(array) => array,
        Err(e) => {
            throw(&mut env, &e);
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativeGetLastDirection(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let value = unsafe { session(handle) }.and_then(MotionSession::direction_label);
    new_jstring(&mut env, value)
}

#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativeGetLastMovement(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let value = unsafe { session(handle) }.and_then(MotionSession::movement_label);
    new_jstring(&mut env, value)
}

/// Returns the last gesture name, or an empty string.
#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativeGetLastGesture(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let value = unsafe { session(handle) }.and_then(MotionSession::gesture_label);
    new_jstring(&mut env, value)
}

/// Install a `MotionLibEventHandler`, or remove it when `handler` is null.
#[no_mangle]
pub extern "system" fn Java_net_qfstudio_motion_MotionLib_nativeSetHandler(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    handler: JObject,
) {
    let result = || -> Result<(), PlatformError> {
        let session = unsafe { session(handle) }?;
        if handler.is_null() {
            return session.set_observer(None);
        }
        let observer = JniObserver {
            vm: env.get_java_vm()?,
            handler: env.new_global_ref(&handler)?,
        };
        session.set_observer(Some(Arc::new(observer)))
    }();

    if let Err(e) = result {
        throw(&mut env, &e);
    }
}
