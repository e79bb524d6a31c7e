//! [`ManagedRuntime`] over the Android JVM
//!
//! Engine classes live in the application's APK, which the system class
//! loader cannot see from a native thread. Classes are therefore loaded
//! through the activity's own class loader.
#![expect(
    unsafe_code,
    reason = "JavaVM and activity pointers come from the host across the JNI boundary"
)]

use super::managed::{ManagedRuntime, StaticCallError};
use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::{JNIEnv, JavaVM};
use libbridge_config::ManagedEntryPoint;

const LOCAL_FRAME_CAPACITY: i32 = 16;

pub struct JniRuntime {
    vm: JavaVM,
    activity: GlobalRef,
}

impl JniRuntime {
    pub fn new(vm: JavaVM, activity: GlobalRef) -> Self {
        Self { vm, activity }
    }

    /// Build from the raw pointers handed out by the host engine
    ///
    /// # Safety
    ///
    /// `vm` must point to the process's live `JavaVM` and `activity` must be a
    /// valid reference to the application's activity object.
    pub unsafe fn from_raw(
        vm: *mut jni::sys::JavaVM,
        activity: jni::sys::jobject,
    ) -> jni::errors::Result<Self> {
        // SAFETY: upheld by the caller.
        let vm = unsafe { JavaVM::from_raw(vm)? };
        let activity = {
            let env = vm.attach_current_thread()?;
            // SAFETY: upheld by the caller; the global ref keeps it alive past this frame.
            let local = unsafe { JObject::from_raw(activity) };
            env.new_global_ref(&local)?
        };
        Ok(Self::new(vm, activity))
    }

    fn env(&self) -> Result<JNIEnv<'_>, String> {
        self.vm.get_env().map_err(|e| e.to_string())
    }
}

impl ManagedRuntime for JniRuntime {
    fn attach_current_thread(&self) -> Result<(), String> {
        self.vm
            .attach_current_thread_permanently()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn detach_current_thread(&self) {
        // SAFETY: only called on the 1→0 transition, after every managed call
        // made under the attachment has returned. All local references were
        // created inside local frames that have already been popped.
        unsafe { self.vm.detach_current_thread() }
    }

    fn take_pending_exception(&self) -> Option<String> {
        let mut env = self.env().ok()?;
        describe_pending_exception(&mut env)
    }

    fn call_static_void(&self, entry: &ManagedEntryPoint) -> Result<(), StaticCallError> {
        // Only the thread that made the first attach is registered with the VM
        let mut env = self.env().map_err(StaticCallError::Detached)?;
        let activity = self.activity.as_obj();

        env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| -> Result<(), StaticCallError> {
            let class = load_class(env, activity, &entry.class)
                .map_err(|e| lookup_failure(env, e))?;

            env.get_static_method_id(&class, entry.method.as_str(), entry.signature.as_str())
                .map_err(|e| lookup_failure(env, e))?;

            // A Java exception from the call stays pending for the bridge to report
            match env.call_static_method(&class, entry.method.as_str(), entry.signature.as_str(), &[])
            {
                Ok(_) | Err(jni::errors::Error::JavaException) => Ok(()),
                Err(e) => Err(StaticCallError::NotFound(e.to_string())),
            }
        })
    }
}

impl From<jni::errors::Error> for StaticCallError {
    fn from(err: jni::errors::Error) -> Self {
        StaticCallError::NotFound(err.to_string())
    }
}

fn load_class<'local>(
    env: &mut JNIEnv<'local>,
    activity: &JObject<'_>,
    name: &str,
) -> jni::errors::Result<JClass<'local>> {
    let loader = env
        .call_method(activity, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])?
        .l()?;
    let class_name = env.new_string(name)?;
    let class = env
        .call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&class_name)],
        )?
        .l()?;
    Ok(JClass::from(class))
}

/// Prefer the managed exception's description over the generic JNI error
fn lookup_failure(env: &mut JNIEnv<'_>, err: jni::errors::Error) -> StaticCallError {
    StaticCallError::NotFound(describe_pending_exception(env).unwrap_or_else(|| err.to_string()))
}

/// Check for, read, and clear the pending exception
fn describe_pending_exception(env: &mut JNIEnv<'_>) -> Option<String> {
    if !env.exception_check().unwrap_or(false) {
        return None;
    }

    let description = env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| -> jni::errors::Result<String> {
        let throwable = env.exception_occurred()?;
        env.exception_clear()?;
        let text = env
            .call_method(&throwable, "toString", "()Ljava/lang/String;", &[])?
            .l()?;
        let text = JString::from(text);
        let text: String = env.get_string(&text)?.into();
        Ok(text)
    });

    // toString itself may have thrown
    let _ = env.exception_clear();
    Some(description.unwrap_or_else(|e| format!("<unreadable exception: {}>", e)))
}
