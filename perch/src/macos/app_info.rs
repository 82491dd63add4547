use objc2::rc::Retained;
use objc2_app_kit::NSRunningApplication;
use objc2_foundation::NSString;

/// Bundle identifier of the app owning `pid`, when one is known.
pub fn get_bundle_id_for_pid(pid: i32) -> Option<String> {
    let app: Retained<NSRunningApplication> = unsafe {
        NSRunningApplication::runningApplicationWithProcessIdentifier(pid as libc::pid_t)
    }?;
    let bundle_id: Retained<NSString> = unsafe { app.bundleIdentifier() }?;
    Some(bundle_id.to_string())
}
