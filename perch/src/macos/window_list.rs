use core_foundation::{
    array::CFArray, base::TCFType, dictionary::CFDictionary, number::CFNumber, string::CFString,
};
use core_graphics::window::{
    kCGNullWindowID, kCGWindowListOptionOnScreenOnly, CGWindowListCopyWindowInfo,
};

use crate::platform::{Bounds, RawWindow};

use super::get_bundle_id_for_pid;

/// Every on-screen window the window server reports, unfiltered. The caller
/// picks out the status bar levels.
pub fn raw_on_screen_windows() -> Vec<RawWindow> {
    let window_list: CFArray = unsafe {
        CFArray::wrap_under_create_rule(CGWindowListCopyWindowInfo(
            kCGWindowListOptionOnScreenOnly,
            kCGNullWindowID,
        ))
    };

    let mut windows = Vec::new();

    for i in 0..window_list.len() {
        let dict_ptr = unsafe { *window_list.get_unchecked(i) };
        let dict: CFDictionary = unsafe { CFDictionary::wrap_under_get_rule(dict_ptr as *const _) };

        let Some(window) = parse_raw_window(&dict) else {
            continue;
        };

        windows.push(window);
    }

    windows
}

fn parse_raw_window(dict: &CFDictionary) -> Option<RawWindow> {
    let owner_pid = get_number(dict, "kCGWindowOwnerPID")?.to_i32()?;
    let window_id = get_number(dict, "kCGWindowNumber")?.to_i32()? as u32;
    let layer = get_number(dict, "kCGWindowLayer")?.to_i32()?;
    let owner_name = get_string(dict, "kCGWindowOwnerName")?;
    let bounds = parse_bounds(dict, "kCGWindowBounds")?;
    let bundle_id = get_bundle_id_for_pid(owner_pid);

    Some(RawWindow {
        owner_name,
        owner_pid,
        window_id,
        layer,
        bounds,
        bundle_id,
    })
}

fn get_number(dict: &CFDictionary, key: &str) -> Option<CFNumber> {
    let key = CFString::new(key);
    unsafe {
        let value = dict.find(key.as_concrete_TypeRef() as *const _)?;
        Some(CFNumber::wrap_under_get_rule(*value as *const _))
    }
}

fn get_string(dict: &CFDictionary, key: &str) -> Option<String> {
    let key = CFString::new(key);
    unsafe {
        let value = dict.find(key.as_concrete_TypeRef() as *const _)?;
        let cf_str = CFString::wrap_under_get_rule(*value as *const _);
        Some(cf_str.to_string())
    }
}

fn parse_bounds(dict: &CFDictionary, key: &str) -> Option<Bounds> {
    let key = CFString::new(key);
    unsafe {
        let value = dict.find(key.as_concrete_TypeRef() as *const _)?;
        let bounds_dict = CFDictionary::wrap_under_get_rule(*value as *const _);

        let x = get_number(&bounds_dict, "X")?.to_f64()?;
        let y = get_number(&bounds_dict, "Y")?.to_f64()?;
        let width = get_number(&bounds_dict, "Width")?.to_f64()?;
        let height = get_number(&bounds_dict, "Height")?.to_f64()?;

        Some(Bounds {
            x,
            y,
            width,
            height,
        })
    }
}
