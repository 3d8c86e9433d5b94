//! C-compatible entry points for hosts that load the library directly.
//!
//! Requests cross as null-terminated UTF-8 strings. The reply is a JSON
//! payload `{"success": bool, "content"?: string, "error"?: string}` in a
//! string the callee allocates; the caller owns it and must hand it back to
//! [`free_string`] once parsed.

use crate::edit;
use serde::{Deserialize, Serialize};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// JSON reply of [`edit_replace_ffi`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplaceResponse {
    pub fn from_result(result: Result<edit::Replacement, edit::EditError>) -> Self {
        match result {
            Ok(replacement) => Self {
                success: true,
                content: Some(replacement.content),
                error: None,
            },
            Err(err) => Self {
                success: false,
                content: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// The payload [`edit_replace_ffi`] returns, without the pointer handling.
pub fn replace_json(content: &str, old_string: &str, new_string: &str, replace_all: bool) -> String {
    let response =
        ReplaceResponse::from_result(edit::replace(content, old_string, new_string, replace_all));
    // a struct of strings and a bool always serializes
    serde_json::to_string(&response).unwrap_or_default()
}

/// # Safety
/// Each pointer must be null or a valid null-terminated C string that stays
/// alive for the duration of the call. Returns null if any pointer is null or
/// not UTF-8; otherwise the returned string must be released with
/// [`free_string`].
#[no_mangle]
pub unsafe extern "C" fn edit_replace_ffi(
    content: *const c_char,
    old_string: *const c_char,
    new_string: *const c_char,
    replace_all: bool,
) -> *mut c_char {
    let (Some(content), Some(old_string), Some(new_string)) = (
        unsafe { borrow_str(content) },
        unsafe { borrow_str(old_string) },
        unsafe { borrow_str(new_string) },
    ) else {
        return ptr::null_mut();
    };

    let json = replace_json(content, old_string, new_string, replace_all);
    CString::new(json)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// # Safety
/// `s` must be null or a pointer previously returned by this library and not
/// yet freed.
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

unsafe fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(content: &str, old: &str, new: &str, replace_all: bool) -> ReplaceResponse {
        let content = CString::new(content).unwrap();
        let old = CString::new(old).unwrap();
        let new = CString::new(new).unwrap();
        unsafe {
            let raw = edit_replace_ffi(content.as_ptr(), old.as_ptr(), new.as_ptr(), replace_all);
            assert!(!raw.is_null());
            let json = CStr::from_ptr(raw).to_str().unwrap().to_owned();
            free_string(raw);
            serde_json::from_str(&json).unwrap()
        }
    }

    #[test]
    fn test_success_payload() {
        let response = call("Hello world", "world", "Rust", false);
        assert!(response.success);
        assert_eq!(response.content.as_deref(), Some("Hello Rust"));
        assert_eq!(response.error, None);
    }

    #[test]
    fn test_error_payload() {
        let response = call("foo bar foo", "foo", "x", false);
        assert!(!response.success);
        assert_eq!(response.content, None);
        assert_eq!(
            response.error.as_deref(),
            Some("Found 2 matches for oldString. Provide more surrounding lines in oldString to identify the correct match.")
        );
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let json = replace_json("abc", "abc", "abc", false);
        assert_eq!(
            json,
            r#"{"success":false,"error":"oldString and newString must be different"}"#
        );
    }

    #[test]
    fn test_null_input_returns_null() {
        let old = CString::new("a").unwrap();
        let raw = unsafe { edit_replace_ffi(ptr::null(), old.as_ptr(), old.as_ptr(), false) };
        assert!(raw.is_null());
        unsafe { free_string(raw) };
    }

    #[test]
    fn test_invalid_utf8_returns_null() {
        let bad = [0xffu8, 0xfe, 0x00];
        let ok = CString::new("a").unwrap();
        let raw = unsafe {
            edit_replace_ffi(bad.as_ptr().cast::<c_char>(), ok.as_ptr(), ok.as_ptr(), false)
        };
        assert!(raw.is_null());
    }
}
