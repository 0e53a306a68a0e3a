//! Name lookup for GL enums.
use crate::api::gl::{self, GLenum};

/// Returns the value of the GL enum with the given name.
///
/// Accepts both bare names (`"TEXTURE_2D"`) and prefixed ones (`"GL.TEXTURE_2D"`, `"GL_TEXTURE_2D"`).
pub fn gl_get(name: &str) -> Option<GLenum> {
    let name = name
        .strip_prefix("GL.")
        .or_else(|| name.strip_prefix("GL_"))
        .unwrap_or(name);
    gl::ENUM_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, v)| v)
}

/// Returns the name of a GL enum value.
///
/// Several enums share a value (e.g. `POINTS` and `NONE`); the first declared one wins.
pub fn gl_name(value: GLenum) -> Option<&'static str> {
    gl::ENUM_TABLE
        .iter()
        .find(|&&(_, v)| v == value)
        .map(|&(n, _)| n)
}

/// Formats an enum value for diagnostics: its name if known, the hex value otherwise.
pub(crate) fn describe(value: GLenum) -> String {
    match gl_name(value) {
        Some(name) => name.to_string(),
        None => format!("{:#06x}", value),
    }
}
