use crate::api::gl::{self, GLenum};
use std::{fmt, mem, num::NonZeroU32};

/// An opaque object name returned by the driver.
///
/// Zero is never a valid name, so `Option<RawHandle>` is the same size as a `u32` and `None`
/// plays the part of the GL "null object".
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct RawHandle(NonZeroU32);

impl RawHandle {
    pub fn new(name: u32) -> Option<RawHandle> {
        NonZeroU32::new(name).map(RawHandle)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kinds of driver objects.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ObjectKind {
    Buffer,
    /// A shader stage object. The payload is the stage enum (`VERTEX_SHADER` or `FRAGMENT_SHADER`).
    Shader(GLenum),
    Program,
    Texture,
    Renderbuffer,
    Framebuffer,
}

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Buffer => "buffer",
            ObjectKind::Shader(gl::VERTEX_SHADER) => "vertex shader",
            ObjectKind::Shader(gl::FRAGMENT_SHADER) => "fragment shader",
            ObjectKind::Shader(_) => "shader",
            ObjectKind::Program => "program",
            ObjectKind::Texture => "texture",
            ObjectKind::Renderbuffer => "renderbuffer",
            ObjectKind::Framebuffer => "framebuffer",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A driver object name with unique ownership.
///
/// Holds `None` before creation and after release. Unlike a plain `RawHandle`, the name can be
/// taken out only once, which is what makes deletion happen exactly once.
pub(crate) struct UniqueHandle {
    kind: ObjectKind,
    raw: Option<RawHandle>,
}

impl UniqueHandle {
    pub(crate) fn new(kind: ObjectKind, raw: RawHandle) -> UniqueHandle {
        UniqueHandle {
            kind,
            raw: Some(raw),
        }
    }

    pub(crate) fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Returns the name, or `None` if it was released.
    pub(crate) fn get(&self) -> Option<RawHandle> {
        self.raw
    }

    pub(crate) fn is_null(&self) -> bool {
        self.raw.is_none()
    }

    /// Releases the name. Returns `None` if it was already released.
    pub(crate) fn take(&mut self) -> Option<RawHandle> {
        mem::replace(&mut self.raw, None)
    }
}

impl fmt::Debug for UniqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.raw {
            Some(raw) => write!(f, "{}{:?}", self.kind, raw),
            None => write!(f, "{}(null)", self.kind),
        }
    }
}
