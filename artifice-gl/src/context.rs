//! Context and bind-point state.
use crate::{
    api::{get::describe, gl, gl::GLenum, Driver, ParameterValue},
    error::{Error, GlResult},
    format::TextureFormat,
    handle::{ObjectKind, RawHandle, UniqueHandle},
};
use slotmap::{new_key_type, SlotMap};
use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
};
use tracing::trace;

new_key_type! {
    /// Identifies the storage of a texture or renderbuffer in its context.
    pub struct ImageId;
    /// Identifies a buffer in its context.
    pub struct BufferId;
}

/// Context-side description of a texture or renderbuffer, shared by everything that
/// references it by `ImageId` (framebuffer attachments).
#[derive(Clone, Debug)]
pub(crate) struct ImageRecord {
    pub(crate) handle: RawHandle,
    pub(crate) format: TextureFormat,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) mip_levels: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct BufferRecord {
    pub(crate) handle: RawHandle,
    pub(crate) byte_length: usize,
}

/// The last object bound to each bind point through this context.
///
/// Wrappers bind what they need right before using it and leave it bound; nothing is restored.
#[derive(Clone, Debug, Default)]
struct BindState {
    array_buffer: Option<RawHandle>,
    element_array_buffer: Option<RawHandle>,
    program: Option<RawHandle>,
    framebuffer: Option<RawHandle>,
    renderbuffer: Option<RawHandle>,
    texture_2d: Option<RawHandle>,
    texture_cube: Option<RawHandle>,
}

/// Options for creating a context.
#[derive(Clone, Debug, Default)]
pub struct ContextCreateInfo {
    /// Name, for debugging purposes.
    pub label: String,
    /// Whether to emit a trace event for every bind call.
    pub trace_calls: bool,
}

/// Fixed-function state that can be set as a group. Unset fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextParameters {
    /// `[x, y, width, height]`
    pub viewport: Option<[i32; 4]>,
    pub clear_color: Option<[f32; 4]>,
    pub clear_depth: Option<f32>,
    pub clear_stencil: Option<i32>,
    pub depth_test: Option<bool>,
    pub blend: Option<bool>,
    pub cull_face: Option<bool>,
    pub scissor_test: Option<bool>,
}

pub(crate) struct ContextInner {
    label: String,
    trace_calls: bool,
    driver: RefCell<Box<dyn Driver>>,
    bindings: RefCell<BindState>,
    images: RefCell<SlotMap<ImageId, ImageRecord>>,
    buffers: RefCell<SlotMap<BufferId, BufferRecord>>,
}

/// A graphics context.
///
/// Every object is created against exactly one context and keeps a weak reference to it: dropping
/// the last `Context` clone makes every remaining object fail with [`Error::ContextLost`]. The
/// context and all objects are confined to the thread that created them (`Rc`-based, neither
/// `Send` nor `Sync`), which is the threading contract of the native APIs.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("label", &self.inner.label)
            .field("bindings", &*self.inner.bindings.borrow())
            .finish()
    }
}

impl Context {
    pub fn new(driver: impl Driver + 'static) -> Context {
        Context::with_create_info(driver, ContextCreateInfo::default())
    }

    pub fn with_create_info(driver: impl Driver + 'static, create_info: ContextCreateInfo) -> Context {
        trace!(label = create_info.label.as_str(), "create_context");
        Context {
            inner: Rc::new(ContextInner {
                label: create_info.label,
                trace_calls: create_info.trace_calls,
                driver: RefCell::new(Box::new(driver)),
                bindings: RefCell::new(BindState::default()),
                images: RefCell::new(SlotMap::with_key()),
                buffers: RefCell::new(SlotMap::with_key()),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &Rc<ContextInner> {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> ContextRef {
        ContextRef(Rc::downgrade(&self.inner))
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Polls the driver for context loss.
    pub fn is_lost(&self) -> bool {
        self.inner.driver.borrow().is_context_lost()
    }

    //----------------------------------------------------------------------------------------------
    // bind state

    /// Returns the buffer last bound to `ARRAY_BUFFER` or `ELEMENT_ARRAY_BUFFER`.
    pub fn current_buffer(&self, target: GLenum) -> Option<RawHandle> {
        let b = self.inner.bindings.borrow();
        match target {
            gl::ARRAY_BUFFER => b.array_buffer,
            gl::ELEMENT_ARRAY_BUFFER => b.element_array_buffer,
            _ => None,
        }
    }

    pub fn current_program(&self) -> Option<RawHandle> {
        self.inner.bindings.borrow().program
    }

    pub fn current_framebuffer(&self) -> Option<RawHandle> {
        self.inner.bindings.borrow().framebuffer
    }

    pub fn current_renderbuffer(&self) -> Option<RawHandle> {
        self.inner.bindings.borrow().renderbuffer
    }

    /// Returns the texture last bound to `TEXTURE_2D` or `TEXTURE_CUBE_MAP`.
    pub fn current_texture(&self, target: GLenum) -> Option<RawHandle> {
        let b = self.inner.bindings.borrow();
        match target {
            gl::TEXTURE_2D => b.texture_2d,
            gl::TEXTURE_CUBE_MAP => b.texture_cube,
            _ => None,
        }
    }

    //----------------------------------------------------------------------------------------------
    // parameter queries

    /// Queries a context-wide parameter (`MAX_TEXTURE_SIZE`, `VERSION`, ...).
    pub fn get_parameter(&self, pname: GLenum) -> GlResult<ParameterValue> {
        self.inner.check_lost()?;
        self.inner.driver().get_parameter(pname).ok_or_else(|| {
            Error::InvalidParameter(format!("unknown parameter {}", describe(pname)))
        })
    }

    fn get_limit(&self, pname: GLenum) -> GlResult<u32> {
        let value = self.get_parameter(pname)?;
        value
            .as_int()
            .map(|v| v.max(0) as u32)
            .ok_or_else(|| {
                Error::InvalidParameter(format!("{} is not an integer parameter", describe(pname)))
            })
    }

    pub fn max_texture_size(&self) -> GlResult<u32> {
        self.get_limit(gl::MAX_TEXTURE_SIZE)
    }

    pub fn max_cube_map_texture_size(&self) -> GlResult<u32> {
        self.get_limit(gl::MAX_CUBE_MAP_TEXTURE_SIZE)
    }

    pub fn max_renderbuffer_size(&self) -> GlResult<u32> {
        self.get_limit(gl::MAX_RENDERBUFFER_SIZE)
    }

    pub fn max_vertex_attribs(&self) -> GlResult<u32> {
        self.get_limit(gl::MAX_VERTEX_ATTRIBS)
    }

    pub fn max_color_attachments(&self) -> GlResult<u32> {
        self.get_limit(gl::MAX_COLOR_ATTACHMENTS)
    }

    pub fn version(&self) -> GlResult<String> {
        match self.get_parameter(gl::VERSION)? {
            ParameterValue::String(s) => Ok(s),
            other => Err(Error::InvalidParameter(format!(
                "VERSION returned a non-string value: {:?}",
                other
            ))),
        }
    }

    pub fn has_extension(&self, name: &str) -> GlResult<bool> {
        self.inner.check_lost()?;
        Ok(self.inner.driver().has_extension(name))
    }

    /// Whether instanced draws and attribute divisors are available (core in WebGL 2 / GLES 3,
    /// `ANGLE_instanced_arrays` otherwise).
    pub fn supports_instancing(&self) -> GlResult<bool> {
        self.inner.check_lost()?;
        Ok(self.inner.supports_instancing())
    }

    /// Whether float formats are color-renderable (`EXT_color_buffer_float`).
    pub fn supports_float_color_buffers(&self) -> GlResult<bool> {
        self.has_extension("EXT_color_buffer_float")
    }

    //----------------------------------------------------------------------------------------------
    // fixed-function state

    /// Applies every field of `params` that is set.
    pub fn set_parameters(&self, params: &ContextParameters) -> GlResult<()> {
        self.inner.check_lost()?;
        if let Some([_, _, w, h]) = params.viewport {
            if w < 0 || h < 0 {
                return Err(Error::InvalidParameter(format!(
                    "negative viewport size {}x{}",
                    w, h
                )));
            }
        }
        let mut driver = self.inner.driver();
        if let Some([x, y, w, h]) = params.viewport {
            driver.viewport(x, y, w as u32, h as u32);
        }
        if let Some(c) = params.clear_color {
            driver.clear_color(c);
        }
        if let Some(d) = params.clear_depth {
            driver.clear_depth(d);
        }
        if let Some(s) = params.clear_stencil {
            driver.clear_stencil(s);
        }
        let caps = [
            (gl::DEPTH_TEST, params.depth_test),
            (gl::BLEND, params.blend),
            (gl::CULL_FACE, params.cull_face),
            (gl::SCISSOR_TEST, params.scissor_test),
        ];
        for &(cap, enabled) in caps.iter() {
            if let Some(enabled) = enabled {
                driver.set_capability(cap, enabled);
            }
        }
        Ok(())
    }

    /// Reads the current values of the fields that are set in `params`.
    pub fn query_parameters(&self, params: &ContextParameters) -> GlResult<ContextParameters> {
        let mut current = ContextParameters::default();
        if params.viewport.is_some() {
            current.viewport = Some(self.query_ints::<4>(gl::VIEWPORT)?);
        }
        if params.clear_color.is_some() {
            current.clear_color = Some(self.query_floats::<4>(gl::COLOR_CLEAR_VALUE)?);
        }
        if params.clear_depth.is_some() {
            current.clear_depth = Some(self.query_floats::<1>(gl::DEPTH_CLEAR_VALUE)?[0]);
        }
        if params.clear_stencil.is_some() {
            current.clear_stencil = Some(self.query_ints::<1>(gl::STENCIL_CLEAR_VALUE)?[0]);
        }
        if params.depth_test.is_some() {
            current.depth_test = Some(self.query_bool(gl::DEPTH_TEST)?);
        }
        if params.blend.is_some() {
            current.blend = Some(self.query_bool(gl::BLEND)?);
        }
        if params.cull_face.is_some() {
            current.cull_face = Some(self.query_bool(gl::CULL_FACE)?);
        }
        if params.scissor_test.is_some() {
            current.scissor_test = Some(self.query_bool(gl::SCISSOR_TEST)?);
        }
        Ok(current)
    }

    /// Applies `params`, runs `f`, then restores the previous values of the fields that `params`
    /// changed.
    pub fn with_parameters<R>(
        &self,
        params: &ContextParameters,
        f: impl FnOnce(&Context) -> R,
    ) -> GlResult<R> {
        let saved = self.query_parameters(params)?;
        self.set_parameters(params)?;
        let result = f(self);
        self.set_parameters(&saved)?;
        Ok(result)
    }

    fn query_ints<const N: usize>(&self, pname: GLenum) -> GlResult<[i32; N]> {
        let value = self.get_parameter(pname)?;
        let mut out = [0; N];
        match value {
            ParameterValue::Ints(ref v) if v.len() == N => out.copy_from_slice(v),
            ParameterValue::Int(v) if N == 1 => out[0] = v as i32,
            other => {
                return Err(Error::InvalidParameter(format!(
                    "unexpected value for {}: {:?}",
                    describe(pname),
                    other
                )))
            }
        }
        Ok(out)
    }

    fn query_floats<const N: usize>(&self, pname: GLenum) -> GlResult<[f32; N]> {
        let value = self.get_parameter(pname)?;
        let mut out = [0.0; N];
        match value {
            ParameterValue::Floats(ref v) if v.len() == N => out.copy_from_slice(v),
            ParameterValue::Float(v) if N == 1 => out[0] = v,
            other => {
                return Err(Error::InvalidParameter(format!(
                    "unexpected value for {}: {:?}",
                    describe(pname),
                    other
                )))
            }
        }
        Ok(out)
    }

    fn query_bool(&self, pname: GLenum) -> GlResult<bool> {
        match self.get_parameter(pname)? {
            ParameterValue::Bool(b) => Ok(b),
            other => Err(Error::InvalidParameter(format!(
                "unexpected value for {}: {:?}",
                describe(pname),
                other
            ))),
        }
    }
}

impl ContextInner {
    pub(crate) fn driver(&self) -> RefMut<Box<dyn Driver>> {
        self.driver.borrow_mut()
    }

    /// WebGL 2 or GLES 3.
    pub(crate) fn is_version_2(&self) -> bool {
        let version = self.driver.borrow().get_parameter(gl::VERSION);
        let version = version.as_ref().and_then(|v| v.as_str()).unwrap_or("");
        version.starts_with("WebGL 2") || version.starts_with("OpenGL ES 3")
    }

    pub(crate) fn supports_instancing(&self) -> bool {
        self.is_version_2() || self.driver.borrow().has_extension("ANGLE_instanced_arrays")
    }

    pub(crate) fn check_lost(&self) -> GlResult<()> {
        if self.driver.borrow().is_context_lost() {
            Err(Error::ContextLost)
        } else {
            Ok(())
        }
    }

    /// Creates a driver object. Returns the owning handle along with the name.
    pub(crate) fn create_object(&self, kind: ObjectKind) -> GlResult<(UniqueHandle, RawHandle)> {
        self.check_lost()?;
        let raw = self.driver().create_object(kind);
        match raw {
            Some(raw) => {
                trace!(context = self.label.as_str(), handle = ?raw, %kind, "create_object");
                Ok((UniqueHandle::new(kind, raw), raw))
            }
            None if self.driver.borrow().is_context_lost() => Err(Error::ContextLost),
            None => Err(Error::ResourceCreation { kind }),
        }
    }

    /// Deletes a driver object. The driver unbinds deleted objects, so the matching bind points
    /// are reset as well.
    pub(crate) fn delete_object(&self, kind: ObjectKind, raw: RawHandle) {
        trace!(context = self.label.as_str(), handle = ?raw, %kind, "destroy_object");
        {
            let mut b = self.bindings.borrow_mut();
            let b = &mut *b;
            let reset = |slot: &mut Option<RawHandle>| {
                if *slot == Some(raw) {
                    *slot = None;
                }
            };
            match kind {
                ObjectKind::Buffer => {
                    reset(&mut b.array_buffer);
                    reset(&mut b.element_array_buffer);
                }
                ObjectKind::Program => reset(&mut b.program),
                ObjectKind::Framebuffer => reset(&mut b.framebuffer),
                ObjectKind::Renderbuffer => reset(&mut b.renderbuffer),
                ObjectKind::Texture => {
                    reset(&mut b.texture_2d);
                    reset(&mut b.texture_cube);
                }
                ObjectKind::Shader(_) => {}
            }
        }
        self.driver().delete_object(kind, raw);
    }

    fn trace_bind(&self, what: &'static str, target: GLenum, handle: Option<RawHandle>) {
        if self.trace_calls {
            trace!(
                context = self.label.as_str(),
                bind_target = describe(target).as_str(),
                ?handle,
                what
            );
        }
    }

    pub(crate) fn bind_buffer(&self, target: GLenum, handle: Option<RawHandle>) {
        self.trace_bind("bind_buffer", target, handle);
        {
            let mut b = self.bindings.borrow_mut();
            match target {
                gl::ARRAY_BUFFER => b.array_buffer = handle,
                gl::ELEMENT_ARRAY_BUFFER => b.element_array_buffer = handle,
                _ => {}
            }
        }
        self.driver().bind_buffer(target, handle);
    }

    pub(crate) fn use_program(&self, handle: Option<RawHandle>) {
        self.trace_bind("use_program", gl::NONE, handle);
        self.bindings.borrow_mut().program = handle;
        self.driver().use_program(handle);
    }

    pub(crate) fn bind_texture(&self, target: GLenum, handle: Option<RawHandle>) {
        self.trace_bind("bind_texture", target, handle);
        {
            let mut b = self.bindings.borrow_mut();
            match target {
                gl::TEXTURE_2D => b.texture_2d = handle,
                gl::TEXTURE_CUBE_MAP => b.texture_cube = handle,
                _ => {}
            }
        }
        self.driver().bind_texture(target, handle);
    }

    pub(crate) fn bind_renderbuffer(&self, handle: Option<RawHandle>) {
        self.trace_bind("bind_renderbuffer", gl::RENDERBUFFER, handle);
        self.bindings.borrow_mut().renderbuffer = handle;
        self.driver().bind_renderbuffer(handle);
    }

    /// Binds a framebuffer to both the draw and read bind points (`None` is the default surface).
    pub(crate) fn bind_framebuffer(&self, handle: Option<RawHandle>) {
        self.trace_bind("bind_framebuffer", gl::FRAMEBUFFER, handle);
        self.bindings.borrow_mut().framebuffer = handle;
        self.driver().bind_framebuffer(gl::FRAMEBUFFER, handle);
    }

    //----------------------------------------------------------------------------------------------
    // resource arenas

    pub(crate) fn register_image(&self, record: ImageRecord) -> ImageId {
        self.images.borrow_mut().insert(record)
    }

    pub(crate) fn remove_image(&self, id: ImageId) {
        self.images.borrow_mut().remove(id);
    }

    pub(crate) fn images(&self) -> Ref<SlotMap<ImageId, ImageRecord>> {
        self.images.borrow()
    }

    pub(crate) fn register_buffer(&self, record: BufferRecord) -> BufferId {
        self.buffers.borrow_mut().insert(record)
    }

    pub(crate) fn remove_buffer(&self, id: BufferId) {
        self.buffers.borrow_mut().remove(id);
    }

    pub(crate) fn buffers(&self) -> Ref<SlotMap<BufferId, BufferRecord>> {
        self.buffers.borrow()
    }

    pub(crate) fn buffers_mut(&self) -> RefMut<SlotMap<BufferId, BufferRecord>> {
        self.buffers.borrow_mut()
    }
}

/// Weak reference from an object to the context it was created against.
#[derive(Clone)]
pub(crate) struct ContextRef(Weak<ContextInner>);

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.upgrade() {
            Some(ctx) => write!(f, "ContextRef({:?})", ctx.label),
            None => f.write_str("ContextRef(dropped)"),
        }
    }
}

impl ContextRef {
    /// Returns the context, or `ContextLost` if it was dropped or the driver reports loss.
    pub(crate) fn get(&self) -> GlResult<Rc<ContextInner>> {
        let ctx = self.0.upgrade().ok_or(Error::ContextLost)?;
        ctx.check_lost()?;
        Ok(ctx)
    }

    /// Upgrades to a strong `Context`, for objects that create other objects after construction.
    pub(crate) fn context(&self) -> GlResult<Context> {
        Ok(Context { inner: self.get()? })
    }

    /// Returns the context and the object name behind `handle`, failing with `UseAfterFree` if the
    /// handle was released.
    pub(crate) fn resolve(&self, handle: &UniqueHandle) -> GlResult<(Rc<ContextInner>, RawHandle)> {
        let raw = handle.get().ok_or(Error::UseAfterFree {
            kind: handle.kind(),
        })?;
        Ok((self.get()?, raw))
    }

    pub(crate) fn is(&self, context: &Context) -> bool {
        Weak::ptr_eq(&self.0, &Rc::downgrade(&context.inner))
    }

    pub(crate) fn same_as(&self, other: &ContextRef) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }

    /// Releases a handle. Never fails: if the context is gone or lost, the handle is dropped
    /// without calling the driver (a lost context has already freed everything).
    pub(crate) fn release(&self, handle: &mut UniqueHandle) {
        let kind = handle.kind();
        if let Some(raw) = handle.take() {
            match self.0.upgrade() {
                Some(ctx) if !ctx.driver.borrow().is_context_lost() => ctx.delete_object(kind, raw),
                _ => trace!(handle = ?raw, %kind, "release_orphaned_object"),
            }
        }
    }

    /// Runs `f` with the context if it is still alive, ignoring loss. Used by cleanup paths.
    pub(crate) fn with_alive(&self, f: impl FnOnce(&ContextInner)) {
        if let Some(ctx) = self.0.upgrade() {
            f(&ctx)
        }
    }
}
