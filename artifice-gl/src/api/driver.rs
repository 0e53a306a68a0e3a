//! The native context interface.
//!
//! `Driver` is the boundary between the object layer and whatever actually talks to the GPU
//! (a WebGL context, a GLES context, or [`HeadlessDriver`](crate::api::HeadlessDriver)). Its
//! methods map one-to-one to GL entry points and have the same implicit-state semantics: most
//! of them operate on whatever object is currently bound to the given target.
use crate::{api::gl::GLenum, handle::ObjectKind, handle::RawHandle, uniform::UniformValue};

/// Value returned by a parameter query.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Ints(Vec<i32>),
    Float(f32),
    Floats(Vec<f32>),
    String(String),
}

impl ParameterValue {
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            ParameterValue::Int(v) => Some(v),
            ParameterValue::Bool(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// An active attribute or uniform of a linked program, as reported by the driver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveVariable {
    pub name: String,
    /// Declared type (`FLOAT_VEC3`, `SAMPLER_2D`, ...).
    pub ty: GLenum,
    /// Array length, 1 for non-arrays.
    pub size: u32,
    /// Attribute index or uniform location.
    pub location: u32,
}

pub trait Driver {
    /// Polls the context-lost flag.
    fn is_context_lost(&self) -> bool;
    fn get_parameter(&self, pname: GLenum) -> Option<ParameterValue>;
    fn has_extension(&self, name: &str) -> bool;

    /// Creates an object of the given kind. Returns `None` if the driver refuses.
    fn create_object(&mut self, kind: ObjectKind) -> Option<RawHandle>;
    fn delete_object(&mut self, kind: ObjectKind, handle: RawHandle);

    // buffers
    fn bind_buffer(&mut self, target: GLenum, buffer: Option<RawHandle>);
    /// Reallocates the storage of the bound buffer. The new contents are zeroed.
    fn buffer_data(&mut self, target: GLenum, size: usize, usage: GLenum);
    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]);
    fn get_buffer_sub_data(&mut self, target: GLenum, offset: usize, out: &mut [u8]);

    // shaders and programs
    /// Sets the source of a shader object and compiles it. Returns the info log on failure.
    fn compile_shader(&mut self, shader: RawHandle, source: &str) -> Result<(), String>;
    /// Attaches the shaders to the program and links it. Returns the info log on failure.
    fn link_program(&mut self, program: RawHandle, shaders: &[RawHandle]) -> Result<(), String>;
    fn active_attributes(&mut self, program: RawHandle) -> Vec<ActiveVariable>;
    fn active_uniforms(&mut self, program: RawHandle) -> Vec<ActiveVariable>;
    fn use_program(&mut self, program: Option<RawHandle>);
    /// Sets a uniform of the program in use.
    fn uniform(&mut self, location: u32, value: &UniformValue);

    // textures
    fn bind_texture(&mut self, target: GLenum, texture: Option<RawHandle>);
    /// Allocates immutable storage for all levels of the bound texture.
    fn tex_storage_2d(
        &mut self,
        target: GLenum,
        levels: u32,
        internal_format: GLenum,
        width: u32,
        height: u32,
    );
    /// Uploads a full mip level. `target` is `TEXTURE_2D` or a cube face.
    fn tex_sub_image_2d(
        &mut self,
        target: GLenum,
        level: u32,
        width: u32,
        height: u32,
        format: GLenum,
        ty: GLenum,
        data: &[u8],
    );
    fn tex_parameter(&mut self, target: GLenum, pname: GLenum, value: GLenum);

    // renderbuffers
    fn bind_renderbuffer(&mut self, renderbuffer: Option<RawHandle>);
    fn renderbuffer_storage(&mut self, internal_format: GLenum, width: u32, height: u32);

    // framebuffers
    fn bind_framebuffer(&mut self, target: GLenum, framebuffer: Option<RawHandle>);
    fn framebuffer_texture_2d(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        tex_target: GLenum,
        texture: Option<RawHandle>,
        level: u32,
    );
    fn framebuffer_renderbuffer(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        renderbuffer: Option<RawHandle>,
    );
    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum;
    fn draw_buffers(&mut self, buffers: &[GLenum]);
    fn read_buffer(&mut self, src: GLenum);
    /// Reads pixels from the read buffer of the bound read framebuffer.
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        format: GLenum,
        ty: GLenum,
        out: &mut [u8],
    );

    // vertex attributes
    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn disable_vertex_attrib_array(&mut self, index: u32);
    /// Sources attribute `index` from the buffer bound to `ARRAY_BUFFER`.
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: u32,
        ty: GLenum,
        normalized: bool,
        stride: usize,
        offset: usize,
    );
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);
    fn vertex_attrib_4f(&mut self, index: u32, value: [f32; 4]);

    // draw calls
    fn draw_arrays_instanced(&mut self, mode: GLenum, first: usize, count: usize, instances: u32);
    fn draw_elements_instanced(
        &mut self,
        mode: GLenum,
        count: usize,
        ty: GLenum,
        offset: usize,
        instances: u32,
    );

    // fixed-function state
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn clear_color(&mut self, color: [f32; 4]);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, stencil: i32);
    fn set_capability(&mut self, cap: GLenum, enabled: bool);
    fn clear(&mut self, mask: GLenum);
}
