//! A software driver that emulates GL object state in memory.
//!
//! `HeadlessDriver` keeps buffers, textures, renderbuffers, framebuffers, shaders and programs as
//! plain Rust data and implements the bind-point semantics of GL on top of them. Nothing is
//! rasterized: draw calls are validated and recorded. The driver is cheaply cloneable (clones share
//! the same state), so a clone kept outside of a [`Context`](crate::Context) can be used to
//! inspect what the object layer did.
//!
//! The GLSL "compiler" is a declaration scanner: top-level `attribute`/`in`/`varying`/`out`/
//! `uniform` declarations on a single line are recognized, everything else is ignored.
use crate::{
    api::{
        driver::{ActiveVariable, Driver, ParameterValue},
        get::describe,
        gl::{self, GLenum},
    },
    format::{mip_level_size, TextureFormat},
    handle::{ObjectKind, RawHandle},
    uniform::{glsl_type_from_name, UniformValue},
};
use std::{
    cell::{RefCell, RefMut},
    collections::{HashMap, HashSet},
    rc::Rc,
};
use tracing::debug;

/// Limits and capabilities reported by a headless driver.
#[derive(Clone, Debug)]
pub struct HeadlessConfig {
    pub version: String,
    pub extensions: Vec<String>,
    pub max_texture_size: u32,
    pub max_cube_map_texture_size: u32,
    pub max_renderbuffer_size: u32,
    pub max_vertex_attribs: u32,
    pub max_color_attachments: u32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        HeadlessConfig {
            version: "WebGL 2.0 (headless)".to_string(),
            extensions: vec!["EXT_color_buffer_float".to_string()],
            max_texture_size: 4096,
            max_cube_map_texture_size: 4096,
            max_renderbuffer_size: 4096,
            max_vertex_attribs: 16,
            max_color_attachments: 4,
        }
    }
}

impl HeadlessConfig {
    /// A WebGL 1 style configuration: no instancing, no float render targets, one color attachment.
    pub fn webgl1() -> HeadlessConfig {
        HeadlessConfig {
            version: "WebGL 1.0 (headless)".to_string(),
            extensions: Vec::new(),
            max_color_attachments: 1,
            ..Default::default()
        }
    }
}

/// A draw call that reached the driver.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub mode: GLenum,
    pub first: usize,
    pub count: usize,
    /// Index type and byte offset for indexed draws.
    pub indices: Option<(GLenum, usize)>,
    pub instances: u32,
    pub program: RawHandle,
    /// `None` for the default surface.
    pub framebuffer: Option<RawHandle>,
    /// Attribute indices that were sourced from buffers.
    pub enabled_attributes: Vec<u32>,
}

/// Pointer state of one vertex attribute index.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AttribPointer {
    pub buffer: Option<RawHandle>,
    pub size: u32,
    pub ty: GLenum,
    pub normalized: bool,
    pub stride: usize,
    pub offset: usize,
}

/// State of one vertex attribute index.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexAttribState {
    pub enabled: bool,
    pub pointer: Option<AttribPointer>,
    pub divisor: u32,
    /// Value used when the array is disabled.
    pub constant: [f32; 4],
}

impl Default for VertexAttribState {
    fn default() -> Self {
        VertexAttribState {
            enabled: false,
            pointer: None,
            divisor: 0,
            constant: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

//--------------------------------------------------------------------------------------------------
#[derive(Clone, Debug)]
struct Declaration {
    name: String,
    ty: GLenum,
    size: u32,
    location: Option<u32>,
}

#[derive(Clone, Debug, Default)]
struct ShaderInterface {
    inputs: Vec<Declaration>,
    outputs: Vec<Declaration>,
    uniforms: Vec<Declaration>,
}

#[derive(Debug)]
struct ShaderObject {
    stage: GLenum,
    interface: Option<ShaderInterface>,
}

#[derive(Debug, Default)]
struct ProgramObject {
    linked: bool,
    attributes: Vec<ActiveVariable>,
    uniforms: Vec<ActiveVariable>,
    uniform_values: HashMap<u32, UniformValue>,
}

#[derive(Debug, Default)]
struct TextureObject {
    target: Option<GLenum>,
    format: Option<TextureFormat>,
    width: u32,
    height: u32,
    /// `[face][level]`
    images: Vec<Vec<Vec<u8>>>,
    parameters: HashMap<GLenum, GLenum>,
}

#[derive(Debug, Default)]
struct RenderbufferObject {
    format: Option<TextureFormat>,
    width: u32,
    height: u32,
}

#[derive(Copy, Clone, Debug)]
enum FramebufferAttachment {
    Texture { name: u32, target: GLenum, level: u32 },
    Renderbuffer { name: u32 },
}

#[derive(Debug)]
struct FramebufferObject {
    attachments: HashMap<GLenum, FramebufferAttachment>,
    draw_buffers: Vec<GLenum>,
    read_buffer: GLenum,
}

#[derive(Debug)]
enum Object {
    Buffer(Vec<u8>),
    Shader(ShaderObject),
    Program(ProgramObject),
    Texture(TextureObject),
    Renderbuffer(RenderbufferObject),
    Framebuffer(FramebufferObject),
}

struct HeadlessState {
    config: HeadlessConfig,
    lost: bool,
    refuse_allocations: bool,
    next_name: u32,
    objects: HashMap<u32, Object>,

    array_buffer: Option<u32>,
    element_array_buffer: Option<u32>,
    program: Option<u32>,
    draw_framebuffer: Option<u32>,
    read_framebuffer: Option<u32>,
    renderbuffer: Option<u32>,
    textures: HashMap<GLenum, u32>,
    attribs: Vec<VertexAttribState>,

    viewport: [i32; 4],
    clear_color: [f32; 4],
    clear_depth: f32,
    clear_stencil: i32,
    capabilities: HashSet<GLenum>,

    draws: Vec<DrawRecord>,
    clears: Vec<(Option<RawHandle>, GLenum)>,
    deletes: usize,
    invalid_deletes: usize,
    errors: Vec<String>,
}

impl HeadlessState {
    fn new(config: HeadlessConfig) -> HeadlessState {
        let attribs = vec![VertexAttribState::default(); config.max_vertex_attribs as usize];
        HeadlessState {
            config,
            lost: false,
            refuse_allocations: false,
            next_name: 1,
            objects: HashMap::new(),
            array_buffer: None,
            element_array_buffer: None,
            program: None,
            draw_framebuffer: None,
            read_framebuffer: None,
            renderbuffer: None,
            textures: HashMap::new(),
            attribs,
            viewport: [0, 0, 300, 150],
            clear_color: [0.0; 4],
            clear_depth: 1.0,
            clear_stencil: 0,
            capabilities: HashSet::new(),
            draws: Vec::new(),
            clears: Vec::new(),
            deletes: 0,
            invalid_deletes: 0,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: String) {
        debug!(message = message.as_str(), "headless_gl_error");
        self.errors.push(message);
    }

    fn bound_buffer(&mut self, target: GLenum) -> Option<&mut Vec<u8>> {
        let name = match target {
            gl::ARRAY_BUFFER => self.array_buffer,
            gl::ELEMENT_ARRAY_BUFFER => self.element_array_buffer,
            _ => None,
        }?;
        match self.objects.get_mut(&name) {
            Some(Object::Buffer(data)) => Some(data),
            _ => None,
        }
    }

    fn texture_binding_for(target: GLenum) -> GLenum {
        if is_cube_face(target) {
            gl::TEXTURE_CUBE_MAP
        } else {
            target
        }
    }

    fn bound_texture(&mut self, target: GLenum) -> Option<&mut TextureObject> {
        let name = *self.textures.get(&Self::texture_binding_for(target))?;
        match self.objects.get_mut(&name) {
            Some(Object::Texture(t)) => Some(t),
            _ => None,
        }
    }

    fn bound_framebuffer(&mut self, target: GLenum) -> Option<&mut FramebufferObject> {
        let name = match target {
            gl::READ_FRAMEBUFFER => self.read_framebuffer,
            _ => self.draw_framebuffer,
        }?;
        match self.objects.get_mut(&name) {
            Some(Object::Framebuffer(f)) => Some(f),
            _ => None,
        }
    }

    /// Size and format of an attached image, `None` if the attachment is dangling or unallocated.
    fn attachment_info(&self, a: &FramebufferAttachment) -> Option<(TextureFormat, u32, u32)> {
        match *a {
            FramebufferAttachment::Texture { name, level, .. } => match self.objects.get(&name) {
                Some(Object::Texture(t)) => {
                    let format = t.format?;
                    let levels = t.images.first().map(|l| l.len()).unwrap_or(0) as u32;
                    if level >= levels {
                        return None;
                    }
                    let (w, h) = mip_level_size(t.width, t.height, level);
                    Some((format, w, h))
                }
                _ => None,
            },
            FramebufferAttachment::Renderbuffer { name } => match self.objects.get(&name) {
                Some(Object::Renderbuffer(r)) => Some((r.format?, r.width, r.height)),
                _ => None,
            },
        }
    }

    fn framebuffer_status(&self, name: Option<u32>) -> GLenum {
        let fb = match name.and_then(|n| self.objects.get(&n)) {
            None => return gl::FRAMEBUFFER_COMPLETE,
            Some(Object::Framebuffer(fb)) => fb,
            Some(_) => return gl::FRAMEBUFFER_UNSUPPORTED,
        };
        if fb.attachments.is_empty() {
            return gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }
        if fb.attachments.contains_key(&gl::DEPTH_ATTACHMENT)
            && fb.attachments.contains_key(&gl::DEPTH_STENCIL_ATTACHMENT)
        {
            return gl::FRAMEBUFFER_UNSUPPORTED;
        }
        let float_color = self.config.extensions.iter().any(|e| e == "EXT_color_buffer_float");
        let mut size = None;
        for (&point, a) in fb.attachments.iter() {
            let (format, w, h) = match self.attachment_info(a) {
                Some(info) => info,
                None => return gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
            };
            let renderable = match point {
                gl::DEPTH_ATTACHMENT => format.aspect() == crate::format::FormatAspect::Depth,
                gl::STENCIL_ATTACHMENT => format.aspect() == crate::format::FormatAspect::Stencil,
                gl::DEPTH_STENCIL_ATTACHMENT => {
                    format.aspect() == crate::format::FormatAspect::DepthStencil
                }
                _ => format.is_color_renderable(float_color),
            };
            if !renderable {
                return gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
            }
            match size {
                None => size = Some((w, h)),
                Some(s) if s != (w, h) => return gl::FRAMEBUFFER_INCOMPLETE_DIMENSIONS,
                _ => {}
            }
        }
        gl::FRAMEBUFFER_COMPLETE
    }
}

fn is_cube_face(target: GLenum) -> bool {
    (gl::TEXTURE_CUBE_MAP_POSITIVE_X..=gl::TEXTURE_CUBE_MAP_NEGATIVE_Z).contains(&target)
}

fn face_index(target: GLenum) -> usize {
    if is_cube_face(target) {
        (target - gl::TEXTURE_CUBE_MAP_POSITIVE_X) as usize
    } else {
        0
    }
}

//--------------------------------------------------------------------------------------------------
// GLSL declaration scanner

const QUALIFIERS: &[&str] = &["attribute", "varying", "in", "out", "uniform"];
const PRECISIONS: &[&str] = &["lowp", "mediump", "highp", "flat", "smooth"];

fn compile_glsl(stage: GLenum, source: &str) -> Result<ShaderInterface, String> {
    let mut interface = ShaderInterface::default();
    let mut has_main = false;

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        let line = match line.find("//") {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();

        if let Some(message) = line.strip_prefix("#error") {
            return Err(format!("ERROR: 0:{}: '#error' : {}", line_no, message.trim()));
        }
        if line.starts_with("void main") {
            has_main = true;
            continue;
        }

        let mut rest = line;
        let mut location = None;
        if rest.starts_with("layout") {
            let open = rest.find('(');
            let close = open.and_then(|open| rest[open..].find(')').map(|c| open + c));
            let (open, close) = match (open, close) {
                (Some(open), Some(close)) => (open, close),
                _ => return Err(format!("ERROR: 0:{}: 'layout' : syntax error", line_no)),
            };
            location = rest[open + 1..close]
                .split('=')
                .nth(1)
                .and_then(|v| v.trim().parse::<u32>().ok());
            rest = rest[close + 1..].trim();
        }

        let mut tokens = rest
            .trim_end_matches(';')
            .split_whitespace()
            .filter(|t| !PRECISIONS.contains(t));
        let qualifier = match tokens.next() {
            Some(q) if QUALIFIERS.contains(&q) && rest.ends_with(';') => q,
            _ => continue,
        };
        let (ty_name, decl) = match (tokens.next(), tokens.next()) {
            (Some(ty), Some(decl)) => (ty, decl),
            _ => return Err(format!("ERROR: 0:{}: '{}' : syntax error", line_no, rest)),
        };
        let ty = glsl_type_from_name(ty_name).ok_or_else(|| {
            format!("ERROR: 0:{}: '{}' : unknown type", line_no, ty_name)
        })?;
        let (name, size) = match decl.find('[') {
            Some(pos) => {
                let len = decl[pos + 1..]
                    .trim_end_matches(']')
                    .parse::<u32>()
                    .map_err(|_| format!("ERROR: 0:{}: '{}' : invalid array size", line_no, decl))?;
                (&decl[..pos], len)
            }
            None => (decl, 1),
        };
        let declaration = Declaration {
            name: name.to_string(),
            ty,
            size,
            location,
        };

        match (stage, qualifier) {
            (_, "uniform") => interface.uniforms.push(declaration),
            (gl::VERTEX_SHADER, "attribute") | (gl::VERTEX_SHADER, "in") => {
                interface.inputs.push(declaration)
            }
            (gl::VERTEX_SHADER, "varying") | (gl::VERTEX_SHADER, "out") => {
                interface.outputs.push(declaration)
            }
            (gl::FRAGMENT_SHADER, "varying") | (gl::FRAGMENT_SHADER, "in") => {
                interface.inputs.push(declaration)
            }
            (gl::FRAGMENT_SHADER, "out") => interface.outputs.push(declaration),
            _ => {
                return Err(format!(
                    "ERROR: 0:{}: '{}' : qualifier not allowed in this stage",
                    line_no, qualifier
                ))
            }
        }
    }

    if !has_main {
        return Err("ERROR: 0:0: '' : missing main() function".to_string());
    }
    Ok(interface)
}

fn link_glsl(
    vertex: &ShaderInterface,
    fragment: &ShaderInterface,
    max_vertex_attribs: u32,
) -> Result<(Vec<ActiveVariable>, Vec<ActiveVariable>), String> {
    for input in fragment.inputs.iter() {
        match vertex.outputs.iter().find(|o| o.name == input.name) {
            Some(o) if o.ty == input.ty => {}
            Some(_) => {
                return Err(format!(
                    "ERROR: varying `{}` has different types in vertex and fragment shaders",
                    input.name
                ))
            }
            None => {
                return Err(format!(
                    "ERROR: fragment input `{}` is not written by the vertex shader",
                    input.name
                ))
            }
        }
    }

    // attribute locations: explicit ones first, then the lowest free index
    let mut used = HashSet::new();
    for input in vertex.inputs.iter() {
        if let Some(loc) = input.location {
            if !used.insert(loc) {
                return Err(format!("ERROR: attribute location {} is assigned twice", loc));
            }
        }
    }
    let mut attributes = Vec::new();
    let mut next = 0;
    for input in vertex.inputs.iter() {
        let location = match input.location {
            Some(loc) => loc,
            None => {
                while used.contains(&next) {
                    next += 1;
                }
                used.insert(next);
                next
            }
        };
        if location >= max_vertex_attribs {
            return Err(format!(
                "ERROR: too many vertex attributes (location {} for `{}`)",
                location, input.name
            ));
        }
        attributes.push(ActiveVariable {
            name: input.name.clone(),
            ty: input.ty,
            size: input.size,
            location,
        });
    }

    let mut uniforms: Vec<ActiveVariable> = Vec::new();
    for u in vertex.uniforms.iter().chain(fragment.uniforms.iter()) {
        match uniforms.iter().find(|v| v.name == u.name) {
            Some(v) if v.ty != u.ty => {
                return Err(format!(
                    "ERROR: uniform `{}` is declared with different types",
                    u.name
                ))
            }
            Some(_) => {}
            None => {
                let location = uniforms.len() as u32;
                uniforms.push(ActiveVariable {
                    name: u.name.clone(),
                    ty: u.ty,
                    size: u.size,
                    location,
                })
            }
        }
    }

    Ok((attributes, uniforms))
}

//--------------------------------------------------------------------------------------------------

/// In-memory implementation of [`Driver`].
#[derive(Clone)]
pub struct HeadlessDriver {
    state: Rc<RefCell<HeadlessState>>,
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        HeadlessDriver::new()
    }
}

impl HeadlessDriver {
    pub fn new() -> HeadlessDriver {
        HeadlessDriver::with_config(HeadlessConfig::default())
    }

    pub fn with_config(config: HeadlessConfig) -> HeadlessDriver {
        HeadlessDriver {
            state: Rc::new(RefCell::new(HeadlessState::new(config))),
        }
    }

    /// Returns the state if the context is not lost. GL calls on a lost context are no-ops.
    fn live(&self) -> Option<RefMut<HeadlessState>> {
        let state = self.state.borrow_mut();
        if state.lost {
            None
        } else {
            Some(state)
        }
    }

    /// Simulates a context loss. All objects are freed at once.
    pub fn lose_context(&self) {
        let mut state = self.state.borrow_mut();
        state.lost = true;
        state.objects.clear();
    }

    /// Makes subsequent `create_object` calls fail (or succeed again).
    pub fn refuse_allocations(&self, refuse: bool) {
        self.state.borrow_mut().refuse_allocations = refuse;
    }

    pub fn draw_calls(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    pub fn draw_count(&self) -> usize {
        self.state.borrow().draws.len()
    }

    /// Clear calls: target framebuffer and mask.
    pub fn clear_calls(&self) -> Vec<(Option<RawHandle>, GLenum)> {
        self.state.borrow().clears.clone()
    }

    /// Number of successful object deletions.
    pub fn delete_count(&self) -> usize {
        self.state.borrow().deletes
    }

    /// Number of deletions of names that were not live objects (double frees).
    pub fn invalid_deletes(&self) -> usize {
        self.state.borrow().invalid_deletes
    }

    pub fn live_object_count(&self) -> usize {
        self.state.borrow().objects.len()
    }

    pub fn is_live(&self, handle: RawHandle) -> bool {
        self.state.borrow().objects.contains_key(&handle.get())
    }

    /// GL errors raised by invalid calls, in order.
    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }

    pub fn buffer_contents(&self, buffer: RawHandle) -> Option<Vec<u8>> {
        match self.state.borrow().objects.get(&buffer.get()) {
            Some(Object::Buffer(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn uniform_value(&self, program: RawHandle, location: u32) -> Option<UniformValue> {
        match self.state.borrow().objects.get(&program.get()) {
            Some(Object::Program(p)) => p.uniform_values.get(&location).copied(),
            _ => None,
        }
    }

    pub fn texture_parameter(&self, texture: RawHandle, pname: GLenum) -> Option<GLenum> {
        match self.state.borrow().objects.get(&texture.get()) {
            Some(Object::Texture(t)) => t.parameters.get(&pname).copied(),
            _ => None,
        }
    }

    pub fn vertex_attrib(&self, index: u32) -> Option<VertexAttribState> {
        self.state.borrow().attribs.get(index as usize).copied()
    }

    /// Attachment points of a framebuffer that have something attached.
    pub fn framebuffer_attachments(&self, framebuffer: RawHandle) -> Vec<GLenum> {
        match self.state.borrow().objects.get(&framebuffer.get()) {
            Some(Object::Framebuffer(fb)) => {
                let mut points: Vec<_> = fb.attachments.keys().copied().collect();
                points.sort_unstable();
                points
            }
            _ => Vec::new(),
        }
    }
}

impl Driver for HeadlessDriver {
    fn is_context_lost(&self) -> bool {
        self.state.borrow().lost
    }

    fn get_parameter(&self, pname: GLenum) -> Option<ParameterValue> {
        let s = self.state.borrow();
        let c = &s.config;
        Some(match pname {
            gl::MAX_TEXTURE_SIZE => ParameterValue::Int(c.max_texture_size as i64),
            gl::MAX_CUBE_MAP_TEXTURE_SIZE => ParameterValue::Int(c.max_cube_map_texture_size as i64),
            gl::MAX_RENDERBUFFER_SIZE => ParameterValue::Int(c.max_renderbuffer_size as i64),
            gl::MAX_VERTEX_ATTRIBS => ParameterValue::Int(c.max_vertex_attribs as i64),
            gl::MAX_COLOR_ATTACHMENTS | gl::MAX_DRAW_BUFFERS => {
                ParameterValue::Int(c.max_color_attachments as i64)
            }
            gl::VERSION => ParameterValue::String(c.version.clone()),
            gl::VENDOR => ParameterValue::String("artifice".to_string()),
            gl::RENDERER => ParameterValue::String("headless".to_string()),
            gl::SHADING_LANGUAGE_VERSION => ParameterValue::String("GLSL ES 3.00".to_string()),
            gl::VIEWPORT => ParameterValue::Ints(s.viewport.to_vec()),
            gl::COLOR_CLEAR_VALUE => ParameterValue::Floats(s.clear_color.to_vec()),
            gl::DEPTH_CLEAR_VALUE => ParameterValue::Float(s.clear_depth),
            gl::STENCIL_CLEAR_VALUE => ParameterValue::Int(s.clear_stencil as i64),
            gl::DEPTH_TEST | gl::BLEND | gl::CULL_FACE | gl::SCISSOR_TEST => {
                ParameterValue::Bool(s.capabilities.contains(&pname))
            }
            _ => return None,
        })
    }

    fn has_extension(&self, name: &str) -> bool {
        self.state.borrow().config.extensions.iter().any(|e| e == name)
    }

    fn create_object(&mut self, kind: ObjectKind) -> Option<RawHandle> {
        let mut s = self.live()?;
        if s.refuse_allocations {
            return None;
        }
        let name = s.next_name;
        s.next_name += 1;
        let object = match kind {
            ObjectKind::Buffer => Object::Buffer(Vec::new()),
            ObjectKind::Shader(stage) => Object::Shader(ShaderObject {
                stage,
                interface: None,
            }),
            ObjectKind::Program => Object::Program(ProgramObject::default()),
            ObjectKind::Texture => Object::Texture(TextureObject::default()),
            ObjectKind::Renderbuffer => Object::Renderbuffer(RenderbufferObject::default()),
            ObjectKind::Framebuffer => Object::Framebuffer(FramebufferObject {
                attachments: HashMap::new(),
                draw_buffers: vec![gl::COLOR_ATTACHMENT0],
                read_buffer: gl::COLOR_ATTACHMENT0,
            }),
        };
        s.objects.insert(name, object);
        RawHandle::new(name)
    }

    fn delete_object(&mut self, kind: ObjectKind, handle: RawHandle) {
        let mut s = match self.live() {
            Some(s) => s,
            None => return,
        };
        let name = handle.get();
        if s.objects.remove(&name).is_none() {
            s.invalid_deletes += 1;
            s.error(format!("delete of dead {} name {}", kind, name));
            return;
        }
        let st = &mut *s;
        st.deletes += 1;
        // deleting a bound object unbinds it
        for slot in [
            &mut st.array_buffer,
            &mut st.element_array_buffer,
            &mut st.program,
            &mut st.draw_framebuffer,
            &mut st.read_framebuffer,
            &mut st.renderbuffer,
        ] {
            if *slot == Some(name) {
                *slot = None;
            }
        }
        st.textures.retain(|_, n| *n != name);
    }

    fn bind_buffer(&mut self, target: GLenum, buffer: Option<RawHandle>) {
        if let Some(mut s) = self.live() {
            let name = buffer.map(RawHandle::get);
            if let Some(n) = name {
                if !matches!(s.objects.get(&n), Some(Object::Buffer(_))) {
                    s.error(format!("bind_buffer: {} is not a buffer", n));
                    return;
                }
            }
            match target {
                gl::ARRAY_BUFFER => s.array_buffer = name,
                gl::ELEMENT_ARRAY_BUFFER => s.element_array_buffer = name,
                _ => s.error(format!("bind_buffer: invalid target {}", describe(target))),
            }
        }
    }

    fn buffer_data(&mut self, target: GLenum, size: usize, _usage: GLenum) {
        if let Some(mut s) = self.live() {
            match s.bound_buffer(target) {
                Some(data) => *data = vec![0; size],
                None => s.error("buffer_data: no buffer bound".to_string()),
            }
        }
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, src: &[u8]) {
        if let Some(mut s) = self.live() {
            let result = match s.bound_buffer(target) {
                Some(data) if offset + src.len() <= data.len() => {
                    data[offset..offset + src.len()].copy_from_slice(src);
                    Ok(())
                }
                Some(_) => Err("buffer_sub_data: range out of bounds"),
                None => Err("buffer_sub_data: no buffer bound"),
            };
            if let Err(e) = result {
                s.error(e.to_string());
            }
        }
    }

    fn get_buffer_sub_data(&mut self, target: GLenum, offset: usize, out: &mut [u8]) {
        if let Some(mut s) = self.live() {
            let result = match s.bound_buffer(target) {
                Some(data) if offset + out.len() <= data.len() => {
                    out.copy_from_slice(&data[offset..offset + out.len()]);
                    Ok(())
                }
                Some(_) => Err("get_buffer_sub_data: range out of bounds"),
                None => Err("get_buffer_sub_data: no buffer bound"),
            };
            if let Err(e) = result {
                s.error(e.to_string());
            }
        }
    }

    fn compile_shader(&mut self, shader: RawHandle, source: &str) -> Result<(), String> {
        let mut s = self.live().ok_or_else(|| "context lost".to_string())?;
        match s.objects.get_mut(&shader.get()) {
            Some(Object::Shader(sh)) => {
                let result = compile_glsl(sh.stage, source);
                match result {
                    Ok(interface) => {
                        sh.interface = Some(interface);
                        Ok(())
                    }
                    Err(log) => {
                        sh.interface = None;
                        Err(log)
                    }
                }
            }
            _ => Err(format!("{} is not a shader object", shader.get())),
        }
    }

    fn link_program(&mut self, program: RawHandle, shaders: &[RawHandle]) -> Result<(), String> {
        let mut s = self.live().ok_or_else(|| "context lost".to_string())?;
        let mut vertex = None;
        let mut fragment = None;
        for sh in shaders {
            match s.objects.get(&sh.get()) {
                Some(Object::Shader(ShaderObject {
                    stage,
                    interface: Some(interface),
                })) => match *stage {
                    gl::VERTEX_SHADER => vertex = Some(interface.clone()),
                    gl::FRAGMENT_SHADER => fragment = Some(interface.clone()),
                    _ => {}
                },
                _ => return Err(format!("ERROR: shader {} is not compiled", sh.get())),
            }
        }
        let max_attribs = s.config.max_vertex_attribs;
        let result = match (vertex, fragment) {
            (Some(v), Some(f)) => link_glsl(&v, &f, max_attribs),
            _ => Err("ERROR: a program needs a vertex and a fragment shader".to_string()),
        };
        match s.objects.get_mut(&program.get()) {
            Some(Object::Program(p)) => {
                *p = ProgramObject::default();
                let (attributes, uniforms) = result?;
                p.linked = true;
                p.attributes = attributes;
                p.uniforms = uniforms;
                Ok(())
            }
            _ => Err(format!("{} is not a program object", program.get())),
        }
    }

    fn active_attributes(&mut self, program: RawHandle) -> Vec<ActiveVariable> {
        match self.live().as_ref().and_then(|s| s.objects.get(&program.get())) {
            Some(Object::Program(p)) if p.linked => p.attributes.clone(),
            _ => Vec::new(),
        }
    }

    fn active_uniforms(&mut self, program: RawHandle) -> Vec<ActiveVariable> {
        match self.live().as_ref().and_then(|s| s.objects.get(&program.get())) {
            Some(Object::Program(p)) if p.linked => p.uniforms.clone(),
            _ => Vec::new(),
        }
    }

    fn use_program(&mut self, program: Option<RawHandle>) {
        if let Some(mut s) = self.live() {
            if let Some(p) = program {
                if !matches!(s.objects.get(&p.get()), Some(Object::Program(ProgramObject { linked: true, .. }))) {
                    s.error(format!("use_program: {} is not a linked program", p.get()));
                    return;
                }
            }
            s.program = program.map(RawHandle::get);
        }
    }

    fn uniform(&mut self, location: u32, value: &UniformValue) {
        if let Some(mut s) = self.live() {
            let program = s.program;
            let result = match program.and_then(|p| s.objects.get_mut(&p)) {
                Some(Object::Program(p)) => match p.uniforms.iter().find(|u| u.location == location) {
                    Some(u) if value.is_compatible_with(u.ty) => {
                        p.uniform_values.insert(location, *value);
                        Ok(())
                    }
                    Some(_) => Err(format!("uniform: type mismatch at location {}", location)),
                    None => Err(format!("uniform: invalid location {}", location)),
                },
                _ => Err("uniform: no program in use".to_string()),
            };
            if let Err(e) = result {
                s.error(e);
            }
        }
    }

    fn bind_texture(&mut self, target: GLenum, texture: Option<RawHandle>) {
        if let Some(mut s) = self.live() {
            match texture {
                Some(t) => {
                    let result = match s.objects.get_mut(&t.get()) {
                        Some(Object::Texture(tex)) => match tex.target {
                            Some(existing) if existing != target => Err(format!(
                                "bind_texture: texture {} was first bound to {}",
                                t.get(),
                                describe(existing)
                            )),
                            _ => {
                                tex.target = Some(target);
                                Ok(())
                            }
                        },
                        _ => Err(format!("bind_texture: {} is not a texture", t.get())),
                    };
                    match result {
                        Ok(()) => {
                            s.textures.insert(target, t.get());
                        }
                        Err(e) => s.error(e),
                    }
                }
                None => {
                    s.textures.remove(&target);
                }
            }
        }
    }

    fn tex_storage_2d(
        &mut self,
        target: GLenum,
        levels: u32,
        internal_format: GLenum,
        width: u32,
        height: u32,
    ) {
        if let Some(mut s) = self.live() {
            let format = TextureFormat::from_internal_format(internal_format);
            let result = match (s.bound_texture(target), format) {
                (Some(t), Some(format)) if t.format.is_none() => {
                    let faces = if target == gl::TEXTURE_CUBE_MAP { 6 } else { 1 };
                    t.format = Some(format);
                    t.width = width;
                    t.height = height;
                    t.images = (0..faces)
                        .map(|_| {
                            (0..levels)
                                .map(|level| {
                                    let (w, h) = mip_level_size(width, height, level);
                                    vec![0u8; w as usize * h as usize * format.byte_size()]
                                })
                                .collect()
                        })
                        .collect();
                    Ok(())
                }
                (Some(_), Some(_)) => Err("tex_storage_2d: storage is immutable".to_string()),
                (_, None) => Err(format!(
                    "tex_storage_2d: invalid internal format {}",
                    describe(internal_format)
                )),
                (None, _) => Err("tex_storage_2d: no texture bound".to_string()),
            };
            if let Err(e) = result {
                s.error(e);
            }
        }
    }

    fn tex_sub_image_2d(
        &mut self,
        target: GLenum,
        level: u32,
        width: u32,
        height: u32,
        format: GLenum,
        ty: GLenum,
        data: &[u8],
    ) {
        if let Some(mut s) = self.live() {
            let face = face_index(target);
            let result = match s.bound_texture(target) {
                Some(t) => match t.format {
                    Some(f) => {
                        let info = f.gl_format_info();
                        let expected = mip_level_size(t.width, t.height, level);
                        match t.images.get_mut(face).and_then(|l| l.get_mut(level as usize)) {
                            Some(image)
                                if expected == (width, height)
                                    && info.upload_components == format
                                    && info.upload_ty == ty
                                    && image.len() == data.len() =>
                            {
                                image.copy_from_slice(data);
                                Ok(())
                            }
                            Some(_) => Err("tex_sub_image_2d: size or format mismatch".to_string()),
                            None => Err(format!("tex_sub_image_2d: invalid level {}", level)),
                        }
                    }
                    None => Err("tex_sub_image_2d: texture has no storage".to_string()),
                },
                None => Err("tex_sub_image_2d: no texture bound".to_string()),
            };
            if let Err(e) = result {
                s.error(e);
            }
        }
    }

    fn tex_parameter(&mut self, target: GLenum, pname: GLenum, value: GLenum) {
        if let Some(mut s) = self.live() {
            match s.bound_texture(target) {
                Some(t) => {
                    t.parameters.insert(pname, value);
                }
                None => s.error("tex_parameter: no texture bound".to_string()),
            }
        }
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<RawHandle>) {
        if let Some(mut s) = self.live() {
            s.renderbuffer = renderbuffer.map(RawHandle::get);
        }
    }

    fn renderbuffer_storage(&mut self, internal_format: GLenum, width: u32, height: u32) {
        if let Some(mut s) = self.live() {
            let format = TextureFormat::from_internal_format(internal_format);
            let bound = s.renderbuffer;
            let allocated = match (bound.and_then(|n| s.objects.get_mut(&n)), format) {
                (Some(Object::Renderbuffer(rb)), Some(format)) => {
                    rb.format = Some(format);
                    rb.width = width;
                    rb.height = height;
                    true
                }
                _ => false,
            };
            if !allocated {
                s.error("renderbuffer_storage: invalid renderbuffer or format".to_string());
            }
        }
    }

    fn bind_framebuffer(&mut self, target: GLenum, framebuffer: Option<RawHandle>) {
        if let Some(mut s) = self.live() {
            let name = framebuffer.map(RawHandle::get);
            match target {
                gl::FRAMEBUFFER => {
                    s.draw_framebuffer = name;
                    s.read_framebuffer = name;
                }
                gl::DRAW_FRAMEBUFFER => s.draw_framebuffer = name,
                gl::READ_FRAMEBUFFER => s.read_framebuffer = name,
                _ => s.error(format!("bind_framebuffer: invalid target {}", describe(target))),
            }
        }
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        tex_target: GLenum,
        texture: Option<RawHandle>,
        level: u32,
    ) {
        if let Some(mut s) = self.live() {
            match s.bound_framebuffer(target) {
                Some(fb) => match texture {
                    Some(t) => {
                        fb.attachments.insert(
                            attachment,
                            FramebufferAttachment::Texture {
                                name: t.get(),
                                target: tex_target,
                                level,
                            },
                        );
                    }
                    None => {
                        fb.attachments.remove(&attachment);
                    }
                },
                None => s.error("framebuffer_texture_2d: default framebuffer bound".to_string()),
            }
        }
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        renderbuffer: Option<RawHandle>,
    ) {
        if let Some(mut s) = self.live() {
            match s.bound_framebuffer(target) {
                Some(fb) => match renderbuffer {
                    Some(r) => {
                        fb.attachments
                            .insert(attachment, FramebufferAttachment::Renderbuffer { name: r.get() });
                    }
                    None => {
                        fb.attachments.remove(&attachment);
                    }
                },
                None => s.error("framebuffer_renderbuffer: default framebuffer bound".to_string()),
            }
        }
    }

    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum {
        match self.live() {
            Some(s) => {
                let name = match target {
                    gl::READ_FRAMEBUFFER => s.read_framebuffer,
                    _ => s.draw_framebuffer,
                };
                s.framebuffer_status(name)
            }
            None => gl::FRAMEBUFFER_UNSUPPORTED,
        }
    }

    fn draw_buffers(&mut self, buffers: &[GLenum]) {
        if let Some(mut s) = self.live() {
            if let Some(fb) = s.bound_framebuffer(gl::DRAW_FRAMEBUFFER) {
                fb.draw_buffers = buffers.to_vec();
            }
        }
    }

    fn read_buffer(&mut self, src: GLenum) {
        if let Some(mut s) = self.live() {
            if let Some(fb) = s.bound_framebuffer(gl::READ_FRAMEBUFFER) {
                fb.read_buffer = src;
            }
        }
    }

    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        format: GLenum,
        ty: GLenum,
        out: &mut [u8],
    ) {
        let mut s = match self.live() {
            Some(s) => s,
            None => return,
        };
        for b in out.iter_mut() {
            *b = 0;
        }
        let attachment = match s.bound_framebuffer(gl::READ_FRAMEBUFFER) {
            Some(fb) => fb.attachments.get(&fb.read_buffer).copied(),
            // the default surface has no contents
            None => return,
        };
        let (name, target, level) = match attachment {
            Some(FramebufferAttachment::Texture { name, target, level }) => (name, target, level),
            Some(FramebufferAttachment::Renderbuffer { .. }) => return,
            None => {
                s.error("read_pixels: read buffer has no attachment".to_string());
                return;
            }
        };
        let result = match s.objects.get(&name) {
            Some(Object::Texture(t)) => match (t.format, t.images.get(face_index(target))) {
                (Some(f), Some(levels)) => {
                    let info = f.gl_format_info();
                    let bpp = f.byte_size();
                    let (w, h) = mip_level_size(t.width, t.height, level);
                    let image = levels.get(level as usize).map(Vec::as_slice).unwrap_or(&[]);
                    if info.upload_components != format || info.upload_ty != ty {
                        Err("read_pixels: format mismatch".to_string())
                    } else if x < 0
                        || y < 0
                        || x as u32 + width > w
                        || y as u32 + height > h
                        || out.len() != (width * height) as usize * bpp
                    {
                        Err("read_pixels: region out of bounds".to_string())
                    } else {
                        let row = width as usize * bpp;
                        for r in 0..height as usize {
                            let src = ((y as usize + r) * w as usize + x as usize) * bpp;
                            out[r * row..(r + 1) * row].copy_from_slice(&image[src..src + row]);
                        }
                        Ok(())
                    }
                }
                _ => Err("read_pixels: texture has no storage".to_string()),
            },
            _ => Err("read_pixels: dangling attachment".to_string()),
        };
        if let Err(e) = result {
            s.error(e);
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        if let Some(mut s) = self.live() {
            match s.attribs.get_mut(index as usize) {
                Some(a) => a.enabled = true,
                None => s.error(format!("enable_vertex_attrib_array: invalid index {}", index)),
            }
        }
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        if let Some(mut s) = self.live() {
            match s.attribs.get_mut(index as usize) {
                Some(a) => a.enabled = false,
                None => s.error(format!("disable_vertex_attrib_array: invalid index {}", index)),
            }
        }
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: u32,
        ty: GLenum,
        normalized: bool,
        stride: usize,
        offset: usize,
    ) {
        if let Some(mut s) = self.live() {
            let buffer = s.array_buffer.and_then(RawHandle::new);
            match s.attribs.get_mut(index as usize) {
                Some(a) => {
                    a.pointer = Some(AttribPointer {
                        buffer,
                        size,
                        ty,
                        normalized,
                        stride,
                        offset,
                    })
                }
                None => s.error(format!("vertex_attrib_pointer: invalid index {}", index)),
            }
        }
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        if let Some(mut s) = self.live() {
            match s.attribs.get_mut(index as usize) {
                Some(a) => a.divisor = divisor,
                None => s.error(format!("vertex_attrib_divisor: invalid index {}", index)),
            }
        }
    }

    fn vertex_attrib_4f(&mut self, index: u32, value: [f32; 4]) {
        if let Some(mut s) = self.live() {
            match s.attribs.get_mut(index as usize) {
                Some(a) => a.constant = value,
                None => s.error(format!("vertex_attrib_4f: invalid index {}", index)),
            }
        }
    }

    fn draw_arrays_instanced(&mut self, mode: GLenum, first: usize, count: usize, instances: u32) {
        if let Some(mut s) = self.live() {
            submit_draw(&mut s, mode, first, count, None, instances);
        }
    }

    fn draw_elements_instanced(
        &mut self,
        mode: GLenum,
        count: usize,
        ty: GLenum,
        offset: usize,
        instances: u32,
    ) {
        if let Some(mut s) = self.live() {
            if s.element_array_buffer.is_none() {
                s.error("draw_elements: no index buffer bound".to_string());
                return;
            }
            submit_draw(&mut s, mode, 0, count, Some((ty, offset)), instances);
        }
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        if let Some(mut s) = self.live() {
            s.viewport = [x, y, width as i32, height as i32];
        }
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        if let Some(mut s) = self.live() {
            s.clear_color = color;
        }
    }

    fn clear_depth(&mut self, depth: f32) {
        if let Some(mut s) = self.live() {
            s.clear_depth = depth;
        }
    }

    fn clear_stencil(&mut self, stencil: i32) {
        if let Some(mut s) = self.live() {
            s.clear_stencil = stencil;
        }
    }

    fn set_capability(&mut self, cap: GLenum, enabled: bool) {
        if let Some(mut s) = self.live() {
            if enabled {
                s.capabilities.insert(cap);
            } else {
                s.capabilities.remove(&cap);
            }
        }
    }

    fn clear(&mut self, mask: GLenum) {
        if let Some(mut s) = self.live() {
            let fb = s.draw_framebuffer;
            if s.framebuffer_status(fb) != gl::FRAMEBUFFER_COMPLETE {
                s.error("clear: framebuffer incomplete".to_string());
                return;
            }
            s.clears.push((fb.and_then(RawHandle::new), mask));
            if mask & gl::COLOR_BUFFER_BIT != 0 {
                clear_color_attachments(&mut s);
            }
        }
    }
}

/// Fills the RGBA8 texture attachments of the draw framebuffer with the clear color.
fn clear_color_attachments(s: &mut HeadlessState) {
    let color = s.clear_color;
    let pixel: Vec<u8> = color
        .iter()
        .map(|c| (c.max(0.0).min(1.0) * 255.0).round() as u8)
        .collect();
    let targets: Vec<(u32, GLenum, u32)> = match s.bound_framebuffer(gl::DRAW_FRAMEBUFFER) {
        Some(fb) => fb
            .draw_buffers
            .iter()
            .filter_map(|point| match fb.attachments.get(point) {
                Some(&FramebufferAttachment::Texture { name, target, level }) => {
                    Some((name, target, level))
                }
                _ => None,
            })
            .collect(),
        None => return,
    };
    for (name, target, level) in targets {
        if let Some(Object::Texture(t)) = s.objects.get_mut(&name) {
            if t.format != Some(TextureFormat::Rgba8) {
                continue;
            }
            if let Some(image) = t
                .images
                .get_mut(face_index(target))
                .and_then(|l| l.get_mut(level as usize))
            {
                for px in image.chunks_exact_mut(4) {
                    px.copy_from_slice(&pixel);
                }
            }
        }
    }
}

fn submit_draw(
    s: &mut HeadlessState,
    mode: GLenum,
    first: usize,
    count: usize,
    indices: Option<(GLenum, usize)>,
    instances: u32,
) {
    let program = match s.program.and_then(RawHandle::new) {
        Some(p) => p,
        None => {
            s.error("draw: no program in use".to_string());
            return;
        }
    };
    let fb = s.draw_framebuffer;
    if s.framebuffer_status(fb) != gl::FRAMEBUFFER_COMPLETE {
        s.error("draw: framebuffer incomplete".to_string());
        return;
    }
    let enabled_attributes = s
        .attribs
        .iter()
        .enumerate()
        .filter(|(_, a)| a.enabled)
        .map(|(i, _)| i as u32)
        .collect();
    s.draws.push(DrawRecord {
        mode,
        first,
        count,
        indices,
        instances,
        program,
        framebuffer: fb.and_then(RawHandle::new),
        enabled_attributes,
    });
}
