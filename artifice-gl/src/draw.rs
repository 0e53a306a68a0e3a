//! Draw and clear commands.
//!
//! Every precondition is checked before the first state change: a rejected draw leaves the driver
//! untouched and submits nothing.
use crate::{
    api::gl::{self, GLenum},
    buffer::{Buffer, BufferTarget},
    context::{Context, ContextInner},
    error::{Error, GlResult},
    framebuffer::Framebuffer,
    handle::RawHandle,
    shader::Program,
    vertex_array::{AttributeLimits, VertexAttributes},
};
use tracing::{trace, trace_span, warn};

/// Primitive topology of a draw.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Topology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Topology {
    pub fn to_gl(self) -> GLenum {
        match self {
            Topology::Points => gl::POINTS,
            Topology::Lines => gl::LINES,
            Topology::LineLoop => gl::LINE_LOOP,
            Topology::LineStrip => gl::LINE_STRIP,
            Topology::Triangles => gl::TRIANGLES,
            Topology::TriangleStrip => gl::TRIANGLE_STRIP,
            Topology::TriangleFan => gl::TRIANGLE_FAN,
        }
    }
}

/// Type of the indices in an index buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum IndexType {
    UnsignedByte,
    UnsignedShort,
    /// Needs WebGL 2 or `OES_element_index_uint`.
    UnsignedInt,
}

impl IndexType {
    pub fn byte_size(self) -> usize {
        match self {
            IndexType::UnsignedByte => 1,
            IndexType::UnsignedShort => 2,
            IndexType::UnsignedInt => 4,
        }
    }

    pub fn to_gl(self) -> GLenum {
        match self {
            IndexType::UnsignedByte => gl::UNSIGNED_BYTE,
            IndexType::UnsignedShort => gl::UNSIGNED_SHORT,
            IndexType::UnsignedInt => gl::UNSIGNED_INT,
        }
    }
}

/// Optional parts of a draw.
#[derive(Copy, Clone, Debug)]
pub struct DrawOptions<'a> {
    /// Must be at least 1. Values above 1 need instancing support.
    pub instance_count: u32,
    /// First vertex of a non-indexed draw.
    pub first: usize,
    /// Draws indexed primitives from this buffer when set.
    pub index_buffer: Option<(&'a Buffer, IndexType)>,
    /// Byte offset of the first index in the index buffer.
    pub index_offset: usize,
    /// Render target. `None` is the default surface.
    pub framebuffer: Option<&'a Framebuffer>,
}

impl<'a> Default for DrawOptions<'a> {
    fn default() -> Self {
        DrawOptions {
            instance_count: 1,
            first: 0,
            index_buffer: None,
            index_offset: 0,
            framebuffer: None,
        }
    }
}

/// Checked parameters of an indexed draw.
#[derive(Copy, Clone)]
struct IndexedDraw {
    buffer: RawHandle,
    ty: IndexType,
    offset: usize,
}

/// Draws `count` vertices (or indices) with `program`, sourcing attributes from `attributes`.
///
/// Leaves the program, the target framebuffer, the last attribute buffer and the index buffer
/// bound.
pub fn draw(
    program: &Program,
    attributes: &VertexAttributes,
    topology: Topology,
    count: usize,
    options: &DrawOptions,
) -> GlResult<()> {
    let _span = trace_span!("draw", ?topology, count, instances = options.instance_count).entered();
    let result = draw_inner(program, attributes, topology, count, options);
    if let Err(ref err) = result {
        warn!(%err, "draw rejected");
    }
    result
}

fn draw_inner(
    program: &Program,
    attributes: &VertexAttributes,
    topology: Topology,
    count: usize,
    options: &DrawOptions,
) -> GlResult<()> {
    let ctx = attributes.context_ref().get()?;
    let limits = attributes.validate(&ctx, program)?;
    let program_handle = program
        .handle()
        .ok_or_else(|| Error::InvalidDrawState("program was destroyed".to_string()))?;

    let instances = options.instance_count;
    if instances == 0 {
        return Err(Error::InvalidDrawState("instance count must be at least 1".to_string()));
    }
    if instances > 1 && !ctx.supports_instancing() {
        return Err(Error::InvalidDrawState(format!(
            "{} instances requested but instancing is not supported",
            instances
        )));
    }
    check_instance_limit(&limits, instances)?;

    let indexed = match options.index_buffer {
        Some((buffer, ty)) => Some(check_index_buffer(&ctx, attributes, buffer, ty, count, options)?),
        None => {
            check_vertex_limit(&limits, options.first, count)?;
            None
        }
    };

    match options.framebuffer {
        Some(framebuffer) => {
            if !framebuffer.context_ref().same_as(attributes.context_ref()) {
                return Err(Error::InvalidDrawState(
                    "framebuffer belongs to another context".to_string(),
                ));
            }
            if framebuffer.is_destroyed() {
                return Err(Error::InvalidDrawState("framebuffer was destroyed".to_string()));
            }
            framebuffer.bind_for_draw()?;
        }
        None => ctx.bind_framebuffer(None),
    }

    ctx.use_program(Some(program_handle));
    attributes.apply(&ctx, program)?;
    let mode = topology.to_gl();
    match indexed {
        Some(IndexedDraw { buffer, ty, offset }) => {
            ctx.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, Some(buffer));
            ctx.driver()
                .draw_elements_instanced(mode, count, ty.to_gl(), offset, instances);
        }
        None => {
            ctx.driver()
                .draw_arrays_instanced(mode, options.first, count, instances);
        }
    }
    trace!(program = ?program_handle, indexed = indexed.is_some(), "submitted draw");
    Ok(())
}

fn check_vertex_limit(limits: &AttributeLimits, first: usize, count: usize) -> GlResult<()> {
    if let Some(available) = limits.vertices {
        let end = first.checked_add(count).ok_or_else(|| {
            Error::InvalidDrawState(format!("vertex range {}+{} overflows", first, count))
        })?;
        if end > available {
            return Err(Error::InvalidDrawState(format!(
                "vertices {}..{} requested, the attribute buffers hold {}",
                first, end, available
            )));
        }
    }
    Ok(())
}

fn check_instance_limit(limits: &AttributeLimits, instances: u32) -> GlResult<()> {
    if let Some(available) = limits.instances {
        if instances as usize > available {
            return Err(Error::InvalidDrawState(format!(
                "{} instances requested, the per-instance buffers hold {}",
                instances, available
            )));
        }
    }
    Ok(())
}

fn check_index_buffer(
    ctx: &ContextInner,
    attributes: &VertexAttributes,
    buffer: &Buffer,
    ty: IndexType,
    count: usize,
    options: &DrawOptions,
) -> GlResult<IndexedDraw> {
    if !buffer.context_ref().same_as(attributes.context_ref()) {
        return Err(Error::InvalidDrawState(
            "index buffer belongs to another context".to_string(),
        ));
    }
    if buffer.target() != BufferTarget::Index {
        return Err(Error::InvalidDrawState(
            "indices must come from an index buffer".to_string(),
        ));
    }
    if ty == IndexType::UnsignedInt
        && !ctx.is_version_2()
        && !ctx.driver().has_extension("OES_element_index_uint")
    {
        return Err(Error::InvalidDrawState(
            "32-bit indices need OES_element_index_uint".to_string(),
        ));
    }
    let size = ty.byte_size();
    if options.index_offset % size != 0 {
        return Err(Error::InvalidDrawState(format!(
            "index offset {} is not a multiple of the index size {}",
            options.index_offset, size
        )));
    }
    let record = ctx
        .buffers()
        .get(buffer.id())
        .cloned()
        .ok_or_else(|| Error::InvalidDrawState("index buffer was destroyed".to_string()))?;
    let end = count
        .checked_mul(size)
        .and_then(|n| n.checked_add(options.index_offset));
    match end {
        Some(end) if end <= record.byte_length => Ok(IndexedDraw {
            buffer: record.handle,
            ty,
            offset: options.index_offset,
        }),
        _ => Err(Error::InvalidDrawState(format!(
            "{} indices at offset {} exceed the index buffer ({} bytes)",
            count, options.index_offset, record.byte_length
        ))),
    }
}

/// What [`clear`] clears. Unset fields leave the corresponding buffer untouched.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ClearOptions {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
    pub stencil: Option<i32>,
}

impl ClearOptions {
    pub fn color(color: [f32; 4]) -> ClearOptions {
        ClearOptions {
            color: Some(color),
            ..Default::default()
        }
    }
}

/// Clears a framebuffer, or the default surface if `framebuffer` is `None`.
///
/// The clear values are left set. Leaves the target framebuffer bound.
pub fn clear(context: &Context, framebuffer: Option<&Framebuffer>, options: &ClearOptions) -> GlResult<()> {
    let ctx = context.inner();
    ctx.check_lost()?;
    match framebuffer {
        Some(framebuffer) => {
            if !framebuffer.context_ref().is(context) {
                return Err(Error::InvalidParameter(
                    "framebuffer belongs to another context".to_string(),
                ));
            }
            framebuffer.bind_for_draw()?;
        }
        None => ctx.bind_framebuffer(None),
    }

    let mut mask = 0;
    let mut driver = ctx.driver();
    if let Some(color) = options.color {
        driver.clear_color(color);
        mask |= gl::COLOR_BUFFER_BIT;
    }
    if let Some(depth) = options.depth {
        driver.clear_depth(depth);
        mask |= gl::DEPTH_BUFFER_BIT;
    }
    if let Some(stencil) = options.stencil {
        driver.clear_stencil(stencil);
        mask |= gl::STENCIL_BUFFER_BIT;
    }
    if mask != 0 {
        driver.clear(mask);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits() {
        let limits = AttributeLimits {
            vertices: Some(6),
            instances: Some(4),
        };
        assert!(check_vertex_limit(&limits, 0, 6).is_ok());
        assert!(check_vertex_limit(&limits, 3, 3).is_ok());
        assert!(matches!(
            check_vertex_limit(&limits, 4, 3),
            Err(Error::InvalidDrawState(_))
        ));
        assert!(check_vertex_limit(&limits, usize::MAX, 2).is_err());
        assert!(check_instance_limit(&limits, 4).is_ok());
        assert!(check_instance_limit(&limits, 5).is_err());

        // constant-only attributes put no bound on the count
        let unbounded = AttributeLimits::default();
        assert!(check_vertex_limit(&unbounded, 0, 1 << 20).is_ok());
        assert!(check_instance_limit(&unbounded, 1000).is_ok());
    }

    #[test]
    fn index_sizes() {
        assert_eq!(IndexType::UnsignedByte.byte_size(), 1);
        assert_eq!(IndexType::UnsignedShort.to_gl(), gl::UNSIGNED_SHORT);
        assert_eq!(Topology::TriangleFan.to_gl(), gl::TRIANGLE_FAN);
    }
}
