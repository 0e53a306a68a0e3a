//! Vertex attribute bindings.
use crate::{
    api::gl::{self, GLenum},
    buffer::{Buffer, BufferTarget},
    context::{BufferId, Context, ContextInner, ContextRef},
    error::{Error, GlResult},
    handle::ObjectKind,
    shader::Program,
};
use std::collections::BTreeMap;
use tracing::trace;

/// Scalar type of the components of a vertex attribute, as stored in the buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    HalfFloat,
    Float,
}

impl ComponentType {
    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort | ComponentType::HalfFloat => 2,
            ComponentType::Int | ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }

    pub fn to_gl(self) -> GLenum {
        match self {
            ComponentType::Byte => gl::BYTE,
            ComponentType::UnsignedByte => gl::UNSIGNED_BYTE,
            ComponentType::Short => gl::SHORT,
            ComponentType::UnsignedShort => gl::UNSIGNED_SHORT,
            ComponentType::Int => gl::INT,
            ComponentType::UnsignedInt => gl::UNSIGNED_INT,
            ComponentType::HalfFloat => gl::HALF_FLOAT,
            ComponentType::Float => gl::FLOAT,
        }
    }
}

/// Where an attribute reads its data within a buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AttributeLayout {
    pub component_type: ComponentType,
    /// 1 to 4.
    pub components: u32,
    /// Distance in bytes between consecutive elements. 0 means tightly packed.
    pub stride: usize,
    /// Byte offset of the first element.
    pub offset: usize,
    /// Whether integer data is normalized to [0,1] or [-1,1].
    pub normalized: bool,
    /// 0 for per-vertex data, N to advance once every N instances.
    pub divisor: u32,
}

/// Largest stride accepted by WebGL.
const MAX_STRIDE: usize = 255;

impl AttributeLayout {
    /// Tightly packed `f32` components starting at offset 0.
    pub fn floats(components: u32) -> AttributeLayout {
        AttributeLayout {
            component_type: ComponentType::Float,
            components,
            stride: 0,
            offset: 0,
            normalized: false,
            divisor: 0,
        }
    }

    /// Size in bytes of one element.
    pub fn element_size(&self) -> usize {
        self.component_type.byte_size() * self.components as usize
    }

    /// Stride actually used between elements.
    pub fn effective_stride(&self) -> usize {
        if self.stride == 0 {
            self.element_size()
        } else {
            self.stride
        }
    }

    pub fn validate(&self) -> GlResult<()> {
        if self.components == 0 || self.components > 4 {
            return Err(Error::InvalidLayout(format!(
                "{} components per element, expected 1 to 4",
                self.components
            )));
        }
        let component_size = self.component_type.byte_size();
        if self.stride != 0 && self.stride < self.element_size() {
            return Err(Error::InvalidLayout(format!(
                "stride {} is smaller than the element size {}",
                self.stride,
                self.element_size()
            )));
        }
        if self.stride > MAX_STRIDE {
            return Err(Error::InvalidLayout(format!(
                "stride {} exceeds {}",
                self.stride, MAX_STRIDE
            )));
        }
        if self.stride % component_size != 0 || self.offset % component_size != 0 {
            return Err(Error::InvalidLayout(format!(
                "stride {} and offset {} must be multiples of the component size {}",
                self.stride, self.offset, component_size
            )));
        }
        Ok(())
    }

    /// Number of whole elements available in a buffer of `byte_length` bytes.
    fn capacity(&self, byte_length: usize) -> usize {
        match self.offset.checked_add(self.element_size()) {
            Some(end) if end <= byte_length => (byte_length - end) / self.effective_stride() + 1,
            _ => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum AttributeSource {
    Buffer {
        buffer: BufferId,
        layout: AttributeLayout,
    },
    Constant([f32; 4]),
}

/// How many vertices and instances the attribute buffers can feed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct AttributeLimits {
    /// `None` if no per-vertex attribute reads from a buffer.
    pub(crate) vertices: Option<usize>,
    /// `None` if no per-instance attribute reads from a buffer.
    pub(crate) instances: Option<usize>,
}

/// Maps program attribute slots to buffer regions or constant values.
///
/// This is plain client-side state: nothing is sent to the driver until the attributes are bound
/// for a draw. Buffers are referenced, not owned.
#[derive(Debug)]
pub struct VertexAttributes {
    ctx: ContextRef,
    slots: BTreeMap<u32, AttributeSource>,
}

impl VertexAttributes {
    pub fn create(context: &Context) -> GlResult<VertexAttributes> {
        context.inner().check_lost()?;
        Ok(VertexAttributes {
            ctx: context.downgrade(),
            slots: BTreeMap::new(),
        })
    }

    fn check_slot(&self, ctx: &ContextInner, slot: u32) -> GlResult<()> {
        let max = ctx
            .driver()
            .get_parameter(gl::MAX_VERTEX_ATTRIBS)
            .and_then(|v| v.as_int())
            .unwrap_or(0);
        if i64::from(slot) >= max {
            return Err(Error::InvalidParameter(format!(
                "attribute slot {} exceeds MAX_VERTEX_ATTRIBS ({})",
                slot, max
            )));
        }
        Ok(())
    }

    /// Sources `slot` from `buffer` with the given layout, replacing any previous source.
    pub fn set_attribute(&mut self, slot: u32, buffer: &Buffer, layout: AttributeLayout) -> GlResult<()> {
        let ctx = self.ctx.get()?;
        self.check_slot(&ctx, slot)?;
        layout.validate()?;
        if !buffer.context_ref().same_as(&self.ctx) {
            return Err(Error::InvalidParameter(
                "buffer belongs to another context".to_string(),
            ));
        }
        if buffer.is_destroyed() {
            return Err(Error::UseAfterFree {
                kind: ObjectKind::Buffer,
            });
        }
        if buffer.target() != BufferTarget::Vertex {
            return Err(Error::InvalidLayout(
                "attributes must be sourced from a vertex buffer".to_string(),
            ));
        }
        self.slots.insert(
            slot,
            AttributeSource::Buffer {
                buffer: buffer.id(),
                layout,
            },
        );
        Ok(())
    }

    /// Makes `slot` read a constant value instead of buffer data.
    pub fn set_constant(&mut self, slot: u32, value: [f32; 4]) -> GlResult<()> {
        let ctx = self.ctx.get()?;
        self.check_slot(&ctx, slot)?;
        self.slots.insert(slot, AttributeSource::Constant(value));
        Ok(())
    }

    /// Clears whatever source `slot` had.
    pub fn remove(&mut self, slot: u32) {
        self.slots.remove(&slot);
    }

    /// The buffer layout of `slot`, `None` if unset or constant.
    pub fn layout(&self, slot: u32) -> Option<AttributeLayout> {
        match self.slots.get(&slot) {
            Some(AttributeSource::Buffer { layout, .. }) => Some(*layout),
            _ => None,
        }
    }

    pub fn is_set(&self, slot: u32) -> bool {
        self.slots.contains_key(&slot)
    }

    pub(crate) fn context_ref(&self) -> &ContextRef {
        &self.ctx
    }

    /// Checks that the attributes can feed `program`, then binds them.
    ///
    /// Leaves the last attribute buffer bound to `ARRAY_BUFFER`.
    pub fn bind_for_draw(&self, program: &Program) -> GlResult<()> {
        let ctx = self.ctx.get()?;
        self.validate(&ctx, program)?;
        self.apply(&ctx, program)
    }

    /// Checks every slot of `program` without touching the driver.
    pub(crate) fn validate(&self, ctx: &ContextInner, program: &Program) -> GlResult<AttributeLimits> {
        if !program.context_ref().same_as(&self.ctx) {
            return Err(Error::InvalidDrawState(
                "vertex attributes and program belong to different contexts".to_string(),
            ));
        }
        if !program.is_linked() {
            return Err(Error::InvalidDrawState(format!(
                "program is not linked ({:?})",
                program.state()
            )));
        }
        let declared = program.attributes();
        for attribute in declared.iter() {
            if !self.slots.contains_key(&attribute.location) {
                return Err(Error::MissingAttribute {
                    slot: attribute.location,
                });
            }
        }
        for &slot in self.slots.keys() {
            if !declared.iter().any(|a| a.location == slot) {
                return Err(Error::InvalidDrawState(format!(
                    "attribute slot {} is not declared by the program",
                    slot
                )));
            }
        }

        let buffers = ctx.buffers();
        let mut limits = AttributeLimits::default();
        let mut instanced = false;
        for (&slot, source) in self.slots.iter() {
            if let AttributeSource::Buffer { buffer, layout } = source {
                let record = buffers.get(*buffer).ok_or_else(|| {
                    Error::InvalidDrawState(format!(
                        "buffer of attribute slot {} was destroyed",
                        slot
                    ))
                })?;
                let capacity = layout.capacity(record.byte_length);
                let limit = if layout.divisor == 0 {
                    &mut limits.vertices
                } else {
                    instanced = true;
                    &mut limits.instances
                };
                let capacity = if layout.divisor == 0 {
                    capacity
                } else {
                    capacity.saturating_mul(layout.divisor as usize)
                };
                *limit = Some(limit.map_or(capacity, |l| l.min(capacity)));
            }
        }
        drop(buffers);
        if instanced && !ctx.supports_instancing() {
            return Err(Error::InvalidDrawState(
                "attribute divisors need instancing support".to_string(),
            ));
        }
        Ok(limits)
    }

    /// Sends the bindings of every slot of `program` to the driver and disables the other slots.
    pub(crate) fn apply(&self, ctx: &ContextInner, program: &Program) -> GlResult<()> {
        let max_slots = ctx
            .driver()
            .get_parameter(gl::MAX_VERTEX_ATTRIBS)
            .and_then(|v| v.as_int())
            .unwrap_or(0) as u32;
        let instancing = ctx.supports_instancing();
        let declared: Vec<u32> = program.attributes().iter().map(|a| a.location).collect();

        for slot in 0..max_slots {
            let source = if declared.contains(&slot) {
                self.slots.get(&slot)
            } else {
                None
            };
            match source {
                Some(AttributeSource::Buffer { buffer, layout }) => {
                    let handle = ctx.buffers().get(*buffer).map(|r| r.handle);
                    let handle = handle.ok_or_else(|| {
                        Error::InvalidDrawState(format!(
                            "buffer of attribute slot {} was destroyed",
                            slot
                        ))
                    })?;
                    ctx.bind_buffer(gl::ARRAY_BUFFER, Some(handle));
                    let mut driver = ctx.driver();
                    driver.vertex_attrib_pointer(
                        slot,
                        layout.components,
                        layout.component_type.to_gl(),
                        layout.normalized,
                        layout.stride,
                        layout.offset,
                    );
                    if instancing {
                        driver.vertex_attrib_divisor(slot, layout.divisor);
                    }
                    driver.enable_vertex_attrib_array(slot);
                }
                Some(AttributeSource::Constant(value)) => {
                    let mut driver = ctx.driver();
                    driver.disable_vertex_attrib_array(slot);
                    driver.vertex_attrib_4f(slot, *value);
                }
                None => ctx.driver().disable_vertex_attrib_array(slot),
            }
        }
        trace!(slots = self.slots.len(), "bind_vertex_attributes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_validation() {
        assert!(AttributeLayout::floats(3).validate().is_ok());
        assert!(matches!(
            AttributeLayout::floats(5).validate(),
            Err(Error::InvalidLayout(_))
        ));
        let narrow = AttributeLayout {
            stride: 8,
            ..AttributeLayout::floats(3)
        };
        assert!(matches!(narrow.validate(), Err(Error::InvalidLayout(_))));
        let misaligned = AttributeLayout {
            offset: 2,
            ..AttributeLayout::floats(2)
        };
        assert!(misaligned.validate().is_err());
        let bytes = AttributeLayout {
            component_type: ComponentType::UnsignedByte,
            components: 4,
            stride: 0,
            offset: 3,
            normalized: true,
            divisor: 0,
        };
        assert!(bytes.validate().is_ok());
    }

    #[test]
    fn capacity() {
        // interleaved position (vec3) + uv (vec2)
        let uv = AttributeLayout {
            stride: 20,
            offset: 12,
            ..AttributeLayout::floats(2)
        };
        assert_eq!(uv.capacity(60), 3);
        assert_eq!(uv.capacity(59), 2);
        assert_eq!(uv.capacity(12), 0);
        assert_eq!(AttributeLayout::floats(4).capacity(64), 4);
        let far = AttributeLayout {
            offset: usize::MAX - 3,
            ..AttributeLayout::floats(2)
        };
        assert_eq!(far.capacity(64), 0);
    }
}
