//! Object layer over a WebGL-style graphics API.
//!
//! Buffers, programs, textures, renderbuffers and framebuffers are created against a [`Context`]
//! and own their driver handle. Wrappers bind what they need right before a driver call and leave
//! it bound. See [`draw::draw`] for the draw-call path.
pub mod api;
mod buffer;
mod context;
mod error;
mod fbo;
mod format;
mod framebuffer;
mod handle;
mod renderbuffer;
mod sampling;
mod shader;
mod texture;
mod uniform;
mod vertex_array;

pub mod draw;

pub use crate::buffer::{Buffer, BufferTarget, BufferUsage};
pub use crate::context::{BufferId, Context, ContextCreateInfo, ContextParameters, ImageId};
pub use crate::draw::{clear, draw, ClearOptions, DrawOptions, IndexType, Topology};
pub use crate::error::{Error, GlResult};
pub use crate::fbo::Fbo;
pub use crate::format::{max_mip_levels, mip_level_size, FormatAspect, GlFormatInfo, TextureFormat};
pub use crate::framebuffer::{Attachment, AttachmentPoint, Framebuffer, IncompleteReason};
pub use crate::handle::{ObjectKind, RawHandle};
pub use crate::renderbuffer::Renderbuffer;
pub use crate::sampling::{Filter, MipmapMode, TextureParameters, WrapMode};
pub use crate::shader::{Program, ProgramState, ShaderStage};
pub use crate::texture::{CubeFace, Texture2D, TextureCube};
pub use crate::uniform::{glsl_type_name, UniformValue};
pub use crate::vertex_array::{AttributeLayout, ComponentType, VertexAttributes};
