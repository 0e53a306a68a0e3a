//! GL enum values used by this crate.
//!
//! Only the subset of the WebGL 2 / GLES 3 enums that the object wrappers
//! actually pass to a driver is listed here. The table doubles as the source of
//! the name lookup in [`crate::api::get`].
#![allow(missing_docs)]

pub type GLenum = u32;

macro_rules! gl_enums {
    ($($name:ident = $value:expr,)*) => {
        $(pub const $name: GLenum = $value;)*

        /// `(name, value)` pairs for every enum above, in declaration order.
        pub(crate) const ENUM_TABLE: &[(&str, GLenum)] = &[$((stringify!($name), $value),)*];
    };
}

gl_enums! {
    // primitives
    POINTS = 0x0000,
    LINES = 0x0001,
    LINE_LOOP = 0x0002,
    LINE_STRIP = 0x0003,
    TRIANGLES = 0x0004,
    TRIANGLE_STRIP = 0x0005,
    TRIANGLE_FAN = 0x0006,

    // clear mask bits
    DEPTH_BUFFER_BIT = 0x0100,
    STENCIL_BUFFER_BIT = 0x0400,
    COLOR_BUFFER_BIT = 0x4000,

    // buffers
    ARRAY_BUFFER = 0x8892,
    ELEMENT_ARRAY_BUFFER = 0x8893,
    STREAM_DRAW = 0x88E0,
    STATIC_DRAW = 0x88E4,
    DYNAMIC_DRAW = 0x88E8,

    // data types
    BYTE = 0x1400,
    UNSIGNED_BYTE = 0x1401,
    SHORT = 0x1402,
    UNSIGNED_SHORT = 0x1403,
    INT = 0x1404,
    UNSIGNED_INT = 0x1405,
    FLOAT = 0x1406,
    HALF_FLOAT = 0x140B,
    UNSIGNED_SHORT_4_4_4_4 = 0x8033,
    UNSIGNED_SHORT_5_6_5 = 0x8363,
    UNSIGNED_INT_24_8 = 0x84FA,
    FLOAT_32_UNSIGNED_INT_24_8_REV = 0x8DAD,

    // uniform types
    FLOAT_VEC2 = 0x8B50,
    FLOAT_VEC3 = 0x8B51,
    FLOAT_VEC4 = 0x8B52,
    INT_VEC2 = 0x8B53,
    INT_VEC3 = 0x8B54,
    INT_VEC4 = 0x8B55,
    BOOL = 0x8B56,
    BOOL_VEC2 = 0x8B57,
    BOOL_VEC3 = 0x8B58,
    BOOL_VEC4 = 0x8B59,
    FLOAT_MAT2 = 0x8B5A,
    FLOAT_MAT3 = 0x8B5B,
    FLOAT_MAT4 = 0x8B5C,
    SAMPLER_2D = 0x8B5E,
    SAMPLER_CUBE = 0x8B60,

    // shaders
    FRAGMENT_SHADER = 0x8B30,
    VERTEX_SHADER = 0x8B31,

    // capabilities
    CULL_FACE = 0x0B44,
    DEPTH_TEST = 0x0B71,
    BLEND = 0x0BE2,
    SCISSOR_TEST = 0x0C11,

    // textures
    TEXTURE_2D = 0x0DE1,
    TEXTURE_CUBE_MAP = 0x8513,
    TEXTURE_CUBE_MAP_POSITIVE_X = 0x8515,
    TEXTURE_CUBE_MAP_NEGATIVE_X = 0x8516,
    TEXTURE_CUBE_MAP_POSITIVE_Y = 0x8517,
    TEXTURE_CUBE_MAP_NEGATIVE_Y = 0x8518,
    TEXTURE_CUBE_MAP_POSITIVE_Z = 0x8519,
    TEXTURE_CUBE_MAP_NEGATIVE_Z = 0x851A,
    TEXTURE_MAG_FILTER = 0x2800,
    TEXTURE_MIN_FILTER = 0x2801,
    TEXTURE_WRAP_S = 0x2802,
    TEXTURE_WRAP_T = 0x2803,
    TEXTURE_WRAP_R = 0x8072,
    NEAREST = 0x2600,
    LINEAR = 0x2601,
    NEAREST_MIPMAP_NEAREST = 0x2700,
    LINEAR_MIPMAP_NEAREST = 0x2701,
    NEAREST_MIPMAP_LINEAR = 0x2702,
    LINEAR_MIPMAP_LINEAR = 0x2703,
    REPEAT = 0x2901,
    CLAMP_TO_EDGE = 0x812F,
    MIRRORED_REPEAT = 0x8370,

    // pixel formats
    DEPTH_COMPONENT = 0x1902,
    RED = 0x1903,
    RGB = 0x1907,
    RGBA = 0x1908,
    RG = 0x8227,
    DEPTH_STENCIL = 0x84F9,

    // internal formats
    RGBA4 = 0x8056,
    RGB8 = 0x8051,
    RGBA8 = 0x8058,
    DEPTH_COMPONENT16 = 0x81A5,
    DEPTH_COMPONENT24 = 0x81A6,
    R8 = 0x8229,
    RG8 = 0x822B,
    R32F = 0x822E,
    RGBA32F = 0x8814,
    RGBA16F = 0x881A,
    DEPTH24_STENCIL8 = 0x88F0,
    DEPTH_COMPONENT32F = 0x8CAC,
    DEPTH32F_STENCIL8 = 0x8CAD,
    STENCIL_INDEX8 = 0x8D48,
    RGB565 = 0x8D62,

    // framebuffers
    NONE = 0x0000,
    BACK = 0x0405,
    DEPTH_STENCIL_ATTACHMENT = 0x821A,
    READ_FRAMEBUFFER = 0x8CA8,
    DRAW_FRAMEBUFFER = 0x8CA9,
    COLOR_ATTACHMENT0 = 0x8CE0,
    DEPTH_ATTACHMENT = 0x8D00,
    STENCIL_ATTACHMENT = 0x8D20,
    FRAMEBUFFER = 0x8D40,
    RENDERBUFFER = 0x8D41,
    FRAMEBUFFER_COMPLETE = 0x8CD5,
    FRAMEBUFFER_INCOMPLETE_ATTACHMENT = 0x8CD6,
    FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT = 0x8CD7,
    FRAMEBUFFER_INCOMPLETE_DIMENSIONS = 0x8CD9,
    FRAMEBUFFER_UNSUPPORTED = 0x8CDD,

    // parameter names
    VIEWPORT = 0x0BA2,
    DEPTH_CLEAR_VALUE = 0x0B73,
    STENCIL_CLEAR_VALUE = 0x0B91,
    COLOR_CLEAR_VALUE = 0x0C22,
    MAX_TEXTURE_SIZE = 0x0D33,
    VENDOR = 0x1F00,
    RENDERER = 0x1F01,
    VERSION = 0x1F02,
    MAX_RENDERBUFFER_SIZE = 0x84E8,
    MAX_CUBE_MAP_TEXTURE_SIZE = 0x851C,
    MAX_DRAW_BUFFERS = 0x8824,
    MAX_VERTEX_ATTRIBS = 0x8869,
    SHADING_LANGUAGE_VERSION = 0x8B8C,
    MAX_COLOR_ATTACHMENTS = 0x8CDF,
}
