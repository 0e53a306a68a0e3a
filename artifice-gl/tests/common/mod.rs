#![allow(dead_code)]
use artifice_gl::api::{HeadlessConfig, HeadlessDriver};
use artifice_gl::{
    AttributeLayout, Buffer, BufferTarget, BufferUsage, Context, ContextCreateInfo, Program,
    VertexAttributes,
};

/// Textured quad: `position` is slot 0, `uv` slot 1.
pub const VERTEX_SHADER: &str = "
    attribute vec3 position;
    attribute vec2 uv;
    uniform mat4 transform;
    varying vec2 v_uv;
    void main() {
        v_uv = uv;
        gl_Position = transform * vec4(position, 1.0);
    }
";

pub const FRAGMENT_SHADER: &str = "
    precision mediump float;
    uniform vec4 tint;
    uniform sampler2D albedo;
    varying vec2 v_uv;
    void main() {
        gl_FragColor = tint * texture2D(albedo, v_uv);
    }
";

/// Two triangles, interleaved position (vec3) + uv (vec2).
pub const QUAD: [f32; 30] = [
    -1.0, -1.0, 0.0, 0.0, 0.0, //
    1.0, -1.0, 0.0, 1.0, 0.0, //
    1.0, 1.0, 0.0, 1.0, 1.0, //
    -1.0, -1.0, 0.0, 0.0, 0.0, //
    1.0, 1.0, 0.0, 1.0, 1.0, //
    -1.0, 1.0, 0.0, 0.0, 1.0, //
];

pub struct Fixture {
    pub driver: HeadlessDriver,
    pub context: Context,
}

impl Fixture {
    pub fn new() -> Fixture {
        Fixture::with_config(HeadlessConfig::default())
    }

    pub fn with_config(config: HeadlessConfig) -> Fixture {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
        let driver = HeadlessDriver::with_config(config);
        let context = Context::with_create_info(
            driver.clone(),
            ContextCreateInfo {
                label: "test".to_string(),
                trace_calls: true,
            },
        );
        Fixture { driver, context }
    }

    pub fn quad_program(&self) -> Program {
        Program::create(&self.context, VERTEX_SHADER, FRAGMENT_SHADER).unwrap()
    }

    pub fn quad_buffer(&self) -> Buffer {
        let mut buffer =
            Buffer::create(&self.context, BufferTarget::Vertex, BufferUsage::Static).unwrap();
        buffer.upload_slice(&QUAD, 0).unwrap();
        buffer
    }

    /// Attributes feeding `quad_program` from an interleaved `quad_buffer`.
    pub fn quad_attributes(&self, buffer: &Buffer) -> VertexAttributes {
        let mut attributes = VertexAttributes::create(&self.context).unwrap();
        attributes
            .set_attribute(
                0,
                buffer,
                AttributeLayout {
                    stride: 20,
                    ..AttributeLayout::floats(3)
                },
            )
            .unwrap();
        attributes
            .set_attribute(
                1,
                buffer,
                AttributeLayout {
                    stride: 20,
                    offset: 12,
                    ..AttributeLayout::floats(2)
                },
            )
            .unwrap();
        attributes
    }
}

/// Solid RGBA8 image data.
pub fn solid_rgba8(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    pixel
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 4)
        .collect()
}
