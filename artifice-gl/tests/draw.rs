mod common;

use artifice_gl::api::{gl, HeadlessConfig};
use artifice_gl::{
    draw, Attachment, AttachmentPoint, AttributeLayout, Buffer, BufferTarget, BufferUsage,
    DrawOptions, Error, Framebuffer, IncompleteReason, IndexType, Program, Renderbuffer,
    Texture2D, TextureFormat, Topology, VertexAttributes,
};
use common::Fixture;

const INSTANCED_VERTEX_SHADER: &str = "
    attribute vec2 position;
    attribute vec2 offset;
    void main() {
        gl_Position = vec4(position + offset, 0.0, 1.0);
    }
";

const PLAIN_FRAGMENT_SHADER: &str = "
    precision mediump float;
    void main() {
        gl_FragColor = vec4(1.0);
    }
";

#[test]
fn non_indexed_draw() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let attributes = fixture.quad_attributes(&buffer);

    draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()).unwrap();

    let calls = fixture.driver.draw_calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.mode, gl::TRIANGLES);
    assert_eq!((call.first, call.count, call.instances), (0, 6, 1));
    assert_eq!(call.indices, None);
    assert_eq!(Some(call.program), program.handle());
    assert_eq!(call.framebuffer, None);
    assert_eq!(call.enabled_attributes, vec![0, 1]);

    let uv = fixture.driver.vertex_attrib(1).unwrap().pointer.unwrap();
    assert_eq!((uv.size, uv.stride, uv.offset), (2, 20, 12));
    assert_eq!(uv.buffer, buffer.handle());
    assert!(fixture.driver.errors().is_empty(), "{:?}", fixture.driver.errors());
    assert_eq!(fixture.context.current_program(), program.handle());
}

#[test]
fn missing_attribute_submits_nothing() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let mut attributes = VertexAttributes::create(&fixture.context).unwrap();
    attributes
        .set_attribute(0, &buffer, AttributeLayout { stride: 20, ..AttributeLayout::floats(3) })
        .unwrap();

    assert_eq!(
        draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()),
        Err(Error::MissingAttribute { slot: 1 })
    );
    assert_eq!(
        attributes.bind_for_draw(&program),
        Err(Error::MissingAttribute { slot: 1 })
    );
    assert_eq!(fixture.driver.draw_count(), 0);
}

#[test]
fn offset_past_address_space_is_rejected() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let mut attributes = fixture.quad_attributes(&buffer);
    attributes
        .set_attribute(
            1,
            &buffer,
            AttributeLayout {
                offset: usize::MAX - 3,
                ..AttributeLayout::floats(2)
            },
        )
        .unwrap();

    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()),
        Err(Error::InvalidDrawState(_))
    ));
    assert_eq!(fixture.driver.draw_count(), 0);
}

#[test]
fn constant_attribute() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let mut attributes = fixture.quad_attributes(&buffer);
    attributes.set_constant(1, [0.5, 0.5, 0.0, 1.0]).unwrap();
    assert!(attributes.layout(1).is_none());

    draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()).unwrap();
    assert_eq!(fixture.driver.draw_calls()[0].enabled_attributes, vec![0]);
    let uv = fixture.driver.vertex_attrib(1).unwrap();
    assert!(!uv.enabled);
    assert_eq!(uv.constant, [0.5, 0.5, 0.0, 1.0]);

    attributes.remove(1);
    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()),
        Err(Error::MissingAttribute { slot: 1 })
    ));
}

#[test]
fn program_must_be_linked() {
    let fixture = Fixture::new();
    let program = Program::new(&fixture.context).unwrap();
    let attributes = VertexAttributes::create(&fixture.context).unwrap();
    assert!(matches!(
        draw(&program, &attributes, Topology::Points, 1, &DrawOptions::default()),
        Err(Error::InvalidDrawState(_))
    ));

    let mut linked = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let attributes = fixture.quad_attributes(&buffer);
    linked.destroy();
    assert!(matches!(
        draw(&linked, &attributes, Topology::Triangles, 6, &DrawOptions::default()),
        Err(Error::InvalidDrawState(_))
    ));
    assert_eq!(fixture.driver.draw_count(), 0);
}

#[test]
fn vertex_count_is_bounded_by_buffers() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let attributes = fixture.quad_attributes(&buffer);

    let bad = [
        (7, DrawOptions::default()),
        (4, DrawOptions { first: 3, ..DrawOptions::default() }),
        (1, DrawOptions { instance_count: 0, ..DrawOptions::default() }),
    ];
    for (count, options) in bad.iter() {
        assert!(matches!(
            draw(&program, &attributes, Topology::Triangles, *count, options),
            Err(Error::InvalidDrawState(_))
        ));
    }
    draw(
        &program,
        &attributes,
        Topology::TriangleStrip,
        3,
        &DrawOptions { first: 3, ..DrawOptions::default() },
    )
    .unwrap();
    assert_eq!(fixture.driver.draw_count(), 1);
}

#[test]
fn undeclared_and_destroyed_sources() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let mut buffer = fixture.quad_buffer();
    let mut attributes = fixture.quad_attributes(&buffer);

    attributes.set_constant(5, [0.0; 4]).unwrap();
    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()),
        Err(Error::InvalidDrawState(_))
    ));
    attributes.remove(5);

    buffer.destroy();
    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()),
        Err(Error::InvalidDrawState(_))
    ));
    assert!(matches!(
        attributes.set_attribute(0, &buffer, AttributeLayout::floats(3)),
        Err(Error::UseAfterFree { .. })
    ));
    assert_eq!(fixture.driver.draw_count(), 0);
}

#[test]
fn attribute_setup_is_validated() {
    let fixture = Fixture::new();
    let vertices = fixture.quad_buffer();
    let indices = Buffer::create(&fixture.context, BufferTarget::Index, BufferUsage::Static).unwrap();
    let mut attributes = VertexAttributes::create(&fixture.context).unwrap();
    assert!(matches!(
        attributes.set_attribute(16, &vertices, AttributeLayout::floats(3)),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        attributes.set_attribute(0, &indices, AttributeLayout::floats(3)),
        Err(Error::InvalidLayout(_))
    ));
    assert!(matches!(
        attributes.set_attribute(0, &vertices, AttributeLayout { stride: 256, ..AttributeLayout::floats(3) }),
        Err(Error::InvalidLayout(_))
    ));
    assert!(!attributes.is_set(0));
}

#[test]
fn indexed_draw() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let attributes = fixture.quad_attributes(&buffer);
    let mut indices = Buffer::create(&fixture.context, BufferTarget::Index, BufferUsage::Static).unwrap();
    indices.upload_slice(&[0u16, 1, 2, 0, 2, 5], 0).unwrap();

    let options = DrawOptions {
        index_buffer: Some((&indices, IndexType::UnsignedShort)),
        ..DrawOptions::default()
    };
    draw(&program, &attributes, Topology::Triangles, 6, &options).unwrap();
    let call = &fixture.driver.draw_calls()[0];
    assert_eq!(call.indices, Some((gl::UNSIGNED_SHORT, 0)));
    assert_eq!(call.count, 6);
    assert_eq!(
        fixture.context.current_buffer(gl::ELEMENT_ARRAY_BUFFER),
        indices.handle()
    );

    let offset = DrawOptions { index_offset: 6, ..options };
    draw(&program, &attributes, Topology::Triangles, 3, &offset).unwrap();
    assert_eq!(fixture.driver.draw_calls()[1].indices, Some((gl::UNSIGNED_SHORT, 6)));

    let too_many = draw(&program, &attributes, Topology::Triangles, 7, &options);
    assert!(matches!(too_many, Err(Error::InvalidDrawState(_))));
    let misaligned = DrawOptions { index_offset: 1, ..options };
    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 2, &misaligned),
        Err(Error::InvalidDrawState(_))
    ));
    let wrong_target = DrawOptions {
        index_buffer: Some((&buffer, IndexType::UnsignedShort)),
        ..DrawOptions::default()
    };
    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 6, &wrong_target),
        Err(Error::InvalidDrawState(_))
    ));
    assert_eq!(fixture.driver.draw_count(), 2);
}

#[test]
fn instanced_draw() {
    let fixture = Fixture::new();
    let program =
        Program::create(&fixture.context, INSTANCED_VERTEX_SHADER, PLAIN_FRAGMENT_SHADER).unwrap();
    let mut positions =
        Buffer::create(&fixture.context, BufferTarget::Vertex, BufferUsage::Static).unwrap();
    positions.upload_slice(&[0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0], 0).unwrap();
    let mut offsets =
        Buffer::create(&fixture.context, BufferTarget::Vertex, BufferUsage::Dynamic).unwrap();
    offsets.upload_slice(&[0.0f32, 0.0, 2.0, 0.0, 4.0, 0.0], 0).unwrap();

    let mut attributes = VertexAttributes::create(&fixture.context).unwrap();
    attributes.set_attribute(0, &positions, AttributeLayout::floats(2)).unwrap();
    attributes
        .set_attribute(1, &offsets, AttributeLayout { divisor: 1, ..AttributeLayout::floats(2) })
        .unwrap();

    let options = DrawOptions { instance_count: 3, ..DrawOptions::default() };
    draw(&program, &attributes, Topology::Triangles, 3, &options).unwrap();
    assert_eq!(fixture.driver.draw_calls()[0].instances, 3);
    assert_eq!(fixture.driver.vertex_attrib(1).unwrap().divisor, 1);

    let too_many = DrawOptions { instance_count: 4, ..DrawOptions::default() };
    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 3, &too_many),
        Err(Error::InvalidDrawState(_))
    ));

    // a divisor of 2 stretches three elements over six instances
    attributes
        .set_attribute(1, &offsets, AttributeLayout { divisor: 2, ..AttributeLayout::floats(2) })
        .unwrap();
    let six = DrawOptions { instance_count: 6, ..DrawOptions::default() };
    draw(&program, &attributes, Topology::Triangles, 3, &six).unwrap();
    assert_eq!(fixture.driver.draw_count(), 2);
}

#[test]
fn instancing_needs_support() {
    let fixture = Fixture::with_config(HeadlessConfig::webgl1());
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let attributes = fixture.quad_attributes(&buffer);
    let options = DrawOptions { instance_count: 2, ..DrawOptions::default() };
    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 6, &options),
        Err(Error::InvalidDrawState(_))
    ));
    draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()).unwrap();

    let mut extended = HeadlessConfig::webgl1();
    extended.extensions.push("ANGLE_instanced_arrays".to_string());
    let fixture = Fixture::with_config(extended);
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let attributes = fixture.quad_attributes(&buffer);
    draw(&program, &attributes, Topology::Triangles, 6, &options).unwrap();
}

#[test]
fn framebuffer_target() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let attributes = fixture.quad_attributes(&buffer);

    let color = Texture2D::create(&fixture.context, 32, 32, TextureFormat::Rgba8, 1).unwrap();
    let depth = Renderbuffer::create(&fixture.context, 16, 16, TextureFormat::Depth16).unwrap();
    let mut framebuffer = Framebuffer::create(&fixture.context).unwrap();
    framebuffer
        .attach(AttachmentPoint::Color(0), Attachment::texture(&color))
        .unwrap();
    framebuffer
        .attach(AttachmentPoint::Depth, Attachment::renderbuffer(&depth))
        .unwrap();

    let options = DrawOptions { framebuffer: Some(&framebuffer), ..DrawOptions::default() };
    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 6, &options),
        Err(Error::IncompleteFramebuffer(IncompleteReason::DimensionMismatch { .. }))
    ));
    assert_eq!(fixture.driver.draw_count(), 0);

    framebuffer.detach(AttachmentPoint::Depth).unwrap();
    let options = DrawOptions { framebuffer: Some(&framebuffer), ..DrawOptions::default() };
    draw(&program, &attributes, Topology::Triangles, 6, &options).unwrap();
    assert_eq!(fixture.driver.draw_calls()[0].framebuffer, framebuffer.handle());

    // back to the default surface
    draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()).unwrap();
    assert_eq!(fixture.driver.draw_calls()[1].framebuffer, None);
    assert_eq!(fixture.context.current_framebuffer(), None);
}

#[test]
fn objects_from_another_context() {
    let fixture = Fixture::new();
    let other = Fixture::new();
    let program = other.quad_program();
    let buffer = fixture.quad_buffer();
    let attributes = fixture.quad_attributes(&buffer);
    assert!(matches!(
        draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()),
        Err(Error::InvalidDrawState(_))
    ));
    assert!(matches!(
        VertexAttributes::create(&other.context)
            .unwrap()
            .set_attribute(0, &buffer, AttributeLayout::floats(3)),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn lost_context() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let buffer = fixture.quad_buffer();
    let attributes = fixture.quad_attributes(&buffer);
    fixture.driver.lose_context();
    assert!(fixture.context.is_lost());
    assert_eq!(
        draw(&program, &attributes, Topology::Triangles, 6, &DrawOptions::default()),
        Err(Error::ContextLost)
    );
}
