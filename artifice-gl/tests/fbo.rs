mod common;

use artifice_gl::{
    clear, AttachmentPoint, ClearOptions, Error, Fbo, ObjectKind, TextureFormat,
};
use common::{solid_rgba8, Fixture};

#[test]
fn create_with_depth() {
    let fixture = Fixture::new();
    let fbo = Fbo::create(
        &fixture.context,
        64,
        32,
        TextureFormat::Rgba8,
        Some(TextureFormat::Depth24),
    )
    .unwrap();
    assert_eq!(fbo.size(), (64, 32));
    assert!(fbo.framebuffer().is_complete());
    assert_eq!(
        fbo.framebuffer().attachment(AttachmentPoint::Color(0)),
        fbo.color_texture().handle()
    );
    assert_eq!(
        fbo.framebuffer().attachment(AttachmentPoint::Depth),
        fbo.depth_renderbuffer().and_then(|r| r.handle())
    );
    // framebuffer, texture and renderbuffer
    assert_eq!(fixture.driver.live_object_count(), 3);
}

#[test]
fn depth_stencil_goes_to_the_combined_slot() {
    let fixture = Fixture::new();
    let fbo = Fbo::create(
        &fixture.context,
        16,
        16,
        TextureFormat::Rgba8,
        Some(TextureFormat::Depth24Stencil8),
    )
    .unwrap();
    assert_eq!(
        fbo.framebuffer().attachment_points(),
        vec![AttachmentPoint::Color(0), AttachmentPoint::DepthStencil]
    );
}

#[test]
fn render_and_read_back() {
    let fixture = Fixture::new();
    let fbo = Fbo::create(&fixture.context, 2, 2, TextureFormat::Rgba8, None).unwrap();
    clear(
        &fixture.context,
        Some(fbo.framebuffer()),
        &ClearOptions::color([0.0, 1.0, 0.0, 1.0]),
    )
    .unwrap();
    assert_eq!(
        fbo.color_texture().read_pixels(0).unwrap(),
        solid_rgba8(2, 2, [0, 255, 0, 255])
    );
}

#[test]
fn failed_creation_releases_everything() {
    let fixture = Fixture::new();
    assert!(matches!(
        Fbo::create(
            &fixture.context,
            8,
            8,
            TextureFormat::Rgba8,
            Some(TextureFormat::Rgba8)
        ),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        Fbo::create(&fixture.context, 8, 8, TextureFormat::Depth16, None),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        Fbo::create(&fixture.context, 100_000, 8, TextureFormat::Rgba8, None),
        Err(Error::InvalidParameter(_))
    ));
    assert_eq!(fixture.driver.live_object_count(), 0);
    assert_eq!(fixture.driver.invalid_deletes(), 0);
}

#[test]
fn incomplete_result_is_reported() {
    // float color targets are not renderable without EXT_color_buffer_float
    let fixture = Fixture::with_config(artifice_gl::api::HeadlessConfig::webgl1());
    let err = Fbo::create(&fixture.context, 8, 8, TextureFormat::Rgba16F, None).unwrap_err();
    assert!(matches!(err, Error::IncompleteFramebuffer(_)));
    assert_eq!(fixture.driver.live_object_count(), 0);
}

#[test]
fn resize_recreates_everything() {
    let fixture = Fixture::new();
    let mut fbo = Fbo::create(
        &fixture.context,
        8,
        8,
        TextureFormat::Rgba8,
        Some(TextureFormat::Depth16),
    )
    .unwrap();
    let old_color = fbo.color_texture().handle().unwrap();
    let old_framebuffer = fbo.framebuffer().handle().unwrap();

    fbo.resize(20, 10).unwrap();
    assert_eq!(fbo.size(), (20, 10));
    assert_eq!(fbo.depth_renderbuffer().map(|r| r.width()), Some(20));
    assert!(fbo.framebuffer().is_complete());
    assert!(!fixture.driver.is_live(old_color));
    assert!(!fixture.driver.is_live(old_framebuffer));
    assert_eq!(fixture.driver.live_object_count(), 3);

    // same size is a no-op
    let color = fbo.color_texture().handle();
    fbo.resize(20, 10).unwrap();
    assert_eq!(fbo.color_texture().handle(), color);

    // a failed resize leaves the previous targets in place
    assert!(fbo.resize(0, 10).is_err());
    assert_eq!(fbo.size(), (20, 10));
    assert!(fbo.framebuffer().is_complete());
}

#[test]
fn destroy_releases_owned_attachments() {
    let fixture = Fixture::new();
    let mut fbo = Fbo::create(
        &fixture.context,
        8,
        8,
        TextureFormat::Rgba8,
        Some(TextureFormat::Depth16),
    )
    .unwrap();
    fbo.destroy();
    fbo.destroy();
    assert!(fbo.is_destroyed());
    assert_eq!(fixture.driver.live_object_count(), 0);
    assert_eq!(fixture.driver.delete_count(), 3);
    assert_eq!(fixture.driver.invalid_deletes(), 0);
    assert_eq!(
        fbo.resize(4, 4),
        Err(Error::UseAfterFree {
            kind: ObjectKind::Framebuffer
        })
    );
    drop(fbo);
    assert_eq!(fixture.driver.delete_count(), 3);
}
