mod common;

use artifice_gl::api::{gl, HeadlessConfig};
use artifice_gl::{
    CubeFace, Error, Filter, MipmapMode, Renderbuffer, Texture2D, TextureCube, TextureFormat,
    TextureParameters, WrapMode,
};
use common::{solid_rgba8, Fixture};

#[test]
fn upload_then_read_back() {
    let fixture = Fixture::new();
    for &(width, height) in &[(1, 1), (4, 4), (17, 3), (64, 32)] {
        let texture =
            Texture2D::create(&fixture.context, width, height, TextureFormat::Rgba8, 1).unwrap();
        let data: Vec<u8> = (0..width * height * 4).map(|i| (i % 251) as u8).collect();
        texture.set_image_data(0, &data).unwrap();
        assert_eq!(texture.read_pixels(0).unwrap(), data, "{}x{}", width, height);
    }
}

#[test]
fn other_color_formats_round_trip() {
    let fixture = Fixture::new();
    for &format in &[TextureFormat::R8, TextureFormat::Rg8, TextureFormat::Rgba16F] {
        let texture = Texture2D::create(&fixture.context, 8, 2, format, 1).unwrap();
        let data: Vec<u8> = (0..16 * format.byte_size()).map(|i| i as u8).collect();
        texture.set_image_data(0, &data).unwrap();
        assert_eq!(texture.read_pixels(0).unwrap(), data, "{:?}", format);
    }
}

#[test]
fn image_data_size_is_checked_per_level() {
    let fixture = Fixture::new();
    let texture = Texture2D::create(&fixture.context, 16, 8, TextureFormat::Rgba8, 3).unwrap();
    texture.set_image_data(2, &solid_rgba8(4, 2, [1, 2, 3, 4])).unwrap();
    assert_eq!(
        texture.set_image_data(1, &solid_rgba8(4, 2, [0; 4])),
        Err(Error::FormatMismatch {
            expected: 8 * 4 * 4,
            found: 4 * 2 * 4
        })
    );
    assert!(matches!(
        texture.set_image_data(3, &[]),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn creation_limits() {
    let fixture = Fixture::with_config(HeadlessConfig {
        max_texture_size: 256,
        ..HeadlessConfig::default()
    });
    assert!(Texture2D::create(&fixture.context, 256, 256, TextureFormat::Rgba8, 9).is_ok());
    assert!(matches!(
        Texture2D::create(&fixture.context, 512, 4, TextureFormat::Rgba8, 1),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        Texture2D::create(&fixture.context, 0, 4, TextureFormat::Rgba8, 1),
        Err(Error::InvalidParameter(_))
    ));
    // 4x4 has 3 levels
    assert!(matches!(
        Texture2D::create(&fixture.context, 4, 4, TextureFormat::Rgba8, 4),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        Texture2D::create(&fixture.context, 4, 4, TextureFormat::Stencil8, 1),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn default_parameters_are_applied_at_creation() {
    let fixture = Fixture::new();
    let texture = Texture2D::create(&fixture.context, 4, 4, TextureFormat::Rgba8, 1).unwrap();
    let handle = texture.handle().unwrap();
    assert_eq!(*texture.parameters(), TextureParameters::default());
    assert_eq!(
        fixture.driver.texture_parameter(handle, gl::TEXTURE_MIN_FILTER),
        Some(gl::LINEAR)
    );
    assert_eq!(
        fixture.driver.texture_parameter(handle, gl::TEXTURE_WRAP_S),
        Some(gl::CLAMP_TO_EDGE)
    );
}

#[test]
fn set_parameters() {
    let fixture = Fixture::new();
    let mut texture = Texture2D::create(&fixture.context, 8, 8, TextureFormat::Rgba8, 4).unwrap();
    texture
        .set_parameters(&TextureParameters::LINEAR_MIPMAP_LINEAR)
        .unwrap();
    let handle = texture.handle().unwrap();
    assert_eq!(
        fixture.driver.texture_parameter(handle, gl::TEXTURE_MIN_FILTER),
        Some(gl::LINEAR_MIPMAP_LINEAR)
    );

    let params = TextureParameters {
        wrap_s: WrapMode::Repeat,
        wrap_t: WrapMode::Mirror,
        ..TextureParameters::NEAREST
    };
    texture.set_parameters(&params).unwrap();
    assert_eq!(texture.parameters(), &params);
    assert_eq!(
        fixture.driver.texture_parameter(handle, gl::TEXTURE_WRAP_T),
        Some(gl::MIRRORED_REPEAT)
    );
    assert_eq!(
        fixture.driver.texture_parameter(handle, gl::TEXTURE_MAG_FILTER),
        Some(gl::NEAREST)
    );
}

#[test]
fn mipmap_filter_needs_mip_levels() {
    let fixture = Fixture::new();
    let mut texture = Texture2D::create(&fixture.context, 8, 8, TextureFormat::Rgba8, 1).unwrap();
    let params = TextureParameters {
        mipmap_mode: MipmapMode::Nearest,
        ..TextureParameters::default()
    };
    assert!(matches!(
        texture.set_parameters(&params),
        Err(Error::InvalidParameter(_))
    ));
    // rejected parameters are not applied
    assert_eq!(*texture.parameters(), TextureParameters::default());

    let with_r = TextureParameters {
        wrap_r: Some(WrapMode::Repeat),
        ..TextureParameters::default()
    };
    assert!(matches!(
        texture.set_parameters(&with_r),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn cube_faces() {
    let fixture = Fixture::new();
    let mut cube = TextureCube::create(&fixture.context, 4, 4, TextureFormat::Rgba8, 1).unwrap();
    for (i, &face) in CubeFace::ALL.iter().enumerate() {
        cube.set_image_data(face, 0, &solid_rgba8(4, 4, [i as u8; 4])).unwrap();
    }
    assert_eq!(
        cube.read_pixels(CubeFace::NegativeY, 0).unwrap(),
        solid_rgba8(4, 4, [3; 4])
    );
    cube.set_parameters(&TextureParameters {
        min_filter: Filter::Nearest,
        wrap_r: Some(WrapMode::Repeat),
        ..TextureParameters::default()
    })
    .unwrap();
    assert_eq!(
        fixture
            .driver
            .texture_parameter(cube.handle().unwrap(), gl::TEXTURE_WRAP_R),
        Some(gl::REPEAT)
    );
    assert!(matches!(
        TextureCube::create(&fixture.context, 4, 8, TextureFormat::Rgba8, 1),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn depth_textures_cannot_be_read_back() {
    let fixture = Fixture::new();
    let texture = Texture2D::create(&fixture.context, 4, 4, TextureFormat::Depth24, 1).unwrap();
    assert!(matches!(
        texture.read_pixels(0),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn renderbuffer_lifecycle() {
    let fixture = Fixture::new();
    let mut renderbuffer =
        Renderbuffer::create(&fixture.context, 32, 16, TextureFormat::Depth24Stencil8).unwrap();
    assert_eq!((renderbuffer.width(), renderbuffer.height()), (32, 16));
    assert_eq!(renderbuffer.format(), TextureFormat::Depth24Stencil8);
    assert_eq!(
        fixture.context.current_renderbuffer(),
        renderbuffer.handle()
    );
    renderbuffer.destroy();
    renderbuffer.destroy();
    assert!(renderbuffer.is_destroyed());
    assert_eq!(fixture.driver.delete_count(), 1);
    assert_eq!(fixture.context.current_renderbuffer(), None);

    assert!(matches!(
        Renderbuffer::create(&fixture.context, 0, 16, TextureFormat::Rgba8),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn destroyed_texture() {
    let fixture = Fixture::new();
    let mut texture = Texture2D::create(&fixture.context, 4, 4, TextureFormat::Rgba8, 1).unwrap();
    texture.destroy();
    texture.destroy();
    assert_eq!(fixture.driver.invalid_deletes(), 0);
    assert!(matches!(
        texture.set_image_data(0, &solid_rgba8(4, 4, [0; 4])),
        Err(Error::UseAfterFree { .. })
    ));
}
