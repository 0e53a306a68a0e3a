mod common;

use artifice_gl::api::gl;
use artifice_gl::{Error, Program, ProgramState, ShaderStage, UniformValue};
use common::{Fixture, FRAGMENT_SHADER, VERTEX_SHADER};

const BROKEN_FRAGMENT_SHADER: &str = "
    precision mediump float;
    uniform vec5 tint;
    void main() {}
";

/// Reads a varying the vertex shader never writes.
const UNLINKABLE_FRAGMENT_SHADER: &str = "
    precision mediump float;
    varying vec3 v_normal;
    void main() {}
";

#[test]
fn caches_locations_after_link() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    assert_eq!(program.state(), ProgramState::Linked);
    assert_eq!(program.attribute_location("position"), Ok(0));
    assert_eq!(program.attribute_location("uv"), Ok(1));
    assert_eq!(program.uniform_location("transform"), Ok(0));
    assert_eq!(program.uniform_location("tint"), Ok(1));
    assert_eq!(program.uniform_location("albedo"), Ok(2));

    let names: Vec<_> = program.attributes().iter().map(|a| a.name.clone()).collect();
    assert_eq!(names, ["position", "uv"]);
    assert_eq!(program.uniforms()[0].ty, gl::FLOAT_MAT4);
}

#[test]
fn unknown_names() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    assert_eq!(
        program.uniform_location("normal_matrix"),
        Err(Error::UnknownLocation {
            name: "normal_matrix".to_string()
        })
    );
    assert!(matches!(
        program.attribute_location("tint"),
        Err(Error::UnknownLocation { .. })
    ));
}

#[test]
fn compile_failure_names_the_stage() {
    let fixture = Fixture::new();
    let err = Program::create(&fixture.context, VERTEX_SHADER, BROKEN_FRAGMENT_SHADER).unwrap_err();
    match err {
        Error::ShaderCompile { stage, log } => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(log.contains("vec5"), "{}", log);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // no shader or program object leaks out of a failed build
    assert_eq!(fixture.driver.live_object_count(), 0);
}

#[test]
fn malformed_layout_is_a_compile_error() {
    let fixture = Fixture::new();
    let source = "layout) (location = 0) in vec3 p;\nvoid main() {}";
    let err = Program::create(&fixture.context, source, FRAGMENT_SHADER).unwrap_err();
    match err {
        Error::ShaderCompile { stage, log } => {
            assert_eq!(stage, ShaderStage::Vertex);
            assert!(log.contains("syntax error"), "{}", log);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(fixture.driver.live_object_count(), 0);
}

#[test]
fn failed_rebuild_drops_previous_locations() {
    let fixture = Fixture::new();
    let mut program = fixture.quad_program();
    assert_eq!(program.uniform_location("tint"), Ok(1));

    let err = program.build(VERTEX_SHADER, UNLINKABLE_FRAGMENT_SHADER).unwrap_err();
    assert!(matches!(err, Error::Link { .. }));
    assert_eq!(program.state(), ProgramState::Failed);
    assert!(matches!(
        program.uniform_location("tint"),
        Err(Error::UnknownLocation { .. })
    ));
    assert!(matches!(
        program.attribute_location("position"),
        Err(Error::UnknownLocation { .. })
    ));

    // and a good build brings them back
    program.build(VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
    assert_eq!(program.uniform_location("tint"), Ok(1));
}

#[test]
fn pending_program_has_no_locations() {
    let fixture = Fixture::new();
    let program = Program::new(&fixture.context).unwrap();
    assert_eq!(program.state(), ProgramState::Pending);
    assert!(matches!(
        program.uniform_location("tint"),
        Err(Error::UnknownLocation { .. })
    ));
}

#[test]
fn set_uniform_checks_types() {
    let fixture = Fixture::new();
    let program = fixture.quad_program();
    let tint = program.uniform_location("tint").unwrap();
    program.set_uniform(tint, UniformValue::Vec4([1.0, 0.5, 0.25, 1.0])).unwrap();
    assert_eq!(
        fixture.driver.uniform_value(program.handle().unwrap(), tint),
        Some(UniformValue::Vec4([1.0, 0.5, 0.25, 1.0]))
    );
    assert_eq!(fixture.context.current_program(), program.handle());

    assert_eq!(
        program.set_uniform(tint, UniformValue::Vec3([1.0, 0.5, 0.25])),
        Err(Error::TypeMismatch {
            name: "tint".to_string(),
            expected: "vec4",
            found: "vec3",
        })
    );
    program
        .set_uniform_by_name("albedo", UniformValue::Sampler(3))
        .unwrap();
    assert!(matches!(
        program.set_uniform_by_name("albedo", UniformValue::Float(3.0)),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        program.set_uniform(42, UniformValue::Float(0.0)),
        Err(Error::UnknownLocation { .. })
    ));
}

#[test]
fn array_uniforms_are_rejected() {
    let fixture = Fixture::new();
    let program = Program::create(
        &fixture.context,
        "attribute vec3 position;\nuniform vec4 palette[4];\nvoid main() {}",
        "void main() {}",
    )
    .unwrap();
    assert!(matches!(
        program.set_uniform_by_name("palette", UniformValue::Vec4([0.0; 4])),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn destroy_releases_shaders_and_program() {
    let fixture = Fixture::new();
    let mut program = fixture.quad_program();
    assert_eq!(fixture.driver.live_object_count(), 3);
    program.destroy();
    program.destroy();
    assert_eq!(fixture.driver.live_object_count(), 0);
    assert_eq!(fixture.driver.delete_count(), 3);
    assert_eq!(fixture.driver.invalid_deletes(), 0);
    assert!(matches!(
        program.uniform_location("tint"),
        Err(Error::UseAfterFree { .. })
    ));
}
