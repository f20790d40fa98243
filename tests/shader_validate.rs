//! Parses and validates the renderer's WGSL with naga, so shader typos fail
//! in CI instead of at window creation.

use neon_swarm::gpu::connections::LINE_SHADER;
use neon_swarm::gpu::BILLBOARD_SHADER;

fn validate_wgsl(code: &str) -> Result<(), String> {
    let module = naga::front::wgsl::parse_str(code).map_err(|e| format!("WGSL parse error: {:?}", e))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(())
}

fn entry_points(code: &str) -> Vec<String> {
    let module = naga::front::wgsl::parse_str(code).expect("shader parses");
    module.entry_points.iter().map(|ep| ep.name.clone()).collect()
}

#[test]
fn test_billboard_shader_is_valid() {
    validate_wgsl(BILLBOARD_SHADER).unwrap();
}

#[test]
fn test_line_shader_is_valid() {
    validate_wgsl(LINE_SHADER).unwrap();
}

#[test]
fn test_entry_points_match_pipelines() {
    for shader in [BILLBOARD_SHADER, LINE_SHADER] {
        let names = entry_points(shader);
        assert!(names.contains(&"vs_main".to_string()));
        assert!(names.contains(&"fs_main".to_string()));
    }
}
