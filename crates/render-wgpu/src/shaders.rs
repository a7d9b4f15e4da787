/// WGSL shader for voxel chunk meshes.
///
/// Two vertex entry points cover the two vertex layouts. Faces are shaded by a
/// normal rebuilt from screen-space derivatives, so meshes carry no normals.
/// Textured meshes get darkened quad borders from their UVs.
pub const CHUNK_SHADER: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    model_view: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

fn transform(position: vec3<f32>, uv: vec2<f32>) -> VertexOutput {
    let view_position = uniforms.model_view * vec4<f32>(position, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.projection * view_position;
    out.view_position = view_position.xyz;
    out.uv = uv;
    return out;
}

@vertex
fn vs_position(@location(0) position: vec3<f32>) -> VertexOutput {
    // Centre of the quad: no border darkening.
    return transform(position, vec2<f32>(0.5, 0.5));
}

@vertex
fn vs_textured(
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
) -> VertexOutput {
    return transform(position, uv);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(cross(dpdx(in.view_position), dpdy(in.view_position)));
    let to_eye = normalize(-in.view_position);
    let facing = abs(dot(normal, to_eye));
    let lighting = 0.35 + 0.65 * facing;

    let edge = min(min(in.uv.x, 1.0 - in.uv.x), min(in.uv.y, 1.0 - in.uv.y));
    let border = mix(0.6, 1.0, smoothstep(0.0, 0.06, edge));

    let base = vec3<f32>(0.45, 0.62, 0.38);
    return vec4<f32>(base * lighting * border, 1.0);
}
"#;
