/// WGSL shader for lit box meshes. One instance per draw.
pub const MESH_SHADER: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    // xyz: unit vector towards the light, w: ambient term
    light: vec4<f32>,
    eye: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> frame: Frame;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
};

struct InstanceInput {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) color: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = frame.view_proj * world_pos;
    out.world_position = world_pos.xyz;
    out.world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.world_normal);
    let l = frame.light.xyz;
    let ambient = frame.light.w;
    let diffuse = max(dot(n, l), 0.0);
    let v = normalize(frame.eye.xyz - in.world_position);
    let specular = pow(max(dot(reflect(-l, n), v), 0.0), 32.0) * 0.2;
    let lighting = ambient + diffuse * (1.0 - ambient);
    return vec4<f32>(in.color * lighting + vec3<f32>(specular), 1.0);
}
"#;

/// WGSL shader for the sky: a fullscreen triangle at the far plane whose
/// fragments look up their world direction through the inverse
/// view-direction-projection matrix.
pub const SKY_SHADER: &str = r#"
struct Sky {
    inverse_view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> sky: Sky;

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_sky(@builtin(vertex_index) index: u32) -> SkyOutput {
    let x = f32(i32(index & 1u) * 4 - 1);
    let y = f32(i32(index >> 1u) * 4 - 1);
    var out: SkyOutput;
    out.clip_position = vec4<f32>(x, y, 1.0, 1.0);
    out.ndc = vec2<f32>(x, y);
    return out;
}

@fragment
fn fs_sky(in: SkyOutput) -> @location(0) vec4<f32> {
    let t = sky.inverse_view_proj * vec4<f32>(in.ndc, 1.0, 1.0);
    let dir = normalize(t.xyz / t.w);
    let horizon = vec3<f32>(0.78, 0.84, 0.9);
    let zenith = vec3<f32>(0.25, 0.45, 0.75);
    let ground = vec3<f32>(0.35, 0.33, 0.3);
    var color: vec3<f32>;
    if dir.y >= 0.0 {
        color = mix(horizon, zenith, pow(dir.y, 0.6));
    } else {
        color = mix(horizon, ground, min(-dir.y * 4.0, 1.0));
    }
    return vec4<f32>(color, 1.0);
}
"#;
