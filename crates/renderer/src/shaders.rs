use std::borrow::Cow;
use std::path::Path;

use anyhow::{Context, Result};

/// Name of the per-vertex clip-space input of the vertex stage.
pub const POSITION_ATTRIBUTE: &str = "position";
/// Seconds since the first rendered frame.
pub const TIME_UNIFORM: &str = "iTime";
/// Drawable width and height in pixels.
pub const RESOLUTION_UNIFORM: &str = "iResolution";

/// Vertex/fragment source pair fed to the program builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderSources {
    /// The bundled aurora shaders.
    pub fn builtin() -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER_GLSL),
            fragment: Cow::Borrowed(AURORA_FRAGMENT_GLSL),
        }
    }

    /// Replaces either stage with the contents of a file, keeping the bundled
    /// source for the other.
    pub fn load(vertex: Option<&Path>, fragment: Option<&Path>) -> Result<Self> {
        let mut sources = Self::builtin();
        if let Some(path) = vertex {
            sources.vertex = Cow::Owned(read_source(path)?);
        }
        if let Some(path) = fragment {
            sources.fragment = Cow::Owned(read_source(path)?);
        }
        Ok(sources)
    }

    pub fn is_builtin(&self) -> bool {
        matches!(
            (&self.vertex, &self.fragment),
            (Cow::Borrowed(_), Cow::Borrowed(_))
        )
    }
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self::builtin()
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read shader at {}", path.display()))
}

/// Identity pass-through of the full-screen quad.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 position;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = position * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Procedural aurora: three drifting light curtains over a night sky.
///
/// Only `iTime` and `iResolution` drive the image. `iResolution` must never be
/// zero in either axis; the surface manager clamps it to at least 1x1.
pub const AURORA_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 fragColor;

layout(std140, set = 0, binding = 0) uniform AuroraParams {
    float iTime;
    vec2 iResolution;
};

float hash(vec2 p) {
    p = fract(p * vec2(123.34, 456.21));
    p = p + vec2(dot(p, p + vec2(45.32, 45.32)));
    return fract(p.x * p.y);
}

float noise(vec2 p) {
    vec2 cell = floor(p);
    vec2 f = fract(p);
    vec2 u = f * f * (vec2(3.0, 3.0) - 2.0 * f);
    float a = hash(cell);
    float b = hash(cell + vec2(1.0, 0.0));
    float c = hash(cell + vec2(0.0, 1.0));
    float d = hash(cell + vec2(1.0, 1.0));
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}

float fbm(vec2 p) {
    float value = 0.0;
    float amplitude = 0.5;
    for (int octave = 0; octave < 5; octave++) {
        value += amplitude * noise(p);
        p = p * 2.02 + vec2(1.7, 9.2);
        amplitude *= 0.5;
    }
    return value;
}

void main() {
    vec2 uv = gl_FragCoord.xy / iResolution;
    float aspect = iResolution.x / iResolution.y;
    // Framebuffer origin is top-left; the curtains hang from the top.
    vec2 p = vec2(uv.x * aspect, 1.0 - uv.y);
    float t = iTime * 0.15;

    vec3 sky = mix(vec3(0.0, 0.01, 0.04), vec3(0.01, 0.04, 0.10), p.y);
    vec3 color = sky;

    for (int band = 0; band < 3; band++) {
        float fb = float(band);
        float drift = fbm(vec2(p.x * 1.5 + t + fb * 3.1, t * 0.5 + fb));
        float center = 0.55 + 0.12 * fb - 0.25 * drift;
        float dist = p.y - center;
        float glow = exp(-dist * dist * 60.0);
        float curtain = fbm(vec2(p.x * 6.0 - t * 2.0, p.y * 2.0 + fb));
        float rays = smoothstep(0.35, 0.9, curtain);
        vec3 tint = mix(vec3(0.10, 0.95, 0.60), vec3(0.55, 0.25, 0.95), fb * 0.5);
        color += tint * glow * (0.35 + 0.9 * rays);
    }

    float star = step(0.9975, hash(floor(gl_FragCoord.xy)));
    float twinkle = 0.5 + 0.5 * sin(iTime * 3.0 + hash(floor(gl_FragCoord.xy) + vec2(7.0, 3.0)) * 40.0);
    color += vec3(star * twinkle * smoothstep(0.3, 1.0, p.y));

    float vignette = 1.0 - smoothstep(0.35, 1.25, length(v_uv - vec2(0.5, 0.5)));
    fragColor = vec4(color * vignette, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sources_declare_the_uniform_contract() {
        let sources = ShaderSources::builtin();
        assert!(sources.is_builtin());
        assert!(sources.vertex.contains(POSITION_ATTRIBUTE));
        assert!(sources.fragment.contains(TIME_UNIFORM));
        assert!(sources.fragment.contains(RESOLUTION_UNIFORM));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ShaderSources::load(None, Some(Path::new("/nonexistent/aurora.frag")))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/aurora.frag"));
    }
}
