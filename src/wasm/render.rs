use js_sys::Float32Array;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation, WebGlVertexArrayObject, WebglLoseContext,
};

use crate::params::ParameterSet;
use crate::polytope::{edge_lines, hsv_to_rgb, project_tesseract, tesseract_edges, ProjectionSettings};
use crate::surface::LayerRole;

const VERTEX_SRC: &str = r#"#version 300 es
in vec2 a_pos;
uniform float u_aspect;
void main() {
    gl_Position = vec4(a_pos.x / max(u_aspect, 0.0001), a_pos.y, 0.0, 1.0);
}
"#;

const FRAGMENT_SRC: &str = r#"#version 300 es
precision mediump float;
uniform vec3 u_color;
uniform float u_intensity;
uniform float u_alpha;
out vec4 frag;
void main() {
    frag = vec4(u_color * (0.6 + 0.4 * u_intensity), clamp(u_alpha * u_intensity, 0.0, 1.0));
}
"#;

/// Per-layer look: projection, opacity and hue shift.
fn layer_style(role: LayerRole) -> (ProjectionSettings, f32, f64) {
    let base = ProjectionSettings::default();
    match role {
        LayerRole::Content => (base, 0.9, 0.0),
        LayerRole::Accent => (ProjectionSettings { scale: 3.4, ..base }, 0.35, 45.0),
        LayerRole::Shadow => (ProjectionSettings { camera_w: 3.6, ..base }, 0.2, 180.0),
        LayerRole::Highlight => (ProjectionSettings { scale: 1.5, ..base }, 0.5, -30.0),
    }
}

/// Draws the projected tesseract as line segments on one canvas.
pub struct TesseractRenderer {
    gl: GL,
    canvas: HtmlCanvasElement,
    program: WebGlProgram,
    buffer: WebGlBuffer,
    vao: WebGlVertexArrayObject,
    u_color: Option<WebGlUniformLocation>,
    u_intensity: Option<WebGlUniformLocation>,
    u_alpha: Option<WebGlUniformLocation>,
    u_aspect: Option<WebGlUniformLocation>,
    edges: Vec<(usize, usize)>,
    role: LayerRole,
    params: ParameterSet,
}

impl TesseractRenderer {
    pub fn new(canvas: &HtmlCanvasElement, role: LayerRole) -> Result<Self, JsValue> {
        let gl: GL = canvas
            .get_context("webgl2")?
            .ok_or("WebGL2 not supported")?
            .dyn_into()?;

        let vs = compile(&gl, GL::VERTEX_SHADER, VERTEX_SRC)?;
        let fs = compile(&gl, GL::FRAGMENT_SHADER, FRAGMENT_SRC)?;
        let program = link(&gl, &vs, &fs)?;

        let buffer = gl.create_buffer().ok_or("failed to create buffer")?;
        let vao = gl.create_vertex_array().ok_or("failed to create vertex array")?;
        gl.bind_vertex_array(Some(&vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        let a_pos = gl.get_attrib_location(&program, "a_pos");
        if a_pos < 0 {
            return Err("a_pos attribute missing".into());
        }
        gl.enable_vertex_attrib_array(a_pos as u32);
        gl.vertex_attrib_pointer_with_i32(a_pos as u32, 2, GL::FLOAT, false, 0, 0);
        gl.bind_vertex_array(None);

        gl.enable(GL::BLEND);
        gl.blend_func(GL::SRC_ALPHA, GL::ONE);

        Ok(Self {
            u_color: gl.get_uniform_location(&program, "u_color"),
            u_intensity: gl.get_uniform_location(&program, "u_intensity"),
            u_alpha: gl.get_uniform_location(&program, "u_alpha"),
            u_aspect: gl.get_uniform_location(&program, "u_aspect"),
            canvas: canvas.clone(),
            gl,
            program,
            buffer,
            vao,
            edges: tesseract_edges(),
            role,
            params: ParameterSet {
                intensity: 0.0,
                hue: 0.0,
                morph_factor: 1.0,
                chaos: 0.0,
                speed: 1.0,
                rotation: 0.0,
            },
        })
    }

    /// Take named uniforms from the adapter and redraw.
    pub fn apply(&mut self, uniforms: &[(&'static str, f32)]) {
        for &(name, value) in uniforms {
            let value = f64::from(value);
            match name {
                "u_intensity" => self.params.intensity = value,
                "u_hue" => self.params.hue = value,
                "u_morph" => self.params.morph_factor = value,
                "u_chaos" => self.params.chaos = value,
                "u_speed" => self.params.speed = value,
                "u_rotation" => self.params.rotation = value,
                _ => {}
            }
        }
        self.draw();
    }

    /// Match the backing store to the element's CSS size.
    pub fn resize(&self, device_pixel_ratio: f64) {
        let w = (f64::from(self.canvas.client_width()) * device_pixel_ratio).max(1.0) as u32;
        let h = (f64::from(self.canvas.client_height()) * device_pixel_ratio).max(1.0) as u32;
        if self.canvas.width() != w {
            self.canvas.set_width(w);
        }
        if self.canvas.height() != h {
            self.canvas.set_height(h);
        }
    }

    fn draw(&self) {
        let gl = &self.gl;
        let (settings, alpha, hue_shift) = layer_style(self.role);
        let points = project_tesseract(&self.params, &settings);
        let lines = edge_lines(&points, &self.edges);
        let [r, g, b] = hsv_to_rgb(self.params.hue + hue_shift, 0.7, 1.0);

        let (w, h) = (self.canvas.width() as i32, self.canvas.height() as i32);
        gl.viewport(0, 0, w, h);
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        gl.clear(GL::COLOR_BUFFER_BIT);

        gl.use_program(Some(&self.program));
        gl.uniform3f(self.u_color.as_ref(), r, g, b);
        gl.uniform1f(self.u_intensity.as_ref(), self.params.intensity.clamp(0.0, 1.5) as f32);
        gl.uniform1f(self.u_alpha.as_ref(), alpha);
        gl.uniform1f(self.u_aspect.as_ref(), w as f32 / (h.max(1)) as f32);

        gl.bind_vertex_array(Some(&self.vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&self.buffer));
        let data = Float32Array::from(lines.as_slice());
        gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &data, GL::DYNAMIC_DRAW);
        gl.draw_arrays(GL::LINES, 0, (lines.len() / 2) as i32);
        gl.bind_vertex_array(None);
    }

    /// Release the GPU context ahead of garbage collection.
    pub fn lose_context(&self) {
        self.gl.delete_buffer(Some(&self.buffer));
        self.gl.delete_vertex_array(Some(&self.vao));
        self.gl.delete_program(Some(&self.program));
        if let Ok(Some(ext)) = self.gl.get_extension("WEBGL_lose_context") {
            ext.unchecked_into::<WebglLoseContext>().lose_context();
        }
    }
}

fn compile(gl: &GL, kind: u32, src: &str) -> Result<WebGlShader, JsValue> {
    let shader = gl.create_shader(kind).ok_or("failed to create shader")?;
    gl.shader_source(&shader, src);
    gl.compile_shader(&shader);
    if gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(JsValue::from_str(&format!("shader compile failed: {log}")))
    }
}

fn link(gl: &GL, vs: &WebGlShader, fs: &WebGlShader) -> Result<WebGlProgram, JsValue> {
    let program = gl.create_program().ok_or("failed to create program")?;
    gl.attach_shader(&program, vs);
    gl.attach_shader(&program, fs);
    gl.link_program(&program);
    if gl
        .get_program_parameter(&program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(JsValue::from_str(&format!("program link failed: {log}")))
    }
}
