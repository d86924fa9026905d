// egui "Settings" window: camera sliders, tree parameters and the Recompute button.
// Tree parameters are only applied when Recompute is pressed.

use egui::epaint::Shadow;
use glam::Vec3;
use super::camera::ViewerCamera;
use super::tree::TreeParams;

// ============================================================================
// SLIDER RANGES
// ============================================================================

pub const CAMERA_RANGE: std::ops::RangeInclusive<f32> = -100.0..=100.0;
pub const YAW_RANGE: std::ops::RangeInclusive<f32> = -180.0..=180.0;
pub const FACE_RANGE: std::ops::RangeInclusive<u32> = 50..=250;
pub const RADIUS_RATIO_RANGE: std::ops::RangeInclusive<f32> = 0.0..=1.0;
pub const ANGLE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=60.0;
/// Level 7 at 250 faces is ~3.3M vertices (118 MB), under wgpu's default
/// 256 MB buffer limit. Level 8 would need 359 MB.
pub const MAX_ITERATIONS: u32 = 7;

// ============================================================================
// EDITABLE SETTINGS
// ============================================================================

/// Values the user is editing. Copied into `TreeParams` on Recompute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeSettings {
    pub iterations:   u32,
    pub faces:        u32,
    pub radius_ratio: f32,
    pub angle_x:      f32,
    pub angle_y:      f32,
    pub leaf_color:   [f32; 3],
}

impl TreeSettings {
    pub fn from_params(params: &TreeParams) -> Self {
        Self {
            iterations:   params.max_level,
            faces:        params.face_count,
            radius_ratio: params.radius_ratio,
            angle_x:      params.angle_x,
            angle_y:      params.angle_y,
            leaf_color:   params.leaf_color.to_array(),
        }
    }

    /// Overlay the UI knobs on `base`, clamped to the slider ranges.
    /// Fields the UI does not expose (trunk shape, constants) come from `base`.
    pub fn apply(&self, base: &TreeParams) -> TreeParams {
        TreeParams {
            radius_ratio: self.radius_ratio.clamp(*RADIUS_RATIO_RANGE.start(), *RADIUS_RATIO_RANGE.end()),
            angle_x:      self.angle_x.clamp(*ANGLE_RANGE.start(), *ANGLE_RANGE.end()),
            angle_y:      self.angle_y.clamp(*ANGLE_RANGE.start(), *ANGLE_RANGE.end()),
            face_count:   self.faces.clamp(*FACE_RANGE.start(), *FACE_RANGE.end()),
            max_level:    self.iterations.min(MAX_ITERATIONS),
            leaf_color:   Vec3::from_array(self.leaf_color).clamp(Vec3::ZERO, Vec3::ONE),
            ..*base
        }
    }
}

/// Numbers shown under the controls.
pub struct MeshStats {
    pub vertex_count:   usize,
    pub triangle_count: usize,
    /// Time spent in the last generate_mesh() call (ms).
    pub generation_ms:  f32,
    pub fps:            u32,
}

// ============================================================================
// PANEL
// ============================================================================

pub struct SettingsPanel {
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl SettingsPanel {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        let mut visuals = egui::Visuals::dark();
        visuals.window_shadow = Shadow::NONE;
        egui_ctx.set_visuals(visuals);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // drawn after the depth-tested tree pass
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Run and draw one egui frame on top of `view`.
    /// Camera sliders take effect immediately; returns true when Recompute was clicked.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        camera: &mut ViewerCamera,
        settings: &mut TreeSettings,
        stats: &MeshStats,
    ) -> bool {
        let raw_input = self.egui_state.take_egui_input(window);
        let mut recompute = false;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::Window::new("Settings").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Camera Position");
                    ui.add(egui::DragValue::new(&mut camera.position.x).range(CAMERA_RANGE).speed(0.5));
                    ui.add(egui::DragValue::new(&mut camera.position.y).range(CAMERA_RANGE).speed(0.5));
                    ui.add(egui::DragValue::new(&mut camera.position.z).range(CAMERA_RANGE).speed(0.5));
                });
                ui.add(egui::Slider::new(&mut camera.model_yaw_degrees, YAW_RANGE).text("Object Rotation"));

                ui.separator();

                ui.add(egui::DragValue::new(&mut settings.iterations)
                    .range(0..=MAX_ITERATIONS)
                    .prefix("Iterations: "));
                ui.add(egui::Slider::new(&mut settings.faces, FACE_RANGE).text("Faces"));
                ui.add(egui::Slider::new(&mut settings.radius_ratio, RADIUS_RATIO_RANGE).text("Radius Ratio"));
                ui.add(egui::Slider::new(&mut settings.angle_x, ANGLE_RANGE).text("X Angle"));
                ui.add(egui::Slider::new(&mut settings.angle_y, ANGLE_RANGE).text("Y Angle"));
                ui.horizontal(|ui| {
                    ui.label("Leaf Color");
                    egui::color_picker::color_edit_button_rgb(ui, &mut settings.leaf_color);
                });

                if ui.button("Recompute").clicked() {
                    recompute = true;
                }

                ui.separator();
                ui.label(format!("FPS: {}", stats.fps));
                ui.label(format!(
                    "Vertices: {}  Triangles: {}",
                    stats.vertex_count, stats.triangle_count
                ));
                ui.label(format!("Generation: {:.2} ms", stats.generation_ms));
            });
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        recompute
    }
}
