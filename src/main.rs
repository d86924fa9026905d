// Procedural fractal tree viewer.
// Tune the branching parameters in the Settings window and press Recompute;
// the mesh is rebuilt from scratch on the CPU and re-uploaded in one go.

mod engine;

use std::sync::Arc;
use std::time::Instant;
use winit::{
    event::{Event as WinitEvent, WindowEvent, ElementState, KeyEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};
use engine::{generate_mesh, MeshStats, RenderMesh, TreeParams, TreeRenderer, TreeSettings, ViewerCamera};

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    renderer: TreeRenderer,
    camera: ViewerCamera,

    /// Parameters of the tree currently on the GPU.
    params: TreeParams,
    /// Values being edited in the UI; applied on Recompute.
    settings: TreeSettings,
    stats: MeshStats,
}

/// Generate a tree and report how long it took.
fn timed_generate(params: &TreeParams) -> (RenderMesh, f32) {
    let start = Instant::now();
    let mesh = generate_mesh(params);
    let elapsed_ms = start.elapsed().as_secs_f32() * 1000.0;
    log::info!(
        "Generated tree: {} vertices, {} triangles in {:.2} ms (levels {}, faces {})",
        mesh.vertex_count(),
        mesh.triangle_count(),
        elapsed_ms,
        params.max_level,
        params.face_count,
    );
    (mesh, elapsed_ms)
}

impl State {
    async fn new(window: Arc<Window>) -> Result<Self, engine::RenderError> {
        let params = TreeParams::default();
        let (mesh, generation_ms) = timed_generate(&params);
        let renderer = TreeRenderer::new(window, &mesh).await?;

        Ok(Self {
            renderer,
            camera: ViewerCamera::new(),
            settings: TreeSettings::from_params(&params),
            stats: MeshStats {
                vertex_count: mesh.vertex_count(),
                triangle_count: mesh.triangle_count(),
                generation_ms,
                fps: 0,
            },
            params,
        })
    }

    /// Rebuild the tree from the UI settings and replace the GPU copy.
    /// On failure the previous tree and its parameters stay on screen.
    fn regenerate(&mut self) {
        let params = self.settings.apply(&self.params);
        let (mesh, generation_ms) = timed_generate(&params);
        if let Err(e) = self.renderer.upload_mesh(&mesh) {
            log::error!("Keeping previous tree: {e}");
            return;
        }
        self.params = params;
        self.stats.vertex_count = mesh.vertex_count();
        self.stats.triangle_count = mesh.triangle_count();
        self.stats.generation_ms = generation_ms;
    }

    fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let recompute = self.renderer.render(window, &mut self.camera, &mut self.settings, &self.stats)?;
        if recompute {
            self.regenerate();
        }
        Ok(())
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title("Procedural Tree Generator")
        .with_inner_size(winit::dpi::LogicalSize::new(1920, 1080));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone()))?;
    let mut frame_count = 0;
    let mut last_fps_update = Instant::now();

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                if state.renderer.panel.handle_window_event(&window, event).consumed {
                    return;
                }
                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::Resized(physical_size) => {
                        state.renderer.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        match state.render(&window) {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                state.renderer.resize(state.renderer.size)
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory");
                                control_flow.exit()
                            }
                            Err(e) => log::warn!("{:?}", e),
                        }

                        frame_count += 1;
                        let now = Instant::now();
                        if (now - last_fps_update).as_secs_f32() >= 1.0 {
                            state.stats.fps = frame_count;
                            log::debug!("FPS: {} | Triangles: {}", frame_count, state.stats.triangle_count);
                            frame_count = 0;
                            last_fps_update = now;
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
