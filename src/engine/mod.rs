// Engine module - tree generation core plus the thin wgpu/egui viewer around it

pub mod branch;
pub mod camera;
pub mod error;
pub mod leaf;
pub mod mesh;
pub mod renderer;
pub mod settings_panel;
pub mod tree;

// Re-export commonly used items
pub use camera::ViewerCamera;
pub use error::RenderError;
pub use mesh::RenderMesh;
pub use renderer::TreeRenderer;
pub use settings_panel::{MeshStats, TreeSettings};
pub use tree::{generate_mesh, TreeParams};
