// Viewer camera for inspecting the generated tree.
//
// Camera model:
//   - Eye at `position`, always looking down -Z with +Y up
//   - The tree model sits at `model_offset` and spins around world Y by `model_yaw_degrees`
//   - Both are driven from the settings panel sliders, not from raw input

use glam::{Mat4, Vec3};

pub struct ViewerCamera {
    /// World-space eye position.
    pub position: Vec3,

    /// Tree rotation around world Y, in degrees.
    pub model_yaw_degrees: f32,

    /// Translation applied to the tree before rotating it.
    pub model_offset: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl ViewerCamera {
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, 75.0),
            model_yaw_degrees: 0.0,
            model_offset: Vec3::new(0.0, 0.0, 3.0),
            fov: 45.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }

    /// View matrix: looks from the eye one unit down -Z.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position - Vec3::Z, Vec3::Y)
    }

    /// Perspective projection matrix.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Model matrix: translate, then spin around Y. Also used to rotate normals.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.model_offset)
            * Mat4::from_rotation_y(self.model_yaw_degrees.to_radians())
    }

    /// Combined model-view-projection matrix ready to upload to the GPU.
    pub fn model_view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix() * self.model_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn model_origin_projects_in_front_of_camera() {
        let camera = ViewerCamera::new();
        let clip = camera.model_view_projection(16.0 / 9.0) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.w > 0.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn yaw_rotates_about_world_y() {
        let mut camera = ViewerCamera::new();
        camera.model_offset = Vec3::ZERO;
        camera.model_yaw_degrees = 90.0;
        let p = camera.model_matrix().transform_point3(Vec3::Z);
        assert!(p.abs_diff_eq(Vec3::X, 1e-6));
    }
}
