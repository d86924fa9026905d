// Branch segment builder: one tapered ring of flat-shaded quads per branch.
//
// Each face owns its 4 corners (no welding), so normals stay per-face:
//
//   b ──── d      tip ring    (base + direction + tip radius sample)
//   │ ╲    │
//   │   ╲  │      tris (a,b,d) and (a,d,c)
//   a ──── c      base ring   (base + radius sample)

use glam::{Mat4, Vec3, Vec4};
use super::mesh::{GpuVertex, RenderMesh};

// ============================================================================
// BRANCH DESCRIPTOR
// ============================================================================

/// One queued branch. Immutable once pushed onto the generator's worklist.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BranchDescriptor {
    /// Tip radius / base radius. Same value for every branch of a tree.
    pub radius_ratio: f32,
    /// Child divergence around world X, in degrees.
    pub angle_x: f32,
    /// Child divergence around world Z, in degrees.
    pub angle_y: f32,
    /// Base radius as a vector. Only xyz are geometric; w stays 0.
    pub radius: Vec4,
    /// World-space origin of the branch.
    pub base: Vec3,
    /// Rotation axis for the base ring (the parent's direction).
    pub up_reference: Vec3,
    /// From `base` to the tip; its length is the branch length.
    pub direction: Vec3,
    /// Quads around the circumference. Zero means the branch emits nothing.
    pub faces: u32,
    /// Recursion depth, 0 at the trunk.
    pub level: u32,
}

impl BranchDescriptor {
    pub fn tip(&self) -> Vec3 {
        self.base + self.direction
    }

    /// Descriptor for a child starting at this branch's tip.
    /// The parent's direction becomes the child's ring axis.
    pub fn child(&self, direction: Vec3, face_decay: f32) -> Self {
        Self {
            radius_ratio: self.radius_ratio,
            angle_x: self.angle_x,
            angle_y: self.angle_y,
            radius: self.radius * self.radius_ratio,
            base: self.tip(),
            up_reference: self.direction,
            direction,
            faces: (self.faces as f32 * face_decay) as u32,
            level: self.level + 1,
        }
    }
}

/// Local frame of the last quad built for a branch. Orients terminal leaves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingFrame {
    pub normal: Vec3,
    pub up:     Vec3,
    pub right:  Vec3,
}

impl RingFrame {
    pub const ZERO: Self = Self {
        normal: Vec3::ZERO,
        up:     Vec3::ZERO,
        right:  Vec3::ZERO,
    };
}

// ============================================================================
// SEGMENT BUILDER
// ============================================================================

/// Append the quad ring for `branch` to `mesh`.
///
/// The base ring advances around `up_reference` while the tip ring advances
/// around `direction`. When the two differ the rings twist slightly relative
/// to each other; existing trees depend on that shape, so it is kept.
///
/// Returns the frame of the last quad, or `None` when `faces == 0`.
pub fn build_branch_segment(
    mesh: &mut RenderMesh,
    branch: &BranchDescriptor,
    bark_color: Vec3,
) -> Option<RingFrame> {
    if branch.faces == 0 {
        return None;
    }

    let delta = std::f32::consts::TAU / branch.faces as f32;
    let base_rot = Mat4::from_axis_angle(branch.up_reference.normalize_or_zero(), delta);
    let tip_rot  = Mat4::from_axis_angle(branch.direction.normalize_or_zero(), delta);

    let tip = branch.tip();
    let mut r  = branch.radius;
    let mut r1 = branch.radius * branch.radius_ratio;
    let mut frame = RingFrame::ZERO;

    for _ in 0..branch.faces {
        let a = branch.base + r.truncate();
        let b = tip + r1.truncate();
        r  = base_rot * r;
        r1 = tip_rot * r1;
        let c = branch.base + r.truncate();
        let d = tip + r1.truncate();

        let up = b - a;
        let right = c - a;
        // Zero-radius rings give zero-area quads; keep their normal finite.
        let normal = up.cross(right).normalize_or_zero();
        frame = RingFrame { normal, up, right };

        let ia = mesh.push_vertex(GpuVertex::new(a, normal, bark_color));
        let ib = mesh.push_vertex(GpuVertex::new(b, normal, bark_color));
        let ic = mesh.push_vertex(GpuVertex::new(c, normal, bark_color));
        let id = mesh.push_vertex(GpuVertex::new(d, normal, bark_color));

        mesh.push_triangle(ia, ib, id);
        mesh.push_triangle(ia, id, ic);
    }

    Some(frame)
}
