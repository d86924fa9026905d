// Breadth-first tree mesh generator.
//
// Every branch spawns four children at its tip until `max_level`, then ends in
// a leaf card. Work is driven by an explicit FIFO queue, so output is grouped
// by level:
//
//   [trunk ring] [level 1 rings ×4] [level 2 rings ×16] ... [leaves ×4^max]
//
// Children of one branch are always enqueued in the order
// +angle_y, -angle_y (around world Z), +angle_x, -angle_x (around world X).

use std::collections::VecDeque;
use glam::{Mat4, Vec3, Vec4};
use super::branch::{build_branch_segment, BranchDescriptor, RingFrame};
use super::leaf::emit_leaf;
use super::mesh::RenderMesh;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Children spawned by every non-terminal branch.
pub const CHILDREN_PER_BRANCH: usize = 4;
/// Upper bound on up-front vertex reservation. Larger trees still grow past it.
pub const MAX_RESERVED_VERTICES: usize = 10_000_000;
/// Upper bound on up-front index reservation.
pub const MAX_RESERVED_INDICES: usize = 15_000_000;

/// Fixed shape constants. Not exposed in the UI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeConstants {
    /// Vertex color of every branch ring.
    pub bark_color: Vec3,
    /// Leaf push-back distance as a fraction of the terminal branch radius.
    pub leaf_offset_scale: f32,
    /// Leaf half-size as a multiple of the terminal branch radius, before clamping.
    pub leaf_size_scale: f32,
    pub leaf_size_min: f32,
    pub leaf_size_max: f32,
    /// Face count multiplier per level (result truncated).
    pub face_decay: f32,
}

impl Default for TreeConstants {
    fn default() -> Self {
        Self {
            bark_color: Vec3::new(0.34, 0.23, 0.1),
            leaf_offset_scale: 0.01,
            leaf_size_scale: 16.0,
            leaf_size_min: 0.2,
            leaf_size_max: 0.4,
            face_decay: 0.75,
        }
    }
}

// ============================================================================
// PARAMETERS
// ============================================================================

/// Everything needed to generate one tree. Defaults are the startup tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeParams {
    /// Tip radius / base radius, applied again at every level.
    pub radius_ratio: f32,
    /// Degrees around world X.
    pub angle_x: f32,
    /// Degrees around world Z.
    pub angle_y: f32,
    /// Trunk base radius vector (w unused).
    pub base_radius: Vec4,
    pub base_point: Vec3,
    pub up_reference: Vec3,
    /// Trunk direction; its length is the trunk length.
    pub direction: Vec3,
    /// Trunk face count.
    pub face_count: u32,
    /// Deepest level; branches at this level end in leaves.
    pub max_level: u32,
    pub leaf_color: Vec3,
    pub constants: TreeConstants,
}

impl Default for TreeParams {
    fn default() -> Self {
        let base_radius = Vec4::new(0.0, 0.0, 1.0, 0.0);
        Self {
            radius_ratio: 0.5,
            angle_x: 25.0,
            angle_y: 25.0,
            base_radius,
            base_point: Vec3::ZERO,
            up_reference: Vec3::Y,
            direction: Vec3::new(0.0, 3.5, 0.0) * base_radius.z,
            face_count: 50,
            max_level: 5,
            leaf_color: Vec3::new(0.03, 0.48, 0.09),
            constants: TreeConstants::default(),
        }
    }
}

impl TreeParams {
    /// Level-0 descriptor that seeds the worklist.
    pub fn trunk(&self) -> BranchDescriptor {
        BranchDescriptor {
            radius_ratio: self.radius_ratio,
            angle_x: self.angle_x,
            angle_y: self.angle_y,
            radius: self.base_radius,
            base: self.base_point,
            up_reference: self.up_reference,
            direction: self.direction,
            faces: self.face_count,
            level: 0,
        }
    }
}

// ============================================================================
// GENERATION
// ============================================================================

/// Child directions of `branch`, in enqueue order.
/// Four independent single-axis rotations of the parent direction.
pub fn child_directions(branch: &BranchDescriptor) -> [Vec3; CHILDREN_PER_BRANCH] {
    let y = branch.angle_y.to_radians();
    let x = branch.angle_x.to_radians();
    [
        Mat4::from_rotation_z(y),
        Mat4::from_rotation_z(-y),
        Mat4::from_rotation_x(x),
        Mat4::from_rotation_x(-x),
    ]
    .map(|rot| rot.transform_vector3(branch.direction))
}

/// Exact (vertex, index) counts `generate_mesh` will produce for `params`.
/// Saturates instead of overflowing for absurd depths.
pub fn mesh_size_estimate(params: &TreeParams) -> (usize, usize) {
    let mut vertices = 0usize;
    let mut indices = 0usize;
    let mut branches = 1usize;
    let mut faces = params.face_count;

    for level in 0..=params.max_level {
        let level_faces = branches.saturating_mul(faces as usize);
        vertices = vertices.saturating_add(level_faces.saturating_mul(4));
        indices = indices.saturating_add(level_faces.saturating_mul(6));

        if level == params.max_level {
            // Every deepest-level branch ends in a two-sided leaf card.
            vertices = vertices.saturating_add(branches.saturating_mul(8));
            indices = indices.saturating_add(branches.saturating_mul(12));
        } else {
            branches = branches.saturating_mul(CHILDREN_PER_BRANCH);
            faces = (faces as f32 * params.constants.face_decay) as u32;
        }
    }

    (vertices, indices)
}

/// Generate the full tree mesh for `params`.
///
/// Pure: identical parameters give bit-identical buffers. Never fails;
/// zero faces or zero lengths just produce empty or degenerate geometry.
pub fn generate_mesh(params: &TreeParams) -> RenderMesh {
    let (vertices, indices) = mesh_size_estimate(params);
    let mut mesh = RenderMesh::with_capacity(
        vertices.min(MAX_RESERVED_VERTICES),
        indices.min(MAX_RESERVED_INDICES),
    );

    let constants = &params.constants;
    // Latest ring frame of this pass. Zero-face terminal branches reuse it.
    let mut frame = RingFrame::ZERO;

    let mut queue = VecDeque::new();
    queue.push_back(params.trunk());

    while let Some(branch) = queue.pop_front() {
        if let Some(f) = build_branch_segment(&mut mesh, &branch, constants.bark_color) {
            frame = f;
        }

        if branch.level < params.max_level {
            for direction in child_directions(&branch) {
                queue.push_back(branch.child(direction, constants.face_decay));
            }
        } else {
            emit_leaf(&mut mesh, &branch, frame, params.leaf_color, constants);
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(face_count: u32, max_level: u32) -> TreeParams {
        TreeParams { face_count, max_level, ..TreeParams::default() }
    }

    fn pos(mesh: &RenderMesh, i: usize) -> Vec3 {
        Vec3::from_array(mesh.vertices[i].position)
    }

    /// Face counts per level, decayed the same way the generator does.
    fn faces_per_level(p: &TreeParams) -> Vec<u32> {
        let mut faces = vec![p.face_count];
        for _ in 0..p.max_level {
            let last = *faces.last().unwrap();
            faces.push((last as f32 * 0.75) as u32);
        }
        faces
    }

    #[test]
    fn indices_form_valid_triangles() {
        for (faces, level) in [(50, 0), (50, 2), (7, 3), (250, 1), (3, 4)] {
            let mesh = generate_mesh(&params(faces, level));
            assert_eq!(mesh.index_count() % 3, 0);
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
        }
    }

    #[test]
    fn trunk_only_ends_in_one_leaf() {
        let p = params(50, 0);
        let mesh = generate_mesh(&p);
        assert_eq!(mesh.vertex_count(), 4 * 50 + 8);
        assert_eq!(mesh.index_count(), 6 * 50 + 12);

        let bark = p.constants.bark_color.to_array();
        let leaf = p.leaf_color.to_array();
        assert!(mesh.vertices[..200].iter().all(|v| v.color == bark));
        assert!(mesh.vertices[200..].iter().all(|v| v.color == leaf));
    }

    #[test]
    fn vertex_count_matches_face_sum() {
        let p = params(50, 3);
        let faces = faces_per_level(&p);
        assert_eq!(faces, vec![50, 37, 27, 20]);

        let ring_faces: usize = faces
            .iter()
            .enumerate()
            .map(|(level, &f)| 4usize.pow(level as u32) * f as usize)
            .sum();
        let leaves = 4usize.pow(p.max_level);

        let mesh = generate_mesh(&p);
        assert_eq!(mesh.vertex_count(), 4 * ring_faces + 8 * leaves);
        assert_eq!(mesh.index_count(), 6 * ring_faces + 12 * leaves);
    }

    #[test]
    fn size_estimate_is_exact() {
        for (faces, level) in [(50, 0), (50, 4), (5, 6), (1, 2), (0, 3), (250, 2)] {
            let p = params(faces, level);
            let mesh = generate_mesh(&p);
            assert_eq!(mesh_size_estimate(&p), (mesh.vertex_count(), mesh.index_count()));
        }
    }

    #[test]
    fn size_estimate_saturates() {
        let p = params(250, 200);
        let (v, i) = mesh_size_estimate(&p);
        assert_eq!(v, usize::MAX);
        assert_eq!(i, usize::MAX);
    }

    #[test]
    fn output_is_breadth_first() {
        let p = params(8, 2);
        let mesh = generate_mesh(&p);
        let trunk = p.trunk();
        let children = child_directions(&trunk);

        // Trunk ring first, starting on the base radius.
        assert!(pos(&mesh, 0).abs_diff_eq(trunk.base + trunk.radius.truncate(), 1e-6));

        // Then the four level-1 rings (6 faces each) in enqueue order.
        let level1_faces = 6;
        for (k, dir) in children.iter().enumerate() {
            let block = 4 * 8 + k * 4 * level1_faces;
            let child = trunk.child(*dir, 0.75);
            assert!(pos(&mesh, block).abs_diff_eq(child.base + child.radius.truncate(), 1e-5));
            // b sits on the child's tip ring.
            let b = pos(&mesh, block + 1);
            assert!(b.abs_diff_eq(child.tip() + (child.radius * 0.5).truncate(), 1e-5));
        }
    }

    #[test]
    fn child_directions_rotate_about_world_axes() {
        let trunk = TreeParams::default().trunk();
        let [zp, zn, xp, xn] = child_directions(&trunk);
        let len = trunk.direction.length();
        let (s, c) = 25.0_f32.to_radians().sin_cos();

        assert!(zp.abs_diff_eq(Vec3::new(-s * len, c * len, 0.0), 1e-5));
        assert!(zn.abs_diff_eq(Vec3::new(s * len, c * len, 0.0), 1e-5));
        assert!(xp.abs_diff_eq(Vec3::new(0.0, c * len, s * len), 1e-5));
        assert!(xn.abs_diff_eq(Vec3::new(0.0, c * len, -s * len), 1e-5));
    }

    #[test]
    fn zero_faces_still_recurse_and_leaf() {
        // 1 → 0 at level 1; deeper levels inherit zero.
        let p = params(1, 3);
        let mesh = generate_mesh(&p);
        let leaves = 4usize.pow(3);
        assert_eq!(mesh.vertex_count(), 4 + 8 * leaves);
        assert_eq!(mesh.index_count(), 6 + 12 * leaves);
        assert!(mesh.vertices.iter().all(|v| v.position.iter().all(|c| c.is_finite())));
        assert!(mesh.vertices.iter().all(|v| v.normal.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn zero_face_trunk_emits_only_degenerate_leaves() {
        let p = params(0, 1);
        let mesh = generate_mesh(&p);
        assert_eq!(mesh.vertex_count(), 8 * 4);
        // No frame was ever produced, so every card collapses onto its tip.
        let tip = p.trunk().tip();
        let first_child_tip = tip + child_directions(&p.trunk())[0];
        for v in &mesh.vertices[..8] {
            assert!(Vec3::from_array(v.position).abs_diff_eq(first_child_tip, 1e-6));
        }
    }

    #[test]
    fn leaf_normals_are_unit() {
        let p = params(12, 2);
        let mesh = generate_mesh(&p);
        let leaf = p.leaf_color.to_array();
        let leaf_vertices: Vec<_> = mesh.vertices.iter().filter(|v| v.color == leaf).collect();
        assert_eq!(leaf_vertices.len(), 8 * 16);
        for v in leaf_vertices {
            let n = Vec3::from_array(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn regeneration_is_bit_identical() {
        let p = TreeParams { angle_x: 17.3, angle_y: 41.9, radius_ratio: 0.63, ..params(31, 3) };
        let first = generate_mesh(&p);
        let second = generate_mesh(&p);
        let first_bits: Vec<u32> = first.vertices.iter()
            .flat_map(|v| v.position.iter().chain(&v.normal).chain(&v.color))
            .map(|f| f.to_bits())
            .collect();
        let second_bits: Vec<u32> = second.vertices.iter()
            .flat_map(|v| v.position.iter().chain(&v.normal).chain(&v.color))
            .map(|f| f.to_bits())
            .collect();
        assert_eq!(first_bits, second_bits);
        assert_eq!(first.indices, second.indices);
    }

    #[test]
    fn radius_ratio_shrinks_each_level() {
        let p = TreeParams { radius_ratio: 0.5, ..params(4, 1) };
        let mesh = generate_mesh(&p);
        // First level-1 ring starts on a radius half the trunk's.
        let trunk = p.trunk();
        let child_a = pos(&mesh, 16);
        assert!(((child_a - trunk.tip()).length() - 0.5).abs() < 1e-5);
    }
}
