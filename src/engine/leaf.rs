// Leaf cards: a double-sided quad at the tip of every terminal branch.
//
// Corners are laid out as a diamond in the branch's local up/right frame:
//
//          b (+up)
//         ╱ ╲
//  a (-right)  c (+right)
//         ╲ ╱
//          d (-up)
//
// The card is emitted twice with opposite normals instead of relying on the
// pipeline's cull mode. Each side is pushed back along its own normal by a
// fraction of the branch radius so it does not z-fight the bark.

use glam::Vec3;
use super::branch::{BranchDescriptor, RingFrame};
use super::mesh::{GpuVertex, RenderMesh};
use super::tree::TreeConstants;

/// Half-size of the leaf card for a branch radius of `radius_length`.
pub fn leaf_half_size(radius_length: f32, constants: &TreeConstants) -> f32 {
    (constants.leaf_size_scale * radius_length)
        .clamp(constants.leaf_size_min, constants.leaf_size_max)
}

/// Append the front and back card for `branch` (8 vertices, 12 indices).
pub fn emit_leaf(
    mesh: &mut RenderMesh,
    branch: &BranchDescriptor,
    frame: RingFrame,
    leaf_color: Vec3,
    constants: &TreeConstants,
) {
    let radius_length = branch.radius.length();
    let offset = constants.leaf_offset_scale * radius_length;
    let half = leaf_half_size(radius_length, constants);

    let up = frame.up.normalize_or_zero();
    let right = frame.right.normalize_or_zero();

    let a_mod = -right * half;
    let b_mod = up * half;
    let c_mod = right * half;
    let d_mod = -up * half;

    let tip = branch.tip();

    for side in [1.0_f32, -1.0] {
        let a = tip + a_mod;
        let b = tip + b_mod;
        let c = tip + c_mod;
        let d = tip + d_mod;

        let normal = (side * (b - a).normalize_or_zero().cross((d - a).normalize_or_zero()))
            .normalize_or_zero();
        let push = normal * offset;

        let ia = mesh.push_vertex(GpuVertex::new(a - push, normal, leaf_color));
        let ib = mesh.push_vertex(GpuVertex::new(b - push, normal, leaf_color));
        let ic = mesh.push_vertex(GpuVertex::new(c - push, normal, leaf_color));
        let id = mesh.push_vertex(GpuVertex::new(d - push, normal, leaf_color));

        mesh.push_triangle(ia, ib, ic);
        mesh.push_triangle(ia, ic, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    const LEAF: Vec3 = Vec3::new(0.03, 0.48, 0.09);

    fn terminal(radius: f32) -> BranchDescriptor {
        BranchDescriptor {
            radius_ratio: 0.5,
            angle_x: 25.0,
            angle_y: 25.0,
            radius: Vec4::new(0.0, 0.0, radius, 0.0),
            base: Vec3::new(1.0, 2.0, 3.0),
            up_reference: Vec3::Y,
            direction: Vec3::new(0.0, 2.0, 0.0),
            faces: 4,
            level: 3,
        }
    }

    fn frame() -> RingFrame {
        RingFrame {
            normal: Vec3::Z,
            up: Vec3::new(0.0, 3.0, 0.0),
            right: Vec3::new(0.25, 0.0, 0.0),
        }
    }

    fn emit(radius: f32) -> RenderMesh {
        let mut mesh = RenderMesh::new();
        emit_leaf(&mut mesh, &terminal(radius), frame(), LEAF, &TreeConstants::default());
        mesh
    }

    fn pos(mesh: &RenderMesh, i: usize) -> Vec3 {
        Vec3::from_array(mesh.vertices[i].position)
    }

    #[test]
    fn emits_two_quads() {
        let mesh = emit(0.02);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        assert!(mesh.vertices.iter().all(|v| v.color == LEAF.to_array()));
    }

    #[test]
    fn half_size_is_clamped() {
        let constants = TreeConstants::default();
        assert_eq!(leaf_half_size(0.001, &constants), 0.2);
        assert_eq!(leaf_half_size(1.0, &constants), 0.4);
        assert!((leaf_half_size(0.02, &constants) - 0.32).abs() < 1e-6);
    }

    #[test]
    fn sides_have_opposite_unit_normals() {
        let mesh = emit(0.02);
        let front = Vec3::from_array(mesh.vertices[0].normal);
        let back = Vec3::from_array(mesh.vertices[4].normal);
        assert!((front.length() - 1.0).abs() < 1e-5);
        assert!((back.length() - 1.0).abs() < 1e-5);
        assert!(front.abs_diff_eq(-back, 1e-6));
        // up = +Y, right = +X → card faces along up × right = -Z.
        assert!(front.abs_diff_eq(-Vec3::Z, 1e-5));
    }

    #[test]
    fn corners_are_coplanar_diamond_around_tip() {
        let radius = 0.02;
        let mesh = emit(radius);
        let tip = terminal(radius).tip();
        let offset = 0.01 * radius;
        let normal = Vec3::from_array(mesh.vertices[0].normal);
        let shift = -normal * offset;

        let expected = [
            tip - Vec3::X * 0.32,
            tip + Vec3::Y * 0.32,
            tip + Vec3::X * 0.32,
            tip - Vec3::Y * 0.32,
        ];
        for (i, e) in expected.iter().enumerate() {
            assert!(pos(&mesh, i).abs_diff_eq(*e + shift, 1e-5));
        }

        for side in 0..2 {
            let o = side * 4;
            let n = Vec3::from_array(mesh.vertices[o].normal);
            let d0 = pos(&mesh, o).dot(n);
            for i in 1..4 {
                assert!((pos(&mesh, o + i).dot(n) - d0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn back_side_is_pushed_the_other_way() {
        let mesh = emit(0.02);
        let between = pos(&mesh, 0) - pos(&mesh, 4);
        // Front pushed along +Z, back along -Z, each by 0.01 * radius.
        assert!(between.abs_diff_eq(Vec3::Z * 2.0 * 0.0002, 1e-6));
    }

    #[test]
    fn zero_frame_collapses_to_tip() {
        let mut mesh = RenderMesh::new();
        let branch = terminal(0.02);
        emit_leaf(&mut mesh, &branch, RingFrame::ZERO, LEAF, &TreeConstants::default());
        assert_eq!(mesh.vertex_count(), 8);
        for v in &mesh.vertices {
            assert_eq!(Vec3::from_array(v.position), branch.tip());
            assert_eq!(v.normal, [0.0; 3]);
        }
    }
}
