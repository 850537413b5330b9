//! Scene graph primitives shared by every rigged format (C2). Bones live
//! in a flat arena and reference each other by index — a `Skeleton` is
//! the only owner, so there is never a two-way owning pointer between a
//! bone and its parent.

use glam::{Mat4, Quat, Vec3};

/// One joint in a skeleton. `parent`/`children` are arena indices into
/// the owning `Skeleton`'s `bones` vector, never direct references.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub matrix: Mat4,
    pub matrix_world: Mat4,
}

impl Bone {
    pub fn new(name: impl Into<String>) -> Self {
        Bone {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            matrix: Mat4::IDENTITY,
            matrix_world: Mat4::IDENTITY,
        }
    }

    fn update_local_matrix(&mut self) {
        self.matrix = Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
    }
}

/// An ordered bone list plus parent→child edges derived from each bone's
/// `parent_id`. `bone_inverses[i]` is the bind-pose inverse of
/// `bones[i].matrix_world`.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
    pub roots: Vec<usize>,
    pub bone_inverses: Vec<Mat4>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Self {
        let roots = bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(i, _)| i)
            .collect();

        let mut skeleton = Skeleton { bones, roots, bone_inverses: Vec::new() };
        skeleton.update_matrix_world();
        skeleton.calculate_inverses();
        skeleton
    }

    /// Recomputes every local matrix from position/rotation/scale, then
    /// propagates world matrices root-to-leaf. Parents are always
    /// updated before their children.
    pub fn update_matrix_world(&mut self) {
        for bone in &mut self.bones {
            bone.update_local_matrix();
        }

        let mut stack: Vec<(usize, Mat4)> = self.roots.iter().map(|&r| (r, Mat4::IDENTITY)).collect();

        while let Some((idx, parent_world)) = stack.pop() {
            let world = parent_world * self.bones[idx].matrix;
            self.bones[idx].matrix_world = world;

            for &child in &self.bones[idx].children.clone() {
                stack.push((child, world));
            }
        }
    }

    pub fn calculate_inverses(&mut self) {
        self.bone_inverses = self.bones.iter().map(|b| b.matrix_world.inverse()).collect();
    }

    pub fn get_bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_world_matrix_equals_local_matrix() {
        let mut root = Bone::new("root");
        root.position = Vec3::new(1.0, 2.0, 3.0);
        let skeleton = Skeleton::new(vec![root]);
        assert_eq!(skeleton.bones[0].matrix_world, skeleton.bones[0].matrix);
    }

    #[test]
    fn child_world_matrix_includes_parent_translation() {
        let mut root = Bone::new("root");
        root.position = Vec3::new(10.0, 0.0, 0.0);

        let mut child = Bone::new("child");
        child.parent = Some(0);
        child.position = Vec3::new(1.0, 0.0, 0.0);
        root.children.push(1);

        let skeleton = Skeleton::new(vec![root, child]);
        let world_pos = skeleton.bones[1].matrix_world.transform_point3(Vec3::ZERO);
        assert_eq!(world_pos, Vec3::new(11.0, 0.0, 0.0));
    }

    #[test]
    fn bone_inverse_undoes_world_matrix() {
        let mut root = Bone::new("root");
        root.position = Vec3::new(5.0, -2.0, 1.0);
        let skeleton = Skeleton::new(vec![root]);
        let identity = skeleton.bones[0].matrix_world * skeleton.bone_inverses[0];
        assert!(identity.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }
}
