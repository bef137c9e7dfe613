use glam::{Vec2, Vec3A};

use crate::core::geometry::{geometry_normal, mix_barycentric, mix_barycentric_uv};

/// Per-corner attribute indices; negative means the attribute is absent.
#[derive(Copy, Clone, Debug)]
pub struct FaceIndex {
    pub p: i32,
    pub n: i32,
    pub t: i32,
}

impl FaceIndex {
    pub fn position_only(p: i32) -> Self {
        Self { p, n: -1, t: -1 }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct MeshVertex {
    pub p: Vec3A,
    pub n: Vec3A,
    pub t: Vec2,
}

#[derive(Copy, Clone, Debug)]
pub struct Tri {
    pub p1: MeshVertex,
    pub p2: MeshVertex,
    pub p3: MeshVertex,
}

/// Point interpolated on a triangle: position, shading normal (falls
/// back to the geometric normal when the mesh has none) and uv.
#[derive(Copy, Clone, Debug)]
pub struct InterpolatedPoint {
    pub p: Vec3A,
    pub n: Vec3A,
    pub t: Vec2,
}

/// Indexed triangle mesh in object space.
pub struct Mesh {
    positions: Vec<Vec3A>,
    normals: Vec<Vec3A>,
    texcoords: Vec<Vec2>,
    faces: Vec<[FaceIndex; 3]>,
}

impl Mesh {
    pub fn new(
        positions: Vec<Vec3A>,
        normals: Vec<Vec3A>,
        texcoords: Vec<Vec2>,
        faces: Vec<[FaceIndex; 3]>,
    ) -> Self {
        Self {
            positions,
            normals,
            texcoords,
            faces,
        }
    }

    pub fn num_triangles(&self) -> usize {
        self.faces.len()
    }

    fn vertex(&self, i: FaceIndex) -> MeshVertex {
        MeshVertex {
            p: self.positions[i.p as usize],
            n: if i.n < 0 {
                Vec3A::ZERO
            } else {
                self.normals[i.n as usize]
            },
            t: if i.t < 0 {
                Vec2::ZERO
            } else {
                self.texcoords[i.t as usize]
            },
        }
    }

    pub fn triangle_at(&self, face: usize) -> Tri {
        let [i1, i2, i3] = self.faces[face];
        Tri {
            p1: self.vertex(i1),
            p2: self.vertex(i2),
            p3: self.vertex(i3),
        }
    }

    /// Interpolate a surface point from barycentric coordinates
    /// `uv = (u, v)` weighting `(p2, p3)` against `p1`.
    pub fn surface_point(&self, face: usize, uv: Vec2) -> InterpolatedPoint {
        let [i1, i2, i3] = self.faces[face];
        let p1 = self.positions[i1.p as usize];
        let p2 = self.positions[i2.p as usize];
        let p3 = self.positions[i3.p as usize];
        let n = if i1.n < 0 || i2.n < 0 || i3.n < 0 {
            geometry_normal(p1, p2, p3)
        } else {
            mix_barycentric(
                self.normals[i1.n as usize],
                self.normals[i2.n as usize],
                self.normals[i3.n as usize],
                uv,
            )
            .normalize()
        };
        let t = if i1.t < 0 || i2.t < 0 || i3.t < 0 {
            Vec2::ZERO
        } else {
            mix_barycentric_uv(
                self.texcoords[i1.t as usize],
                self.texcoords[i2.t as usize],
                self.texcoords[i3.t as usize],
                uv,
            )
        };
        InterpolatedPoint {
            p: mix_barycentric(p1, p2, p3, uv),
            n,
            t,
        }
    }

    pub fn triangles(&self) -> impl Iterator<Item = (usize, Tri)> + '_ {
        (0..self.faces.len()).map(move |i| (i, self.triangle_at(i)))
    }

    /// Unit quad in the xy-plane facing +z, used by tests and simple
    /// procedural scenes.
    pub fn quad(half_extent: f32) -> Self {
        let e = half_extent;
        Self::new(
            vec![
                Vec3A::new(-e, -e, 0.0),
                Vec3A::new(e, -e, 0.0),
                Vec3A::new(e, e, 0.0),
                Vec3A::new(-e, e, 0.0),
            ],
            vec![Vec3A::Z],
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            vec![
                [
                    FaceIndex { p: 0, n: 0, t: 0 },
                    FaceIndex { p: 1, n: 0, t: 1 },
                    FaceIndex { p: 2, n: 0, t: 2 },
                ],
                [
                    FaceIndex { p: 0, n: 0, t: 0 },
                    FaceIndex { p: 2, n: 0, t: 2 },
                    FaceIndex { p: 3, n: 0, t: 3 },
                ],
            ],
        )
    }
}
