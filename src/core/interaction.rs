use glam::{Vec2, Vec3A, Vec4};

use crate::core::{color::Color, geometry::PointGeometry};

/// Transport direction of the random walk: eye-to-light or light-to-eye.
/// Only scattering models with a direction-dependent Jacobian (glass)
/// distinguish the two.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransDir {
    EL,
    LE,
}

/// Component index selecting one lobe of a composite material;
/// [`COMP_DONT_CARE`] marginalizes over all lobes.
pub const COMP_DONT_CARE: i32 = -1;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub o: Vec3A,
    pub d: Vec3A,
}

impl Ray {
    pub fn new(o: Vec3A, d: Vec3A) -> Self {
        Self { o, d }
    }

    pub fn at(&self, t: f32) -> Vec3A {
        self.o + self.d * t
    }
}

/// Tag of a [`SceneInteraction`].
///
/// The two terminator tags start a random walk and carry no geometry;
/// endpoint tags force evaluation as emission/importance instead of
/// BSDF; `InfiniteEnvHit` is an environment hit at infinity.
#[derive(Copy, Clone, Debug)]
pub enum InteractionKind {
    CameraTerm { window: Vec4, aspect: f32 },
    LightTerm,
    CameraEndpoint { aspect: f32 },
    LightEndpoint,
    SurfacePoint,
    MediumPoint,
    InfiniteEnvHit,
}

/// A sampled point in the scene together with the primitive node it lies
/// on. The same geometric point can be evaluated as a surface during the
/// walk and re-tagged as an endpoint via [`SceneInteraction::as_type`]
/// when it contributes emission.
#[derive(Copy, Clone, Debug)]
pub struct SceneInteraction {
    pub kind: InteractionKind,
    /// Primitive node index; unused for terminator tags.
    pub node: usize,
    pub geom: PointGeometry,
}

impl SceneInteraction {
    pub fn camera_term(window: Vec4, aspect: f32) -> Self {
        Self {
            kind: InteractionKind::CameraTerm { window, aspect },
            node: usize::MAX,
            geom: PointGeometry::default(),
        }
    }

    pub fn light_term() -> Self {
        Self {
            kind: InteractionKind::LightTerm,
            node: usize::MAX,
            geom: PointGeometry::default(),
        }
    }

    pub fn camera_endpoint(node: usize, geom: PointGeometry, aspect: f32) -> Self {
        Self {
            kind: InteractionKind::CameraEndpoint { aspect },
            node,
            geom,
        }
    }

    pub fn light_endpoint(node: usize, geom: PointGeometry) -> Self {
        Self {
            kind: InteractionKind::LightEndpoint,
            node,
            geom,
        }
    }

    pub fn surface(node: usize, geom: PointGeometry) -> Self {
        Self {
            kind: InteractionKind::SurfacePoint,
            node,
            geom,
        }
    }

    pub fn medium(node: usize, geom: PointGeometry) -> Self {
        Self {
            kind: InteractionKind::MediumPoint,
            node,
            geom,
        }
    }

    pub fn env_hit(node: usize, wo: Vec3A) -> Self {
        Self {
            kind: InteractionKind::InfiniteEnvHit,
            node,
            geom: PointGeometry::infinite(wo),
        }
    }

    /// Copy of this interaction re-tagged with another kind.
    pub fn as_type(&self, kind: InteractionKind) -> Self {
        Self { kind, ..*self }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            InteractionKind::CameraTerm { .. } | InteractionKind::LightTerm
        )
    }

    pub fn is_endpoint(&self) -> bool {
        matches!(
            self.kind,
            InteractionKind::CameraEndpoint { .. }
                | InteractionKind::LightEndpoint
                | InteractionKind::InfiniteEnvHit
        )
    }

    pub fn is_surface(&self) -> bool {
        matches!(self.kind, InteractionKind::SurfacePoint)
    }

    pub fn is_medium(&self) -> bool {
        matches!(self.kind, InteractionKind::MediumPoint)
    }
}

/// Result of joint position+direction sampling. `weight` is the sampled
/// contribution divided by its probability.
#[derive(Copy, Clone, Debug)]
pub struct RaySample {
    pub sp: SceneInteraction,
    pub comp: i32,
    pub wo: Vec3A,
    pub weight: Color,
}

impl RaySample {
    pub fn ray(&self) -> Ray {
        debug_assert!(!self.sp.geom.infinite);
        Ray::new(self.sp.geom.p, self.wo)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DirectionSample {
    pub wo: Vec3A,
    pub comp: i32,
    pub weight: Color,
}

#[derive(Copy, Clone, Debug)]
pub struct DistanceSample {
    pub sp: SceneInteraction,
    pub weight: Color,
}

/// Raster-window helpers for the two image-sampling strategies.
pub struct RasterWindow;

impl RasterWindow {
    /// Raster window of a single pixel in a `w`x`h` film, as
    /// `(x, y, width, height)` in [0,1]^2 coordinates.
    pub fn pixel(x: u32, y: u32, w: u32, h: u32) -> Vec4 {
        let dx = 1.0 / w as f32;
        let dy = 1.0 / h as f32;
        Vec4::new(dx * x as f32, dy * y as f32, dx, dy)
    }

    /// Raster window covering the whole film.
    pub fn full() -> Vec4 {
        Vec4::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Uniform raster position inside a window.
    pub fn sample(window: Vec4, u: (f32, f32)) -> Vec2 {
        Vec2::new(window.x + window.z * u.0, window.y + window.w * u.1)
    }
}
