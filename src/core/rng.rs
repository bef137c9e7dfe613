use rand::SeedableRng;

/// Per-worker random number stream.
///
/// Each render worker owns one of these; streams are never shared across
/// threads. With a user seed the stream for worker `i` is seeded with
/// `seed + i` so single-threaded runs are reproducible.
pub struct Rng {
    rng: rand::rngs::SmallRng,
}

impl Rng {
    pub fn from_entropy() -> Self {
        Self {
            rng: rand::rngs::SmallRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: rand::rngs::SmallRng::seed_from_u64(seed),
        }
    }

    /// Uniform float in [0, 1).
    pub fn u(&mut self) -> f32 {
        rand::Rng::gen(&mut self.rng)
    }

    pub fn u2(&mut self) -> (f32, f32) {
        (self.u(), self.u())
    }

    pub fn uniform_on_sphere(&mut self) -> glam::Vec3A {
        let (u1, u2) = self.u2();
        let phi = u1 * 2.0 * std::f32::consts::PI;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let cos_theta = 1.0 - 2.0 * u2;
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        glam::Vec3A::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
    }

    /// Cosine-weighted direction in the local frame around +z.
    pub fn cosine_weighted_on_hemisphere(&mut self) -> glam::Vec3A {
        let (u1, u2) = self.u2();
        let phi = u1 * 2.0 * std::f32::consts::PI;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let sin_theta = u2.sqrt();
        let cos_theta = (1.0 - u2).sqrt();
        glam::Vec3A::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
    }
}
