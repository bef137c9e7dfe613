use crate::{
    core::{color::Color, interaction::Ray, loader::InputParams, rng::Rng},
    phase::Phase,
};

use super::{MediumDistanceSample, MediumT};

/// Homogeneous participating medium with closed-form free flight.
///
/// Distances are sampled from one extinction channel chosen uniformly;
/// the returned weight divides the analytic transmittance (times
/// `sigma_s` at scattering events) by the averaged channel density.
pub struct HomogeneousMedium {
    sigma_s: Color,
    sigma_t: Color,
    phase: Phase,
}

impl HomogeneousMedium {
    pub fn new(sigma_a: Color, sigma_s: Color, phase: Phase) -> Self {
        Self {
            sigma_s,
            sigma_t: sigma_a + sigma_s,
            phase,
        }
    }

    pub fn load(params: &mut InputParams, phase: Phase) -> anyhow::Result<Self> {
        let sigma_a = params.get_float3_or("sigma_a", [0.0, 0.0, 0.0]).into();
        let sigma_s = params.get_float3("sigma_s")?.into();
        Ok(Self::new(sigma_a, sigma_s, phase))
    }

    fn transmittance(&self, dist: f32) -> Color {
        if dist.is_infinite() {
            let tr = |s: f32| if s == 0.0 { 1.0 } else { 0.0 };
            Color::new(
                tr(self.sigma_t.r),
                tr(self.sigma_t.g),
                tr(self.sigma_t.b),
            )
        } else {
            (self.sigma_t * -dist).exp()
        }
    }
}

impl MediumT for HomogeneousMedium {
    fn phase(&self) -> &Phase {
        &self.phase
    }

    fn sample_distance(
        &self,
        rng: &mut Rng,
        ray: &Ray,
        tmin: f32,
        tmax: f32,
    ) -> Option<MediumDistanceSample> {
        let (u1, u2) = rng.u2();
        let channel = if u1 < 1.0 / 3.0 {
            self.sigma_t.r
        } else if u1 < 2.0 / 3.0 {
            self.sigma_t.g
        } else {
            self.sigma_t.b
        };
        if channel == 0.0 {
            return Some(MediumDistanceSample {
                p: ray.at(tmax),
                medium: false,
                weight: self.transmittance(tmax - tmin) / self.transmittance(tmax - tmin).avg(),
            });
        }
        let t = tmin - (1.0 - u2).ln() / channel;
        if t < tmax {
            let tr = self.transmittance(t - tmin);
            let pdf = (self.sigma_t * tr).avg();
            Some(MediumDistanceSample {
                p: ray.at(t),
                medium: true,
                weight: tr * self.sigma_s / pdf,
            })
        } else {
            let tr = self.transmittance(tmax - tmin);
            let pdf = tr.avg();
            Some(MediumDistanceSample {
                p: ray.at(tmax),
                medium: false,
                weight: tr / pdf,
            })
        }
    }

    fn eval_transmittance(&self, _rng: &mut Rng, _ray: &Ray, tmin: f32, tmax: f32) -> Color {
        self.transmittance(tmax - tmin)
    }
}
