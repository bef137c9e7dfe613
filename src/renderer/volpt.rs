use glam::{Vec2, Vec3A};

use crate::{
    core::{
        color::Color,
        error::RenderError,
        film::Film,
        interaction::{InteractionKind, RasterWindow, RaySample, SceneInteraction},
        loader::InputParams,
        rng::Rng,
    },
    scene::Scene,
    sched::{self, Scheduler},
};

use super::{seed_from_params, RendererT, RenderStats};

/// Volumetric path tracer with next-event estimation.
///
/// The walk decomposes each step into explicit direction and distance
/// sampling so scattering can happen inside participating media. NEE
/// edges are weighted by a transmittance estimate instead of a binary
/// visibility test, and emissive hits contribute only when the NEE edge
/// was not samplable (there is no MIS between the two strategies).
pub struct VolPt {
    max_verts: u32,
    rr_prob: f32,
    seed: Option<u32>,
    sched: Scheduler,
}

impl VolPt {
    pub fn new(max_verts: u32, rr_prob: f32, seed: Option<u32>, sched: Scheduler) -> Self {
        Self {
            max_verts,
            rr_prob,
            seed,
            sched,
        }
    }

    pub fn load(params: &mut InputParams, film_size: (u32, u32)) -> anyhow::Result<Self> {
        let max_verts = params.get_int_or("max_verts", 20) as u32;
        let rr_prob = params.get_float_or("rr_prob", 0.2);
        let seed = seed_from_params(params);
        let _ = params.get_str_or("scheduler", "default");
        // Sample positions are drawn over the whole image.
        let sched = sched::create_scheduler_from_params(params, film_size, false)?;
        Ok(Self::new(max_verts, rr_prob, seed, sched))
    }

    fn sample_walk(&self, scene: &Scene, film: &Film, rng: &mut Rng, aspect: f32) {
        let mut throughput = Color::WHITE;
        let mut wi = Vec3A::ZERO;
        let mut sp = SceneInteraction::camera_term(RasterWindow::full(), aspect);
        let mut raster_pos = Vec2::ZERO;

        for length in 0..self.max_verts {
            // The primary ray comes from the camera terminator; every
            // later vertex samples a direction explicitly.
            let s = if sp.is_terminator() {
                scene.sample_ray(rng, &sp, wi)
            } else {
                scene.sample_direction(rng, &sp, wi).map(|d| RaySample {
                    sp,
                    comp: d.comp,
                    wo: d.wo,
                    weight: d.weight,
                })
            };
            let Some(s) = s else {
                break;
            };
            if s.weight.is_black() {
                break;
            }

            if length == 0 {
                match scene.raster_position(s.wo, aspect) {
                    Some(rp) => raster_pos = rp,
                    None => break,
                }
            }

            let nee = !scene.is_specular(&s.sp, s.comp);
            if nee {
                self.sample_nee_edge(
                    scene, film, rng, &s.sp, s.comp, wi, length, raster_pos, throughput, aspect,
                );
            }

            // Sample the next interaction along the ray: a medium event
            // or the next surface.
            let Some(sd) = scene.sample_distance(rng, &s.sp, s.wo) else {
                break;
            };

            throughput *= s.weight * sd.weight;
            if !throughput.is_finite() {
                break;
            }

            // Emissive interaction reached by the distance strategy.
            if !nee && scene.is_light(&sd.sp) {
                let sp_l = sd.sp.as_type(InteractionKind::LightEndpoint);
                let le = scene.eval_contrb_endpoint_direction(&sp_l, -s.wo);
                film.splat(raster_pos, throughput * le);
            }

            // The walk cannot continue from an environment hit.
            if sd.sp.geom.infinite {
                break;
            }

            // Russian roulette.
            if length > 5 {
                let q = (1.0 - throughput.max_component()).max(self.rr_prob);
                if rng.u() < q {
                    break;
                }
                throughput /= 1.0 - q;
            }

            wi = -s.wo;
            sp = sd.sp;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn sample_nee_edge(
        &self,
        scene: &Scene,
        film: &Film,
        rng: &mut Rng,
        sp: &SceneInteraction,
        comp: i32,
        wi: Vec3A,
        length: u32,
        raster_pos: Vec2,
        throughput: Color,
        aspect: f32,
    ) {
        let Some(s_l) = scene.sample_direct_light(rng, sp) else {
            return;
        };
        let rp = if length == 0 {
            scene.raster_position(-s_l.wo, aspect)
        } else {
            Some(raster_pos)
        };
        let Some(rp) = rp else {
            return;
        };

        let tr = scene.eval_transmittance(rng, sp, &s_l.sp);
        if tr.is_black() {
            return;
        }
        let fs = scene.eval_contrb(sp, comp, wi, -s_l.wo);
        if fs.is_black() {
            return;
        }
        film.splat(rp, throughput * tr * fs * s_l.weight);
    }
}

impl RendererT for VolPt {
    fn render(&self, scene: &Scene, film: &mut Film) -> Result<RenderStats, RenderError> {
        scene.require_renderable()?;
        film.clear();
        let (w, h) = film.size();
        let aspect = film.aspect();

        let film_ref: &Film = film;
        let processed = self
            .sched
            .run(self.seed, |rng, _index, _threadid| {
                self.sample_walk(scene, film_ref, rng, aspect);
            });

        if processed > 0 {
            film.rescale((w as u64 * h as u64) as f32 / processed as f32);
        }
        Ok(RenderStats { processed })
    }
}
