use glam::{Vec2, Vec3A};

use crate::{
    core::{
        color::Color,
        error::RenderError,
        film::Film,
        geometry::{balance_heuristic, RAY_EPS},
        interaction::{InteractionKind, RasterWindow, SceneInteraction, COMP_DONT_CARE},
        loader::InputParams,
        rng::Rng,
    },
    scene::Scene,
    sched::{self, Scheduler},
};

use super::{seed_from_params, RendererT, RenderStats};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PtMode {
    Naive,
    Nee,
    Mis,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageSampleMode {
    Pixel,
    Image,
}

/// Unidirectional path tracer with optional next-event estimation and
/// multiple importance sampling.
///
/// In `Pixel` mode each task renders one sample of a fixed pixel, so
/// NEE is disabled on the primary vertex (the raster position cannot be
/// recomputed); in `Image` mode every task is one image sample and the
/// primary NEE edge re-projects through the camera.
pub struct Pt {
    max_length: u32,
    seed: Option<u32>,
    mode: PtMode,
    image_sample_mode: ImageSampleMode,
    sched: Scheduler,
}

impl Pt {
    pub fn new(
        max_length: u32,
        seed: Option<u32>,
        mode: PtMode,
        image_sample_mode: ImageSampleMode,
        sched: Scheduler,
    ) -> Self {
        Self {
            max_length,
            seed,
            mode,
            image_sample_mode,
            sched,
        }
    }

    pub fn load(params: &mut InputParams, film_size: (u32, u32)) -> anyhow::Result<Self> {
        let max_length = params.get_int_or("max_length", 20) as u32;
        let seed = seed_from_params(params);
        let mode = match params.get_str_or("mode", "mis").as_str() {
            "naive" => PtMode::Naive,
            "nee" => PtMode::Nee,
            "mis" => PtMode::Mis,
            other => anyhow::bail!("{}: unknown mode '{}'", params.name(), other),
        };
        let image_sample_mode = match params.get_str_or("image_sample_mode", "pixel").as_str() {
            "pixel" => ImageSampleMode::Pixel,
            "image" => ImageSampleMode::Image,
            other => anyhow::bail!("{}: unknown image sample mode '{}'", params.name(), other),
        };
        // The parallel backend name is accepted for config
        // compatibility; a single worker-pool backend is provided.
        let _ = params.get_str_or("scheduler", "default");
        let sched = sched::create_scheduler_from_params(
            params,
            film_size,
            image_sample_mode == ImageSampleMode::Pixel,
        )?;
        Ok(Self::new(max_length, seed, mode, image_sample_mode, sched))
    }

    /// One camera sample: a walk of up to `max_length` vertices.
    fn sample_walk(&self, scene: &Scene, film: &Film, rng: &mut Rng, index: u64) {
        let (w, h) = film.size();
        let aspect = film.aspect();
        let window = match self.image_sample_mode {
            ImageSampleMode::Pixel => {
                let pixel = (index % (w as u64 * h as u64)) as u32;
                RasterWindow::pixel(pixel % w, (pixel / w) % h, w, h)
            }
            ImageSampleMode::Image => RasterWindow::full(),
        };

        let mut throughput = Color::WHITE;
        let mut wi = Vec3A::ZERO;
        let mut sp = SceneInteraction::camera_term(window, aspect);
        let mut raster_pos = Vec2::ZERO;

        for length in 0..self.max_length {
            // Sample a ray from the current interaction.
            let Some(s) = scene.sample_ray(rng, &sp, wi) else {
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

            // A NEE edge is samplable unless the sampled component is a
            // delta, and (in pixel mode) not on the primary vertex.
            let nee = self.mode != PtMode::Naive
                && !scene.is_specular(&s.sp, s.comp)
                && (self.image_sample_mode == ImageSampleMode::Image || length > 0);
            if nee {
                self.sample_nee_edge(
                    scene, film, rng, &s.sp, s.comp, wi, length, raster_pos, throughput, aspect,
                );
            }

            // Intersection to the next surface.
            let Some(hit) = scene.intersect(&s.ray(), RAY_EPS, f32::INFINITY) else {
                break;
            };

            throughput *= s.weight;
            if !throughput.is_finite() {
                break;
            }

            // Contribution from a light hit by the sampled direction.
            // In NEE mode this strategy only applies when the NEE edge
            // was not samplable.
            let direct = scene.is_light(&hit) && (self.mode != PtMode::Nee || !nee);
            if direct {
                let sp_l = hit.as_type(InteractionKind::LightEndpoint);
                let fs = scene.eval_contrb_endpoint_direction(&sp_l, -s.wo);
                let misw = if self.mode == PtMode::Naive || !nee {
                    1.0
                } else {
                    // The continuation edge is samplable by both
                    // strategies.
                    balance_heuristic(
                        scene.pdf_direction(&s.sp, s.comp, wi, s.wo),
                        scene.pdf_direct(&s.sp, &sp_l, COMP_DONT_CARE, -s.wo),
                    )
                };
                film.splat(raster_pos, throughput * fs * misw);
            }

            // Russian roulette.
            if length > 3 {
                let q = (1.0 - throughput.max_component()).max(0.2);
                if rng.u() < q {
                    break;
                }
                throughput /= 1.0 - q;
            }

            wi = -s.wo;
            sp = hit;
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
        if !scene.visible(sp, &s_l.sp) {
            return;
        }

        // The primary edge re-projects through the camera.
        let rp = if length == 0 {
            scene.raster_position(-s_l.wo, aspect)
        } else {
            Some(raster_pos)
        };
        let Some(rp) = rp else {
            return;
        };

        // A light with a delta component or degenerated geometry cannot
        // be reached by the direction strategy; MIS collapses to one.
        let direct_samplable =
            !scene.is_specular(&s_l.sp, s_l.comp) && !s_l.sp.geom.degenerated;
        let fs = scene.eval_contrb(sp, comp, wi, -s_l.wo);
        let misw = if self.mode == PtMode::Nee || !direct_samplable {
            1.0
        } else {
            balance_heuristic(
                scene.pdf_direct(sp, &s_l.sp, s_l.comp, s_l.wo),
                scene.pdf_direction(sp, comp, wi, -s_l.wo),
            )
        };
        film.splat(rp, throughput * fs * s_l.weight * misw);
    }
}

impl RendererT for Pt {
    fn render(&self, scene: &Scene, film: &mut Film) -> Result<RenderStats, RenderError> {
        scene.require_renderable()?;
        film.clear();
        let (w, h) = film.size();

        let film_ref: &Film = film;
        let processed = self
            .sched
            .run(self.seed, |rng, index, _threadid| {
                self.sample_walk(scene, film_ref, rng, index);
            });

        if processed > 0 {
            // In pixel mode this equals 1 / samples-per-pixel.
            film.rescale((w as u64 * h as u64) as f32 / processed as f32);
        }
        Ok(RenderStats { processed })
    }
}
