use std::sync::Arc;

use glam::Vec3A;

use crate::{
    core::{
        color::Color,
        geometry::PointGeometry,
        interaction::TransDir,
        loader::InputParams,
        rng::Rng,
    },
    scene::SceneResources,
    texture::{Texture, TextureT},
};

use super::{Diffuse, Glossy, Mask, MaterialDirectionSample, MaterialT};

pub const COMP_MIX_DIFFUSE: i32 = 0;
pub const COMP_MIX_GLOSSY: i32 = 1;
pub const COMP_MIX_ALPHA: i32 = 2;

/// Diffuse+glossy mixture, the default material for wavefront-obj
/// assets. The lobe is selected by the relative strength of the two
/// reflectances; `eval` and `pdf_direction` are the marginals over both
/// lobes, so the sampling weight is `f_marginal / p_marginal`.
pub struct Mixture {
    diffuse: Diffuse,
    glossy: Glossy,
}

impl Mixture {
    pub fn new(diffuse: Diffuse, glossy: Glossy) -> Self {
        Self { diffuse, glossy }
    }

    pub fn load(rsc: &mut SceneResources, params: &mut InputParams) -> anyhow::Result<Self> {
        let diffuse = Diffuse::load(rsc, params)?;
        let glossy = Glossy::load(params)?;
        Ok(Self::new(diffuse, glossy))
    }

    fn diffuse_selection_weight(&self, geom: &PointGeometry) -> f32 {
        diffuse_selection_weight(&self.diffuse, &self.glossy, geom)
    }
}

fn diffuse_selection_weight(diffuse: &Diffuse, glossy: &Glossy, geom: &PointGeometry) -> f32 {
    let wd = diffuse
        .reflectance(geom)
        .map(|c| c.max_component())
        .unwrap_or(0.0);
    let wg = glossy
        .reflectance(geom)
        .map(|c| c.max_component())
        .unwrap_or(0.0);
    if wd == 0.0 && wg == 0.0 {
        1.0
    } else {
        wd / (wd + wg)
    }
}

impl MaterialT for Mixture {
    fn is_specular(&self, _geom: &PointGeometry, _comp: i32) -> bool {
        false
    }

    fn sample_direction(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        wi: Vec3A,
        trans_dir: TransDir,
    ) -> Option<MaterialDirectionSample> {
        let wd = self.diffuse_selection_weight(geom);
        let (comp, s) = if rng.u() < wd {
            (
                COMP_MIX_DIFFUSE,
                self.diffuse.sample_direction(rng, geom, wi, trans_dir)?,
            )
        } else {
            (
                COMP_MIX_GLOSSY,
                self.glossy.sample_direction(rng, geom, wi, trans_dir)?,
            )
        };
        let f = self.eval(geom, comp, wi, s.wo, trans_dir, true);
        let p = self.pdf_direction(geom, comp, wi, s.wo, true);
        if p <= 0.0 {
            return None;
        }
        Some(MaterialDirectionSample {
            wo: s.wo,
            comp,
            weight: f / p,
        })
    }

    fn pdf_direction(
        &self,
        geom: &PointGeometry,
        comp: i32,
        wi: Vec3A,
        wo: Vec3A,
        eval_delta: bool,
    ) -> f32 {
        let wd = self.diffuse_selection_weight(geom);
        wd * self.diffuse.pdf_direction(geom, comp, wi, wo, eval_delta)
            + (1.0 - wd) * self.glossy.pdf_direction(geom, comp, wi, wo, eval_delta)
    }

    fn eval(
        &self,
        geom: &PointGeometry,
        comp: i32,
        wi: Vec3A,
        wo: Vec3A,
        trans_dir: TransDir,
        eval_delta: bool,
    ) -> Color {
        self.diffuse.eval(geom, comp, wi, wo, trans_dir, eval_delta)
            + self.glossy.eval(geom, comp, wi, wo, trans_dir, eval_delta)
    }

    fn reflectance(&self, geom: &PointGeometry) -> Option<Color> {
        self.diffuse.reflectance(geom)
    }
}

/// Diffuse+glossy+alpha mixture. The alpha lobe is a specular
/// pass-through selected with probability `1 - alpha(uv)`; its marginal
/// is defined only on the opposite half-plane (a direction crossing the
/// surface can only come from the mask, a direction staying on the
/// incident side only from diffuse+glossy).
pub struct MixtureWithAlpha {
    diffuse: Diffuse,
    glossy: Glossy,
    mask: Mask,
    mask_tex: Option<Arc<Texture>>,
}

impl MixtureWithAlpha {
    pub fn new(diffuse: Diffuse, glossy: Glossy, mask_tex: Option<Arc<Texture>>) -> Self {
        Self {
            diffuse,
            glossy,
            mask: Mask::new(),
            mask_tex,
        }
    }

    pub fn load(rsc: &mut SceneResources, params: &mut InputParams) -> anyhow::Result<Self> {
        let mask_tex = if params.contains_key("mapKd") {
            let tex = rsc.clone_texture(&params.get_str("mapKd")?)?;
            tex.has_alpha().then_some(tex)
        } else {
            None
        };
        let diffuse = Diffuse::load(rsc, params)?;
        let glossy = Glossy::load(params)?;
        Ok(Self::new(diffuse, glossy, mask_tex))
    }

    fn alpha(&self, geom: &PointGeometry) -> f32 {
        self.mask_tex
            .as_ref()
            .map(|tex| tex.eval_alpha(geom.t))
            .unwrap_or(1.0)
    }

    fn selection_pmf(&self, geom: &PointGeometry, comp: i32) -> f32 {
        let alpha = self.alpha(geom);
        match comp {
            COMP_MIX_ALPHA => 1.0 - alpha,
            COMP_MIX_DIFFUSE => {
                alpha * diffuse_selection_weight(&self.diffuse, &self.glossy, geom)
            }
            COMP_MIX_GLOSSY => {
                alpha * (1.0 - diffuse_selection_weight(&self.diffuse, &self.glossy, geom))
            }
            _ => 0.0,
        }
    }

    fn mix_weight(&self, geom: &PointGeometry, comp: i32) -> f32 {
        let alpha = self.alpha(geom);
        if comp == COMP_MIX_ALPHA {
            1.0 - alpha
        } else {
            alpha
        }
    }
}

impl MaterialT for MixtureWithAlpha {
    fn is_specular(&self, _geom: &PointGeometry, comp: i32) -> bool {
        comp == COMP_MIX_ALPHA
    }

    fn sample_direction(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        wi: Vec3A,
        trans_dir: TransDir,
    ) -> Option<MaterialDirectionSample> {
        let alpha = self.alpha(geom);
        let (comp, s) = if rng.u() > alpha {
            (
                COMP_MIX_ALPHA,
                self.mask.sample_direction(rng, geom, wi, trans_dir)?,
            )
        } else if rng.u() < diffuse_selection_weight(&self.diffuse, &self.glossy, geom) {
            (
                COMP_MIX_DIFFUSE,
                self.diffuse.sample_direction(rng, geom, wi, trans_dir)?,
            )
        } else {
            (
                COMP_MIX_GLOSSY,
                self.glossy.sample_direction(rng, geom, wi, trans_dir)?,
            )
        };
        // Uniform f/p path; delta coefficients of the mask cancel
        // between the marginal eval and pdf.
        let f = self.eval(geom, comp, wi, s.wo, trans_dir, true);
        let p = self.pdf_direction(geom, comp, wi, s.wo, true);
        if p <= 0.0 {
            return None;
        }
        Some(MaterialDirectionSample {
            wo: s.wo,
            comp,
            weight: f / p,
        })
    }

    fn pdf_direction(
        &self,
        geom: &PointGeometry,
        comp: i32,
        wi: Vec3A,
        wo: Vec3A,
        eval_delta: bool,
    ) -> f32 {
        if geom.opposite(wi, wo) {
            // Only the pass-through lobe reaches the other side.
            self.selection_pmf(geom, COMP_MIX_ALPHA)
                * self.mask.pdf_direction(geom, comp, wi, wo, eval_delta)
        } else {
            self.selection_pmf(geom, COMP_MIX_DIFFUSE)
                * self.diffuse.pdf_direction(geom, comp, wi, wo, eval_delta)
                + self.selection_pmf(geom, COMP_MIX_GLOSSY)
                    * self.glossy.pdf_direction(geom, comp, wi, wo, eval_delta)
        }
    }

    fn eval(
        &self,
        geom: &PointGeometry,
        comp: i32,
        wi: Vec3A,
        wo: Vec3A,
        trans_dir: TransDir,
        eval_delta: bool,
    ) -> Color {
        if geom.opposite(wi, wo) {
            self.mix_weight(geom, COMP_MIX_ALPHA)
                * self.mask.eval(geom, comp, wi, wo, trans_dir, eval_delta)
        } else {
            self.mix_weight(geom, COMP_MIX_DIFFUSE)
                * (self.diffuse.eval(geom, comp, wi, wo, trans_dir, eval_delta)
                    + self.glossy.eval(geom, comp, wi, wo, trans_dir, eval_delta))
        }
    }

    fn reflectance(&self, geom: &PointGeometry) -> Option<Color> {
        self.diffuse.reflectance(geom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interaction::COMP_DONT_CARE;
    use glam::Vec2;

    fn surface() -> PointGeometry {
        PointGeometry::on_surface(Vec3A::ZERO, Vec3A::Z, Vec2::ZERO)
    }

    fn mixture() -> Mixture {
        Mixture::new(
            Diffuse::new(Color::new(0.6, 0.3, 0.1), None),
            Glossy::new(Color::gray(0.4), 0.2, 0.2),
        )
    }

    #[test]
    fn marginal_pdf_is_the_selection_weighted_sum() {
        let mat = mixture();
        let geom = surface();
        let wi = Vec3A::new(0.3, 0.2, 0.93).normalize();
        let wd = 0.6 / (0.6 + 0.4);
        let mut rng = Rng::seeded(51);
        for _ in 0..100 {
            let wo = {
                let d = rng.cosine_weighted_on_hemisphere();
                d.normalize()
            };
            let marginal = mat.pdf_direction(&geom, COMP_DONT_CARE, wi, wo, false);
            let expected = wd * mat.diffuse.pdf_direction(&geom, COMP_DONT_CARE, wi, wo, false)
                + (1.0 - wd) * mat.glossy.pdf_direction(&geom, COMP_DONT_CARE, wi, wo, false);
            assert!((marginal - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn marginal_eval_is_the_sum_of_lobes() {
        let mat = mixture();
        let geom = surface();
        let wi = Vec3A::new(0.1, -0.2, 0.97).normalize();
        let wo = Vec3A::new(-0.3, 0.1, 0.95).normalize();
        let f = mat.eval(&geom, COMP_DONT_CARE, wi, wo, TransDir::EL, false);
        let fd = mat.diffuse.eval(&geom, COMP_DONT_CARE, wi, wo, TransDir::EL, false);
        let fg = mat.glossy.eval(&geom, COMP_DONT_CARE, wi, wo, TransDir::EL, false);
        assert!((f.r - (fd.r + fg.r)).abs() < 1e-6);
    }

    #[test]
    fn zero_reflectance_pair_still_selects_a_lobe() {
        let mat = Mixture::new(
            Diffuse::new(Color::BLACK, None),
            Glossy::new(Color::BLACK, 0.2, 0.2),
        );
        let geom = surface();
        assert_eq!(mat.diffuse_selection_weight(&geom), 1.0);
    }

    fn alpha_mixture(alpha: f32) -> MixtureWithAlpha {
        let tex = (alpha < 1.0).then(|| {
            let bitmap = crate::texture::BitmapTexture::from_image(
                &image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
                    2,
                    2,
                    image::Rgba([255, 255, 255, (alpha * 255.0) as u8]),
                )),
            );
            Arc::new(Texture::from(bitmap))
        });
        MixtureWithAlpha::new(
            Diffuse::new(Color::gray(0.5), None),
            Glossy::new(Color::gray(0.5), 0.3, 0.3),
            tex,
        )
    }

    #[test]
    fn opposite_half_plane_takes_only_the_alpha_lobe() {
        let mat = alpha_mixture(0.4);
        let geom = surface();
        let wi = Vec3A::new(0.2, 0.0, 0.98).normalize();
        let wo = -wi;
        let alpha = mat.alpha(&geom);
        // Non-delta evaluation sees nothing across the surface.
        assert!(mat
            .eval(&geom, COMP_MIX_ALPHA, wi, wo, TransDir::EL, false)
            .is_black());
        assert_eq!(mat.pdf_direction(&geom, COMP_MIX_ALPHA, wi, wo, false), 0.0);
        // With delta coefficients the mask contributes 1 - alpha.
        let f = mat.eval(&geom, COMP_MIX_ALPHA, wi, wo, TransDir::EL, true);
        assert!((f.r - (1.0 - alpha)).abs() < 0.01);
        let p = mat.pdf_direction(&geom, COMP_MIX_ALPHA, wi, wo, true);
        assert!((p - (1.0 - alpha)).abs() < 0.01);
    }

    #[test]
    fn same_half_plane_excludes_the_alpha_lobe() {
        let mat = alpha_mixture(0.4);
        let geom = surface();
        let wi = Vec3A::new(0.2, 0.0, 0.98).normalize();
        let wo = Vec3A::new(-0.4, 0.1, 0.91).normalize();
        let with_delta = mat.pdf_direction(&geom, COMP_DONT_CARE, wi, wo, true);
        let without = mat.pdf_direction(&geom, COMP_DONT_CARE, wi, wo, false);
        // The mask never contributes on the incident side.
        assert!((with_delta - without).abs() < 1e-6);
    }

    #[test]
    fn alpha_lobe_sample_has_unit_weight() {
        let mat = alpha_mixture(0.3);
        let geom = surface();
        let wi = Vec3A::new(0.1, 0.3, 0.95).normalize();
        let mut rng = Rng::seeded(77);
        let mut saw_alpha = false;
        for _ in 0..1000 {
            let Some(s) = mat.sample_direction(&mut rng, &geom, wi, TransDir::EL) else {
                continue;
            };
            if s.comp == COMP_MIX_ALPHA {
                saw_alpha = true;
                assert!((s.wo + wi).length() < 1e-6);
                assert!((s.weight.r - 1.0).abs() < 1e-4);
                assert!(mat.is_specular(&geom, s.comp));
            } else {
                assert!(!mat.is_specular(&geom, s.comp));
            }
        }
        assert!(saw_alpha);
    }

    #[test]
    fn opaque_material_never_selects_alpha() {
        let mat = alpha_mixture(1.0);
        let geom = surface();
        let wi = Vec3A::new(0.0, 0.1, 0.99).normalize();
        let mut rng = Rng::seeded(83);
        for _ in 0..1000 {
            if let Some(s) = mat.sample_direction(&mut rng, &geom, wi, TransDir::EL) {
                assert_ne!(s.comp, COMP_MIX_ALPHA);
            }
        }
    }
}
