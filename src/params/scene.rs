//! Scene module parameters.
//!
//! Every scene receives its parameter struct at construction and never
//! mutates it; the per-frame state lives in the scene itself.

use serde::Deserialize;

use crate::util::parse_hex_color;

/// One morphing particle layer (sphere -> torus -> cube -> sphere)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MorphLayerParams {
    /// Particles per trail step
    pub particle_count: usize,

    /// Copies of each particle drawn slightly behind in time (>= 1)
    pub trail_steps: usize,

    /// Seconds between consecutive trail copies
    pub trail_spacing_s: f32,

    /// Morph scalar advance per display tick (3.0 = full cycle)
    pub morph_speed: f32,

    /// Initial morph scalar
    pub morph_offset: f32,

    /// Base palette endpoints and glow tint (`#rrggbb`)
    pub color_a: String,
    pub color_b: String,
    pub glow_color: String,

    pub hue_base: f32,
    pub hue_range: f32,
    pub sat_base: f32,
    pub sat_range: f32,
    pub val_base: f32,
    pub val_range: f32,

    /// Alpha of the body and of the glow term
    pub alpha_base: f32,
    pub alpha_glow: f32,

    /// Shape dimensions (world units)
    pub sphere_radius: f32,
    pub torus_major_radius: f32,
    pub torus_minor_radius: f32,
    pub cube_half_extent: f32,

    /// Normalized bin magnitude above which the burst displacement kicks in
    pub burst_threshold: f32,

    /// Burst displacement per unit magnitude (world units)
    pub burst_gain: f32,
}

impl Default for MorphLayerParams {
    fn default() -> Self {
        Self {
            particle_count: 1200,
            trail_steps: 4,
            trail_spacing_s: 0.07,
            morph_speed: 0.006,
            morph_offset: 0.0,
            color_a: "#7afcff".to_string(),
            color_b: "#ffa6ff".to_string(),
            glow_color: "#fff6e0".to_string(),
            hue_base: 0.55,
            hue_range: 0.20,
            sat_base: 0.74,
            sat_range: 0.18,
            val_base: 0.94,
            val_range: 0.08,
            alpha_base: 0.13,
            alpha_glow: 0.40,
            sphere_radius: 3.1,
            torus_major_radius: 2.15,
            torus_minor_radius: 1.0,
            cube_half_extent: 3.0,
            burst_threshold: 0.70,
            burst_gain: 1.2,
        }
    }
}

impl MorphLayerParams {
    pub fn validate(&self) -> Result<(), String> {
        for (name, hex) in [
            ("color_a", &self.color_a),
            ("color_b", &self.color_b),
            ("glow_color", &self.glow_color),
        ] {
            if parse_hex_color(hex).is_none() {
                return Err(format!("{} must be a #rrggbb color, got '{}'", name, hex));
            }
        }
        if !(self.morph_speed.is_finite() && self.morph_offset.is_finite()) {
            return Err("morph_speed and morph_offset must be finite".to_string());
        }
        if !(self.trail_spacing_s.is_finite() && self.trail_spacing_s >= 0.0) {
            return Err(format!(
                "trail_spacing_s must be >= 0, got {}",
                self.trail_spacing_s
            ));
        }
        Ok(())
    }
}

/// Layered aurora: several morph layers at once
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuroraParams {
    pub layers: Vec<MorphLayerParams>,
}

impl Default for AuroraParams {
    fn default() -> Self {
        let layer = MorphLayerParams::default();
        Self {
            layers: vec![
                // luxury cyan-purple
                MorphLayerParams {
                    particle_count: 1200,
                    morph_speed: 0.006,
                    morph_offset: 0.0,
                    color_a: "#70e2ff".to_string(),
                    color_b: "#c997fc".to_string(),
                    glow_color: "#f3e6ff".to_string(),
                    alpha_base: 0.16,
                    alpha_glow: 0.46,
                    ..layer.clone()
                },
                // deep aurora blue-purple
                MorphLayerParams {
                    particle_count: 900,
                    morph_speed: 0.0046,
                    morph_offset: 0.19,
                    color_a: "#95f7ef".to_string(),
                    color_b: "#b48bf0".to_string(),
                    glow_color: "#b6e6fa".to_string(),
                    hue_base: 0.48,
                    sat_base: 0.64,
                    sat_range: 0.15,
                    val_base: 0.92,
                    val_range: 0.10,
                    alpha_base: 0.11,
                    alpha_glow: 0.29,
                    ..layer.clone()
                },
                // soft pink-blue
                MorphLayerParams {
                    particle_count: 600,
                    morph_speed: 0.0041,
                    morph_offset: 0.38,
                    color_a: "#7ecbff".to_string(),
                    color_b: "#ec8dfd".to_string(),
                    glow_color: "#c9f3fc".to_string(),
                    hue_base: 0.56,
                    hue_range: 0.19,
                    sat_base: 0.71,
                    sat_range: 0.16,
                    val_base: 0.91,
                    alpha_base: 0.09,
                    alpha_glow: 0.23,
                    ..layer
                },
            ],
        }
    }
}

/// Concentric ring tunnel with drifting glow particles
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TunnelParams {
    pub rings: usize,
    pub segments: usize,

    /// Base ring radius (world units)
    pub radius: f32,

    /// Length of the z range the rings cycle through
    pub depth: f32,

    /// Ring travel speed multiplier
    pub speed: f32,

    /// Twist amplitude at the nearest ring (decays to 0 at the far end)
    pub twist_factor: f32,

    /// Opacity of the nearest ring; each further ring loses `opacity_falloff`
    pub glow_opacity: f32,
    pub opacity_falloff: f32,

    pub particle_count: usize,

    /// Lateral spread of glow particles (bound is radius + 0.7)
    pub particle_radius: f32,

    /// Particles past this z respawn at the far end
    pub respawn_z: f32,

    /// Seed for the glow particle generator
    pub seed: u64,
}

impl Default for TunnelParams {
    fn default() -> Self {
        Self {
            rings: 22,
            segments: 64,
            radius: 2.65,
            depth: 18.0,
            speed: 2.2,
            twist_factor: 0.18,
            glow_opacity: 0.94,
            opacity_falloff: 0.035,
            particle_count: 20,
            particle_radius: 1.5,
            respawn_z: 8.0,
            seed: 0x7E11,
        }
    }
}

impl TunnelParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.rings == 0 {
            return Err("tunnel needs at least one ring".to_string());
        }
        if self.segments < 3 {
            return Err(format!("tunnel segments must be >= 3, got {}", self.segments));
        }
        if !(self.depth.is_finite() && self.depth > 0.0) {
            return Err(format!("tunnel depth must be > 0, got {}", self.depth));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(format!("tunnel radius must be > 0, got {}", self.radius));
        }
        if !(self.speed.is_finite() && self.respawn_z.is_finite() && self.particle_radius.is_finite()) {
            return Err("tunnel speed, respawn_z and particle_radius must be finite".to_string());
        }
        Ok(())
    }
}

/// Single strip mesh waving with the spectrum
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RibbonParams {
    pub segments: usize,

    /// Half-height of the strip before audio widening
    pub width: f32,

    /// Horizontal distance between segments
    pub segment_spacing: f32,
}

impl Default for RibbonParams {
    fn default() -> Self {
        Self {
            segments: 180,
            width: 0.9,
            segment_spacing: 0.14,
        }
    }
}

impl RibbonParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.segments < 2 {
            return Err(format!("ribbon segments must be >= 2, got {}", self.segments));
        }
        if !(self.width.is_finite() && self.segment_spacing.is_finite()) {
            return Err("ribbon width and segment_spacing must be finite".to_string());
        }
        Ok(())
    }
}

/// Multi-layer spiral galaxy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GalaxyParams {
    pub layers: usize,
    pub particles_per_layer: usize,
    pub arms: usize,

    /// Outer radius of the first layer; each further layer shrinks by 0.6
    pub spiral_radius: f32,
}

impl Default for GalaxyParams {
    fn default() -> Self {
        Self {
            layers: 4,
            particles_per_layer: 3200,
            arms: 6,
            spiral_radius: 7.0,
        }
    }
}

impl GalaxyParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.layers == 0 || self.arms == 0 {
            return Err("galaxy needs at least one layer and one arm".to_string());
        }
        if !(self.spiral_radius.is_finite() && self.spiral_radius > 0.0) {
            return Err(format!(
                "galaxy spiral_radius must be > 0, got {}",
                self.spiral_radius
            ));
        }
        Ok(())
    }
}

/// All scene parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SceneParams {
    pub morph: MorphLayerParams,
    pub aurora: AuroraParams,
    pub tunnel: TunnelParams,
    pub ribbon: RibbonParams,
    pub galaxy: GalaxyParams,
}

impl SceneParams {
    /// Reject values that would make a scene emit NaN or degenerate geometry
    pub fn validate(&self) -> Result<(), String> {
        self.morph.validate().map_err(|e| format!("[scenes.morph] {}", e))?;
        for (i, layer) in self.aurora.layers.iter().enumerate() {
            layer
                .validate()
                .map_err(|e| format!("[scenes.aurora] layer {}: {}", i, e))?;
        }
        self.tunnel.validate().map_err(|e| format!("[scenes.tunnel] {}", e))?;
        self.ribbon.validate().map_err(|e| format!("[scenes.ribbon] {}", e))?;
        self.galaxy.validate().map_err(|e| format!("[scenes.galaxy] {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SceneParams::default().validate().is_ok());
    }

    #[test]
    fn test_tunnel_degenerate_values_rejected() {
        let zero_depth = TunnelParams {
            depth: 0.0,
            ..TunnelParams::default()
        };
        assert!(zero_depth.validate().is_err());
        let no_rings = TunnelParams {
            rings: 0,
            ..TunnelParams::default()
        };
        assert!(no_rings.validate().is_err());
        let nan_radius = TunnelParams {
            radius: f32::NAN,
            ..TunnelParams::default()
        };
        assert!(nan_radius.validate().is_err());
    }

    #[test]
    fn test_galaxy_and_ribbon_degenerate_values_rejected() {
        let no_arms = GalaxyParams {
            arms: 0,
            ..GalaxyParams::default()
        };
        assert!(no_arms.validate().is_err());
        let flat = GalaxyParams {
            spiral_radius: -1.0,
            ..GalaxyParams::default()
        };
        assert!(flat.validate().is_err());
        let single = RibbonParams {
            segments: 1,
            ..RibbonParams::default()
        };
        assert!(single.validate().is_err());
    }

    #[test]
    fn test_bad_layer_color_names_the_layer() {
        let mut params = SceneParams::default();
        params.aurora.layers[1].glow_color = "#ééé".to_string();
        let err = params.validate().unwrap_err();
        assert!(err.contains("aurora") && err.contains("layer 1"), "{}", err);
    }
}
