use crate::model::Rgba;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const SMA: Rgba = Rgba::rgb(0x80, 0x00, 0x80);
pub const RSI: Rgba = Rgba::rgb(0xa5, 0x2a, 0x2a);
pub const DEFAULT_DENOISED: Rgba = Rgba::rgb(0x44, 0x44, 0x44);

pub const CLOSE: Rgba = Rgba::rgb(0x00, 0x00, 0xff);
pub const OPEN: Rgba = Rgba::rgb(0x00, 0x80, 0x00);
pub const HIGH: Rgba = Rgba::rgba(0, 255, 0, 0.5);
pub const LOW: Rgba = Rgba::rgb(0xff, 0x00, 0x00);
pub const VOLUME: Rgba = Rgba::rgb(0x88, 0x88, 0x88);

/// Fixed colour for each known denoising method.
pub fn method_color(method: &str) -> Rgba {
    match method {
        "wavelet" => Rgba::rgb(0x00, 0xff, 0xff),
        "kalman" => Rgba::rgb(0xff, 0x00, 0xff),
        "ssa" => Rgba::rgb(0xff, 0xff, 0x00),
        "emd" => Rgba::rgb(0xff, 0x80, 0x00),
        other => fallback_color(other),
    }
}

/// Pseudo-random but stable per name, so re-rendering keeps the colour.
fn fallback_color(method: &str) -> Rgba {
    let mut hasher = DefaultHasher::new();
    method.hash(&mut hasher);
    let mut rng = StdRng::seed_from_u64(hasher.finish());
    Rgba::rgb(rng.random(), rng.random(), rng.random())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_methods_use_the_static_palette() {
        assert_eq!(method_color("wavelet").to_css(), "#00ffff");
        assert_eq!(method_color("kalman").to_css(), "#ff00ff");
        assert_eq!(method_color("ssa").to_css(), "#ffff00");
        assert_eq!(method_color("emd").to_css(), "#ff8000");
    }

    #[test]
    fn unknown_method_gets_a_stable_colour() {
        assert_eq!(method_color("ceemdan"), method_color("ceemdan"));
        assert_eq!(method_color("ceemdan").a, 1.0);
    }
}
