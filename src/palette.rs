// --- File: palette.rs ---
use crate::ecosystem::CellKind;

pub type Rgba = [f32; 4];

pub const LEAF_COLOR: Rgba = [0.078_431_38, 1.0, 0.078_431_38, 1.0];
pub const STEM_COLOR: Rgba = [0.196_078_43, 0.658_823_55, 0.321_568_64, 1.0];
pub const DORMANT_SEED_COLOR: Rgba = [0.941_176_5, 0.019_607_844, 0.019_607_844, 1.0]; // #f00505
pub const ACTIVE_SEED_COLOR: Rgba = [0.941_176_5, 0.815_686_3, 0.019_607_844, 1.0]; // #f0d005
pub const ROOT_COLOR: Rgba = [0.490_196_08, 0.376_470_6, 0.160_784_32, 1.0];
pub const UNKNOWN_COLOR: Rgba = [0.90, 0.90, 0.90, 1.0];

/// Fixed cell palette. `activated` only matters for seeds.
#[inline]
pub fn classify(kind: CellKind, activated: bool) -> Rgba {
    match kind {
        CellKind::Leaf => LEAF_COLOR,
        CellKind::Stem => STEM_COLOR,
        CellKind::Seed if activated => ACTIVE_SEED_COLOR,
        CellKind::Seed => DORMANT_SEED_COLOR,
        CellKind::Root => ROOT_COLOR,
        CellKind::Other => UNKNOWN_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-4
    }

    fn assert_rgb(actual: Rgba, r: f32, g: f32, b: f32) {
        assert!(
            approx_eq(actual[0], r) && approx_eq(actual[1], g) && approx_eq(actual[2], b),
            "expected ({r}, {g}, {b}), got {actual:?}"
        );
        assert_eq!(actual[3], 1.0, "alpha is always opaque");
    }

    #[test]
    fn palette_matches_table() {
        for activated in [false, true] {
            assert_rgb(classify(CellKind::Leaf, activated), 0.0784, 1.0, 0.0784);
            assert_rgb(classify(CellKind::Stem, activated), 0.1961, 0.6588, 0.3216);
            assert_rgb(classify(CellKind::Root, activated), 0.4902, 0.3765, 0.1608);
            assert_rgb(classify(CellKind::Other, activated), 0.90, 0.90, 0.90);
        }
        assert_rgb(classify(CellKind::Seed, false), 0.9412, 0.0196, 0.0196);
        assert_rgb(classify(CellKind::Seed, true), 0.9412, 0.8157, 0.0196);
    }

    #[test]
    fn unrecognized_tag_gets_default_color() {
        let kind = CellKind::from_tag("xylem");
        assert_eq!(classify(kind, false), UNKNOWN_COLOR);
        assert_eq!(classify(kind, true), UNKNOWN_COLOR);
    }
}
// --- End of File: palette.rs ---
