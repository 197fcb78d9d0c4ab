/// 10 caractères: ramp par défaut, du plus dense au plus clair.
pub const RAMP_DEFAULT: &str = "@%#*+=-:. ";

/// 70 caractères: Paul Bourke, résolution maximale (dense→clair).
pub const RAMP_EXTENDED: &str =
    "$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/|()1{}[]?-_+~<>i!lI;:,^`'. ";

/// Blocs Unicode: pseudo-pixels.
pub const RAMP_BLOCKS: &str = "█▓▒░ ";

/// Character emitted for samples at or below the black threshold.
pub const BLANK: char = ' ';

/// Ramp index for an intensity: `v * len / 256`, integer division.
///
/// Buckets are `256 / len` wide and the lowest bucket maps to index 0.
///
/// # Example
/// ```
/// use af_core::charset::ramp_index;
/// assert_eq!(ramp_index(127, 2), 0);
/// assert_eq!(ramp_index(128, 2), 1);
/// assert_eq!(ramp_index(255, 10), 9);
/// ```
#[inline(always)]
#[must_use]
pub fn ramp_index(value: u8, len: usize) -> usize {
    usize::from(value) * len / 256
}

/// Lookup table mapping intensity [0..255] → character.
///
/// Pre-computed once per conversion, threshold included, for O(1)
/// per-sample cost.
///
/// # Example
/// ```
/// use af_core::charset::RampLut;
/// let lut = RampLut::new("AB", 15).unwrap();
/// assert_eq!(lut.map(15), ' ');
/// assert_eq!(lut.map(16), 'A');
/// assert_eq!(lut.map(255), 'B');
/// ```
pub struct RampLut {
    lut: [char; 256],
}

impl RampLut {
    /// Build a LUT from a ramp and a black threshold.
    ///
    /// Values `<= black_threshold` map to a blank; a negative threshold
    /// disables blanking. Returns `None` for an empty ramp.
    #[must_use]
    pub fn new(ramp: &str, black_threshold: i32) -> Option<Self> {
        let chars: Vec<char> = ramp.chars().collect();
        if chars.is_empty() {
            return None;
        }
        let mut lut = [BLANK; 256];
        for (v, slot) in (0u8..=255).zip(lut.iter_mut()) {
            if i32::from(v) > black_threshold {
                *slot = chars[ramp_index(v, chars.len())];
            }
        }
        Some(Self { lut })
    }

    /// Map an intensity [0..255] to a character.
    #[inline(always)]
    #[must_use]
    pub fn map(&self, value: u8) -> char {
        self.lut[usize::from(value)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_glyph_ramp_splits_at_128() {
        let lut = RampLut::new("AB", -1).unwrap();
        for v in 0..=127u8 {
            assert_eq!(lut.map(v), 'A', "intensité {v}");
        }
        for v in 128..=255u8 {
            assert_eq!(lut.map(v), 'B', "intensité {v}");
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let lut = RampLut::new(RAMP_DEFAULT, 40).unwrap();
        assert_eq!(lut.map(40), BLANK);
        assert_eq!(lut.map(41), '%');
        assert_eq!(lut.map(0), BLANK);
    }

    #[test]
    fn threshold_255_blanks_everything() {
        let lut = RampLut::new("#", 255).unwrap();
        assert!((0..=255u8).all(|v| lut.map(v) == BLANK));
    }

    #[test]
    fn empty_ramp_is_rejected() {
        assert!(RampLut::new("", 0).is_none());
    }

    #[test]
    fn multibyte_glyphs_count_as_one() {
        let lut = RampLut::new(RAMP_BLOCKS, -1).unwrap();
        assert_eq!(lut.map(0), '█');
        assert_eq!(lut.map(255), ' ');
    }

    #[test]
    fn ramp_monotonic() {
        let chars: Vec<char> = RAMP_EXTENDED.chars().collect();
        let mut prev = 0usize;
        for v in 0..=255u8 {
            let idx = ramp_index(v, chars.len());
            assert!(idx >= prev, "ramp non monotone à l'intensité {v}");
            assert!(idx < chars.len());
            prev = idx;
        }
    }
}
