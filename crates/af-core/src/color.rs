use crate::error::{AsciiError, Result};

/// Couleur RGB 8 bits parsée depuis une spécification texte.
///
/// # Example
/// ```
/// use af_core::color::Rgb;
/// assert_eq!(Rgb::parse("white").unwrap(), Rgb(255, 255, 255));
/// assert_eq!(Rgb::parse("#f00").unwrap(), Rgb(255, 0, 0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

const NAMED: &[(&str, Rgb)] = &[
    ("black", Rgb(0, 0, 0)),
    ("white", Rgb(255, 255, 255)),
    ("red", Rgb(255, 0, 0)),
    ("green", Rgb(0, 128, 0)),
    ("lime", Rgb(0, 255, 0)),
    ("blue", Rgb(0, 0, 255)),
    ("yellow", Rgb(255, 255, 0)),
    ("cyan", Rgb(0, 255, 255)),
    ("magenta", Rgb(255, 0, 255)),
    ("gray", Rgb(128, 128, 128)),
    ("grey", Rgb(128, 128, 128)),
    ("silver", Rgb(192, 192, 192)),
    ("orange", Rgb(255, 165, 0)),
    ("purple", Rgb(128, 0, 128)),
    ("navy", Rgb(0, 0, 128)),
    ("maroon", Rgb(128, 0, 0)),
    ("olive", Rgb(128, 128, 0)),
    ("teal", Rgb(0, 128, 128)),
];

impl Rgb {
    /// Parse a named color, `#rgb`, `#rrggbb` or `rgb(r, g, b)`.
    ///
    /// # Errors
    /// Returns `InvalidSettings` for anything else.
    pub fn parse(spec: &str) -> Result<Self> {
        let s = spec.trim().to_ascii_lowercase();
        if let Some((_, rgb)) = NAMED.iter().find(|(name, _)| *name == s) {
            return Ok(*rgb);
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| invalid(spec));
        }
        if let Some(inner) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            let parts: Vec<u8> = inner
                .split(',')
                .map(|p| p.trim().parse::<u8>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| invalid(spec))?;
            if let [r, g, b] = parts[..] {
                return Ok(Self(r, g, b));
            }
        }
        Err(invalid(spec))
    }

    /// Linear blend `self` over `bg` with coverage `alpha` ∈ [0, 255].
    ///
    /// # Example
    /// ```
    /// use af_core::color::Rgb;
    /// let black = Rgb(0, 0, 0);
    /// let white = Rgb(255, 255, 255);
    /// assert_eq!(black.over(white, 255), black);
    /// assert_eq!(black.over(white, 0), white);
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn over(self, bg: Rgb, alpha: u8) -> Rgb {
        let a = u32::from(alpha);
        let mix = |f: u8, b: u8| ((u32::from(f) * a + u32::from(b) * (255 - a) + 127) / 255) as u8;
        Rgb(mix(self.0, bg.0), mix(self.1, bg.1), mix(self.2, bg.2))
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|d| d * 17);
            Some(Rgb(digit(0)?, digit(1)?, digit(2)?))
        }
        6 => {
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(Rgb(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

fn invalid(spec: &str) -> AsciiError {
    AsciiError::InvalidSettings(format!("couleur inconnue '{spec}'"))
}
