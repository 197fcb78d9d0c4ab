//! Table-driven settings parsing.
//!
//! Every [`Settings`] field is described once: its name, kind, default and
//! validator. Query strings, form bodies, JSON objects and CLI overrides all
//! go through [`Settings::from_params`], so a field behaves the same way
//! whatever transport carried it.

use std::path::PathBuf;

use crate::color::Rgb;
use crate::error::Result;
use crate::settings::{Settings, invalid};

/// Value kind of a settings field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned integer.
    UInt,
    /// Signed integer.
    Int,
    /// Floating point.
    Float,
    /// `1/true/yes/on` → true, anything else → false.
    Bool,
    /// Free text.
    Text,
    /// Optional filesystem path, empty means none.
    Path,
    /// Color specification (see [`Rgb::parse`]).
    Color,
}

/// One row of the settings schema.
pub struct FieldSpec {
    /// Parameter name, identical to the struct field.
    pub name: &'static str,
    /// Value kind.
    pub kind: FieldKind,
    /// Documented default, in parameter form.
    pub default: &'static str,
    apply: fn(&mut Settings, &str) -> bool,
    validate: fn(&Settings) -> Result<()>,
}

impl FieldSpec {
    /// Parse `raw` into `settings`. Returns `false` when `raw` does not
    /// parse for this field's kind; `settings` is then left untouched.
    pub fn apply(&self, settings: &mut Settings, raw: &str) -> bool {
        (self.apply)(settings, raw)
    }

    /// Run this field's validator.
    ///
    /// # Errors
    /// Returns `InvalidSettings` if the current value is out of contract.
    pub fn check(&self, settings: &Settings) -> Result<()> {
        (self.validate)(settings)
    }
}

fn ok(_: &Settings) -> Result<()> {
    Ok(())
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Schema of every settings field, in declaration order.
pub static FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "output_width",
        kind: FieldKind::UInt,
        default: "120",
        apply: |s, raw| raw.trim().parse().map(|v| s.output_width = v).is_ok(),
        validate: |s| {
            if s.output_width >= 1 {
                Ok(())
            } else {
                Err(invalid("output_width", "doit être ≥ 1"))
            }
        },
    },
    FieldSpec {
        name: "ascii_chars",
        kind: FieldKind::Text,
        default: "@%#*+=-:. ",
        apply: |s, raw| {
            s.ascii_chars = raw.to_string();
            true
        },
        validate: |s| {
            if s.ascii_chars.is_empty() {
                Err(invalid("ascii_chars", "ramp vide"))
            } else {
                Ok(())
            }
        },
    },
    FieldSpec {
        name: "black_threshold",
        kind: FieldKind::Int,
        default: "15",
        apply: |s, raw| raw.trim().parse().map(|v| s.black_threshold = v).is_ok(),
        validate: ok,
    },
    FieldSpec {
        name: "invert",
        kind: FieldKind::Bool,
        default: "false",
        apply: |s, raw| {
            s.invert = parse_bool(raw);
            true
        },
        validate: ok,
    },
    FieldSpec {
        name: "char_aspect",
        kind: FieldKind::Float,
        default: "0.55",
        apply: |s, raw| raw.trim().parse().map(|v| s.char_aspect = v).is_ok(),
        validate: |s| {
            if s.char_aspect.is_finite() && s.char_aspect > 0.0 {
                Ok(())
            } else {
                Err(invalid("char_aspect", "doit être fini et > 0"))
            }
        },
    },
    FieldSpec {
        name: "font_path",
        kind: FieldKind::Path,
        default: "",
        apply: |s, raw| {
            let raw = raw.trim();
            s.font_path = (!raw.is_empty()).then(|| PathBuf::from(raw));
            true
        },
        validate: ok,
    },
    FieldSpec {
        name: "font_size",
        kind: FieldKind::UInt,
        default: "12",
        apply: |s, raw| raw.trim().parse().map(|v| s.font_size = v).is_ok(),
        validate: |s| {
            if s.font_size >= 1 {
                Ok(())
            } else {
                Err(invalid("font_size", "doit être ≥ 1"))
            }
        },
    },
    FieldSpec {
        name: "fg_color",
        kind: FieldKind::Color,
        default: "black",
        apply: |s, raw| {
            s.fg_color = raw.trim().to_string();
            true
        },
        validate: |s| Rgb::parse(&s.fg_color).map(|_| ()),
    },
    FieldSpec {
        name: "bg_color",
        kind: FieldKind::Color,
        default: "white",
        apply: |s, raw| {
            s.bg_color = raw.trim().to_string();
            true
        },
        validate: |s| Rgb::parse(&s.bg_color).map(|_| ()),
    },
];

/// Look up a field by parameter name.
#[must_use]
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

impl Settings {
    /// Build settings from loosely typed key/value parameters.
    ///
    /// Missing fields keep their default, unparseable values fall back to
    /// the default, unknown keys are ignored. The result is clamped then
    /// validated.
    ///
    /// # Errors
    /// Returns `InvalidSettings` if a parsed value breaks an invariant.
    ///
    /// # Example
    /// ```
    /// use af_core::Settings;
    /// let s = Settings::from_params([("output_width", "40"), ("invert", "on")]).unwrap();
    /// assert_eq!(s.output_width, 40);
    /// assert!(s.invert);
    /// assert!(Settings::from_params([("output_width", "0")]).is_err());
    /// ```
    pub fn from_params<I, K, V>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::default().with_params(params)
    }

    /// Same as [`Settings::from_params`] but layered over `self`.
    ///
    /// # Errors
    /// Returns `InvalidSettings` if a parsed value breaks an invariant.
    pub fn with_params<I, K, V>(mut self, params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(spec) = field(key) else {
                continue;
            };
            if !spec.apply(&mut self, value) {
                log::debug!(
                    "Valeur illisible pour {key} ({value:?}), défaut conservé : {}",
                    spec.default
                );
            }
        }
        self.clamp_all();
        self.validate()?;
        Ok(self)
    }
}
