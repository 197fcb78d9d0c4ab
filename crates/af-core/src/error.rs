use thiserror::Error;

/// Errors produced by the conversion pipeline.
#[derive(Error, Debug)]
pub enum AsciiError {
    /// Source image is undecodable or has a zero dimension.
    #[error("Image invalide : {0}")]
    InvalidImage(String),

    /// Settings violate an invariant (empty ramp, zero width, bad color…).
    #[error("Réglages invalides : {0}")]
    InvalidSettings(String),

    /// Text given to the rasterizer yields no rows.
    #[error("Texte invalide : {0}")]
    InvalidText(String),

    /// Referenced file or directory entry does not exist.
    #[error("Fichier introuvable : {path}")]
    NotFound {
        /// Path that was not found.
        path: String,
    },

    /// Artifact read/write failure.
    #[error("Erreur d'E/S : {0}")]
    Io(#[from] std::io::Error),
}

impl AsciiError {
    /// HTTP status matching this error kind.
    ///
    /// # Example
    /// ```
    /// use af_core::AsciiError;
    /// let err = AsciiError::NotFound { path: "a.png".into() };
    /// assert_eq!(err.status_code(), 404);
    /// ```
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidImage(_) | Self::InvalidSettings(_) | Self::InvalidText(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Io(_) => 500,
        }
    }
}

/// Shorthand used by the library crates.
pub type Result<T> = std::result::Result<T, AsciiError>;
