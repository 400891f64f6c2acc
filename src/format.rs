use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Document formats accepted by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Pdf,
    Pptx,
    Docx,
}

impl InputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "pptx" => Some(Self::Pptx),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn from_filename(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
    }

    /// Name the Docling runner uses for `allowed_formats`.
    pub fn docling_name(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
            Self::Docx => "docx",
        }
    }

    /// Temp-file suffix, dot included.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Pptx => ".pptx",
            Self::Docx => ".docx",
        }
    }

    pub fn is_enabled(self, cfg: &Config) -> bool {
        match self {
            Self::Pdf => true,
            Self::Pptx => cfg.formats.enable_pptx,
            Self::Docx => cfg.formats.enable_docx,
        }
    }
}

/// Detects the format of `name` and checks it is switched on.
pub fn detect(cfg: &Config, name: &str) -> Option<InputFormat> {
    InputFormat::from_filename(name).filter(|f| f.is_enabled(cfg))
}
