use crate::{config::DoclingPipeline, format::InputFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDiag {
    pub python_exe: String,
    pub python_version: String,
    pub docling_version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractIn {
    pub input_path: String,
    pub format: InputFormat,
    /// Where the runner writes picture crops as PNG files.
    pub out_dir: String,
    pub pipeline: DoclingPipeline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOut {
    pub ok: bool,
    #[serde(default)]
    pub pages: Vec<RawPage>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    pub page_no: u32,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub pictures: Vec<RawPicture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPicture {
    pub ref_id: String,
    #[serde(default)]
    pub bbox: Option<BBox>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Provenance box as Docling reports it (`l`, `t`, `r`, `b`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub l: f64,
    pub t: f64,
    pub r: f64,
    pub b: f64,
    #[serde(default)]
    pub coord_origin: Option<String>,
}

impl BBox {
    pub fn width(&self) -> f64 {
        (self.r - self.l).abs()
    }

    pub fn height(&self) -> f64 {
        (self.b - self.t).abs()
    }
}
