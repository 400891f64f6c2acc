use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub formats: Formats,
    #[serde(default)]
    pub docling: Docling,
    #[serde(default)]
    pub vision: Vision,
    #[serde(default)]
    pub postprocess: Postprocess,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing TOML: {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(raw)?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub max_upload_bytes: usize,
    pub max_concurrent_conversions: usize,
}
impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".into(),
            max_upload_bytes: 200 * 1024 * 1024,
            max_concurrent_conversions: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub scripts_dir: String,
    /// Staging directory for uploads; empty means the OS temp dir.
    pub temp_dir: String,
    pub docling_artifacts_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            scripts_dir: "scripts".into(),
            temp_dir: "".into(),
            docling_artifacts_dir: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Formats {
    pub enable_pptx: bool,
    pub enable_docx: bool,
}
impl Default for Formats {
    fn default() -> Self {
        Self {
            enable_pptx: true,
            enable_docx: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Docling {
    pub python_exe: String,
    pub timeout_seconds: u64,
    pub doctor_timeout_seconds: u64,
    pub env: std::collections::BTreeMap<String, String>,
    pub pipeline: DoclingPipeline,
}
impl Default for Docling {
    fn default() -> Self {
        Self {
            python_exe: "auto".into(),
            timeout_seconds: 900,
            doctor_timeout_seconds: 60,
            env: Default::default(),
            pipeline: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoclingPipeline {
    pub do_ocr: bool,
    pub do_table_structure: bool,
    pub do_cell_matching: bool,
    pub generate_picture_images: bool,
    pub images_scale: f32,
    pub document_timeout_seconds: u64,
}
impl Default for DoclingPipeline {
    fn default() -> Self {
        Self {
            do_ocr: true,
            do_table_structure: true,
            do_cell_matching: true,
            generate_picture_images: true,
            images_scale: 2.0,
            document_timeout_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Vision {
    pub min_width: f64,
    pub min_height: f64,
}
impl Default for Vision {
    fn default() -> Self {
        Self {
            min_width: 150.0,
            min_height: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Postprocess {
    pub normalize_newlines: bool,
    pub normalize_unicode: bool,
    pub trim_trailing_whitespace: bool,
    pub control_chars_to_sanitize: Vec<u8>,
}
impl Default for Postprocess {
    fn default() -> Self {
        let mut control: Vec<u8> = (0x00..=0x08).collect();
        control.extend([0x0B, 0x0C]);
        control.extend(0x0E..=0x1F);
        control.push(0x7F);
        Self {
            normalize_newlines: true,
            normalize_unicode: false,
            trim_trailing_whitespace: true,
            control_chars_to_sanitize: control,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub keep_python_stderr: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_python_stderr: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub pin_scripts_dir: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            pin_scripts_dir: true,
        }
    }
}
