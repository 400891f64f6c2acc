#![allow(dead_code)]

use anyhow::{Result, bail};
use smart_extract::{
    config::Config,
    engine::{BBox, DocDiag, Engine, ExtractIn, ExtractOut, RawPage, RawPicture},
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
];

pub fn test_config(temp_root: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.paths.temp_dir = temp_root.display().to_string();
    cfg
}

pub fn bbox(l: f64, t: f64, r: f64, b: f64) -> Option<BBox> {
    Some(BBox {
        l,
        t,
        r,
        b,
        coord_origin: Some("BOTTOMLEFT".into()),
    })
}

/// Stands in for Docling: checks the staged input exists, writes one PNG
/// crop per picture into the scratch dir and returns canned pages.
pub struct FakeEngine {
    pub fail_with: Option<String>,
    pub seen: Mutex<Vec<ExtractIn>>,
}

impl FakeEngine {
    pub fn ok() -> Self {
        Self {
            fail_with: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> ExtractIn {
        self.seen.lock().unwrap().last().cloned().expect("engine was called")
    }
}

impl Engine for FakeEngine {
    fn doctor(&self) -> Result<DocDiag> {
        Ok(DocDiag {
            python_exe: "python3".into(),
            python_version: "3.12.0".into(),
            docling_version: Some("2.0.0".into()),
            ok: true,
            error: None,
        })
    }

    fn extract(&self, req: &ExtractIn) -> Result<ExtractOut> {
        self.seen.lock().unwrap().push(req.clone());
        if !Path::new(&req.input_path).is_file() {
            bail!("staged input missing: {}", req.input_path);
        }
        if let Some(msg) = &self.fail_with {
            bail!("{msg}");
        }

        let crop = PathBuf::from(&req.out_dir).join("p00002_00001.png");
        std::fs::write(&crop, PNG_BYTES)?;

        Ok(ExtractOut {
            ok: true,
            pages: vec![
                RawPage {
                    page_no: 2,
                    markdown: "## Results  \r\nchart below\r\n".into(),
                    pictures: vec![
                        RawPicture {
                            ref_id: "#/pictures/1".into(),
                            bbox: bbox(10.0, 400.0, 310.0, 100.0),
                            image_path: Some(crop.display().to_string()),
                            error: None,
                        },
                        RawPicture {
                            ref_id: "#/pictures/2".into(),
                            bbox: bbox(0.0, 50.0, 40.0, 10.0),
                            image_path: Some(crop.display().to_string()),
                            error: None,
                        },
                    ],
                },
                RawPage {
                    page_no: 1,
                    markdown: "# Title".into(),
                    pictures: vec![RawPicture {
                        ref_id: "#/pictures/0".into(),
                        bbox: None,
                        image_path: None,
                        error: Some("no provenance".into()),
                    }],
                },
            ],
            warnings: vec![],
            error: None,
        })
    }
}

pub fn entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}
