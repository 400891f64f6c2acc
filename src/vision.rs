use crate::{
    config::Config,
    engine::RawPicture,
    response::VisionCandidate,
};
use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::path::Path;
use tracing::debug;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Turns a page's pictures into vision candidates, dropping anything too
/// small, without geometry, or whose crop could not be produced.
pub fn select_candidates(cfg: &Config, pictures: &[RawPicture]) -> Vec<VisionCandidate> {
    pictures
        .iter()
        .filter_map(|pic| match candidate(cfg, pic) {
            Ok(c) => c,
            Err(err) => {
                debug!("skipping picture {}: {err:#}", pic.ref_id);
                None
            }
        })
        .collect()
}

/// `Ok(None)` means the picture was filtered out; `Err` means it qualified
/// but its image could not be used.
fn candidate(cfg: &Config, pic: &RawPicture) -> Result<Option<VisionCandidate>> {
    let Some(bbox) = &pic.bbox else {
        debug!("picture {} has no bounding box", pic.ref_id);
        return Ok(None);
    };
    let (width, height) = (bbox.width(), bbox.height());
    if !(width > cfg.vision.min_width && height > cfg.vision.min_height) {
        return Ok(None);
    }
    if let Some(err) = &pic.error {
        bail!("runner could not render image: {err}");
    }
    let Some(path) = pic.image_path.as_deref() else {
        bail!("no image written");
    };
    Ok(Some(VisionCandidate {
        ref_id: pic.ref_id.clone(),
        base64_image: encode_png(Path::new(path))?,
        width: width as i64,
        height: height as i64,
    }))
}

pub fn encode_png(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if !bytes.starts_with(&PNG_SIGNATURE) {
        bail!("not a PNG: {}", path.display());
    }
    Ok(STANDARD.encode(&bytes))
}
