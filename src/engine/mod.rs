pub mod python;
pub mod types;

use anyhow::Result;

pub use types::{BBox, DocDiag, ExtractIn, ExtractOut, RawPage, RawPicture};

pub trait Engine: Send + Sync {
    fn doctor(&self) -> Result<DocDiag>;
    fn extract(&self, req: &ExtractIn) -> Result<ExtractOut>;
}
