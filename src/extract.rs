use crate::{
    config::Config,
    engine::{Engine, ExtractIn, RawPage},
    format::{self, InputFormat},
    postprocess::clean_markdown,
    response::{ExtractSmartResponse, SlideData},
    staging::Staged,
    util::{hash_file, request_id, short_id},
    vision::select_candidates,
};
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

pub struct Extractor<E: Engine> {
    cfg: Config,
    engine: E,
}

impl<E: Engine> Extractor<E> {
    pub fn new(cfg: &Config, engine: E) -> Self {
        Self {
            cfg: cfg.clone(),
            engine,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Stages an uploaded document, converts it and shapes the result.
    /// The staged file and crop dir are gone when this returns.
    pub fn extract_upload(
        &self,
        filename: &str,
        format: InputFormat,
        bytes: &[u8],
    ) -> Result<ExtractSmartResponse> {
        let id = request_id(bytes);
        info!(
            "request {id} filename={filename} format={} bytes={}",
            format.docling_name(),
            bytes.len()
        );
        let staged = Staged::upload(&self.cfg, filename, format, bytes)?;
        self.run(&id, filename, format, &staged)
    }

    /// Converts a file already on disk; used by the `extract` subcommand.
    pub fn extract_path(&self, input: &Path) -> Result<ExtractSmartResponse> {
        let filename = input
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("input has no file name: {}", input.display()))?;
        let format = format::detect(&self.cfg, filename)
            .ok_or_else(|| anyhow!("unsupported input format: {}", input.display()))?;
        if !input.is_file() {
            return Err(anyhow!("input does not exist: {}", input.display()));
        }
        let id = short_id(hash_file(input)?);
        let staged = Staged::existing(&self.cfg, input)?;
        self.run(&id, filename, format, &staged)
    }

    fn run(
        &self,
        id: &str,
        filename: &str,
        format: InputFormat,
        staged: &Staged,
    ) -> Result<ExtractSmartResponse> {
        let started = Instant::now();
        let req = ExtractIn {
            input_path: staged.input().display().to_string(),
            format,
            out_dir: staged.scratch().display().to_string(),
            pipeline: self.cfg.docling.pipeline.clone(),
        };

        let out = self
            .engine
            .extract(&req)
            .with_context(|| format!("converting {filename}"))
            .inspect_err(|err| error!("request {id} conversion failed: {err:#}"))?;

        let slides = self.shape(out.pages);
        let candidates: usize = slides.iter().map(|s| s.vision_candidates.len()).sum();
        info!(
            "request {id} done pages={} candidates={candidates} elapsed_ms={}",
            slides.len(),
            started.elapsed().as_millis()
        );

        Ok(ExtractSmartResponse {
            filename: filename.to_string(),
            slides,
        })
    }

    fn shape(&self, mut pages: Vec<RawPage>) -> Vec<SlideData> {
        // Stable sort, so the first of any duplicate page numbers survives dedup.
        pages.sort_by_key(|p| p.page_no);
        pages.dedup_by_key(|p| p.page_no);

        pages
            .into_iter()
            .map(|page| {
                let vision_candidates = select_candidates(&self.cfg, &page.pictures);
                debug!(
                    "page {} pictures={} candidates={}",
                    page.page_no,
                    page.pictures.len(),
                    vision_candidates.len()
                );
                SlideData {
                    page_number: page.page_no,
                    markdown_content: clean_markdown(&self.cfg, &page.markdown),
                    vision_candidates,
                }
            })
            .collect()
    }
}
