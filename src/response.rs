use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionCandidate {
    pub ref_id: String,
    pub base64_image: String,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideData {
    pub page_number: u32,
    pub markdown_content: String,
    pub vision_candidates: Vec<VisionCandidate>,
}

/// Body of a successful `POST /extract-smart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractSmartResponse {
    pub filename: String,
    pub slides: Vec<SlideData>,
}
