use std::sync::Arc;

use crate::config::ExtractionStrategy;
use crate::error::PipelineError;
use crate::models::{FoodResult, ImageAttachment};
use crate::services::{extractor, prompts, GenerativeModel};

pub struct FoodDetector {
    model: Arc<dyn GenerativeModel>,
    extraction: ExtractionStrategy,
}

impl FoodDetector {
    pub fn new(model: Arc<dyn GenerativeModel>, extraction: ExtractionStrategy) -> Self {
        Self { model, extraction }
    }

    /// Detect the food in a `data:image/...;base64,...` URI.
    pub async fn detect(&self, data_uri: &str) -> Result<FoodResult, PipelineError> {
        let image = ImageAttachment::from_data_uri(data_uri)?;
        log::info!(
            "📸 Detecting food in {} image ({} base64 bytes)",
            image.mime_type,
            image.data.len()
        );

        let request = prompts::build_food_request(&image);
        let text = self.model.generate(&request).await?;
        let result = extractor::extract_food(&text, self.extraction)?;

        log::info!("🍽️ Detected {} ({} kcal)", result.food, result.calories);
        Ok(result)
    }
}
