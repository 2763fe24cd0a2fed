use std::sync::Arc;

use crate::config::{ExtractionStrategy, MissingFieldPolicy};
use crate::error::PipelineError;
use crate::models::{ExercisePlan, UserProfile};
use crate::services::{extractor, prompts, GenerativeModel};

pub struct ExercisePlanner {
    model: Arc<dyn GenerativeModel>,
    extraction: ExtractionStrategy,
    missing_fields: MissingFieldPolicy,
}

impl ExercisePlanner {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        extraction: ExtractionStrategy,
        missing_fields: MissingFieldPolicy,
    ) -> Self {
        Self {
            model,
            extraction,
            missing_fields,
        }
    }

    pub async fn plan(&self, profile: &UserProfile) -> Result<ExercisePlan, PipelineError> {
        log::info!("🏃 Generating exercise plan");

        let request = prompts::build_exercise_request(profile, self.missing_fields)?;
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("📝 Exercise prompt is {} bytes", request.text().len());
        }
        let text = self.model.generate(&request).await?;
        let plan = extractor::extract_exercise(&text, self.extraction)?;

        log::info!("✅ Exercise plan with {} options", plan.exercise.len());
        Ok(plan)
    }
}
