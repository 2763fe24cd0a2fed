use crate::config::MissingFieldPolicy;
use crate::error::PipelineError;
use crate::models::{ImageAttachment, ProfileValue, UserProfile};
use crate::services::gemini::{InlineData, ModelRequest, Part};

pub const FOOD_DETECTION_PROMPT: &str = r#"Detect the food item in this image. Return a JSON structure in this format:
{
  "food": "Food Name",
  "ingredients": ["ingredient1", "ingredient2", ...],
  "total_calories": number
}
Return only valid JSON."#;

const EXERCISE_PROMPT_HEADER: &str = r#"
You are a certified fitness trainer. Suggest a realistic and effective daily exercise routine based on the user's profile. Focus on beginner-friendly routines, but consider the user's activity level and goal (weight loss, maintenance, gain). Use a motivational tone.

✔ Return short, easy-to-read daily exercise recommendations with estimated calories burned.
✔ Prefer home-friendly exercises (bodyweight, walking, jogging, etc.).
✔ Show calorie burn in round numbers.
✔ Return 2 exercise options:
- Option 1: Simple and minimal (good for beginners)
- Option 2: Slightly advanced (good for moderate fitness)

Respond strictly in this JSON format:
{
  "exercise": ["Option 1: ... (burns ~XXX cal)", "Option 2: ... (burns ~XXX cal)"]
}
"#;

/// Rendered in place of a missing required field under `MissingFieldPolicy::Placeholder`.
pub const MISSING_VALUE: &str = "undefined";

pub fn build_food_request(image: &ImageAttachment) -> ModelRequest {
    ModelRequest::single(vec![
        Part::Text {
            text: FOOD_DETECTION_PROMPT.to_string(),
        },
        Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        },
    ])
}

pub fn build_exercise_request(
    profile: &UserProfile,
    policy: MissingFieldPolicy,
) -> Result<ModelRequest, PipelineError> {
    let missing = profile.missing_fields();
    if !missing.is_empty() {
        match policy {
            MissingFieldPolicy::Reject => return Err(PipelineError::InvalidProfile(missing)),
            MissingFieldPolicy::Placeholder => {
                log::warn!("⚠️ Profile is missing {:?}, rendering as '{}'", missing, MISSING_VALUE);
            }
        }
    }

    let render = |value: Option<&ProfileValue>| {
        value
            .map(|v| v.to_string())
            .unwrap_or_else(|| MISSING_VALUE.to_string())
    };

    let prompt = format!(
        "{header}\nUser Profile:\n\
         - Age: {age}\n\
         - Gender: {gender}\n\
         - Weight: {weight} kg\n\
         - Height: {height} cm\n\
         - Activity Level: {activity}\n\
         - Goal: {goal}\n",
        header = EXERCISE_PROMPT_HEADER,
        age = profile.age_text(),
        gender = render(profile.gender.as_ref()),
        weight = render(profile.weight.as_ref()),
        height = render(profile.height.as_ref()),
        activity = render(profile.activity_level.as_ref()),
        goal = render(profile.goal.as_ref()),
    );

    Ok(ModelRequest::single(vec![Part::Text { text: prompt }]))
}
