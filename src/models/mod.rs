use base64::{engine::general_purpose, Engine};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

static DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(image/[A-Za-z0-9_]+);base64,(.*)$").expect("valid data-uri pattern")
});

/// Image sent inline to the model, taken from a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime_type: String,
    /// Base64 payload, kept encoded; the model API wants it that way.
    pub data: String,
}

impl ImageAttachment {
    pub fn from_data_uri(uri: &str) -> Result<Self, PipelineError> {
        let caps = DATA_URI.captures(uri).ok_or(PipelineError::InvalidInputFormat)?;
        let mime_type = caps[1].to_string();
        let data = caps[2].to_string();

        if general_purpose::STANDARD.decode(&data).is_err() {
            return Err(PipelineError::InvalidInputFormat);
        }

        Ok(Self { mime_type, data })
    }
}

/// Body of a food detection request.
#[derive(Debug, Deserialize)]
pub struct FoodRequest {
    pub image: Option<String>,
}

/// A profile value as the client sent it. Rendered into the prompt unchanged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Number(serde_json::Number),
    Text(String),
    Flag(bool),
    /// Arrays and objects; the client contract puts no shape on profile fields.
    Other(serde_json::Value),
}

impl ProfileValue {
    /// `0`, `""` and `false` count as not provided for defaulted fields.
    pub fn is_blank(&self) -> bool {
        match self {
            ProfileValue::Number(n) => n.as_f64() == Some(0.0),
            ProfileValue::Text(s) => s.is_empty(),
            ProfileValue::Flag(b) => !b,
            ProfileValue::Other(_) => false,
        }
    }
}

impl std::fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileValue::Number(n) => write!(f, "{}", number_text(n)),
            ProfileValue::Text(s) => write!(f, "{}", s),
            ProfileValue::Flag(b) => write!(f, "{}", b),
            ProfileValue::Other(value) => write!(f, "{}", value_text(value)),
        }
    }
}

/// Whole-valued floats print without a fraction, so `70.0` and `1e2` read `70` and `100`.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(x) if n.is_f64() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 => {
            format!("{}", x as i64)
        }
        _ => n.to_string(),
    }
}

/// Text form of an arbitrary JSON value inside a prompt line.
/// Arrays join their elements with `,`; objects collapse to `[object Object]`.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => number_text(n),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(","),
        serde_json::Value::Object(_) => "[object Object]".to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub age: Option<ProfileValue>,
    pub gender: Option<ProfileValue>,
    pub weight: Option<ProfileValue>, // kg
    pub height: Option<ProfileValue>, // cm
    pub activity_level: Option<ProfileValue>,
    pub goal: Option<ProfileValue>,
}

impl UserProfile {
    pub const DEFAULT_AGE: &'static str = "25";

    /// Parse a request body. Any JSON that is not an object yields an empty profile.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        match serde_json::from_slice::<serde_json::Value>(body)? {
            value @ serde_json::Value::Object(_) => serde_json::from_value(value),
            _ => Ok(Self::default()),
        }
    }

    /// Required fields in prompt order, paired with their JSON names.
    pub fn required_fields(&self) -> [(&'static str, Option<&ProfileValue>); 5] {
        [
            ("gender", self.gender.as_ref()),
            ("weight", self.weight.as_ref()),
            ("height", self.height.as_ref()),
            ("activityLevel", self.activity_level.as_ref()),
            ("goal", self.goal.as_ref()),
        ]
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.required_fields()
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn age_text(&self) -> String {
        match &self.age {
            Some(age) if !age.is_blank() => age.to_string(),
            _ => Self::DEFAULT_AGE.to_string(),
        }
    }
}

/// Food detection result, as the model reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FoodResult {
    pub food: String,
    pub ingredients: Vec<String>,
    #[serde(rename = "total_calories")]
    pub calories: serde_json::Number,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExercisePlan {
    pub exercise: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FoodItem {
    pub name: String,
    pub calories: serde_json::Number,
    pub ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FoodResponse {
    pub items: Vec<FoodItem>,
    pub count: serde_json::Number,
    pub success: bool,
}

impl From<FoodResult> for FoodResponse {
    fn from(result: FoodResult) -> Self {
        // `count` carries the calorie total; the client reads it as such.
        let count = result.calories.clone();
        Self {
            items: vec![FoodItem {
                name: result.food,
                calories: result.calories,
                ingredients: result.ingredients,
            }],
            count,
            success: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExerciseResponse {
    pub success: bool,
    pub exercise: Vec<String>,
}

impl From<ExercisePlan> for ExerciseResponse {
    fn from(plan: ExercisePlan) -> Self {
        Self {
            success: true,
            exercise: plan.exercise,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
