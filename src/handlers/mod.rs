pub mod exercise;
pub mod food;

pub use exercise::ExercisePlanner;
pub use food::FoodDetector;
