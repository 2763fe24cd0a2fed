pub mod extractor; // JSON carving from model answers
pub mod gemini; // Gemini generateContent client
pub mod prompts;

pub use gemini::{GeminiService, GenerativeModel};
