//! Default prompt templates.

/// Instruction sent with the screenshot to the vision model.
pub const DEFAULT_OCR_PROMPT: &str = "Describe the contents of the image.";

/// Field-extraction prompt. `{text_content}` receives the OCR text and
/// `{json_format}` the literal example object.
pub const DEFAULT_ANALYSIS_PROMPT: &str = r#"Text recognized from a running app screenshot:
{text_content}

From the recognized text above, extract the following information and return it as JSON:
1. Run date (date) - format YYYY-MM-DD
2. Distance (distance_km) - number, in kilometres
3. Duration (duration) - format HH:MM:SS
4. Average pace (pace) - format MM:SS/km
5. Calories burned (calories) - number, in kilocalories

Return the result strictly in the following JSON format and nothing else. If the screenshot does not contain a field, use null for it:
{json_format}"#;

/// Example of the target object embedded in the analysis prompt.
pub const DEFAULT_JSON_FORMAT: &str = r#"{
  "date": "YYYY-MM-DD",
  "distance_km": number,
  "duration": "HH:MM:SS",
  "pace": "MM:SS/km",
  "calories": number
}"#;

/// Prompt used by `runlog check` to confirm the endpoint answers.
pub const PING_PROMPT: &str = "Hello, please reply 'API connection OK' to confirm the connection works.";
