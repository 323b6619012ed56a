//! LLM-backed workout generation over the chat-completions API.
//!
//! Models often wrap JSON in prose or code fences, so the parser slices
//! from the first `{` to the last `}` before deserializing. Callers fall
//! back to the rule-based generator on any error here.

use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::models::profile::{FitnessLevel, Somatotype};
use crate::models::workout::GenerateWorkoutRequest;
use crate::services::generation::GeneratedWorkout;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("LLM returned status {0}")]
    Status(u16),
    #[error("LLM response contained no message content")]
    EmptyResponse,
    #[error("LLM response was not a workout JSON object")]
    NoJsonObject,
    #[error("LLM workout JSON failed to deserialize: {0}")]
    Deserialize(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub fn build_prompt(
    request: &GenerateWorkoutRequest,
    level: FitnessLevel,
    body_type: Option<Somatotype>,
    available_equipment: &[String],
    recent_workouts: &[String],
) -> String {
    let athlete = match body_type {
        Some(body_type) => format!("{} {}", level.as_str(), body_type.as_str()),
        None => level.as_str().to_string(),
    };
    let equipment = if available_equipment.is_empty() {
        "bodyweight only".to_string()
    } else {
        available_equipment.join(", ")
    };
    let focus = if request.focus_areas.is_empty() {
        "full body".to_string()
    } else {
        request.focus_areas.join(", ")
    };
    let history = if recent_workouts.is_empty() {
        "none".to_string()
    } else {
        recent_workouts.join("; ")
    };

    format!(
        "Create a {} workout lasting {} minutes for a {} athlete.\n\
         Focus areas: {}.\n\
         Available equipment: {}.\n\
         Recent workouts: {}.\n\
         Respond with a single JSON object only, no prose, shaped as:\n\
         {{\"name\": str, \"description\": str, \"workout_type\": str, \
         \"duration_minutes\": int, \"difficulty_level\": str, \
         \"exercises\": [{{\"exercise_name\": str, \"exercise_type\": str, \
         \"sets\": int, \"reps\": str, \"rest_time_seconds\": int, \
         \"equipment_required\": str|null, \"notes\": str|null}}]}}",
        request.workout_type, request.duration_minutes, athlete, focus, equipment, history
    )
}

/// Slices the first `{` through the last `}` out of model output.
fn extract_json(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

pub fn parse_workout(content: &str) -> Result<GeneratedWorkout, GenerationError> {
    let json = extract_json(content).ok_or(GenerationError::NoJsonObject)?;
    Ok(serde_json::from_str(json)?)
}

/// Requests a workout from the configured chat-completions endpoint.
pub async fn generate_with_llm(
    http: &reqwest::Client,
    config: &Config,
    request: &GenerateWorkoutRequest,
    level: FitnessLevel,
    body_type: Option<Somatotype>,
    available_equipment: &[String],
    recent_workouts: &[String],
) -> Result<GeneratedWorkout, GenerationError> {
    let prompt = build_prompt(request, level, body_type, available_equipment, recent_workouts);
    let body = json!({
        "model": config.llm_model,
        "messages": [
            {
                "role": "system",
                "content": "You are a certified fitness coach. You respond only with JSON."
            },
            { "role": "user", "content": prompt }
        ],
        "temperature": 0.7
    });

    let response = http
        .post(format!("{}/chat/completions", config.llm_api_base))
        .bearer_auth(&config.llm_api_key)
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(GenerationError::Status(response.status().as_u16()));
    }

    let completion: ChatCompletionResponse = response.json().await?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(GenerationError::EmptyResponse)?;

    parse_workout(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKOUT_JSON: &str = r#"{
        "name": "Garage HIIT",
        "description": "Short and sharp",
        "workout_type": "hiit",
        "duration_minutes": 20,
        "difficulty_level": "intermediate",
        "exercises": [
            {
                "exercise_name": "Burpees",
                "exercise_type": "cardio",
                "sets": 4,
                "reps": "30 seconds",
                "rest_time_seconds": 30
            }
        ]
    }"#;

    #[test]
    fn parses_bare_json_object() {
        let workout = parse_workout(WORKOUT_JSON).unwrap();
        assert_eq!(workout.name, "Garage HIIT");
        assert_eq!(workout.exercises.len(), 1);
        assert!(workout.exercises[0].equipment_required.is_none());
    }

    #[test]
    fn parses_json_wrapped_in_prose_and_fences() {
        let content = format!(
            "Here is your workout:\n```json\n{}\n```\nEnjoy!",
            WORKOUT_JSON
        );
        let workout = parse_workout(&content).unwrap();
        assert_eq!(workout.workout_type, "hiit");
        assert_eq!(workout.duration_minutes, 20);
    }

    #[test]
    fn rejects_content_without_object() {
        let err = parse_workout("Sorry, I cannot help with that.").unwrap_err();
        assert!(matches!(err, GenerationError::NoJsonObject));
    }

    #[test]
    fn rejects_malformed_object() {
        let err = parse_workout("{\"name\": \"incomplete\"}").unwrap_err();
        assert!(matches!(err, GenerationError::Deserialize(_)));
    }

    #[test]
    fn extract_json_spans_first_to_last_brace() {
        assert_eq!(extract_json("abc {\"a\": {\"b\": 1}} xyz"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json("no braces"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn prompt_includes_profile_and_equipment() {
        let request: GenerateWorkoutRequest = serde_json::from_str(
            r#"{"workout_type": "strength", "duration_minutes": 45, "focus_areas": ["legs"]}"#,
        )
        .unwrap();
        let prompt = build_prompt(
            &request,
            FitnessLevel::Advanced,
            Some(Somatotype::Mesomorph),
            &["barbell".to_string(), "rack".to_string()],
            &["Leg Day (strength, 45 min)".to_string()],
        );
        assert!(prompt.contains("strength workout lasting 45 minutes"));
        assert!(prompt.contains("advanced mesomorph athlete"));
        assert!(prompt.contains("barbell, rack"));
        assert!(prompt.contains("legs"));
        assert!(prompt.contains("Leg Day (strength, 45 min)"));
    }

    #[test]
    fn prompt_defaults_to_bodyweight_and_full_body() {
        let request: GenerateWorkoutRequest = serde_json::from_str("{}").unwrap();
        let prompt = build_prompt(&request, FitnessLevel::Beginner, None, &[], &[]);
        assert!(prompt.contains("bodyweight only"));
        assert!(prompt.contains("full body"));
        assert!(prompt.contains("beginner athlete"));
        assert!(prompt.contains("Recent workouts: none"));
    }
}
