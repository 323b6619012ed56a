//! End-to-end checks on workout generation: rule tables and LLM parsing.

use forgefit_backend::models::profile::FitnessLevel;
use forgefit_backend::services::generation::generate_rule_based;
use forgefit_backend::services::llm::parse_workout;

#[test]
fn rule_based_generation_is_always_well_formed() {
    for workout_type in ["hiit", "conditioning", "strength", "mystery"] {
        for level in [
            FitnessLevel::Beginner,
            FitnessLevel::Intermediate,
            FitnessLevel::Advanced,
        ] {
            for duration in [5, 20, 30, 45, 60, 180] {
                let workout = generate_rule_based(workout_type, duration, level, &[]);
                assert!(!workout.exercises.is_empty());
                assert!(workout.exercises.len() <= 8);
                assert_eq!(workout.duration_minutes, duration);
                assert_eq!(workout.difficulty_level, level.as_str());
                for exercise in &workout.exercises {
                    assert!(exercise.sets >= 1);
                    assert!(exercise.rest_time_seconds >= 15);
                    assert!(!exercise.exercise_name.is_empty());
                    assert!(!exercise.reps.is_empty());
                }
            }
        }
    }
}

#[test]
fn repeated_sampling_stays_within_the_pool() {
    let pool_names = [
        "Burpees",
        "Mountain Climbers",
        "Jump Squats",
        "High Knees",
        "Jumping Jacks",
        "Plank Jacks",
        "Squat Thrusts",
        "Sprint in Place",
    ];
    for _ in 0..20 {
        let workout = generate_rule_based("hiit", 20, FitnessLevel::Intermediate, &[]);
        assert_eq!(workout.exercises.len(), 5);
        for exercise in &workout.exercises {
            assert!(pool_names.contains(&exercise.exercise_name.as_str()));
        }
        // No exercise appears twice in one workout.
        let mut names: Vec<&str> = workout
            .exercises
            .iter()
            .map(|e| e.exercise_name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), workout.exercises.len());
    }
}

#[test]
fn llm_output_with_fences_round_trips_into_rule_schema() {
    let content = r#"Sure! Here's the plan:
```json
{
    "name": "Morning Burner",
    "description": "Fast full-body session",
    "workout_type": "hiit",
    "duration_minutes": 25,
    "difficulty_level": "beginner",
    "exercises": [
        {
            "exercise_name": "Burpees",
            "exercise_type": "cardio",
            "sets": 3,
            "reps": "30 seconds",
            "rest_time_seconds": 45,
            "equipment_required": null,
            "notes": "Keep a steady pace"
        },
        {
            "exercise_name": "Kettlebell Swings",
            "exercise_type": "compound",
            "sets": 3,
            "reps": "15",
            "rest_time_seconds": 60,
            "equipment_required": "kettlebell",
            "notes": null
        }
    ]
}
```
Let me know how it goes!"#;

    let workout = parse_workout(content).expect("fenced JSON should parse");
    assert_eq!(workout.name, "Morning Burner");
    assert_eq!(workout.exercises.len(), 2);
    assert_eq!(
        workout.exercises[1].equipment_required.as_deref(),
        Some("kettlebell")
    );
    assert_eq!(workout.exercises[0].notes.as_deref(), Some("Keep a steady pace"));
}

#[test]
fn llm_refusal_text_is_an_error() {
    assert!(parse_workout("I can't produce a workout right now.").is_err());
}
