//! Rule-based workout generation.
//!
//! Exercise pools are filtered by available equipment, scaled for the
//! user's fitness level, then sampled down to a count sized from the
//! requested duration.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::models::profile::FitnessLevel;

/// Workout produced by a generator before it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedWorkout {
    pub name: String,
    pub description: Option<String>,
    pub workout_type: String,
    pub duration_minutes: i32,
    pub difficulty_level: String,
    pub exercises: Vec<GeneratedExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedExercise {
    pub exercise_name: String,
    pub exercise_type: String,
    pub sets: i32,
    pub reps: String,
    pub rest_time_seconds: i32,
    #[serde(default)]
    pub equipment_required: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct PoolEntry {
    name: &'static str,
    exercise_type: &'static str,
    sets: i32,
    reps: &'static str,
    rest_seconds: i32,
    equipment: Option<&'static str>,
}

const HIIT_POOL: &[PoolEntry] = &[
    PoolEntry { name: "Burpees", exercise_type: "cardio", sets: 4, reps: "30 seconds", rest_seconds: 30, equipment: None },
    PoolEntry { name: "Mountain Climbers", exercise_type: "cardio", sets: 4, reps: "30 seconds", rest_seconds: 30, equipment: None },
    PoolEntry { name: "Jump Squats", exercise_type: "cardio", sets: 4, reps: "30 seconds", rest_seconds: 30, equipment: None },
    PoolEntry { name: "High Knees", exercise_type: "cardio", sets: 4, reps: "30 seconds", rest_seconds: 30, equipment: None },
    PoolEntry { name: "Jumping Jacks", exercise_type: "cardio", sets: 4, reps: "30 seconds", rest_seconds: 30, equipment: None },
    PoolEntry { name: "Plank Jacks", exercise_type: "cardio", sets: 4, reps: "30 seconds", rest_seconds: 30, equipment: None },
    PoolEntry { name: "Squat Thrusts", exercise_type: "cardio", sets: 4, reps: "30 seconds", rest_seconds: 30, equipment: None },
    PoolEntry { name: "Sprint in Place", exercise_type: "cardio", sets: 4, reps: "30 seconds", rest_seconds: 30, equipment: None },
];

const CONDITIONING_POOL: &[PoolEntry] = &[
    PoolEntry { name: "Thrusters", exercise_type: "compound", sets: 3, reps: "12", rest_seconds: 60, equipment: Some("barbell") },
    PoolEntry { name: "Pull-ups", exercise_type: "compound", sets: 3, reps: "AMRAP", rest_seconds: 60, equipment: Some("pull-up bar") },
    PoolEntry { name: "Kettlebell Swings", exercise_type: "compound", sets: 3, reps: "15", rest_seconds: 60, equipment: Some("kettlebell") },
    PoolEntry { name: "Box Jumps", exercise_type: "plyometric", sets: 3, reps: "10", rest_seconds: 60, equipment: Some("box") },
    PoolEntry { name: "Wall Balls", exercise_type: "compound", sets: 3, reps: "15", rest_seconds: 60, equipment: Some("medicine ball") },
    PoolEntry { name: "Rowing", exercise_type: "cardio", sets: 3, reps: "250m", rest_seconds: 90, equipment: Some("rowing machine") },
    PoolEntry { name: "Push-ups", exercise_type: "compound", sets: 3, reps: "15", rest_seconds: 60, equipment: None },
    PoolEntry { name: "Air Squats", exercise_type: "compound", sets: 3, reps: "20", rest_seconds: 45, equipment: None },
];

const STRENGTH_POOL: &[PoolEntry] = &[
    PoolEntry { name: "Squats", exercise_type: "compound", sets: 5, reps: "5", rest_seconds: 120, equipment: Some("barbell") },
    PoolEntry { name: "Bench Press", exercise_type: "compound", sets: 5, reps: "5", rest_seconds: 120, equipment: Some("barbell") },
    PoolEntry { name: "Deadlifts", exercise_type: "compound", sets: 5, reps: "5", rest_seconds: 180, equipment: Some("barbell") },
    PoolEntry { name: "Overhead Press", exercise_type: "compound", sets: 5, reps: "5", rest_seconds: 120, equipment: Some("barbell") },
    PoolEntry { name: "Barbell Rows", exercise_type: "compound", sets: 5, reps: "5", rest_seconds: 120, equipment: Some("barbell") },
    PoolEntry { name: "Dumbbell Lunges", exercise_type: "compound", sets: 4, reps: "8", rest_seconds: 90, equipment: Some("dumbbells") },
    PoolEntry { name: "Dips", exercise_type: "compound", sets: 4, reps: "8", rest_seconds: 90, equipment: Some("dip station") },
    PoolEntry { name: "Pull-ups", exercise_type: "compound", sets: 4, reps: "5", rest_seconds: 120, equipment: Some("pull-up bar") },
];

fn pool_for(workout_type: &str) -> &'static [PoolEntry] {
    match workout_type {
        "hiit" => HIIT_POOL,
        "conditioning" => CONDITIONING_POOL,
        "strength" => STRENGTH_POOL,
        _ => HIIT_POOL,
    }
}

/// Minutes of planned work each exercise accounts for, per style.
fn minutes_per_exercise(workout_type: &str) -> i32 {
    match workout_type {
        "hiit" => 4,
        "conditioning" => 6,
        "strength" => 8,
        _ => 4,
    }
}

fn scale_for_level(entry: &PoolEntry, level: FitnessLevel) -> (i32, i32) {
    match level {
        FitnessLevel::Beginner => ((entry.sets - 1).max(1), entry.rest_seconds + 15),
        FitnessLevel::Intermediate => (entry.sets, entry.rest_seconds),
        FitnessLevel::Advanced => (entry.sets + 1, (entry.rest_seconds - 10).max(15)),
    }
}

fn equipment_available(entry: &PoolEntry, available: &[String]) -> bool {
    match entry.equipment {
        None => true,
        Some(required) => available
            .iter()
            .any(|item| item.eq_ignore_ascii_case(required)),
    }
}

/// Builds a workout from the static pools. Always succeeds; used both as
/// the `use_ai = false` path and as the fallback when the LLM call fails.
pub fn generate_rule_based(
    workout_type: &str,
    duration_minutes: i32,
    level: FitnessLevel,
    available_equipment: &[String],
) -> GeneratedWorkout {
    let pool = pool_for(workout_type);

    // With no declared equipment the whole pool is eligible; otherwise
    // keep bodyweight moves plus anything the user owns.
    let eligible: Vec<&PoolEntry> = if available_equipment.is_empty() {
        pool.iter().collect()
    } else {
        let filtered: Vec<&PoolEntry> = pool
            .iter()
            .filter(|entry| equipment_available(entry, available_equipment))
            .collect();
        if filtered.is_empty() {
            pool.iter().collect()
        } else {
            filtered
        }
    };

    let count = (duration_minutes / minutes_per_exercise(workout_type))
        .clamp(1, eligible.len() as i32) as usize;

    let mut rng = rand::thread_rng();
    let mut selected: Vec<&PoolEntry> = eligible
        .choose_multiple(&mut rng, count)
        .copied()
        .collect();
    selected.sort_by_key(|entry| {
        pool.iter()
            .position(|candidate| std::ptr::eq(candidate, *entry))
    });

    let exercises = selected
        .iter()
        .map(|entry| {
            let (sets, rest_seconds) = scale_for_level(entry, level);
            GeneratedExercise {
                exercise_name: entry.name.to_string(),
                exercise_type: entry.exercise_type.to_string(),
                sets,
                reps: entry.reps.to_string(),
                rest_time_seconds: rest_seconds,
                equipment_required: entry.equipment.map(str::to_string),
                notes: None,
            }
        })
        .collect();

    GeneratedWorkout {
        name: format!("{} Workout ({} min)", title_case(workout_type), duration_minutes),
        description: Some(format!(
            "Auto-generated {} workout for a {} athlete",
            workout_type,
            level.as_str()
        )),
        workout_type: workout_type.to_string(),
        duration_minutes,
        difficulty_level: level.as_str().to_string(),
        exercises,
    }
}

fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hiit_thirty_minutes_yields_seven_exercises() {
        let workout = generate_rule_based("hiit", 30, FitnessLevel::Intermediate, &[]);
        assert_eq!(workout.exercises.len(), 7);
        assert_eq!(workout.workout_type, "hiit");
        for exercise in &workout.exercises {
            assert_eq!(exercise.sets, 4);
            assert_eq!(exercise.reps, "30 seconds");
            assert_eq!(exercise.rest_time_seconds, 30);
        }
    }

    #[test]
    fn count_scales_with_duration_and_divisor() {
        let workout = generate_rule_based("strength", 40, FitnessLevel::Intermediate, &[]);
        assert_eq!(workout.exercises.len(), 5);

        let workout = generate_rule_based("conditioning", 30, FitnessLevel::Intermediate, &[]);
        assert_eq!(workout.exercises.len(), 5);
    }

    #[test]
    fn short_duration_still_yields_one_exercise() {
        let workout = generate_rule_based("strength", 5, FitnessLevel::Beginner, &[]);
        assert_eq!(workout.exercises.len(), 1);
    }

    #[test]
    fn beginner_gets_fewer_sets_and_longer_rest() {
        let workout = generate_rule_based("hiit", 60, FitnessLevel::Beginner, &[]);
        for exercise in &workout.exercises {
            assert_eq!(exercise.sets, 3);
            assert_eq!(exercise.rest_time_seconds, 45);
        }
    }

    #[test]
    fn advanced_gets_more_sets_and_shorter_rest() {
        let workout = generate_rule_based("hiit", 60, FitnessLevel::Advanced, &[]);
        for exercise in &workout.exercises {
            assert_eq!(exercise.sets, 5);
            assert_eq!(exercise.rest_time_seconds, 20);
        }
    }

    #[test]
    fn equipment_filter_keeps_bodyweight_and_owned_gear() {
        let equipment = vec!["Kettlebell".to_string()];
        let workout = generate_rule_based("conditioning", 90, FitnessLevel::Intermediate, &equipment);
        for exercise in &workout.exercises {
            match exercise.equipment_required.as_deref() {
                None => {}
                Some(required) => assert!(required.eq_ignore_ascii_case("kettlebell")),
            }
        }
    }

    #[test]
    fn unfiltered_pool_used_when_nothing_matches() {
        let equipment = vec!["trampoline".to_string()];
        let workout = generate_rule_based("strength", 90, FitnessLevel::Intermediate, &equipment);
        assert!(!workout.exercises.is_empty());
    }

    #[test]
    fn unknown_type_falls_back_to_hiit_pool() {
        let workout = generate_rule_based("yoga", 30, FitnessLevel::Intermediate, &[]);
        assert!(workout
            .exercises
            .iter()
            .all(|exercise| exercise.reps == "30 seconds"));
        assert_eq!(workout.workout_type, "yoga");
    }

    #[test]
    fn difficulty_reflects_level() {
        let workout = generate_rule_based("hiit", 30, FitnessLevel::Advanced, &[]);
        assert_eq!(workout.difficulty_level, "advanced");
        assert!(workout.name.starts_with("Hiit Workout"));
    }
}
