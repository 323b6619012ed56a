//! Workout session lifecycle and per-exercise performance models.
//!
//! Transition rules live on the model so handlers stay thin:
//! scheduled -> in_progress -> completed, with skipped as an alternate
//! terminal reachable from scheduled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Skipped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Skipped => "skipped",
        }
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("session cannot be started from the '{0}' state")]
    NotStartable(&'static str),
    #[error("session cannot be completed from the '{0}' state")]
    NotCompletable(&'static str),
    #[error("session cannot be skipped from the '{0}' state")]
    NotSkippable(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutSession {
    pub id: String,
    pub user_id: String,
    pub workout_id: String,
    pub status: SessionStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// 1-5 workout rating supplied with completion feedback.
    pub overall_rating: Option<i32>,
    pub feedback_notes: Option<String>,
    pub duration_minutes: Option<i32>,
    pub calories_burned: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional feedback supplied alongside completion.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SessionFeedback {
    #[validate(range(min = 1, max = 5))]
    pub overall_rating: Option<i32>,
    pub feedback_notes: Option<String>,
    #[validate(range(min = 0))]
    pub calories_burned: Option<i32>,
}

impl WorkoutSession {
    pub fn new(user_id: String, workout_id: String, scheduled_date: Option<DateTime<Utc>>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            workout_id,
            status: SessionStatus::Scheduled,
            scheduled_date,
            started_at: None,
            completed_at: None,
            overall_rating: None,
            feedback_notes: None,
            duration_minutes: None,
            calories_burned: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the session to in_progress, stamping `started_at`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != SessionStatus::Scheduled {
            return Err(TransitionError::NotStartable(self.status.as_str()));
        }
        self.status = SessionStatus::InProgress;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Completes the session from scheduled or in_progress, stamping
    /// `completed_at` and deriving duration when a start time exists.
    pub fn complete(
        &mut self,
        feedback: &SessionFeedback,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        match self.status {
            SessionStatus::Scheduled | SessionStatus::InProgress => {}
            other => return Err(TransitionError::NotCompletable(other.as_str())),
        }

        self.status = SessionStatus::Completed;
        self.completed_at = Some(now);
        if let Some(started) = self.started_at {
            let elapsed = now - started;
            self.duration_minutes = Some(elapsed.num_minutes() as i32);
        }
        if feedback.overall_rating.is_some() {
            self.overall_rating = feedback.overall_rating;
        }
        if feedback.feedback_notes.is_some() {
            self.feedback_notes = feedback.feedback_notes.clone();
        }
        if feedback.calories_burned.is_some() {
            self.calories_burned = feedback.calories_burned;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Marks a scheduled session as skipped.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != SessionStatus::Scheduled {
            return Err(TransitionError::NotSkippable(self.status.as_str()));
        }
        self.status = SessionStatus::Skipped;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExercisePerformance {
    pub id: String,
    pub session_id: String,
    pub exercise_id: String,
    pub actual_sets: Option<i32>,
    /// Free-form like the plan: "12", "AMRAP", "250m".
    pub actual_reps: Option<String>,
    pub actual_weight: Option<f64>,
    /// Seconds.
    pub actual_duration: Option<i32>,
    /// 1-10 RPE scale.
    pub perceived_exertion: Option<i32>,
    pub notes: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LogPerformanceRequest {
    pub exercise_id: String,
    #[validate(range(min = 0))]
    pub actual_sets: Option<i32>,
    pub actual_reps: Option<String>,
    #[validate(range(min = 0.0))]
    pub actual_weight: Option<f64>,
    #[validate(range(min = 0))]
    pub actual_duration: Option<i32>,
    #[validate(range(min = 1, max = 10))]
    pub perceived_exertion: Option<i32>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub workout_id: String,
    pub scheduled_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: WorkoutSession,
    pub performances: Vec<ExercisePerformance>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scheduled_session() -> WorkoutSession {
        WorkoutSession::new("user-1".into(), "workout-1".into(), None)
    }

    #[test]
    fn start_from_scheduled_sets_started_at() {
        let mut session = scheduled_session();
        let now = Utc::now();
        session.start(now).unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.started_at, Some(now));
    }

    #[test]
    fn start_rejected_outside_scheduled() {
        let now = Utc::now();
        for status in [
            SessionStatus::InProgress,
            SessionStatus::Completed,
            SessionStatus::Skipped,
        ] {
            let mut session = scheduled_session();
            session.status = status;
            assert!(session.start(now).is_err());
        }
    }

    #[test]
    fn complete_from_in_progress_derives_duration() {
        let mut session = scheduled_session();
        let start = Utc::now();
        session.start(start).unwrap();
        let end = start + Duration::seconds(2700);
        session.complete(&SessionFeedback::default(), end).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.completed_at, Some(end));
        assert_eq!(session.duration_minutes, Some(45));
    }

    #[test]
    fn complete_from_scheduled_has_no_duration() {
        let mut session = scheduled_session();
        session
            .complete(&SessionFeedback::default(), Utc::now())
            .unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.duration_minutes.is_none());
    }

    #[test]
    fn complete_rejected_from_terminal_states() {
        let now = Utc::now();
        for status in [SessionStatus::Completed, SessionStatus::Skipped] {
            let mut session = scheduled_session();
            session.status = status;
            let err = session.complete(&SessionFeedback::default(), now).unwrap_err();
            assert!(matches!(err, TransitionError::NotCompletable(_)));
        }
    }

    #[test]
    fn complete_applies_feedback_fields() {
        let mut session = scheduled_session();
        let feedback = SessionFeedback {
            overall_rating: Some(4),
            feedback_notes: Some("tough one".into()),
            calories_burned: Some(310),
        };
        session.complete(&feedback, Utc::now()).unwrap();
        assert_eq!(session.overall_rating, Some(4));
        assert_eq!(session.feedback_notes.as_deref(), Some("tough one"));
        assert_eq!(session.calories_burned, Some(310));
    }

    #[test]
    fn skip_only_from_scheduled() {
        let now = Utc::now();
        let mut session = scheduled_session();
        session.skip(now).unwrap();
        assert_eq!(session.status, SessionStatus::Skipped);

        let mut session = scheduled_session();
        session.start(now).unwrap();
        assert!(session.skip(now).is_err());
    }

    #[test]
    fn session_status_serde_snake_case() {
        let status: SessionStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, SessionStatus::InProgress);
        let value = serde_json::to_value(SessionStatus::Skipped).unwrap();
        assert_eq!(value, serde_json::json!("skipped"));
    }

    #[test]
    fn feedback_rating_bounds() {
        let feedback = SessionFeedback {
            overall_rating: Some(6),
            ..Default::default()
        };
        assert!(feedback.validate().is_err());
    }
}
