use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub handle: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub bio_text: String,
    pub joined_at: DateTime<Utc>,
    pub layout_seed_angle: f32,
}

/// Fields supplied by the onboarding form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMember {
    pub handle: String,
    pub photo_url: Option<String>,
    pub bio_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub order: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: String,
    pub member_id: String,
    pub score: usize,
    pub total_questions: usize,
    pub answers: Vec<usize>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewQuizAttempt {
    pub member_id: String,
    pub score: usize,
    pub total_questions: usize,
    pub answers: Vec<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptSummary {
    pub score: usize,
    pub total: usize,
}

impl From<&QuizAttempt> for AttemptSummary {
    fn from(attempt: &QuizAttempt) -> Self {
        Self {
            score: attempt.score,
            total: attempt.total_questions,
        }
    }
}

/// A member as shown on the canvas, decorated with their latest quiz result.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberEntry {
    pub member: Member,
    pub latest_attempt: Option<AttemptSummary>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Members,
    QuizAttempts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
}
