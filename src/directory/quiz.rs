use super::records::{NewQuizAttempt, QuizQuestion};

pub fn score_answers(questions: &[QuizQuestion], answers: &[Option<usize>]) -> usize {
    questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| **answer == Some(question.correct_answer))
        .count()
}

pub fn score_percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as u32
}

pub fn score_message(percentage: u32) -> &'static str {
    match percentage {
        100.. => "Perfect! You're a privacy expert!",
        75..=99 => "Excellent! You know your privacy!",
        50..=74 => "Good job! Keep learning!",
        _ => "Keep exploring Web3 privacy!",
    }
}

/// One row of the results view.
pub struct QuestionReview<'a> {
    pub question: &'a QuizQuestion,
    pub chosen: Option<usize>,
}

impl QuestionReview<'_> {
    pub fn is_correct(&self) -> bool {
        self.chosen == Some(self.question.correct_answer)
    }

    pub fn chosen_text(&self) -> &str {
        self.chosen
            .and_then(|index| self.question.options.get(index))
            .map_or("(no answer)", String::as_str)
    }

    pub fn correct_text(&self) -> &str {
        self.question
            .options
            .get(self.question.correct_answer)
            .map_or("", String::as_str)
    }
}

/// Walks through the questions one at a time. `next` only advances once the
/// current question has an answer; the last `next` finishes the session.
#[derive(Clone, Debug)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    current: usize,
    answers: Vec<Option<usize>>,
    finished: bool,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            questions,
            current: 0,
            answers,
            finished: false,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub fn selected(&self) -> Option<usize> {
        self.answers.get(self.current).copied().flatten()
    }

    pub fn select(&mut self, option: usize) {
        if self.finished {
            return;
        }

        let in_range = self
            .current_question()
            .is_some_and(|question| option < question.options.len());
        if in_range && let Some(slot) = self.answers.get_mut(self.current) {
            *slot = Some(option);
        }
    }

    pub fn can_advance(&self) -> bool {
        !self.finished && self.selected().is_some()
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    /// Returns true when this call finished the quiz.
    pub fn next(&mut self) -> bool {
        if !self.can_advance() {
            return false;
        }

        if self.is_last() {
            self.finished = true;
            true
        } else {
            self.current += 1;
            false
        }
    }

    pub fn previous(&mut self) {
        if !self.finished {
            self.current = self.current.saturating_sub(1);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn progress(&self) -> f32 {
        if self.questions.is_empty() {
            return 0.0;
        }
        (self.current + 1) as f32 / self.questions.len() as f32
    }

    pub fn score(&self) -> usize {
        score_answers(&self.questions, &self.answers)
    }

    pub fn percentage(&self) -> u32 {
        score_percentage(self.score(), self.questions.len())
    }

    pub fn review(&self) -> impl Iterator<Item = QuestionReview<'_>> {
        self.questions
            .iter()
            .zip(&self.answers)
            .map(|(question, chosen)| QuestionReview {
                question,
                chosen: *chosen,
            })
    }

    pub fn attempt_for(&self, member_id: &str) -> NewQuizAttempt {
        NewQuizAttempt {
            member_id: member_id.to_owned(),
            score: self.score(),
            total_questions: self.questions.len(),
            answers: self.answers.iter().flatten().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(correct: &[usize]) -> Vec<QuizQuestion> {
        correct
            .iter()
            .enumerate()
            .map(|(index, &correct_answer)| QuizQuestion {
                id: format!("q{index}"),
                question: format!("Question {index}?"),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_answer,
                order: index as u32,
            })
            .collect()
    }

    #[test]
    fn score_counts_matching_answers() {
        let questions = questions(&[1, 1, 2]);
        assert_eq!(score_answers(&questions, &[Some(1), Some(0), Some(2)]), 2);
    }

    #[test]
    fn percentage_rounds_like_the_results_view() {
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(0, 0), 0);
    }

    #[test]
    fn messages_follow_thresholds() {
        assert_eq!(score_message(100), "Perfect! You're a privacy expert!");
        assert_eq!(score_message(75), "Excellent! You know your privacy!");
        assert_eq!(score_message(50), "Good job! Keep learning!");
        assert_eq!(score_message(49), "Keep exploring Web3 privacy!");
    }

    #[test]
    fn session_requires_an_answer_before_advancing() {
        let mut session = QuizSession::new(questions(&[1, 1, 2]));
        assert!(!session.can_advance());
        assert!(!session.next());
        assert_eq!(session.current_index(), 0);

        session.select(1);
        assert!(!session.next());
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn previous_keeps_answers_and_stops_at_zero() {
        let mut session = QuizSession::new(questions(&[0, 1]));
        session.previous();
        assert_eq!(session.current_index(), 0);

        session.select(2);
        session.next();
        session.previous();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.selected(), Some(2));
    }

    #[test]
    fn out_of_range_options_are_ignored() {
        let mut session = QuizSession::new(questions(&[0]));
        session.select(9);
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn finishing_produces_an_attempt() {
        let mut session = QuizSession::new(questions(&[1, 1, 2]));
        for answer in [1, 0, 2] {
            session.select(answer);
            session.next();
        }

        assert!(session.is_finished());
        assert_eq!(session.score(), 2);
        assert_eq!(session.percentage(), 67);

        let attempt = session.attempt_for("member-1");
        assert_eq!(attempt.score, 2);
        assert_eq!(attempt.total_questions, 3);
        assert_eq!(attempt.answers, vec![1, 0, 2]);

        let review = session.review().collect::<Vec<_>>();
        assert!(review[0].is_correct());
        assert!(!review[1].is_correct());
        assert_eq!(review[1].chosen_text(), "a");
        assert_eq!(review[1].correct_text(), "b");
    }

    #[test]
    fn finished_session_ignores_further_input() {
        let mut session = QuizSession::new(questions(&[0]));
        session.select(0);
        assert!(session.next());

        session.select(1);
        session.previous();
        assert!(!session.next());
        assert_eq!(session.score(), 1);
    }
}
