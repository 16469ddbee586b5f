use std::sync::Arc;

use dex_core::collection::AnswerOutcome;
use dex_core::model::{Catalog, ImageUri, QuizCandidate, QuizQuestion};
use dex_core::selector::QuizSelector;
use rand::Rng;

use crate::collection_service::CollectionService;
use crate::error::QuizError;
use crate::sync_service::ProgressSynchronizer;

/// Result of the first pick on a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub chosen: QuizCandidate,
    pub target: QuizCandidate,
    pub outcome: AnswerOutcome,
}

impl AnswerFeedback {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.outcome.correct
    }
}

/// One running quiz: the current question, how many were asked and the score.
#[derive(Debug, Clone)]
pub struct QuizSession {
    question: QuizQuestion,
    question_index: u32,
    score: u32,
    feedback: Option<AnswerFeedback>,
}

impl QuizSession {
    #[must_use]
    pub fn question(&self) -> &QuizQuestion {
        &self.question
    }

    /// Zero-based index of the current question.
    #[must_use]
    pub fn question_index(&self) -> u32 {
        self.question_index
    }

    /// Correct first picks so far.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Feedback for the current question once it has been answered.
    #[must_use]
    pub fn feedback(&self) -> Option<&AnswerFeedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.feedback.is_some()
    }

    /// Questions answered so far. Sessions only advance past answered
    /// questions, so this is every earlier question plus the current one if
    /// it has feedback.
    #[must_use]
    pub fn answered(&self) -> u32 {
        self.question_index + u32::from(self.is_answered())
    }
}

/// Runs quiz sessions against the synchronizer's current progress.
#[derive(Clone)]
pub struct QuizService {
    catalog: Arc<Catalog>,
    sync: Arc<ProgressSynchronizer>,
    collection: Arc<CollectionService>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        sync: Arc<ProgressSynchronizer>,
        collection: Arc<CollectionService>,
    ) -> Self {
        Self {
            catalog,
            sync,
            collection,
        }
    }

    /// Start a session with the thread-local RNG.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Selector` if no question can be built.
    pub fn start(&self) -> Result<QuizSession, QuizError> {
        self.start_with_rng(&mut rand::rng())
    }

    /// # Errors
    ///
    /// Returns `QuizError::Selector` if no question can be built.
    pub fn start_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<QuizSession, QuizError> {
        let question = self.build_question(None, rng)?;
        Ok(QuizSession {
            question,
            question_index: 0,
            score: 0,
            feedback: None,
        })
    }

    /// Answer the current question with the candidate at `index`.
    ///
    /// Only the first pick counts: later picks on the same question return
    /// `Ok(None)` and change nothing.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidChoice` for an out-of-range index and
    /// `QuizError::Collection` if the target is not in the catalog.
    pub async fn pick(
        &self,
        session: &mut QuizSession,
        index: usize,
    ) -> Result<Option<AnswerFeedback>, QuizError> {
        if session.is_answered() {
            return Ok(None);
        }

        let len = session.question.candidates().len();
        let chosen = session
            .question
            .candidate(index)
            .cloned()
            .ok_or(QuizError::InvalidChoice { index, len })?;
        let target = session.question.target().clone();

        let outcome = self
            .collection
            .record_answer(chosen.id(), target.id())
            .await?;
        if outcome.correct {
            session.score += 1;
        }

        let feedback = AnswerFeedback {
            chosen,
            target,
            outcome,
        };
        session.feedback = Some(feedback.clone());
        Ok(Some(feedback))
    }

    /// Move to the next question with the thread-local RNG.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Selector` if no question can be built.
    pub fn advance(&self, session: &mut QuizSession) -> Result<(), QuizError> {
        self.advance_with_rng(session, &mut rand::rng())
    }

    /// Clear the current feedback and build the next question, avoiding the
    /// previous target photo.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Selector` if no question can be built.
    pub fn advance_with_rng<R: Rng + ?Sized>(
        &self,
        session: &mut QuizSession,
        rng: &mut R,
    ) -> Result<(), QuizError> {
        let previous = session.question.target().image().clone();
        session.question = self.build_question(Some(&previous), rng)?;
        session.question_index += 1;
        session.feedback = None;
        Ok(())
    }

    fn build_question<R: Rng + ?Sized>(
        &self,
        previous_image: Option<&ImageUri>,
        rng: &mut R,
    ) -> Result<QuizQuestion, QuizError> {
        let snapshot = self.sync.current();
        let question = QuizSelector::new(&self.catalog).next_question(
            &snapshot.progress.collection,
            previous_image,
            rng,
        )?;
        Ok(question)
    }
}
