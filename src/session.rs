use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::models::{SeriesPoint, StudentOption, TopicOption};
use crate::progress;
use crate::provider::{ProgressProvider, ProviderError};
use crate::topics;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("select both a student and a topic first")]
    IncompleteSelection,
    #[error("student {0} is not in the loaded roster")]
    UnknownStudent(i64),
    #[error("topic {0} is not among the loaded topics")]
    UnknownTopic(i64),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Identity of one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Only the most recently issued ticket may commit its result.
#[derive(Debug, Default)]
pub struct RequestGate {
    latest: u64,
}

impl RequestGate {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest == ticket.0
    }

    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressView {
    Empty,
    Loading,
    Ready(Vec<SeriesPoint>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    /// A newer request or selection replaced this one; its result was dropped.
    Superseded,
}

struct SessionState {
    students: Vec<StudentOption>,
    topics: Vec<TopicOption>,
    student: Option<StudentOption>,
    topic: Option<TopicOption>,
    view: ProgressView,
    roster_gate: RequestGate,
    topic_gate: RequestGate,
    progress_gate: RequestGate,
}

impl SessionState {
    fn drop_progress(&mut self) {
        self.progress_gate.invalidate();
        if self.view == ProgressView::Loading {
            self.view = ProgressView::Empty;
        }
    }
}

/// Student/topic selection for one progress screen.
///
/// Results are committed only while the request that produced them is still
/// the latest for its kind, so a slow response can never overwrite a newer
/// selection.
pub struct ProgressSession<P> {
    provider: P,
    state: Mutex<SessionState>,
}

impl<P: ProgressProvider> ProgressSession<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: Mutex::new(SessionState {
                students: Vec::new(),
                topics: Vec::new(),
                student: None,
                topic: None,
                view: ProgressView::Empty,
                roster_gate: RequestGate::default(),
                topic_gate: RequestGate::default(),
                progress_gate: RequestGate::default(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn load_students(
        &self,
        class_id: i64,
    ) -> Result<Outcome<Vec<StudentOption>>, SessionError> {
        let ticket = {
            let mut state = self.state();
            state.roster_gate.issue()
        };

        let result = self.provider.students(class_id).await;

        let mut state = self.state();
        if !state.roster_gate.is_current(ticket) {
            tracing::debug!(class_id, "discarding superseded roster response");
            return Ok(Outcome::Superseded);
        }
        let students = result?;
        tracing::info!(class_id, count = students.len(), "loaded roster");

        let still_listed = state
            .student
            .as_ref()
            .is_some_and(|selected| students.contains(selected));
        if state.student.is_some() && !still_listed {
            state.student = None;
            state.drop_progress();
        }
        state.students = students.clone();
        Ok(Outcome::Applied(students))
    }

    pub async fn load_topics(
        &self,
        lesson_id: i64,
    ) -> Result<Outcome<Vec<TopicOption>>, SessionError> {
        let ticket = {
            let mut state = self.state();
            state.topic_gate.issue()
        };

        let result = self.provider.topics(lesson_id).await;

        let mut state = self.state();
        if !state.topic_gate.is_current(ticket) {
            tracing::debug!(lesson_id, "discarding superseded topic response");
            return Ok(Outcome::Superseded);
        }
        let options = topics::flatten(&result?);
        tracing::info!(lesson_id, count = options.len(), "loaded topics");

        let still_listed = state
            .topic
            .as_ref()
            .is_some_and(|selected| options.contains(selected));
        if state.topic.is_some() && !still_listed {
            state.topic = None;
            state.drop_progress();
        }
        state.topics = options.clone();
        Ok(Outcome::Applied(options))
    }

    pub fn select_student(&self, student_id: i64) -> Result<(), SessionError> {
        let mut state = self.state();
        let student = state
            .students
            .iter()
            .find(|student| student.id == student_id)
            .cloned()
            .ok_or(SessionError::UnknownStudent(student_id))?;
        if state.student.as_ref() != Some(&student) {
            state.student = Some(student);
            state.drop_progress();
        }
        Ok(())
    }

    pub fn select_topic(&self, topic_id: i64) -> Result<(), SessionError> {
        let mut state = self.state();
        let topic = state
            .topics
            .iter()
            .find(|topic| topic.id == Some(topic_id))
            .cloned()
            .ok_or(SessionError::UnknownTopic(topic_id))?;
        if state.topic.as_ref() != Some(&topic) {
            state.topic = Some(topic);
            state.drop_progress();
        }
        Ok(())
    }

    /// Fetches evaluations for the current selection and builds the series.
    ///
    /// A provider failure leaves the view empty rather than showing the
    /// previous selection's chart.
    pub async fn apply(&self) -> Result<Outcome<Vec<SeriesPoint>>, SessionError> {
        let (ticket, student_id, topic_id) = {
            let mut state = self.state();
            let student_id = state.student.as_ref().map(|student| student.id);
            let topic_id = state.topic.as_ref().and_then(|topic| topic.id);
            let (Some(student_id), Some(topic_id)) = (student_id, topic_id) else {
                return Err(SessionError::IncompleteSelection);
            };
            state.view = ProgressView::Loading;
            (state.progress_gate.issue(), student_id, topic_id)
        };

        let result = self.provider.evaluations(student_id, topic_id).await;

        let mut state = self.state();
        if !state.progress_gate.is_current(ticket) {
            tracing::debug!(student_id, topic_id, "discarding superseded progress response");
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(records) => {
                let series = progress::progress_series(&records);
                tracing::info!(student_id, topic_id, records = records.len(), "progress ready");
                state.view = ProgressView::Ready(series.clone());
                Ok(Outcome::Applied(series))
            }
            Err(err) => {
                tracing::warn!(student_id, topic_id, error = %err, "progress request failed");
                state.view = ProgressView::Empty;
                Err(err.into())
            }
        }
    }

    pub fn reset(&self) {
        let mut state = self.state();
        state.student = None;
        state.topic = None;
        state.progress_gate.invalidate();
        state.view = ProgressView::Empty;
    }

    pub fn view(&self) -> ProgressView {
        self.state().view.clone()
    }

    pub fn selected_student(&self) -> Option<StudentOption> {
        self.state().student.clone()
    }

    pub fn selected_topic(&self) -> Option<TopicOption> {
        self.state().topic.clone()
    }
}
