use async_trait::async_trait;
use thiserror::Error;

use crate::models::{EvaluationRecord, StudentOption, TopicNode};

/// Failures raised while acquiring raw inputs from an upstream source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("upstream reported status code {0}")]
    Upstream(i64),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("lesson {0} not found")]
    UnknownLesson(i64),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Source of rosters, topic forests and evaluation history.
#[async_trait]
pub trait ProgressProvider: Send + Sync {
    async fn students(&self, class_id: i64) -> Result<Vec<StudentOption>, ProviderError>;

    async fn topics(&self, lesson_id: i64) -> Result<Vec<TopicNode>, ProviderError>;

    /// An empty result is valid and means the student has no evaluations
    /// for the topic yet.
    async fn evaluations(
        &self,
        student_id: i64,
        topic_id: i64,
    ) -> Result<Vec<EvaluationRecord>, ProviderError>;
}

#[async_trait]
impl<P: ProgressProvider + ?Sized> ProgressProvider for Box<P> {
    async fn students(&self, class_id: i64) -> Result<Vec<StudentOption>, ProviderError> {
        (**self).students(class_id).await
    }

    async fn topics(&self, lesson_id: i64) -> Result<Vec<TopicNode>, ProviderError> {
        (**self).topics(lesson_id).await
    }

    async fn evaluations(
        &self,
        student_id: i64,
        topic_id: i64,
    ) -> Result<Vec<EvaluationRecord>, ProviderError> {
        (**self).evaluations(student_id, topic_id).await
    }
}
