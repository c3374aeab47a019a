use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::{EvaluationRecord, LessonContext, StudentOption, TopicNode};
use crate::provider::{ProgressProvider, ProviderError};

const ROSTER_PAGE_SIZE: u32 = 100;

/// Provider backed by the school HTTP API.
///
/// The API exposes no topic endpoint; topic forests come from lesson
/// context files handed over at construction.
#[derive(Clone)]
pub struct ApiProvider {
    client: Client,
    base_url: String,
    lessons: Vec<LessonContext>,
}

impl ApiProvider {
    pub fn new(base_url: &str, lessons: Vec<LessonContext>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            lessons,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "requesting upstream");
        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus(response.status()));
        }

        let envelope: Envelope<T> = response.json().await?;
        envelope.into_data()
    }
}

/// Reads lesson contexts from a JSON file holding either one lesson or a list.
pub fn load_lessons(path: &Path) -> anyhow::Result<Vec<LessonContext>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LessonFile {
        Many(Vec<LessonContext>),
        One(LessonContext),
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let lessons = match serde_json::from_str::<LessonFile>(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?
    {
        LessonFile::Many(lessons) => lessons,
        LessonFile::One(lesson) => vec![lesson],
    };
    Ok(lessons)
}

#[async_trait]
impl ProgressProvider for ApiProvider {
    async fn students(&self, class_id: i64) -> Result<Vec<StudentOption>, ProviderError> {
        let roster: Roster = self
            .get(
                "/api/School/GetClassStudents",
                &[
                    ("classId", class_id.to_string()),
                    ("page", "1".to_string()),
                    ("pageSize", ROSTER_PAGE_SIZE.to_string()),
                ],
            )
            .await?;

        Ok(roster
            .students
            .into_iter()
            .map(|student| StudentOption {
                id: student.id,
                name: student.student_name,
            })
            .collect())
    }

    async fn topics(&self, lesson_id: i64) -> Result<Vec<TopicNode>, ProviderError> {
        self.lessons
            .iter()
            .find(|lesson| lesson.lesson_id == lesson_id)
            .map(|lesson| lesson.topics.clone())
            .ok_or(ProviderError::UnknownLesson(lesson_id))
    }

    async fn evaluations(
        &self,
        student_id: i64,
        topic_id: i64,
    ) -> Result<Vec<EvaluationRecord>, ProviderError> {
        let stats: Vec<EvaluationStat> = self
            .get(
                "/api/Exam/GetTopicEvaluationDetailStats",
                &[
                    ("studentId", student_id.to_string()),
                    ("topicId", topic_id.to_string()),
                ],
            )
            .await?;

        stats.into_iter().map(EvaluationStat::into_record).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    status_code: i64,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, ProviderError> {
        if self.status_code != 200 {
            return Err(ProviderError::Upstream(self.status_code));
        }
        self.data
            .ok_or_else(|| ProviderError::Malformed("response carried no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct Roster {
    #[serde(default)]
    students: Vec<RosterStudent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterStudent {
    id: i64,
    student_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationStat {
    month_name: String,
    positive_percentage: f64,
    year_month: RawPeriodKey,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPeriodKey {
    Number(i64),
    Text(String),
}

impl EvaluationStat {
    fn into_record(self) -> Result<EvaluationRecord, ProviderError> {
        Ok(EvaluationRecord {
            period_key: parse_period_key(self.year_month)?,
            source_period_label: self.month_name,
            percentage: self.positive_percentage,
        })
    }
}

/// Accepts `202401`, `"202401"`, `"2024/1"` or `"2024-01"`.
fn parse_period_key(raw: RawPeriodKey) -> Result<i64, ProviderError> {
    let text = match raw {
        RawPeriodKey::Number(value) => return Ok(value),
        RawPeriodKey::Text(text) => text,
    };
    let malformed = || ProviderError::Malformed(format!("invalid yearMonth {text:?}"));

    let parts: Vec<&str> = text.trim().split(['/', '-']).collect();
    match parts.as_slice() {
        [whole] => whole.parse().map_err(|_| malformed()),
        [year, month] => {
            let year: i64 = year.parse().map_err(|_| malformed())?;
            let month: i64 = month.parse().map_err(|_| malformed())?;
            if !(1..=12).contains(&month) {
                return Err(malformed());
            }
            Ok(year * 100 + month)
        }
        _ => Err(malformed()),
    }
}
