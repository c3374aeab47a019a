use anyhow::Context;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{EvaluationRecord, StudentOption, TopicNode, TopicRow};
use crate::provider::{ProgressProvider, ProviderError};
use crate::topics;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let class_id = 7_i64;
    let lesson_id = 12_i64;

    sqlx::query(
        r#"
        INSERT INTO student_progress.lessons (id, class_id, title)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE
        SET class_id = EXCLUDED.class_id, title = EXCLUDED.title
        "#,
    )
    .bind(lesson_id)
    .bind(class_id)
    .bind("Mathematics, grade 7")
    .execute(pool)
    .await?;

    let students = vec![
        (1001_i64, "Sara Ahmadi"),
        (1002_i64, "Reza Karimi"),
        (1003_i64, "Niloofar Rahimi"),
    ];

    for (id, name) in students {
        sqlx::query(
            r#"
            INSERT INTO student_progress.students (id, class_id, full_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET class_id = EXCLUDED.class_id, full_name = EXCLUDED.full_name
            "#,
        )
        .bind(id)
        .bind(class_id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let topic_rows = vec![
        (1_i64, None, "Fractions", 0),
        (2_i64, Some(1_i64), "Adding fractions", 0),
        (3_i64, Some(1_i64), "Comparing fractions", 1),
        (4_i64, Some(3_i64), "Common denominators", 0),
        (5_i64, None, "Geometry", 1),
        (6_i64, Some(5_i64), "Angles", 0),
    ];

    for (id, parent_id, name, position) in topic_rows {
        sqlx::query(
            r#"
            INSERT INTO student_progress.topics (id, lesson_id, parent_id, name, position)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET parent_id = EXCLUDED.parent_id, name = EXCLUDED.name, position = EXCLUDED.position
            "#,
        )
        .bind(id)
        .bind(lesson_id)
        .bind(parent_id)
        .bind(name)
        .bind(position)
        .execute(pool)
        .await?;
    }

    let evaluations = vec![
        ("seed-001", 1001_i64, 2_i64, NaiveDate::from_ymd_opt(2023, 10, 14), 55.0),
        ("seed-002", 1001, 2, NaiveDate::from_ymd_opt(2024, 10, 12), 65.0),
        ("seed-003", 1001, 2, NaiveDate::from_ymd_opt(2024, 11, 9), 72.5),
        ("seed-004", 1001, 2, NaiveDate::from_ymd_opt(2024, 1, 20), 48.0),
        ("seed-005", 1001, 2, NaiveDate::from_ymd_opt(2024, 3, 2), 81.0),
        ("seed-006", 1001, 4, NaiveDate::from_ymd_opt(2024, 5, 18), 90.0),
        ("seed-007", 1002, 2, NaiveDate::from_ymd_opt(2024, 2, 10), 38.0),
        ("seed-008", 1002, 2, NaiveDate::from_ymd_opt(2025, 2, 8), 61.0),
        ("seed-009", 1003, 6, NaiveDate::from_ymd_opt(2024, 12, 7), 77.0),
    ];

    for (source_key, student_id, topic_id, date, percentage) in evaluations {
        let date = date.context("invalid date")?;
        sqlx::query(
            r#"
            INSERT INTO student_progress.evaluations
            (id, student_id, topic_id, month_name, year_month, positive_percentage, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(topic_id)
        .bind(date.format("%B").to_string())
        .bind(year_month(date))
        .bind(percentage)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn year_month(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 100 + i64::from(date.month())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_id: i64,
        topic_id: i64,
        month_name: String,
        year_month: i64,
        positive_percentage: f64,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO student_progress.evaluations
            (id, student_id, topic_id, month_name, year_month, positive_percentage, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.student_id)
        .bind(row.topic_id)
        .bind(&row.month_name)
        .bind(row.year_month)
        .bind(row.positive_percentage)
        .bind(&source_key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to import row {source_key}"))?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Postgres-backed provider.
#[derive(Clone)]
pub struct PgProvider {
    pool: PgPool,
}

impl PgProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressProvider for PgProvider {
    async fn students(&self, class_id: i64) -> Result<Vec<StudentOption>, ProviderError> {
        let rows = sqlx::query(
            "SELECT id, full_name FROM student_progress.students \
             WHERE class_id = $1 ORDER BY full_name",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        let mut students = Vec::with_capacity(rows.len());
        for row in rows {
            students.push(StudentOption {
                id: row.try_get("id")?,
                name: row.try_get("full_name")?,
            });
        }
        Ok(students)
    }

    async fn topics(&self, lesson_id: i64) -> Result<Vec<TopicNode>, ProviderError> {
        let exists: bool =
            sqlx::query("SELECT EXISTS (SELECT 1 FROM student_progress.lessons WHERE id = $1)")
                .bind(lesson_id)
                .fetch_one(&self.pool)
                .await?
                .try_get(0)?;
        if !exists {
            return Err(ProviderError::UnknownLesson(lesson_id));
        }

        let rows = sqlx::query(
            "SELECT id, parent_id, name, position FROM student_progress.topics \
             WHERE lesson_id = $1",
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await?;

        let mut topic_rows = Vec::with_capacity(rows.len());
        for row in rows {
            topic_rows.push(TopicRow {
                id: row.try_get("id")?,
                parent_id: row.try_get("parent_id")?,
                name: row.try_get("name")?,
                position: row.try_get("position")?,
            });
        }
        Ok(topics::build_forest(topic_rows))
    }

    async fn evaluations(
        &self,
        student_id: i64,
        topic_id: i64,
    ) -> Result<Vec<EvaluationRecord>, ProviderError> {
        let rows = sqlx::query(
            "SELECT month_name, year_month, positive_percentage \
             FROM student_progress.evaluations \
             WHERE student_id = $1 AND topic_id = $2 ORDER BY seq",
        )
        .bind(student_id)
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(EvaluationRecord {
                source_period_label: row.try_get("month_name")?,
                period_key: row.try_get("year_month")?,
                percentage: row.try_get("positive_percentage")?,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_month_sorts_chronologically() {
        let october = NaiveDate::from_ymd_opt(2023, 10, 14).unwrap();
        let january = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        assert_eq!(year_month(october), 202310);
        assert_eq!(year_month(january), 202401);
        assert!(year_month(january) > year_month(october));
    }

    #[test]
    fn seeded_month_names_match_calendar_table() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let name = date.format("%B").to_string();
        assert_eq!(crate::calendar::translate(&name), "اسفند");
    }
}
