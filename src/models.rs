use serde::{Deserialize, Deserializer, Serialize};

/// One node of a curriculum hierarchy.
///
/// `id` and `name` stay optional so a node with missing fields is carried
/// through untouched rather than rejected or defaulted. Sub-topics may arrive
/// under `children`, `subSubject`, or both; both lists are kept, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTopicNode")]
pub struct TopicNode {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub children: Vec<TopicNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTopicNode {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    children: Vec<TopicNode>,
    #[serde(default, deserialize_with = "null_as_empty")]
    sub_subject: Vec<TopicNode>,
}

impl From<RawTopicNode> for TopicNode {
    fn from(mut raw: RawTopicNode) -> Self {
        raw.children.append(&mut raw.sub_subject);
        Self {
            id: raw.id,
            name: raw.name,
            children: raw.children,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TopicNode>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<TopicNode>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TopicNode {
    pub fn new(id: i64, name: &str, children: Vec<TopicNode>) -> Self {
        Self {
            id: Some(id),
            name: Some(name.to_string()),
            children,
        }
    }
}

/// Unlinks descendants onto a heap stack so deep chains drop without recursion.
impl Drop for TopicNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicOption {
    pub id: Option<i64>,
    pub label: Option<String>,
}

/// Adjacency-list topic shape as stored in Postgres.
#[derive(Debug, Clone)]
pub struct TopicRow {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentOption {
    pub id: i64,
    pub name: String,
}

/// The context a progress screen is opened with.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonContext {
    pub lesson_id: i64,
    pub class_id: i64,
    #[serde(default)]
    pub topics: Vec<TopicNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pub source_period_label: String,
    pub period_key: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPoint {
    pub label: String,
    pub percentage: f64,
    pub period_key: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub percentage: f64,
}
