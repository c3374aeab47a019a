use groupscholar_student_progress::models::{EvaluationRecord, TopicNode, TopicOption};
use groupscholar_student_progress::{progress, topics};

#[test]
fn single_topic_and_march_record_produce_esfand_bar() {
    let forest: Vec<TopicNode> =
        serde_json::from_str(r#"[{"id": 1, "name": "Topic", "children": []}]"#).unwrap();
    assert_eq!(
        topics::flatten(&forest),
        vec![TopicOption {
            id: Some(1),
            label: Some("Topic".to_string()),
        }]
    );

    let series = progress::progress_series(&[EvaluationRecord {
        source_period_label: "March".to_string(),
        period_key: 1,
        percentage: 85.0,
    }]);

    assert_eq!(series.len(), 12);
    for point in &series {
        if point.label == "اسفند" {
            assert_eq!(point.percentage, 85.0);
        } else {
            assert_eq!(point.percentage, 0.0, "{}", point.label);
        }
    }
}

#[test]
fn lesson_file_topics_flatten_through_sub_subjects() {
    let forest: Vec<TopicNode> = serde_json::from_str(
        r#"[
            {"id": 1, "name": "Fractions", "subSubject": [
                {"id": 2, "name": "Adding", "subSubject": [{"id": 3, "name": "Like denominators"}]}
            ]},
            {"id": 4, "name": "Geometry", "subSubject": null}
        ]"#,
    )
    .unwrap();

    let labels: Vec<_> = topics::flatten(&forest)
        .into_iter()
        .filter_map(|option| option.label)
        .collect();
    assert_eq!(labels, vec!["Fractions", "Adding", "Like denominators", "Geometry"]);
}
