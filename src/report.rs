use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{SeriesPoint, StudentOption, TopicOption};

const BAR_WIDTH: usize = 25;

fn topic_label(topic: &TopicOption) -> &str {
    topic.label.as_deref().unwrap_or("(unnamed topic)")
}

/// Text bar scaled to 0..=100; out-of-range values are clamped for drawing only.
fn bar(percentage: f64) -> String {
    let clamped = if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, 100.0)
    };
    let filled = ((clamped / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn render_markdown(
    student: &StudentOption,
    topic: &TopicOption,
    generated_on: NaiveDate,
    series: &[SeriesPoint],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Progress Report");
    let _ = writeln!(
        output,
        "Generated for {} on \"{}\" ({})",
        student.name,
        topic_label(topic),
        generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Correct Answers by Month");
    let _ = writeln!(output);
    let _ = writeln!(output, "| Month | Correct (%) | |");
    let _ = writeln!(output, "|---|---:|---|");

    for point in series {
        let _ = writeln!(
            output,
            "| {} | {} | `{}` |",
            point.label,
            point.percentage,
            bar(point.percentage)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Figures cover only the selected topic; months without evaluations show 0."
    );

    output
}

pub fn render_json(series: &[SeriesPoint]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(series)?)
}

pub fn render_students(students: &[StudentOption]) -> String {
    let mut output = String::new();
    if students.is_empty() {
        let _ = writeln!(output, "No students in this class.");
    }
    for student in students {
        let _ = writeln!(output, "- {} ({})", student.name, student.id);
    }
    output
}

pub fn render_topic_options(options: &[TopicOption]) -> String {
    let mut output = String::new();
    if options.is_empty() {
        let _ = writeln!(output, "No topics for this lesson.");
    }
    for option in options {
        match option.id {
            Some(id) => {
                let _ = writeln!(output, "- {} ({})", topic_label(option), id);
            }
            None => {
                let _ = writeln!(output, "- {} (no id)", topic_label(option));
            }
        }
    }
    output
}
