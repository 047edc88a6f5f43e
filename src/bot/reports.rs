//! Plain-text rendering of spreadsheet reports.

use super::texts;
use crate::config::Period;
use crate::statistics::{DepartmentReport, FundLine, KeyValueLine, Leaders};

fn value(raw: &str) -> &str {
    if raw.is_empty() {
        "0"
    } else {
        raw
    }
}

pub fn department(report: &DepartmentReport, period: Period) -> String {
    let mut text = format!("📊 {} ({})", report.department, texts::period_label(period).to_lowercase());
    if report.totals.is_empty() && report.people.is_empty() {
        text.push('\n');
        text.push_str(texts::NO_DATA);
        return text;
    }
    for (name, raw) in &report.totals {
        text.push_str(&format!("\n{}: {}", name, value(raw)));
    }
    if !report.people.is_empty() {
        text.push_str("\n\nСотрудники:");
        for person in &report.people {
            let values: Vec<String> = person
                .values
                .iter()
                .map(|(name, raw)| format!("{} {}", name.to_lowercase(), value(raw)))
                .collect();
            text.push_str(&format!("\n{}: {}", person.name, values.join(", ")));
        }
    }
    text
}

pub fn leaders(all: &[Leaders]) -> String {
    let lines: Vec<String> = all
        .iter()
        .filter(|l| !l.names.is_empty())
        .map(|l| {
            format!(
                "🏆 {}: {} ({} б.)",
                l.department,
                l.names.join(", "),
                format_points(l.points)
            )
        })
        .collect();
    if lines.is_empty() {
        texts::NO_LEADER.to_string()
    } else {
        lines.join("\n")
    }
}

fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{}", points as i64)
    } else {
        format!("{points:.1}")
    }
}

pub fn key_values(lines: &[KeyValueLine]) -> String {
    if lines.is_empty() {
        return texts::NO_DATA.to_string();
    }
    let mut text = String::from("📌 Ключевые показатели");
    for line in lines {
        text.push_str(&format!("\n\n{}", line.name));
        for period in &line.periods {
            match &period.planned {
                Some(planned) => text.push_str(&format!(
                    "\n{}: {} из {}",
                    period.name,
                    value(&period.actual),
                    value(planned)
                )),
                None => text.push_str(&format!("\n{}: {}", period.name, value(&period.actual))),
            }
        }
    }
    text
}

pub fn funds(lines: &[FundLine]) -> String {
    if lines.is_empty() {
        return texts::NO_DATA.to_string();
    }
    let mut text = String::from("💼 Фонды");
    for line in lines {
        text.push_str(&format!(
            "\n{}: {} из {}",
            line.name,
            value(&line.actual),
            value(&line.planned)
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{KeyValuePoint, PersonLine};

    #[test]
    fn department_report_lists_totals_and_people() {
        let report = DepartmentReport {
            department: "Продажи".into(),
            totals: vec![("Звонки".into(), "12".into()), ("Встречи".into(), String::new())],
            people: vec![PersonLine {
                name: "Иван Иванов".into(),
                values: vec![("Звонки".into(), "5".into())],
            }],
        };
        assert_eq!(
            department(&report, Period::Day),
            "📊 Продажи (за день)\nЗвонки: 12\nВстречи: 0\n\nСотрудники:\nИван Иванов: звонки 5"
        );

        let empty = DepartmentReport {
            department: "Продажи".into(),
            totals: Vec::new(),
            people: Vec::new(),
        };
        assert!(department(&empty, Period::Week).ends_with(texts::NO_DATA));
    }

    #[test]
    fn leaders_skip_departments_without_winner() {
        let all = vec![
            Leaders {
                department: "Юристы".into(),
                names: vec!["Иванов".into(), "Петров".into()],
                points: 5.0,
            },
            Leaders {
                department: "Продажи".into(),
                names: Vec::new(),
                points: 0.0,
            },
        ];
        assert_eq!(leaders(&all), "🏆 Юристы: Иванов, Петров (5 б.)");
        assert_eq!(leaders(&all[1..]), texts::NO_LEADER);
        assert_eq!(format_points(2.5), "2.5");
    }

    #[test]
    fn key_values_and_funds_render_plans() {
        let lines = vec![KeyValueLine {
            name: "Выручка".into(),
            periods: vec![
                KeyValuePoint {
                    name: "Месяц".into(),
                    actual: "150".into(),
                    planned: Some("200".into()),
                },
                KeyValuePoint {
                    name: "Год".into(),
                    actual: "1800".into(),
                    planned: None,
                },
            ],
        }];
        assert_eq!(
            key_values(&lines),
            "📌 Ключевые показатели\n\nВыручка\nМесяц: 150 из 200\nГод: 1800"
        );
        let funds_text = funds(&[FundLine {
            name: "Резерв".into(),
            actual: String::new(),
            planned: "10".into(),
        }]);
        assert_eq!(funds_text, "💼 Фонды\nРезерв: 0 из 10");
    }
}
