use time::macros::format_description;

use super::repo_types::Task;

pub const CSV_HEADER: &str = "Title,Description,Category,Priority,Due Date,Status,Tags,Shared With";

fn quoted(out: &mut String, value: &str) {
    out.push('"');
    out.push_str(&value.replace('"', "\"\""));
    out.push('"');
}

fn cell(out: &mut String, value: &str) {
    if value.contains([',', '"', '\n', '\r']) {
        quoted(out, value);
    } else {
        out.push_str(value);
    }
}

/// Renders tasks as CSV, one row per task, `\n` line endings.
pub fn to_csv(tasks: &[Task]) -> String {
    let mut out = String::with_capacity(64 * (tasks.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');

    for task in tasks {
        let due = task
            .due_date
            .and_then(|d| d.format(format_description!("[year]-[month]-[day]")).ok())
            .unwrap_or_default();
        let status = if task.completed { "Completed" } else { "Pending" };
        let shared = task.shared_emails().collect::<Vec<_>>().join("; ");

        quoted(&mut out, &task.title);
        out.push(',');
        quoted(&mut out, &task.description);
        out.push(',');
        cell(&mut out, &task.category_name);
        out.push(',');
        cell(&mut out, task.priority.as_str());
        out.push(',');
        cell(&mut out, &due);
        out.push(',');
        cell(&mut out, status);
        out.push(',');
        cell(&mut out, &task.tags.join("; "));
        out.push(',');
        cell(&mut out, &shared);
        out.push('\n');
    }
    out
}
