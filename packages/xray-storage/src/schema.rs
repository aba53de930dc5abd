pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_pipeline_runs.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_pipeline_runs.sql")),
				"tables/002_step_traces.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_step_traces.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_expands_all_includes() {
		let rendered = render_schema();

		assert!(rendered.contains("CREATE TABLE IF NOT EXISTS pipeline_runs"));
		assert!(rendered.contains("CREATE TABLE IF NOT EXISTS step_traces"));
		assert!(rendered.contains("ON DELETE CASCADE"));
		assert!(!rendered.contains("\\ir "));
	}
}
