// Database schema definitions
// SQL for the relational store: profiles, candidates, votes, blocks, ledger_heads

pub const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

/// Split a schema script into individual statements, dropping comment-only lines.
pub fn statements(schema: &str) -> Vec<String> {
    schema
        .split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .map(|statement| statement.trim().to_string())
        .filter(|statement| !statement.is_empty())
        .collect()
}
