//! Commented Python notebooks.
//!
//! A notebook is a plain `.py` file. Runs of lines starting with `#` are
//! markup, everything else is code:
//!
//! - `# text` lines are prose (Markdown), with the `# ` prefix removed
//! - `#^ name` lines list modules to import at startup
//! - `#@ name` lines list packages to install before anything runs
//!
//! Code runs become one run form each.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotebookError {
    #[error("Unknown comment marker {marker:?} on line {line}")]
    UnknownMarker { line: usize, marker: char },
}

/// One contiguous piece of a notebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Prose(String),
    SysImports(Vec<String>),
    Installs(Vec<String>),
    Code(String),
}

const MAIN_GUARD: &str = "if __name__ == '__main__':";

/// Split a notebook into prose, package lists and code chunks
pub fn split(source: &str) -> Result<Vec<Chunk>, NotebookError> {
    let mut chunks = Vec::new();
    let mut group: Vec<&str> = Vec::new();
    let mut group_start = 1;
    let mut in_comment = false;

    for (idx, line) in source.split_inclusive('\n').enumerate() {
        let is_comment = line.starts_with('#');
        if !group.is_empty() && is_comment != in_comment {
            chunks.extend(finish_group(&group, in_comment, group_start)?);
            group.clear();
        }
        if group.is_empty() {
            group_start = idx + 1;
            in_comment = is_comment;
        }
        group.push(line);
    }
    if !group.is_empty() {
        chunks.extend(finish_group(&group, in_comment, group_start)?);
    }

    tracing::debug!(chunks = chunks.len(), "Split notebook");
    Ok(chunks)
}

fn finish_group(
    lines: &[&str],
    comment: bool,
    first_line: usize,
) -> Result<Option<Chunk>, NotebookError> {
    if comment {
        comment_chunk(lines, first_line).map(Some)
    } else {
        Ok(code_chunk(lines))
    }
}

fn comment_chunk(lines: &[&str], first_line: usize) -> Result<Chunk, NotebookError> {
    let marker = lines
        .first()
        .and_then(|line| line.chars().nth(1))
        .unwrap_or('\n');

    let entries = || {
        lines
            .iter()
            .map(|line| strip_marker(line).trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect::<Vec<_>>()
    };

    match marker {
        ' ' | '\n' | '\r' => Ok(Chunk::Prose(
            lines.iter().map(|line| strip_marker(line)).collect(),
        )),
        '^' => Ok(Chunk::SysImports(entries())),
        '@' => Ok(Chunk::Installs(entries())),
        marker => Err(NotebookError::UnknownMarker {
            line: first_line,
            marker,
        }),
    }
}

/// Drop the two-character `# ` / `#^` / `#@` prefix; a bare `#` becomes a blank line
fn strip_marker(line: &str) -> &str {
    let rest = &line[1..];
    match rest.chars().next() {
        Some('\n') | Some('\r') | None => rest,
        Some(c) => &rest[c.len_utf8()..],
    }
}

fn code_chunk(lines: &[&str]) -> Option<Chunk> {
    let mut lines: Vec<&str> = lines
        .iter()
        .map(|line| line.trim_end())
        .skip_while(|line| line.is_empty())
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    if lines.first() == Some(&MAIN_GUARD) {
        lines.remove(0);
    }
    let indent = lines.first()?.len() - lines.first()?.trim_start_matches(' ').len();

    let code = lines
        .iter()
        .map(|line| {
            let strip = line.len() - line.trim_start_matches(' ').len();
            &line[strip.min(indent)..]
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(Chunk::Code(code))
}
