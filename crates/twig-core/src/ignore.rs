//! .twigignore: untracked paths the workspace scan skips.
//!
//! Format, one rule per line:
//! - Blank lines and lines starting with `#` are skipped
//! - A plain name (`build`, `notes.txt`) matches any path component
//! - A name with `*` or `?` (`*.log`) is a glob matched against filenames
//! - A leading `/` (`/out/report.txt`) anchors the rule to the working-tree root
//!
//! The metadata directory is always ignored, with or without a
//! `.twigignore` file.

use std::fs;
use std::path::Path;

use tracing::warn;

/// Name of the ignore file at the working-tree root.
pub const IGNORE_FILE: &str = ".twigignore";

const MAX_RULES: usize = 1000;
const MAX_PATTERN_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    /// Matches any path component exactly.
    Name(String),
    /// Glob against the final path component.
    Glob(String),
    /// Exact relative path from the root, or a directory prefix of one.
    Anchored(String),
}

/// A parsed set of ignore rules.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    meta_dir: String,
    rules: Vec<Rule>,
}

impl IgnoreRules {
    /// Rules that ignore only the metadata directory.
    pub fn new(meta_dir: &str) -> Self {
        IgnoreRules {
            meta_dir: meta_dir.to_string(),
            rules: Vec::new(),
        }
    }

    /// Load `.twigignore` from the working-tree root, if there is one.
    pub fn load(root: &Path, meta_dir: &str) -> Self {
        let path = root.join(IGNORE_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content, meta_dir),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::new(meta_dir),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable ignore file, using defaults");
                Self::new(meta_dir)
            }
        }
    }

    /// Parse `.twigignore` content. Rules beyond the size limits are dropped.
    pub fn parse(content: &str, meta_dir: &str) -> Self {
        let mut ignore = Self::new(meta_dir);
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if ignore.rules.len() >= MAX_RULES || trimmed.len() > MAX_PATTERN_LEN {
                continue;
            }
            let pattern = trimmed.trim_end_matches('/');
            let rule = if let Some(anchored) = pattern.strip_prefix('/') {
                Rule::Anchored(anchored.to_string())
            } else if pattern.contains('*') || pattern.contains('?') {
                Rule::Glob(pattern.to_string())
            } else {
                Rule::Name(pattern.to_string())
            };
            ignore.rules.push(rule);
        }
        ignore
    }

    /// True if the walk should skip `rel_path` (a file, or a directory and
    /// everything below it).
    ///
    /// `rel_path` uses `/` separators and is relative to the working-tree root.
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        if rel_path.split('/').next() == Some(self.meta_dir.as_str()) {
            return true;
        }
        let filename = rel_path.rsplit('/').next().unwrap_or(rel_path);
        self.rules.iter().any(|rule| match rule {
            Rule::Name(name) => rel_path.split('/').any(|c| c == name),
            Rule::Glob(pattern) => glob_match(pattern, filename),
            Rule::Anchored(path) => {
                rel_path == path
                    || rel_path
                        .strip_prefix(path.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        })
    }
}

/// Simple glob matching: `*` matches any run of characters, `?` exactly one.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            pi = star_p + 1;
            ti = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
