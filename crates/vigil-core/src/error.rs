//! Error aggregation shared by the dispatch crates.
//!
//! Dispatch fans out to many items and must report every terminal failure,
//! never just the first one. [`JoinedError`] keeps one fragment per failed
//! item; [`ValidationError`] carries the multi-line, path-labelled report
//! produced at config-validation time.

use std::fmt;

/// A combined error holding one fragment per failed item.
///
/// Display joins the fragments with newlines, so callers (and tests) can
/// count failures by counting lines.
#[derive(Debug, Clone)]
pub struct JoinedError {
    fragments: Vec<String>,
}

impl JoinedError {
    /// Joins `fragments` into one error; `None` when the list is empty.
    pub fn join(fragments: Vec<String>) -> Option<Self> {
        if fragments.is_empty() {
            None
        } else {
            Some(Self { fragments })
        }
    }

    /// Number of failure fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the error holds no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The individual failure fragments.
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }
}

impl fmt::Display for JoinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fragments.join("\n"))
    }
}

impl std::error::Error for JoinedError {}

/// Multi-line validation report, sorted by item key with path-like labels.
#[derive(Debug, Clone)]
pub struct ValidationError {
    lines: Vec<String>,
}

impl ValidationError {
    /// Builds a report from pre-formatted lines; `None` when empty.
    pub fn from_lines(lines: Vec<String>) -> Option<Self> {
        if lines.is_empty() {
            None
        } else {
            Some(Self { lines })
        }
    }

    /// The report lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_empty_is_none() {
        assert!(JoinedError::join(vec![]).is_none());
    }

    #[test]
    fn fragments_preserved_in_order() {
        let err = JoinedError::join(vec!["a failed".into(), "b failed".into()]).unwrap();
        assert_eq!(err.len(), 2);
        assert_eq!(err.to_string(), "a failed\nb failed");
    }

    #[test]
    fn validation_report_renders_lines() {
        let err = ValidationError::from_lines(vec![
            "webhook:".into(),
            "  one:".into(),
            "    secret: <required>".into(),
        ])
        .unwrap();
        assert_eq!(err.to_string().lines().count(), 3);
    }
}
