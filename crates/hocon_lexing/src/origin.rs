use std::fmt;

/// Describes where a token or value came from: a source description (usually
/// a filename), an optional line number and any comments attached by the
/// parser. Carried by every token and every config value so error messages
/// can point at the offending input.
///
/// Origins are deliberately not part of value equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    description: String,
    line: Option<usize>,
    comments: Vec<String>,
}

impl Origin {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            line: None,
            comments: vec![],
        }
    }

    /// Returns a copy of this origin pointing at the given line.
    pub fn with_line(&self, line: usize) -> Self {
        Self {
            line: Some(line),
            ..self.clone()
        }
    }

    /// Returns a copy of this origin carrying the given comments.
    pub fn with_comments(&self, comments: Vec<String>) -> Self {
        Self {
            comments,
            ..self.clone()
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Merges two origins into one describing both, concatenating the
    /// descriptions and taking the union of the comments. Line numbers
    /// survive only when the descriptions agree.
    pub fn merge_two(a: &Origin, b: &Origin) -> Origin {
        let (description, line) = if a.description == b.description {
            (a.description.clone(), a.line.or(b.line))
        } else {
            (format!("{},{}", a.description, b.description), None)
        };

        let mut comments = a.comments.clone();
        for comment in &b.comments {
            if !comments.contains(comment) {
                comments.push(comment.clone());
            }
        }

        Origin {
            description,
            line,
            comments,
        }
    }

    /// Folds a whole list of origins with [`Origin::merge_two`].
    pub fn merge_all<'a>(origins: impl IntoIterator<Item = &'a Origin>) -> Origin {
        let mut iter = origins.into_iter();
        let first = match iter.next() {
            Some(first) => first.clone(),
            None => Origin::new("unknown origin"),
        };
        iter.fold(first, |merged, next| Origin::merge_two(&merged, next))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: {}", self.description, line),
            None => write!(f, "{}", self.description),
        }
    }
}
