//! Path template parsing.
//!
//! A template such as `/files/{name}.{ext}` is split into segments. Each
//! segment is one of:
//!
//! - a literal (`files`), matched byte-for-byte;
//! - a bare placeholder (`{id}`), matching any non-empty segment;
//! - a pattern (`{name}.{ext}`, `v{version}`), mixing literals and
//!   placeholders inside a single segment, compiled to an anchored regex.

use regex::Regex;

use crate::error::TemplateError;

/// One parsed template segment.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Literal text.
    Literal(String),
    /// A whole-segment placeholder.
    Param(String),
    /// A segment mixing literal text and placeholders.
    Pattern {
        /// Segment text with placeholder names erased (`{}.{}`).
        shape: String,
        /// Anchored regex with one capture group per placeholder.
        regex: Regex,
        /// Placeholder names in capture order.
        names: Vec<String>,
    },
}

impl Segment {
    /// Returns the key used to detect templates that cannot be told apart.
    pub(crate) fn shape(&self) -> &str {
        match self {
            Self::Literal(text) => text,
            Self::Param(_) => "{}",
            Self::Pattern { shape, .. } => shape,
        }
    }
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
    names: Vec<String>,
}

impl PathTemplate {
    /// Parses a template.
    ///
    /// Empty segments are dropped, so `/users/` and `/users` share a shape.
    ///
    /// # Example
    ///
    /// ```rust
    /// use delphi_router::PathTemplate;
    ///
    /// let template = PathTemplate::parse("/orgs/{org}/files/{name}.{ext}").unwrap();
    /// assert_eq!(template.param_names(), ["org", "name", "ext"]);
    /// assert_eq!(template.literal_count(), 2);
    /// ```
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut names: Vec<String> = Vec::new();

        for part in raw.split('/').filter(|s| !s.is_empty()) {
            let segment = parse_segment(raw, part)?;
            let segment_names: Vec<&String> = match &segment {
                Segment::Literal(_) => Vec::new(),
                Segment::Param(name) => vec![name],
                Segment::Pattern { names, .. } => names.iter().collect(),
            };
            for name in segment_names {
                if names.contains(name) {
                    return Err(TemplateError::DuplicatePlaceholder {
                        template: raw.to_string(),
                        name: name.clone(),
                    });
                }
                names.push(name.clone());
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            names,
        })
    }

    /// Returns the template text as declared.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns placeholder names in the order they appear.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// Number of purely literal segments.
    #[must_use]
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Number of mixed literal/placeholder segments.
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Pattern { .. }))
            .count()
    }
}

fn parse_segment(template: &str, part: &str) -> Result<Segment, TemplateError> {
    if !part.contains('{') && !part.contains('}') {
        return Ok(Segment::Literal(part.to_string()));
    }

    let invalid = |reason: &str| TemplateError::InvalidSegment {
        template: template.to_string(),
        segment: part.to_string(),
        reason: reason.to_string(),
    };

    let mut names = Vec::new();
    let mut shape = String::new();
    let mut pattern = String::from("^");
    let mut rest = part;
    let mut previous_was_placeholder = false;

    while !rest.is_empty() {
        if let Some(after_open) = rest.strip_prefix('{') {
            let close = after_open
                .find('}')
                .ok_or_else(|| invalid("unterminated placeholder"))?;
            let name = &after_open[..close];
            if name.is_empty() || name.contains('{') {
                return Err(invalid("empty or nested placeholder name"));
            }
            if previous_was_placeholder {
                return Err(invalid("adjacent placeholders cannot be separated"));
            }
            names.push(name.to_string());
            shape.push_str("{}");
            pattern.push_str("(.+?)");
            rest = &after_open[close + 1..];
            previous_was_placeholder = true;
        } else {
            let end = rest.find('{').unwrap_or(rest.len());
            let literal = &rest[..end];
            if literal.contains('}') {
                return Err(invalid("unbalanced '}'"));
            }
            shape.push_str(literal);
            pattern.push_str(&regex::escape(literal));
            rest = &rest[end..];
            previous_was_placeholder = false;
        }
    }
    pattern.push('$');

    if shape == "{}" {
        return Ok(Segment::Param(names.remove(0)));
    }

    let regex = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;
    Ok(Segment::Pattern {
        shape,
        regex,
        names,
    })
}
