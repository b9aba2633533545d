//! Path templates for routes that carry variables.
//!
//! A template is parsed once at registration into an ordered list of
//! [`Segment`]s and matched against request paths by consuming template and
//! path segments in lock-step. There is no backtracking: every segment kind
//! has exactly one way to consume input, so a template either matches a path
//! or it does not.
//!
//! ## Syntax
//!
//! | Pattern segment | Kind                               |
//! |-----------------|------------------------------------|
//! | `pets`          | [`Segment::Literal`]               |
//! | `{id}`          | [`Segment::Variable`]              |
//! | `{path+}`       | [`Segment::MultiVariable`] (last)  |
//!
//! Leading, trailing and doubled `/` are ignored, so `/pets/{id}/` and
//! `pets/{id}` are the same template.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Maximum number of captured variables before heap allocation.
/// Most routes have ≤4 path variables (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_VARIABLES: usize = 8;

/// Stack-allocated storage for captured `(name, value)` pairs.
///
/// Names are `Arc<str>` shared with the template they came from; values are
/// per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_VARIABLES]>;

/// One slash-delimited component of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this text (case-sensitive).
    Literal(String),
    /// Captures one path segment under the name.
    Variable(Arc<str>),
    /// Captures every remaining path segment under the name; terminal only.
    MultiVariable(Arc<str>),
}

/// Registration-time failure to parse a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("malformed template '{template}': unbalanced braces in segment '{segment}'")]
    UnbalancedBraces { template: String, segment: String },
    #[error("malformed template '{template}': empty variable name")]
    EmptyVariableName { template: String },
    #[error("malformed template '{template}': multi-value variable '{name}' must be the last segment")]
    MultiVariableNotLast { template: String, name: String },
}

/// Variables captured by matching a path against a template.
///
/// Pairs are in segment order. A name repeats once per segment captured by a
/// multi-value variable; the path [`Shape`](crate::shape::Shape) folds those
/// into a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedVariables(pub ParamVec);

impl ExtractedVariables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get a variable by name
    ///
    /// Uses "last write wins" semantics, so for a multi-value capture this is
    /// the final captured segment.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values captured under `name`, in path order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (&**k, v.as_str()))
    }
}

/// A parsed, immutable URI pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a URI pattern.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for unbalanced braces, an empty variable
    /// name, or a multi-value variable that is not the final segment.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opsrouter::router::{PathTemplate, Segment};
    ///
    /// let template = PathTemplate::tokenize("/files/{bucket}/{key+}").unwrap();
    /// assert_eq!(template.segments().len(), 3);
    /// assert!(matches!(template.segments()[2], Segment::MultiVariable(_)));
    /// ```
    pub fn tokenize(pattern: &str) -> Result<Self, TemplateError> {
        let parts: Vec<&str> = split_path(pattern).collect();
        let mut segments = Vec::with_capacity(parts.len());

        for (idx, part) in parts.iter().enumerate() {
            let opens = part.matches('{').count();
            let closes = part.matches('}').count();
            if opens == 0 && closes == 0 {
                segments.push(Segment::Literal((*part).to_string()));
                continue;
            }

            let inner = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(inner) if opens == 1 && closes == 1 => inner,
                _ => {
                    return Err(TemplateError::UnbalancedBraces {
                        template: pattern.to_string(),
                        segment: (*part).to_string(),
                    })
                }
            };

            let (name, multi) = match inner.strip_suffix('+') {
                Some(name) => (name, true),
                None => (inner, false),
            };
            if name.is_empty() {
                return Err(TemplateError::EmptyVariableName {
                    template: pattern.to_string(),
                });
            }
            if multi && idx + 1 != parts.len() {
                return Err(TemplateError::MultiVariableNotLast {
                    template: pattern.to_string(),
                    name: name.to_string(),
                });
            }

            let name: Arc<str> = Arc::from(name);
            segments.push(if multi {
                Segment::MultiVariable(name)
            } else {
                Segment::Variable(name)
            });
        }

        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the template contains no variables and has at most one
    /// segment; such templates belong in the exact-match table.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        match self.segments.as_slice() {
            [] | [Segment::Literal(_)] => true,
            _ => false,
        }
    }

    /// Key for the exact-match table: the lower-cased literal, or `""` for the root.
    #[must_use]
    pub fn exact_key(&self) -> Option<String> {
        match self.segments.as_slice() {
            [] => Some(String::new()),
            [Segment::Literal(literal)] => Some(literal.to_lowercase()),
            _ => None,
        }
    }

    /// Whether both templates accept exactly the same set of paths.
    ///
    /// Variable names are ignored: `/pets/{id}` and `/pets/{petId}` are
    /// equivalent, and the second one registered can never be selected.
    #[must_use]
    pub fn is_equivalent(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Variable(_), Segment::Variable(_)) => true,
                    (Segment::MultiVariable(_), Segment::MultiVariable(_)) => true,
                    _ => false,
                })
    }

    /// Match request path segments against the template.
    ///
    /// Returns `None` on a literal mismatch or an arity mismatch. A trailing
    /// multi-value variable accepts zero or more remaining segments.
    #[must_use]
    pub fn match_segments(&self, path: &[&str]) -> Option<ExtractedVariables> {
        let mut variables = ParamVec::new();
        let mut remaining = path;

        for segment in &self.segments {
            match segment {
                Segment::MultiVariable(name) => {
                    for value in remaining {
                        variables.push((Arc::clone(name), (*value).to_string()));
                    }
                    return Some(ExtractedVariables(variables));
                }
                Segment::Literal(literal) => {
                    let (head, rest) = remaining.split_first()?;
                    if head != literal {
                        return None;
                    }
                    remaining = rest;
                }
                Segment::Variable(name) => {
                    let (head, rest) = remaining.split_first()?;
                    variables.push((Arc::clone(name), (*head).to_string()));
                    remaining = rest;
                }
            }
        }

        remaining.is_empty().then_some(ExtractedVariables(variables))
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => write!(f, "/{literal}")?,
                Segment::Variable(name) => write!(f, "/{{{name}}}")?,
                Segment::MultiVariable(name) => write!(f, "/{{{name}+}}")?,
            }
        }
        Ok(())
    }
}

/// Split a path into its non-empty `/`-separated segments.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
