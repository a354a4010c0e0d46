//! Template compilation errors.

use thiserror::Error;

/// Errors raised while compiling or registering a path template.
///
/// All of these indicate an inconsistent API description rather than a bad
/// request, so they surface when the router is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The same placeholder name appears twice in one template.
    #[error("placeholder '{name}' appears more than once in template '{template}'")]
    DuplicatePlaceholder {
        /// The offending template.
        template: String,
        /// The repeated placeholder name.
        name: String,
    },

    /// A segment could not be parsed (unbalanced braces, empty names,
    /// adjacent placeholders).
    #[error("invalid segment '{segment}' in template '{template}': {reason}")]
    InvalidSegment {
        /// The offending template.
        template: String,
        /// The segment text.
        segment: String,
        /// Why the segment was rejected.
        reason: String,
    },

    /// Two templates have the same shape and can never be told apart.
    #[error("template '{template}' conflicts with already registered '{existing}'")]
    Conflict {
        /// The template being inserted.
        template: String,
        /// The template already occupying the same shape.
        existing: String,
    },
}
