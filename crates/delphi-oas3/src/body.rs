//! Request body negotiation.

use std::fmt;
use std::sync::Arc;

use delphi_core::{
    pointer, BodyParserRegistry, DelphiResult, ErrorSource, MediaTypeMap, ResolvedBody, ValidationTarget,
    ValidatorFactory, ValidatorFunction,
};

use crate::document::{ApiDocument, RequestBody};

/// One declared media type, compiled.
#[derive(Clone)]
struct CompiledMediaType {
    pointer: String,
    validator: Option<Arc<dyn ValidatorFunction>>,
}

/// The compiled request body declaration of one operation.
///
/// Negotiation picks the most specific declared range for the request's
/// `Content-Type`: an exact match, then `type/*`, then `*/*`. A failed
/// negotiation is not reported here; it surfaces when the body is parsed
/// or validated.
#[derive(Clone)]
pub struct RequestBodyResolver {
    required: bool,
    doc_path: String,
    media_types: MediaTypeMap<CompiledMediaType>,
}

/// Result of negotiating one request.
#[derive(Debug)]
pub struct NegotiatedBody {
    /// Lazy body handling for the request.
    pub body: ResolvedBody,
    /// JSON pointer to the selected media type, if one matched.
    pub media_type_pointer: Option<String>,
}

impl RequestBodyResolver {
    /// Compiles the body declared at `doc_path`.
    ///
    /// # Errors
    ///
    /// Fails if a media type key is not a media type or a schema does not
    /// compile.
    pub fn compile(
        body: &RequestBody,
        doc_path: &str,
        document: &ApiDocument,
        factory: &dyn ValidatorFactory,
    ) -> DelphiResult<Self> {
        let mut media_types = MediaTypeMap::new();
        for (key, media_type) in &body.content {
            let pointer = pointer::join(doc_path, &["content", key]);
            let validator = match &media_type.schema {
                Some(schema) => {
                    let target = ValidationTarget::new(ErrorSource::Request, "body", pointer::join(&pointer, &["schema"]));
                    Some(factory.compile(schema, document.raw(), target)?)
                }
                None => None,
            };
            media_types.insert(key, CompiledMediaType { pointer, validator })?;
        }

        Ok(Self {
            required: body.required,
            doc_path: doc_path.to_string(),
            media_types,
        })
    }

    /// Whether a body must be sent.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Declared media types, in document order.
    pub fn media_types(&self) -> impl Iterator<Item = &str> {
        self.media_types.keys()
    }

    /// Negotiates a request's `Content-Type`.
    #[must_use]
    pub fn negotiate(&self, content_type: Option<&str>, parsers: &BodyParserRegistry) -> NegotiatedBody {
        let body = ResolvedBody::new(self.required, content_type, self.doc_path.as_str());
        let Some(content_type) = content_type else {
            return NegotiatedBody {
                body,
                media_type_pointer: None,
            };
        };
        match self.media_types.negotiate(content_type) {
            Some((key, media_type)) => NegotiatedBody {
                body: body
                    .negotiated(key, media_type.validator.clone())
                    .with_parser(parsers.find(content_type)),
                media_type_pointer: Some(media_type.pointer.clone()),
            },
            None => NegotiatedBody {
                body,
                media_type_pointer: None,
            },
        }
    }
}

impl fmt::Debug for RequestBodyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBodyResolver")
            .field("required", &self.required)
            .field("doc_path", &self.doc_path)
            .field("media_types", &self.media_types.keys().collect::<Vec<_>>())
            .finish()
    }
}
