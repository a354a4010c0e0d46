//! Server matching.
//!
//! Declared server URLs are compiled into anchored regular expressions.
//! A request matches the first server, in declaration order, whose template
//! matches a prefix of the request ending at a path segment boundary.

use std::fmt;
use std::sync::Arc;

use delphi_core::{pointer, DelphiError, DelphiResult, ParametersMap, ValidatorFactory};
use indexmap::IndexMap;
use regex::Regex;
use tracing::warn;

use crate::config::ResolverConfig;
use crate::document::{ApiDocument, ServerVariable};
use crate::parameters::ParameterDeclaration;

/// A server that matched a request.
#[derive(Debug, Clone)]
pub struct MatchedServer {
    /// Index into the document's `servers`; `None` for the implicit root
    /// server or when servers are ignored.
    pub index: Option<usize>,
    /// Raw server variable values.
    pub params: ParametersMap<String>,
    /// The request path with the server base removed; never empty.
    pub path: String,
    /// Declarations of the server's variables.
    pub parameters: Arc<[ParameterDeclaration]>,
}

struct CompiledServer {
    index: Option<usize>,
    url: String,
    absolute: bool,
    host_has_port: bool,
    regex: Regex,
    names: Vec<String>,
    parameters: Arc<[ParameterDeclaration]>,
}

/// Matches requests against the document's servers.
///
/// # Example
///
/// ```rust
/// use delphi_oas3::{ApiDocument, ResolverConfig, SchemaValidatorFactory, ServerMatcher};
///
/// let document = ApiDocument::from_yaml(r#"
/// openapi: 3.0.3
/// servers:
///   - url: https://{region}.example.com/v1
///     variables:
///       region: { default: eu, enum: [eu, us] }
/// paths: {}
/// "#).unwrap();
///
/// let matcher = ServerMatcher::compile(&document, &ResolverConfig::default(), &SchemaValidatorFactory::default()).unwrap();
/// let matched = matcher.match_request(Some("us.example.com:443"), "/v1/pets").unwrap();
/// assert_eq!(matched.params["region"], "us");
/// assert_eq!(matched.path, "/pets");
///
/// assert!(matcher.match_request(Some("ap.example.com"), "/v1/pets").is_none());
/// ```
pub struct ServerMatcher {
    servers: Vec<CompiledServer>,
    ignore: bool,
}

impl ServerMatcher {
    /// Compiles the document's servers. Without declared servers a root
    /// server (`/`) is assumed.
    ///
    /// # Errors
    ///
    /// Fails if a server URL is not a valid template.
    pub fn compile(
        document: &ApiDocument,
        config: &ResolverConfig,
        factory: &dyn ValidatorFactory,
    ) -> DelphiResult<Self> {
        if config.ignore_servers {
            return Ok(Self {
                servers: Vec::new(),
                ignore: true,
            });
        }

        let declared = &document.model().servers;
        let mut servers = Vec::with_capacity(declared.len().max(1));
        if declared.is_empty() {
            servers.push(CompiledServer::compile(None, "/", &IndexMap::new(), Arc::from(Vec::new()))?);
        }
        for (index, server) in declared.iter().enumerate() {
            let base = pointer::join("/servers", &[&index.to_string()]);
            let parameters = server
                .variables
                .iter()
                .map(|(name, variable)| {
                    let at = pointer::join(&base, &["variables", name]);
                    ParameterDeclaration::server_variable(name, variable, &at, document, factory)
                })
                .collect::<DelphiResult<Vec<_>>>()?;
            servers.push(CompiledServer::compile(
                Some(index),
                &server.url,
                &server.variables,
                Arc::from(parameters),
            )?);
        }

        Ok(Self {
            servers,
            ignore: false,
        })
    }

    /// Returns true if server matching is skipped.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.ignore
    }

    /// Number of compiled servers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Returns true if no server is compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Matches a request. `host` comes from an absolute request URL or the
    /// `Host` header and is only consulted for absolute server URLs.
    #[must_use]
    pub fn match_request(&self, host: Option<&str>, path: &str) -> Option<MatchedServer> {
        if self.ignore {
            return Some(MatchedServer {
                index: None,
                params: ParametersMap::new(),
                path: if path.is_empty() { "/".to_string() } else { path.to_string() },
                parameters: Arc::from(Vec::new()),
            });
        }
        self.servers.iter().find_map(|server| server.match_request(host, path))
    }
}

impl fmt::Debug for ServerMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerMatcher")
            .field("servers", &self.servers.iter().map(|s| s.url.as_str()).collect::<Vec<_>>())
            .field("ignore", &self.ignore)
            .finish()
    }
}

impl CompiledServer {
    fn compile(
        index: Option<usize>,
        url: &str,
        variables: &IndexMap<String, ServerVariable>,
        parameters: Arc<[ParameterDeclaration]>,
    ) -> DelphiResult<Self> {
        let trimmed = url.trim_end_matches('/');
        let (absolute, rest) = match strip_scheme(trimmed) {
            Some(rest) => (true, rest.to_string()),
            None if trimmed.is_empty() || trimmed.starts_with('/') => (false, trimmed.to_string()),
            None => (false, format!("/{trimmed}")),
        };
        let host_has_port = absolute && rest.split('/').next().is_some_and(|host| host.contains(':'));

        let mut pattern = String::from("^");
        let mut names = Vec::new();
        let mut remaining = rest.as_str();
        while let Some(start) = remaining.find('{') {
            pattern.push_str(&regex::escape(&remaining[..start]));
            let end = remaining[start..]
                .find('}')
                .map(|offset| start + offset)
                .ok_or_else(|| DelphiError::invalid_template(url, "unbalanced '{'"))?;
            let name = &remaining[start + 1..end];
            if name.is_empty() {
                return Err(DelphiError::invalid_template(url, "empty variable name"));
            }
            match variables.get(name) {
                Some(variable) if !variable.enum_values.is_empty() => {
                    let alternatives: Vec<String> = variable.enum_values.iter().map(|v| regex::escape(v)).collect();
                    pattern.push('(');
                    pattern.push_str(&alternatives.join("|"));
                    pattern.push(')');
                }
                Some(_) => pattern.push_str("([^/]+)"),
                None => {
                    warn!(server = url, variable = name, "server variable is not declared");
                    pattern.push_str("([^/]+)");
                }
            }
            names.push(name.to_string());
            remaining = &remaining[end + 1..];
        }
        if remaining.contains('}') {
            return Err(DelphiError::invalid_template(url, "unbalanced '}'"));
        }
        pattern.push_str(&regex::escape(remaining));
        pattern.push_str("(?P<rest>/.*)?$");

        let regex = Regex::new(&pattern).map_err(|e| DelphiError::invalid_template(url, e.to_string()))?;
        Ok(Self {
            index,
            url: url.to_string(),
            absolute,
            host_has_port,
            regex,
            names,
            parameters,
        })
    }

    fn match_request(&self, host: Option<&str>, path: &str) -> Option<MatchedServer> {
        let subject = if self.absolute {
            let host = host?.to_ascii_lowercase();
            let host = if self.host_has_port { host.as_str() } else { strip_port(&host) };
            format!("{host}{path}")
        } else {
            path.to_string()
        };

        let captures = self.regex.captures(&subject)?;
        let params = self
            .names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| captures.get(i + 1).map(|m| (name.clone(), m.as_str().to_string())))
            .collect();
        let rest = captures.name("rest").map_or("/", |m| m.as_str());

        Some(MatchedServer {
            index: self.index,
            params,
            path: rest.to_string(),
            parameters: Arc::clone(&self.parameters),
        })
    }
}

/// Removes `scheme://` or a leading `//`.
fn strip_scheme(url: &str) -> Option<&str> {
    if let Some(rest) = url.strip_prefix("//") {
        return Some(rest);
    }
    let (scheme, rest) = url.split_once("://")?;
    let valid = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(rest)
}

/// Removes a trailing `:port` from a host.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
