//! Radix tree node implementation.
//!
//! Every node stands for one path segment. Children are kept in three
//! buckets searched in priority order: literal, pattern, placeholder. The
//! search explores every branch that can match and keeps the most specific
//! complete match, so a literal that dead-ends never hides a placeholder
//! route further along.

use regex::Regex;

use crate::error::TemplateError;
use crate::template::{PathTemplate, Segment};

/// How a node matches its segment.
#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Static,
    Pattern(Regex),
    Param,
}

/// A registered template terminating at a node.
#[derive(Debug, Clone)]
pub(crate) struct Leaf<T> {
    pub template: String,
    pub names: Vec<String>,
    pub literals: usize,
    pub patterns: usize,
    pub value: T,
}

impl<T> Leaf<T> {
    fn rank(&self) -> (usize, usize) {
        (self.literals, self.patterns)
    }
}

/// A complete match found during the search.
#[derive(Debug)]
pub(crate) struct Candidate<'a, 'p, T> {
    pub leaf: &'a Leaf<T>,
    pub values: Vec<&'p str>,
}

/// A node in the radix tree.
#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    segment: String,
    kind: NodeKind,
    leaf: Option<Leaf<T>>,
    /// Sorted by segment for binary search.
    static_children: Vec<Node<T>>,
    /// Declaration order.
    pattern_children: Vec<Node<T>>,
    param_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn new(segment: String, kind: NodeKind) -> Self {
        Self {
            segment,
            kind,
            leaf: None,
            static_children: Vec::new(),
            pattern_children: Vec::new(),
            param_child: None,
        }
    }

    /// Creates a root node for the tree.
    pub(crate) fn root() -> Self {
        Self::new(String::new(), NodeKind::Static)
    }

    /// Inserts a compiled template.
    ///
    /// Fails with [`TemplateError::Conflict`] when another template with the
    /// same shape already ends at the target node.
    pub(crate) fn insert(&mut self, template: &PathTemplate, value: T) -> Result<(), TemplateError> {
        let mut node = self;
        for segment in template.segments() {
            node = node.child_for(segment);
        }

        if let Some(existing) = &node.leaf {
            return Err(TemplateError::Conflict {
                template: template.as_str().to_string(),
                existing: existing.template.clone(),
            });
        }

        node.leaf = Some(Leaf {
            template: template.as_str().to_string(),
            names: template.param_names().to_vec(),
            literals: template.literal_count(),
            patterns: template.pattern_count(),
            value,
        });
        Ok(())
    }

    fn child_for(&mut self, segment: &Segment) -> &mut Self {
        match segment {
            Segment::Literal(text) => {
                let index = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(text))
                {
                    Ok(index) => index,
                    Err(index) => {
                        self.static_children
                            .insert(index, Node::new(text.clone(), NodeKind::Static));
                        index
                    }
                };
                &mut self.static_children[index]
            }
            Segment::Pattern { shape, regex, .. } => {
                let index = match self
                    .pattern_children
                    .iter()
                    .position(|c| c.segment == *shape)
                {
                    Some(index) => index,
                    None => {
                        self.pattern_children
                            .push(Node::new(shape.clone(), NodeKind::Pattern(regex.clone())));
                        self.pattern_children.len() - 1
                    }
                };
                &mut self.pattern_children[index]
            }
            Segment::Param(_) => &mut **self
                .param_child
                .get_or_insert_with(|| Box::new(Node::new(segment.shape().to_string(), NodeKind::Param))),
        }
    }

    /// Searches the subtree for the most specific template matching
    /// `segments`.
    ///
    /// Ranking is (literal segments, pattern segments); on equal rank the
    /// first candidate reached in literal → pattern → placeholder order is
    /// kept.
    pub(crate) fn find<'a, 'p>(
        &'a self,
        segments: &[&'p str],
        captured: &mut Vec<&'p str>,
        best: &mut Option<Candidate<'a, 'p, T>>,
    ) {
        let Some((&first, rest)) = segments.split_first() else {
            if let Some(leaf) = &self.leaf {
                let outranked = matches!(
                    best.as_ref(),
                    Some(current) if current.leaf.rank() >= leaf.rank()
                );
                if !outranked {
                    *best = Some(Candidate {
                        leaf,
                        values: captured.clone(),
                    });
                }
            }
            return;
        };

        if let Some(child) = self.find_static_child(first) {
            child.find(rest, captured, best);
        }

        for child in &self.pattern_children {
            if let NodeKind::Pattern(regex) = &child.kind {
                if let Some(caps) = regex.captures(first) {
                    let mark = captured.len();
                    captured.extend(caps.iter().skip(1).flatten().map(|m| m.as_str()));
                    child.find(rest, captured, best);
                    captured.truncate(mark);
                }
            }
        }

        if let Some(child) = &self.param_child {
            captured.push(first);
            child.find(rest, captured, best);
            captured.pop();
        }
    }

    fn find_static_child(&self, segment: &str) -> Option<&Self> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}
