//! Selector matching against the document tree.
//!
//! Chains are matched right-to-left: the subject compound is tested
//! against the element first, then the remaining compounds are looked for
//! among its element ancestors.

use trellis_dom::{Document, ElementNode, NodeId};
use trellis_types::EngineConfig;

use crate::selector::{
    Combinator, CompoundSelector, PseudoClass, PseudoElement, SelectorChain, SelectorComponent,
};

/// Matching switches derived from [`EngineConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare class and ID names ASCII case-insensitively.
    pub quirks_mode: bool,
}

impl From<&EngineConfig> for MatchOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            quirks_mode: config.quirks_mode,
        }
    }
}

/// Whether `chain` selects the element `node_id` in standards mode.
///
/// A chain ending in a pseudo-element selects a generated box, never the
/// element itself, so it does not match here; see [`matches_pseudo`].
///
/// # Panics
///
/// Panics if `node_id` is not an element.
pub fn matches(chain: &SelectorChain, doc: &Document, node_id: NodeId) -> bool {
    matches_with(chain, doc, node_id, MatchOptions::default())
}

/// [`matches`] with explicit options.
pub fn matches_with(
    chain: &SelectorChain,
    doc: &Document,
    node_id: NodeId,
    options: MatchOptions,
) -> bool {
    expect_element(doc, node_id);
    chain.pseudo_element.is_none() && matches_compounds(chain, doc, node_id, options)
}

/// Whether `chain` selects the `pseudo` box generated for `node_id`.
pub fn matches_pseudo(
    chain: &SelectorChain,
    doc: &Document,
    node_id: NodeId,
    pseudo: PseudoElement,
    options: MatchOptions,
) -> bool {
    expect_element(doc, node_id);
    chain.pseudo_element == Some(pseudo) && matches_compounds(chain, doc, node_id, options)
}

fn expect_element(doc: &Document, node_id: NodeId) {
    assert!(
        doc.element(node_id).is_some(),
        "selector matching requires an element, node {node_id} is not one"
    );
}

/// Match every compound, ignoring the chain's pseudo-element.
fn matches_compounds(
    chain: &SelectorChain,
    doc: &Document,
    node_id: NodeId,
    options: MatchOptions,
) -> bool {
    let Some(last) = chain.compounds.len().checked_sub(1) else {
        return false;
    };

    // The last compound is the subject -- it must match node_id.
    if !matches_compound(doc, node_id, &chain.compounds[last], options) {
        return false;
    }

    if chain.is_descendant_only() {
        matches_descendant_run(chain, doc, node_id, last, options)
    } else {
        match_left(chain, doc, node_id, last, options) == MatchResult::Matched
    }
}

/// Descendant-only chains: scan ancestors nearest-first with a cursor over
/// the remaining compounds. Matching the nearest candidate ancestor is
/// always safe here, so no backtracking is needed.
fn matches_descendant_run(
    chain: &SelectorChain,
    doc: &Document,
    node_id: NodeId,
    last: usize,
    options: MatchOptions,
) -> bool {
    let mut remaining = last;
    for ancestor in doc.ancestors(node_id) {
        if remaining == 0 {
            break;
        }
        if matches_compound(doc, ancestor, &chain.compounds[remaining - 1], options) {
            remaining -= 1;
        }
    }
    remaining == 0
}

/// Outcome of matching the compounds left of some position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchResult {
    Matched,
    /// Failed here; an enclosing descendant step may retry further up.
    NotMatched,
    /// Failed for every ancestor that could still be tried, so enclosing
    /// descendant steps must give up too.
    NotMatchedGlobally,
}

/// General chains: `compounds[idx]` already matched `node_id`; match the
/// compounds to its left.
///
/// A descendant step that runs out of ancestors fails globally: a retry
/// from a higher starting point only sees a subset of the same ancestors.
fn match_left(
    chain: &SelectorChain,
    doc: &Document,
    node_id: NodeId,
    idx: usize,
    options: MatchOptions,
) -> MatchResult {
    if idx == 0 {
        return MatchResult::Matched;
    }
    match chain.combinators[idx - 1] {
        Combinator::Child => match doc.parent_element(node_id) {
            Some(parent) => match_at(chain, doc, parent, idx - 1, options),
            None => MatchResult::NotMatchedGlobally,
        },
        Combinator::Descendant => {
            for ancestor in doc.ancestors(node_id) {
                match match_at(chain, doc, ancestor, idx - 1, options) {
                    MatchResult::NotMatched => continue,
                    result => return result,
                }
            }
            MatchResult::NotMatchedGlobally
        },
    }
}

/// Match `compounds[idx]` against `node_id`, then everything to its left.
fn match_at(
    chain: &SelectorChain,
    doc: &Document,
    node_id: NodeId,
    idx: usize,
    options: MatchOptions,
) -> MatchResult {
    if !matches_compound(doc, node_id, &chain.compounds[idx], options) {
        return MatchResult::NotMatched;
    }
    match_left(chain, doc, node_id, idx, options)
}

/// Check if a compound selector matches a given element.
pub fn matches_compound(
    doc: &Document,
    node_id: NodeId,
    compound: &CompoundSelector,
    options: MatchOptions,
) -> bool {
    let Some(elem) = doc.element(node_id) else {
        return false;
    };
    compound
        .components
        .iter()
        .all(|component| matches_component(doc, node_id, elem, component, options))
}

fn matches_component(
    doc: &Document,
    node_id: NodeId,
    elem: &ElementNode,
    component: &SelectorComponent,
    options: MatchOptions,
) -> bool {
    match component {
        SelectorComponent::Universal => true,
        SelectorComponent::Type(tag) => elem.is(tag),
        SelectorComponent::Class(class) if options.quirks_mode => elem.has_class_ignore_case(class),
        SelectorComponent::Class(class) => elem.has_class(class),
        SelectorComponent::Id(id) => elem.id.as_deref().is_some_and(|v| {
            if options.quirks_mode {
                v.eq_ignore_ascii_case(id)
            } else {
                v == id
            }
        }),
        SelectorComponent::PseudoClass(pseudo) => match pseudo {
            PseudoClass::FirstChild => doc.is_first_element_child(node_id),
            PseudoClass::LastChild => doc.is_last_element_child(node_id),
        },
    }
}
