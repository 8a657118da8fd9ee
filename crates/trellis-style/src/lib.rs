//! Selector matching and cascade resolution.
//!
//! Data flows one way: a [`StyleSheetStore`] holds parsed rules; for a
//! queried element it yields the rules whose selectors match
//! ([`matching`]), each with its [`Specificity`]; the [`cascade`] then picks
//! one winning declaration per property into an [`EffectiveStyle`].
//!
//! Everything here reads an immutable snapshot of the rules and the tree,
//! so separate elements can be resolved from several threads at once as
//! long as nobody mutates the store or document meanwhile.

pub mod cascade;
pub mod filter;
pub mod layer;
pub mod matching;
pub mod parser;
pub mod selector;
pub mod specificity;
pub mod stylesheet;

// -----------------------------------------------------------------------
// Public re-exports
// -----------------------------------------------------------------------

pub use cascade::{
    AppliedDeclaration, EffectiveStyle, Provenance, resolve, resolve_pseudo, style_tree,
};
pub use filter::AncestorFilter;
pub use layer::{LayerId, LayerTree, UNLAYERED};
pub use matching::{MatchOptions, matches, matches_with};
pub use parser::{parse_declaration, parse_declarations, parse_selector_list, parse_stylesheet};
pub use selector::{
    Combinator, CompoundSelector, PseudoClass, PseudoElement, SelectorChain, SelectorComponent,
};
pub use specificity::{Specificity, specificity};
pub use stylesheet::{Declaration, MatchedRule, Origin, SourceOrder, StyleRule, StyleSheetStore};
