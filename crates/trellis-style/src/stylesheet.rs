//! Parsed style rules and the per-document rule store.

use serde::Serialize;
use trellis_dom::{Document, NodeId};
use trellis_types::EngineConfig;

use crate::filter::AncestorFilter;
use crate::layer::{LayerId, LayerTree, UNLAYERED};
use crate::matching::{self, MatchOptions};
use crate::parser;
use crate::selector::{PseudoElement, SelectorChain};
use crate::specificity::{Specificity, specificity};

/// Position of a rule in the order it was added to its store.
pub type SourceOrder = u32;

/// Source order given to the `style` attribute pseudo-rule. Later than
/// any rule a store can hold.
pub const INLINE_SOURCE_ORDER: SourceOrder = SourceOrder::MAX;

/// Where a declaration came from. Later variants outrank earlier ones
/// between declarations of equal importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Origin {
    /// From a `<link>` or `<style>` stylesheet.
    AuthorSheet,
    /// From the element's `style=""` attribute.
    Inline,
}

/// A single `property: value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    /// Lowercased property name.
    pub property: String,
    /// Value text, not interpreted at this layer.
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.trim().to_ascii_lowercase(),
            value: value.trim().to_string(),
            important: false,
        }
    }

    /// A declaration carrying `!important`.
    pub fn important(property: &str, value: &str) -> Self {
        Self {
            important: true,
            ..Self::new(property, value)
        }
    }
}

/// Comma-separated selector chains sharing one declaration block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleRule {
    pub selectors: Vec<SelectorChain>,
    pub declarations: Vec<Declaration>,
    pub origin: Origin,
    /// Cascade layer in the owning store's [`LayerTree`].
    pub layer: LayerId,
    /// Assigned by [`StyleSheetStore::add_rule`].
    pub source_order: SourceOrder,
}

impl StyleRule {
    /// An unlayered author-sheet rule. Its source order is set when it is
    /// stored.
    pub fn new(selectors: Vec<SelectorChain>, declarations: Vec<Declaration>) -> Self {
        Self {
            selectors,
            declarations,
            origin: Origin::AuthorSheet,
            layer: UNLAYERED,
            source_order: 0,
        }
    }

    pub fn in_layer(mut self, layer: LayerId) -> Self {
        self.layer = layer;
        self
    }
}

/// A stored rule that applies to a queried element.
#[derive(Debug, Clone, Copy)]
pub struct MatchedRule<'a> {
    pub rule: &'a StyleRule,
    /// The matching chain with the highest specificity.
    pub selector: &'a SelectorChain,
    pub specificity: Specificity,
    /// Cascade position of the rule's layer, see [`LayerTree::order`].
    pub layer_order: u32,
    /// Dotted layer name, `None` when unlayered.
    pub layer: Option<&'a str>,
}

/// Ordered rule collection for one document.
///
/// Each stored rule gets the next source-order index. The counter belongs
/// to the store, so a fresh store must be created per document load.
#[derive(Debug, Clone, Default)]
pub struct StyleSheetStore {
    rules: Vec<StyleRule>,
    next_order: SourceOrder,
    layers: LayerTree,
    config: EngineConfig,
}

impl StyleSheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions::from(&self.config)
    }

    pub fn layers(&self) -> &LayerTree {
        &self.layers
    }

    /// Declare (or look up) the layer with dotted name `path`, for rules
    /// built without the parser.
    pub fn layer(&mut self, path: &str) -> LayerId {
        self.layers.named_path(UNLAYERED, path)
    }

    /// Store `rule`, stamping it with the next source-order index, which
    /// is also returned.
    ///
    /// # Panics
    ///
    /// Panics if the store has exhausted its source-order range, or if the
    /// rule's layer was not declared in this store.
    pub fn add_rule(&mut self, mut rule: StyleRule) -> SourceOrder {
        assert!(
            self.layers.contains(rule.layer),
            "layer {} is not declared in this store",
            rule.layer
        );
        let order = self.next_order;
        assert!(
            order < INLINE_SOURCE_ORDER,
            "style sheet store is full ({order} rules)"
        );
        self.next_order += 1;
        rule.source_order = order;
        self.rules.push(rule);
        order
    }

    /// Parse `css` and append every valid rule. Returns how many were added.
    pub fn add_stylesheet(&mut self, css: &str) -> usize {
        let rules = parser::parse_stylesheet(css, &self.config, &mut self.layers);
        let count = rules.len();
        let first = self.next_order;
        for rule in rules {
            self.add_rule(rule);
        }
        log::debug!("Added stylesheet: {count} rules from source order {first}");
        count
    }

    /// All stored rules, in insertion order.
    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules with a chain selecting `node_id`, lazily, in insertion order.
    pub fn rules_for<'a>(
        &'a self,
        doc: &'a Document,
        node_id: NodeId,
    ) -> impl Iterator<Item = MatchedRule<'a>> + 'a {
        self.matching(doc, node_id, None, None)
    }

    /// Rules with a chain selecting the `pseudo` box of `node_id`.
    pub fn rules_for_pseudo<'a>(
        &'a self,
        doc: &'a Document,
        node_id: NodeId,
        pseudo: PseudoElement,
    ) -> impl Iterator<Item = MatchedRule<'a>> + 'a {
        self.matching(doc, node_id, Some(pseudo), None)
    }

    /// Shared matching loop. `filter`, when given, must hold exactly the
    /// ancestors of `node_id`.
    pub(crate) fn matching<'a>(
        &'a self,
        doc: &'a Document,
        node_id: NodeId,
        pseudo: Option<PseudoElement>,
        filter: Option<&'a AncestorFilter>,
    ) -> impl Iterator<Item = MatchedRule<'a>> + 'a {
        let options = self.match_options();
        self.rules.iter().filter_map(move |rule| {
            let mut best: Option<(&SelectorChain, Specificity)> = None;
            for chain in &rule.selectors {
                if filter.is_some_and(|f| !f.may_match(chain)) {
                    continue;
                }
                let hit = match pseudo {
                    None => matching::matches_with(chain, doc, node_id, options),
                    Some(p) => matching::matches_pseudo(chain, doc, node_id, p, options),
                };
                if hit {
                    let spec = specificity(chain);
                    if best.is_none_or(|(_, prev)| spec > prev) {
                        best = Some((chain, spec));
                    }
                }
            }
            best.map(|(selector, specificity)| MatchedRule {
                rule,
                selector,
                specificity,
                layer_order: self.layers.order(rule.layer),
                layer: self.layers.path(rule.layer),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::CompoundSelector;
    use trellis_dom::{DocumentBuilder, ElementNode};

    fn rule(selectors: Vec<SelectorChain>, prop: &str, value: &str) -> StyleRule {
        StyleRule::new(selectors, vec![Declaration::new(prop, value)])
    }

    fn tag(t: &str) -> SelectorChain {
        SelectorChain::new(CompoundSelector::tag(t))
    }

    #[test]
    fn declaration_normalizes_property() {
        let d = Declaration::new("  Color ", " Red ");
        assert_eq!(d.property, "color");
        assert_eq!(d.value, "Red");
        assert!(!d.important);
        assert!(Declaration::important("COLOR", "red").important);
    }

    #[test]
    fn source_order_strictly_increases() {
        let mut store = StyleSheetStore::new();
        let a = store.add_rule(rule(vec![tag("p")], "color", "red"));
        let b = store.add_rule(rule(vec![tag("p")], "color", "blue"));
        let c = store.add_rule(rule(vec![tag("div")], "color", "green"));
        assert!(a < b && b < c);
        let orders: Vec<_> = store.rules().iter().map(|r| r.source_order).collect();
        assert_eq!(orders, vec![a, b, c]);
    }

    #[test]
    fn caller_supplied_order_is_overwritten() {
        let mut store = StyleSheetStore::new();
        let mut r = rule(vec![tag("p")], "color", "red");
        r.source_order = 77;
        assert_eq!(store.add_rule(r), 0);
        assert_eq!(store.rules()[0].source_order, 0);
    }

    #[test]
    fn rules_for_filters_and_keeps_insertion_order() {
        let mut b = DocumentBuilder::new();
        let p = b.leaf(ElementNode::new("p").with_class("x"));
        let doc = b.finish();

        let mut store = StyleSheetStore::new();
        store.add_rule(rule(vec![SelectorChain::new(CompoundSelector::class("x"))], "a", "1"));
        store.add_rule(rule(vec![tag("div")], "b", "2"));
        store.add_rule(rule(vec![tag("p")], "c", "3"));

        let props: Vec<_> = store
            .rules_for(&doc, p)
            .map(|m| m.rule.declarations[0].property.as_str())
            .collect();
        assert_eq!(props, vec!["a", "c"]);
    }

    #[test]
    fn selector_group_uses_best_matching_chain() {
        let mut b = DocumentBuilder::new();
        let p = b.leaf(ElementNode::new("p").with_id("lead"));
        let doc = b.finish();

        let mut store = StyleSheetStore::new();
        store.add_rule(rule(
            vec![
                tag("p"),
                SelectorChain::new(CompoundSelector::id("lead")),
                SelectorChain::new(CompoundSelector::class("missing")),
            ],
            "color",
            "red",
        ));

        let matched: Vec<_> = store.rules_for(&doc, p).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].specificity, Specificity::new(1, 0, 0));
        assert_eq!(matched[0].selector.to_string(), "#lead");
    }

    #[test]
    fn either_chain_of_a_group_applies() {
        let mut b = DocumentBuilder::new();
        let h1 = b.leaf(ElementNode::new("h1"));
        let h2 = b.leaf(ElementNode::new("h2"));
        let p = b.leaf(ElementNode::new("p"));
        let doc = b.finish();

        let mut store = StyleSheetStore::new();
        store.add_rule(rule(vec![tag("h1"), tag("h2")], "font-weight", "bold"));
        assert_eq!(store.rules_for(&doc, h1).count(), 1);
        assert_eq!(store.rules_for(&doc, h2).count(), 1);
        assert_eq!(store.rules_for(&doc, p).count(), 0);
    }

    #[test]
    fn pseudo_rules_are_separate() {
        let mut b = DocumentBuilder::new();
        let p = b.leaf(ElementNode::new("p"));
        let doc = b.finish();

        let mut store = StyleSheetStore::new();
        store.add_rule(rule(vec![tag("p")], "color", "red"));
        store.add_rule(rule(
            vec![tag("p").with_pseudo_element(PseudoElement::Before)],
            "content",
            "\"-\"",
        ));
        assert_eq!(store.rules_for(&doc, p).count(), 1);
        let before: Vec<_> = store.rules_for_pseudo(&doc, p, PseudoElement::Before).collect();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].rule.declarations[0].property, "content");
        assert_eq!(store.rules_for_pseudo(&doc, p, PseudoElement::After).count(), 0);
    }

    #[test]
    fn add_stylesheet_counts_valid_rules() {
        let mut store = StyleSheetStore::new();
        let added = store.add_stylesheet("p { color: red } ul >  { color: blue } li { x: y }");
        assert_eq!(added, 2);
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }

    #[test]
    fn matched_rules_carry_their_layer() {
        let mut b = DocumentBuilder::new();
        let p = b.leaf(ElementNode::new("p"));
        let doc = b.finish();

        let mut store = StyleSheetStore::new();
        store.add_stylesheet("@layer base { p { color: red } } p { color: blue }");
        let base = store.layer("base");
        store.add_rule(rule(vec![tag("p")], "margin", "0").in_layer(base));

        let layers: Vec<_> = store.rules_for(&doc, p).map(|m| m.layer).collect();
        assert_eq!(layers, vec![Some("base"), None, Some("base")]);
        let orders: Vec<_> = store.rules_for(&doc, p).map(|m| m.layer_order).collect();
        assert!(orders[0] < orders[1]);
        assert_eq!(orders[0], orders[2]);
    }

    #[test]
    #[should_panic(expected = "is not declared in this store")]
    fn foreign_layer_id_panics() {
        let mut store = StyleSheetStore::new();
        store.add_rule(rule(vec![tag("p")], "color", "red").in_layer(5));
    }

    #[test]
    fn quirks_config_reaches_matching() {
        let mut b = DocumentBuilder::new();
        let p = b.leaf(ElementNode::new("p").with_class("Note"));
        let doc = b.finish();

        let config = EngineConfig {
            quirks_mode: true,
            ..EngineConfig::default()
        };
        let mut store = StyleSheetStore::with_config(config);
        store.add_stylesheet(".note { color: red }");
        assert_eq!(store.rules_for(&doc, p).count(), 1);

        let mut strict = StyleSheetStore::new();
        strict.add_stylesheet(".note { color: red }");
        assert_eq!(strict.rules_for(&doc, p).count(), 0);
    }
}
