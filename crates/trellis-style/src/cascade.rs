//! CSS cascade.
//!
//! For one element, every declaration from matching rules and from the
//! `style` attribute competes per property. The winner is the greatest
//! under this order, compared field by field:
//!
//! 1. `!important` over normal,
//! 2. inline origin over author sheets,
//! 3. cascade layer: for normal declarations unlayered rules beat every
//!    layer and later layers beat earlier ones; for `!important` ones the
//!    layer order is reversed,
//! 4. higher specificity,
//! 5. later source order,
//! 6. later position inside the same declaration block.
//!
//! The last two are unique per declaration, so every property has exactly
//! one winner.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::Serialize;
use trellis_dom::{Document, NodeId};

use crate::filter::AncestorFilter;
use crate::parser::parse_declarations;
use crate::selector::{PseudoElement, SelectorChain};
use crate::specificity::Specificity;
use crate::stylesheet::{
    Declaration, INLINE_SOURCE_ORDER, MatchedRule, Origin, SourceOrder, StyleSheetStore,
};

// -----------------------------------------------------------------------
// Effective style
// -----------------------------------------------------------------------

/// Where a winning declaration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub origin: Origin,
    pub specificity: Specificity,
    pub source_order: SourceOrder,
    /// Position inside the rule's (or `style` attribute's) block.
    pub position: usize,
    /// Text of the matching selector chain; `None` for inline styles.
    pub selector: Option<String>,
    /// Dotted name of the rule's cascade layer; `None` when unlayered.
    pub layer: Option<String>,
}

/// A declaration that won the cascade, with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDeclaration {
    pub declaration: Declaration,
    pub provenance: Provenance,
}

/// The winning declaration for each property set on one element.
///
/// Properties no rule sets are absent; defaulting and inheritance belong
/// to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EffectiveStyle {
    properties: BTreeMap<String, AppliedDeclaration>,
}

impl EffectiveStyle {
    pub fn get(&self, property: &str) -> Option<&AppliedDeclaration> {
        self.properties.get(&property.to_ascii_lowercase())
    }

    /// Shorthand for the winning value of `property`.
    pub fn value(&self, property: &str) -> Option<&str> {
        self.get(property).map(|a| a.declaration.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Winners in property-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AppliedDeclaration)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Resolve the effective style of `node_id` from the rules in `store` and
/// the element's inline declarations.
///
/// # Panics
///
/// Panics if `node_id` is not an element.
pub fn resolve(
    doc: &Document,
    node_id: NodeId,
    store: &StyleSheetStore,
    inline: &[Declaration],
) -> EffectiveStyle {
    expect_element(doc, node_id);
    cascade(node_id, store.matching(doc, node_id, None, None), inline)
}

/// Resolve the style of the `pseudo` box generated for `node_id`. Only
/// rules whose chain ends in that pseudo-element take part; the `style`
/// attribute never applies to generated boxes.
pub fn resolve_pseudo(
    doc: &Document,
    node_id: NodeId,
    pseudo: PseudoElement,
    store: &StyleSheetStore,
) -> EffectiveStyle {
    expect_element(doc, node_id);
    cascade(node_id, store.matching(doc, node_id, Some(pseudo), None), &[])
}

fn expect_element(doc: &Document, node_id: NodeId) {
    assert!(
        doc.element(node_id).is_some(),
        "cascade requires an element, node {node_id} is not one"
    );
}

/// Style every element of `doc`, using each element's `style` attribute
/// as its inline declarations.
///
/// Returns a `Vec` indexed by `NodeId`. Attached elements get
/// `Some(style)`; text nodes, the document root and detached nodes get
/// `None`. Each entry equals what [`resolve`] returns for that element.
pub fn style_tree(doc: &Document, store: &StyleSheetStore) -> Vec<Option<EffectiveStyle>> {
    let mut styles: Vec<Option<EffectiveStyle>> = vec![None; doc.nodes.len()];
    let mut filter = store
        .config()
        .ancestor_filter
        .then(|| AncestorFilter::new(store.match_options()));

    // Explicit stack so document depth is bounded by memory, not the call
    // stack. `Exit` pops the element pushed into the filter on entry.
    let mut stack = vec![Visit::Enter(doc.root)];
    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(node_id) => {
                if let Some(elem) = doc.element(node_id) {
                    let inline = elem
                        .style
                        .as_deref()
                        .map(parse_declarations)
                        .unwrap_or_default();
                    let matched = store.matching(doc, node_id, None, filter.as_ref());
                    styles[node_id] = Some(cascade(node_id, matched, &inline));

                    if let Some(f) = filter.as_mut() {
                        f.push(elem);
                        stack.push(Visit::Exit);
                    }
                }
                let children = &doc.nodes[node_id].children;
                stack.extend(children.iter().rev().map(|&child| Visit::Enter(child)));
            },
            Visit::Exit => {
                if let Some(f) = filter.as_mut() {
                    f.pop();
                }
            },
        }
    }
    styles
}

/// Step of the depth-first walk in [`style_tree`].
enum Visit {
    Enter(NodeId),
    Exit,
}

// -----------------------------------------------------------------------
// Winner selection
// -----------------------------------------------------------------------

/// One competing declaration with its cascade metadata.
struct Candidate<'a> {
    declaration: &'a Declaration,
    origin: Origin,
    specificity: Specificity,
    source_order: SourceOrder,
    position: usize,
    selector: Option<&'a SelectorChain>,
    layer_order: u32,
    layer: Option<&'a str>,
}

impl Candidate<'_> {
    fn rank(&self) -> (bool, Origin, u32, Specificity, SourceOrder, usize) {
        let important = self.declaration.important;
        let layer = if important {
            u32::MAX - self.layer_order
        } else {
            self.layer_order
        };
        (
            important,
            self.origin,
            layer,
            self.specificity,
            self.source_order,
            self.position,
        )
    }

    fn into_applied(self) -> AppliedDeclaration {
        AppliedDeclaration {
            declaration: self.declaration.clone(),
            provenance: Provenance {
                origin: self.origin,
                specificity: self.specificity,
                source_order: self.source_order,
                position: self.position,
                selector: self.selector.map(|chain| chain.to_string()),
                layer: self.layer.map(str::to_string),
            },
        }
    }
}

fn cascade<'a, 'r: 'a, 'i: 'a>(
    node_id: NodeId,
    matched: impl Iterator<Item = MatchedRule<'r>>,
    inline: &'i [Declaration],
) -> EffectiveStyle {
    let mut winners: BTreeMap<&'a str, Candidate<'a>> = BTreeMap::new();

    let mut offer = |candidate: Candidate<'a>| {
        let declaration: &'a Declaration = candidate.declaration;
        match winners.entry(declaration.property.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            },
            Entry::Occupied(mut slot) => {
                if candidate.rank() > slot.get().rank() {
                    slot.insert(candidate);
                }
            },
        }
    };

    for m in matched {
        for (position, declaration) in m.rule.declarations.iter().enumerate() {
            offer(Candidate {
                declaration,
                origin: m.rule.origin,
                specificity: m.specificity,
                source_order: m.rule.source_order,
                position,
                selector: Some(m.selector),
                layer_order: m.layer_order,
                layer: m.layer,
            });
        }
    }

    // The `style` attribute acts as a rule that outranks every selector.
    // Origin is compared before layers, so its layer position is moot.
    for (position, declaration) in inline.iter().enumerate() {
        offer(Candidate {
            declaration,
            origin: Origin::Inline,
            specificity: Specificity::INLINE,
            source_order: INLINE_SOURCE_ORDER,
            position,
            selector: None,
            layer_order: 0,
            layer: None,
        });
    }

    let properties = winners
        .into_iter()
        .map(|(property, winner)| {
            log::trace!(
                "node {node_id}: {property} <- {:?} {} #{}",
                winner.origin,
                winner.specificity,
                winner.source_order
            );
            (property.to_string(), winner.into_applied())
        })
        .collect();

    EffectiveStyle { properties }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{CompoundSelector, SelectorChain};
    use crate::stylesheet::StyleRule;
    use trellis_dom::{DocumentBuilder, ElementNode};
    use trellis_types::EngineConfig;

    fn store_from(css: &str) -> StyleSheetStore {
        let mut store = StyleSheetStore::new();
        store.add_stylesheet(css);
        store
    }

    fn single(element: ElementNode) -> (Document, NodeId) {
        let mut b = DocumentBuilder::new();
        let id = b.leaf(element);
        (b.finish(), id)
    }

    #[test]
    fn later_rule_wins_on_equal_specificity() {
        let (doc, el) = single(ElementNode::new("p").with_class("test"));
        let store = store_from(".test { color: blue } .test { color: purple }");
        let style = resolve(&doc, el, &store, &[]);
        assert_eq!(style.value("color"), Some("purple"));
        assert_eq!(style.get("color").unwrap().provenance.source_order, 1);
    }

    #[test]
    fn specificity_beats_source_order() {
        let (doc, el) = single(ElementNode::new("div").with_id("main").with_class("cls"));
        let store = store_from("#main { color: blue } .cls { color: red } div { color: green }");
        let style = resolve(&doc, el, &store, &[]);
        assert_eq!(style.value("color"), Some("blue"));
    }

    #[test]
    fn inline_beats_any_selector() {
        let (doc, el) = single(ElementNode::new("p").with_class("one").with_id("x"));
        let store = store_from("#x.one { color: red }");
        let inline = parse_declarations("color: blue");
        let style = resolve(&doc, el, &store, &inline);
        assert_eq!(style.value("color"), Some("blue"));
        let prov = &style.get("color").unwrap().provenance;
        assert_eq!(prov.origin, Origin::Inline);
        assert_eq!(prov.selector, None);
    }

    #[test]
    fn important_author_beats_inline() {
        let (doc, el) = single(ElementNode::new("p").with_class("one"));
        let store = store_from(".one { color: red !important }");
        let inline = parse_declarations("color: blue");
        let style = resolve(&doc, el, &store, &inline);
        assert_eq!(style.value("color"), Some("red"));
    }

    #[test]
    fn important_inline_beats_important_author() {
        let (doc, el) = single(ElementNode::new("p").with_id("x"));
        let store = store_from("#x { color: red !important }");
        let inline = parse_declarations("color: blue !important");
        let style = resolve(&doc, el, &store, &inline);
        assert_eq!(style.value("color"), Some("blue"));
    }

    #[test]
    fn important_beats_higher_specificity() {
        let (doc, el) = single(ElementNode::new("div").with_id("main"));
        let store = store_from("#main { color: blue } div { color: green !important }");
        let style = resolve(&doc, el, &store, &[]);
        assert_eq!(style.value("color"), Some("green"));
    }

    #[test]
    fn later_declaration_in_same_block_wins() {
        let (doc, el) = single(ElementNode::new("p"));
        let store = store_from("p { color: red; color: blue }");
        let inline = parse_declarations("margin: 0; margin: 4px");
        let style = resolve(&doc, el, &store, &inline);
        assert_eq!(style.value("color"), Some("blue"));
        assert_eq!(style.value("margin"), Some("4px"));
        assert_eq!(style.get("color").unwrap().provenance.position, 1);
    }

    #[test]
    fn unrelated_properties_merge() {
        let mut b = DocumentBuilder::new();
        b.open(ElementNode::new("ul"));
        let li = b.leaf(ElementNode::new("li"));
        let doc = b.finish();
        let store = store_from("LI { color: purple } UL LI { text-decoration: underline }");
        let style = resolve(&doc, li, &store, &[]);
        assert_eq!(style.len(), 2);
        assert_eq!(style.value("color"), Some("purple"));
        assert_eq!(style.value("text-decoration"), Some("underline"));
    }

    #[test]
    fn no_matching_rules_gives_empty_style() {
        let (doc, el) = single(ElementNode::new("span"));
        let store = store_from("p { color: red }");
        let style = resolve(&doc, el, &store, &[]);
        assert!(style.is_empty());
        assert_eq!(style.value("color"), None);
    }

    #[test]
    fn property_lookup_is_case_insensitive() {
        let (doc, el) = single(ElementNode::new("p"));
        let store = store_from("p { COLOR: red }");
        let style = resolve(&doc, el, &store, &[]);
        assert_eq!(style.value("Color"), Some("red"));
    }

    #[test]
    fn provenance_records_matching_chain() {
        let mut b = DocumentBuilder::new();
        b.open(ElementNode::new("ul"));
        let li = b.leaf(ElementNode::new("li").with_id("gre"));
        let doc = b.finish();
        let store = store_from("LI, UL LI#gre { color: green }");
        let prov = resolve(&doc, li, &store, &[])
            .get("color")
            .unwrap()
            .provenance
            .clone();
        assert_eq!(prov.selector.as_deref(), Some("UL LI#gre"));
        assert_eq!(prov.specificity, Specificity::new(1, 0, 2));
        assert_eq!(prov.origin, Origin::AuthorSheet);
    }

    #[test]
    fn pseudo_element_resolution_is_separate() {
        let (doc, el) = single(ElementNode::new("p").with_class("note"));
        let store = store_from(
            "p { color: black } p::before { content: \"*\"; color: gray } \
             .note:before { color: red } p::after { content: \"!\" }",
        );
        let element = resolve(&doc, el, &store, &parse_declarations("color: blue"));
        assert_eq!(element.value("color"), Some("blue"));
        assert_eq!(element.value("content"), None);

        let before = resolve_pseudo(&doc, el, PseudoElement::Before, &store);
        // `.note:before` (0,1,1) outranks `p::before` (0,0,2).
        assert_eq!(before.value("color"), Some("red"));
        assert_eq!(before.value("content"), Some("\"*\""));

        let letter = resolve_pseudo(&doc, el, PseudoElement::FirstLetter, &store);
        assert!(letter.is_empty());
    }

    #[test]
    fn inline_origin_rule_in_store_outranks_author() {
        let (doc, el) = single(ElementNode::new("p"));
        let mut store = StyleSheetStore::new();
        let mut rule = StyleRule::new(
            vec![SelectorChain::new(CompoundSelector::tag("p"))],
            vec![Declaration::new("color", "teal")],
        );
        rule.origin = Origin::Inline;
        store.add_rule(rule);
        store.add_stylesheet("p#never, p { color: red }");
        let style = resolve(&doc, el, &store, &[]);
        assert_eq!(style.value("color"), Some("teal"));
    }

    #[test]
    fn style_tree_uses_style_attribute_and_skips_text() {
        let mut b = DocumentBuilder::new();
        let div = b.open(ElementNode::new("div").with_style("color: blue"));
        let text = b.text("hi");
        let p = b.leaf(ElementNode::new("p"));
        let doc = b.finish();
        let store = store_from("div { color: red } div p { color: green }");

        let styles = style_tree(&doc, &store);
        assert_eq!(styles.len(), doc.nodes.len());
        assert!(styles[doc.root].is_none());
        assert!(styles[text].is_none());
        assert_eq!(styles[div].as_ref().unwrap().value("color"), Some("blue"));
        assert_eq!(styles[p].as_ref().unwrap().value("color"), Some("green"));
    }

    #[test]
    fn style_tree_matches_resolve_with_and_without_filter() {
        let mut b = DocumentBuilder::new();
        b.open(ElementNode::new("body").with_class("dark"));
        b.open(ElementNode::new("ul").with_id("menu"));
        let li1 = b.leaf(ElementNode::new("li").with_style("margin: 2px"));
        b.open(ElementNode::new("li").with_class("open"));
        b.open(ElementNode::new("ul"));
        b.leaf(ElementNode::new("li"));
        let doc = b.finish();
        let css = ".dark li { color: white } #menu > li { padding: 1px } \
                   ul li li { color: gray } .open ul > li:first-child { font-weight: bold } \
                   .light li { color: black }";

        for ancestor_filter in [true, false] {
            let mut store = StyleSheetStore::with_config(EngineConfig {
                ancestor_filter,
                ..EngineConfig::default()
            });
            store.add_stylesheet(css);
            let styles = style_tree(&doc, &store);
            for id in doc.elements() {
                let inline = doc
                    .element(id)
                    .and_then(|e| e.style.as_deref())
                    .map(parse_declarations)
                    .unwrap_or_default();
                assert_eq!(
                    styles[id].as_ref(),
                    Some(&resolve(&doc, id, &store, &inline)),
                    "node {id} with ancestor_filter={ancestor_filter}"
                );
            }
            assert_eq!(styles[li1].as_ref().unwrap().value("margin"), Some("2px"));
        }
    }

    #[test]
    fn layers_order_normal_and_important_declarations() {
        let (doc, el) = single(ElementNode::new("p").with_class("a"));
        let store = store_from(
            "@layer base, theme; \
             @layer theme { p { color: red; margin: 1px !important } } \
             @layer base { .a { color: green; margin: 2px !important } } \
             p { margin: 3px !important }",
        );
        let style = resolve(&doc, el, &store, &[]);
        // Later layer beats a higher specificity in an earlier one.
        assert_eq!(style.value("color"), Some("red"));
        // Important layered declarations beat important unlayered ones,
        // earliest layer first.
        assert_eq!(style.value("margin"), Some("2px"));
        assert_eq!(
            style.get("margin").unwrap().provenance.layer.as_deref(),
            Some("base")
        );
        assert_eq!(style.get("color").unwrap().provenance.layer.as_deref(), Some("theme"));
    }

    #[test]
    fn unlayered_normal_beats_layered_specificity() {
        let (doc, el) = single(ElementNode::new("p").with_id("x"));
        let store = store_from("@layer a { #x { color: red } } p { color: green }");
        let style = resolve(&doc, el, &store, &[]);
        assert_eq!(style.value("color"), Some("green"));
        assert_eq!(style.get("color").unwrap().provenance.layer, None);
    }

    #[test]
    fn inline_beats_layered_important_only_when_important() {
        let (doc, el) = single(ElementNode::new("p"));
        let store = store_from("@layer a { p { color: red !important } }");
        let normal = resolve(&doc, el, &store, &parse_declarations("color: blue"));
        assert_eq!(normal.value("color"), Some("red"));
        let important = resolve(&doc, el, &store, &parse_declarations("color: blue !important"));
        assert_eq!(important.value("color"), Some("blue"));
    }

    #[test]
    fn style_tree_handles_very_deep_documents() {
        const DEPTH: usize = 100_000;
        let mut b = DocumentBuilder::new();
        for _ in 0..DEPTH {
            b.open(ElementNode::new("div"));
        }
        let deepest = b.leaf(ElementNode::new("p"));
        let doc = b.finish();

        for ancestor_filter in [true, false] {
            let mut store = StyleSheetStore::with_config(EngineConfig {
                ancestor_filter,
                ..EngineConfig::default()
            });
            store.add_stylesheet("div { color: red } p { color: green } .x p { color: blue }");
            let styles = style_tree(&doc, &store);
            assert_eq!(styles[deepest].as_ref().unwrap().value("color"), Some("green"));
            let styled = styles.iter().filter(|s| s.is_some()).count();
            assert_eq!(styled, DEPTH + 1);
        }
    }

    #[test]
    fn effective_style_serializes_as_map() {
        let (doc, el) = single(ElementNode::new("p"));
        let store = store_from("p { color: red }");
        let json = serde_json::to_value(resolve(&doc, el, &store, &[])).unwrap();
        assert_eq!(json["color"]["declaration"]["value"], "red");
        assert_eq!(json["color"]["provenance"]["origin"], "AuthorSheet");
    }

    #[test]
    #[should_panic(expected = "cascade requires an element")]
    fn resolving_a_text_node_panics() {
        let mut b = DocumentBuilder::new();
        let t = b.text("loose");
        let doc = b.finish();
        resolve(&doc, t, &StyleSheetStore::new(), &[]);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        /// Selectors that all match the `<p>` built by `doc()`, each with
        /// specificity above (0,0,0).
        fn arb_selector() -> impl Strategy<Value = &'static str> {
            prop_oneof![
                Just("p"),
                Just(".a"),
                Just("#x"),
                Just("div p"),
                Just("p.a"),
                Just("div > p.a"),
            ]
        }

        fn arb_rule(important: impl Strategy<Value = bool>) -> impl Strategy<Value = String> {
            (arb_selector(), "[a-z]{1,5}", important).prop_map(|(sel, value, important)| {
                let bang = if important { " !important" } else { "" };
                format!("{sel} {{ color: {value}{bang} }}\n")
            })
        }

        fn doc() -> (Document, NodeId) {
            let mut b = DocumentBuilder::new();
            b.open(ElementNode::new("div"));
            let p = b.leaf(ElementNode::new("p").with_class("a").with_id("x"));
            (b.finish(), p)
        }

        proptest! {
            #[test]
            fn resolve_is_deterministic(
                rules in proptest::collection::vec(arb_rule(any::<bool>()), 0..12),
            ) {
                let (doc, p) = doc();
                let store = store_from(&rules.concat());
                let inline = parse_declarations("color: inline");
                prop_assert_eq!(
                    resolve(&doc, p, &store, &inline),
                    resolve(&doc, p, &store, &inline)
                );
            }

            #[test]
            fn appended_rule_wins_only_with_higher_specificity(
                rules in proptest::collection::vec(arb_rule(Just(false)), 1..12),
            ) {
                let (doc, p) = doc();
                let css = rules.concat();
                let prior = resolve(&doc, p, &store_from(&css), &[])
                    .get("color")
                    .unwrap()
                    .provenance
                    .clone();

                // (2,0,0) is above every selector in the pool.
                let mut stronger = store_from(&css);
                stronger.add_stylesheet("#x#x { color: winner }");
                let strong = resolve(&doc, p, &stronger, &[]);
                prop_assert_eq!(strong.value("color"), Some("winner"));

                // (0,0,0) is below every selector in the pool.
                let mut weaker = store_from(&css);
                weaker.add_stylesheet("* { color: loser }");
                let after = resolve(&doc, p, &weaker, &[]);
                prop_assert_eq!(&after.get("color").unwrap().provenance, &prior);
            }

            #[test]
            fn equal_rules_later_wins(first in "[a-z]{1,5}", second in "[a-z]{1,5}") {
                let (doc, p) = doc();
                let store = store_from(&format!(".a {{ color: {first} }} .a {{ color: {second} }}"));
                let resolved = resolve(&doc, p, &store, &[]);
                prop_assert_eq!(resolved.value("color"), Some(second.as_str()));
            }
        }
    }
}
