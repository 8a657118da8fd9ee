//! Parsed selector values.
//!
//! A [`SelectorChain`] stores its compounds left-to-right as written: the
//! last compound is the *subject*, the element the chain selects. The
//! combinator at `combinators[i]` joins `compounds[i]` to `compounds[i + 1]`.

use std::fmt;

use serde::Serialize;

/// Relationship between two adjacent compounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Combinator {
    /// Whitespace: any ancestor.
    Descendant,
    /// `>`: the parent element.
    Child,
}

/// Structural pseudo-classes evaluated against the static tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
}

impl PseudoClass {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "first-child" => Some(Self::FirstChild),
            "last-child" => Some(Self::LastChild),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FirstChild => "first-child",
            Self::LastChild => "last-child",
        }
    }
}

/// Generated boxes a chain may target instead of the element itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PseudoElement {
    Before,
    After,
    FirstLetter,
}

impl PseudoElement {
    /// Parse a pseudo-element name, with or without leading colons.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim_start_matches(':').to_ascii_lowercase().as_str() {
            "before" => Some(Self::Before),
            "after" => Some(Self::After),
            "first-letter" => Some(Self::FirstLetter),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::FirstLetter => "first-letter",
        }
    }
}

/// One simple selector inside a compound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum SelectorComponent {
    Universal,
    Type(String),
    Class(String),
    Id(String),
    PseudoClass(PseudoClass),
}

/// Simple selectors that all apply to one element, e.g. `li.red#gre`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CompoundSelector {
    pub components: Vec<SelectorComponent>,
}

impl CompoundSelector {
    pub fn universal() -> Self {
        Self {
            components: vec![SelectorComponent::Universal],
        }
    }

    pub fn tag(tag: &str) -> Self {
        Self {
            components: vec![SelectorComponent::Type(tag.to_string())],
        }
    }

    pub fn class(class: &str) -> Self {
        Self::default().with_class(class)
    }

    pub fn id(id: &str) -> Self {
        Self::default().with_id(id)
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.components
            .push(SelectorComponent::Class(class.to_string()));
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.components.push(SelectorComponent::Id(id.to_string()));
        self
    }

    pub fn with_pseudo_class(mut self, pseudo: PseudoClass) -> Self {
        self.components.push(SelectorComponent::PseudoClass(pseudo));
        self
    }
}

/// A complex selector: compounds joined by combinators, plus an optional
/// trailing pseudo-element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SelectorChain {
    pub compounds: Vec<CompoundSelector>,
    pub combinators: Vec<Combinator>,
    pub pseudo_element: Option<PseudoElement>,
}

impl SelectorChain {
    /// A chain of a single compound.
    pub fn new(subject: CompoundSelector) -> Self {
        Self {
            compounds: vec![subject],
            combinators: Vec::new(),
            pseudo_element: None,
        }
    }

    /// Join `compounds` with descendant combinators, e.g. `UL LI LI`.
    ///
    /// # Panics
    ///
    /// Panics if `compounds` is empty.
    pub fn descendants(compounds: Vec<CompoundSelector>) -> Self {
        assert!(!compounds.is_empty(), "selector chain needs a subject");
        let combinators = vec![Combinator::Descendant; compounds.len() - 1];
        Self {
            compounds,
            combinators,
            pseudo_element: None,
        }
    }

    /// Append `compound` as the new subject, joined by `combinator`.
    pub fn then(mut self, combinator: Combinator, compound: CompoundSelector) -> Self {
        self.combinators.push(combinator);
        self.compounds.push(compound);
        self
    }

    pub fn with_pseudo_element(mut self, pseudo: PseudoElement) -> Self {
        self.pseudo_element = Some(pseudo);
        self
    }

    /// The rightmost compound.
    pub fn subject(&self) -> &CompoundSelector {
        // Constructors and the parser never build an empty chain.
        &self.compounds[self.compounds.len() - 1]
    }

    /// Whether every combinator is a descendant combinator.
    pub fn is_descendant_only(&self) -> bool {
        self.combinators.iter().all(|c| *c == Combinator::Descendant)
    }
}

impl fmt::Display for SelectorComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Universal => f.write_str("*"),
            Self::Type(tag) => f.write_str(tag),
            Self::Class(class) => write!(f, ".{class}"),
            Self::Id(id) => write!(f, "#{id}"),
            Self::PseudoClass(p) => write!(f, ":{}", p.name()),
        }
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("*");
        }
        for component in &self.components {
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.compounds.iter().enumerate() {
            if i > 0 {
                match self.combinators[i - 1] {
                    Combinator::Descendant => f.write_str(" ")?,
                    Combinator::Child => f.write_str(" > ")?,
                }
            }
            write!(f, "{compound}")?;
        }
        if let Some(pseudo) = self.pseudo_element {
            write!(f, "::{}", pseudo.name())?;
        }
        Ok(())
    }
}
