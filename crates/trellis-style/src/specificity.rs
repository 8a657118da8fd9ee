//! Selector specificity.

use std::fmt;

use serde::Serialize;

use crate::selector::{SelectorChain, SelectorComponent};

/// CSS specificity as an `(ids, classes, types)` triple.
///
/// The derived ordering is lexicographic over the fields in declaration
/// order, so one ID outranks any number of classes: `(1,0,0) > (0,99,99)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub types: u32,
}

impl Specificity {
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Assigned to the `style` attribute pseudo-rule. Greater than any
    /// specificity a selector can reach.
    pub const INLINE: Self = Self::new(u32::MAX, u32::MAX, u32::MAX);

    pub const fn new(ids: u32, classes: u32, types: u32) -> Self {
        Self { ids, classes, types }
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INLINE {
            return f.write_str("inline");
        }
        write!(f, "({},{},{})", self.ids, self.classes, self.types)
    }
}

/// Compute the specificity of a selector chain.
///
/// IDs count toward `ids`; classes and pseudo-classes toward `classes`;
/// type selectors and a trailing pseudo-element toward `types`. The
/// universal selector counts for nothing.
pub fn specificity(chain: &SelectorChain) -> Specificity {
    let mut spec = Specificity::ZERO;
    for component in chain.compounds.iter().flat_map(|c| &c.components) {
        match component {
            SelectorComponent::Id(_) => spec.ids += 1,
            SelectorComponent::Class(_) | SelectorComponent::PseudoClass(_) => spec.classes += 1,
            SelectorComponent::Type(_) => spec.types += 1,
            SelectorComponent::Universal => {},
        }
    }
    if chain.pseudo_element.is_some() {
        spec.types += 1;
    }
    spec
}
