//! Ancestor Bloom filter for fast selector rejection.
//!
//! While walking a subtree, the identifiers (tag, ID, classes) of every
//! element on the current ancestor path are kept in a counting Bloom
//! filter. A chain whose non-subject compounds need an identifier the
//! filter has definitely not seen cannot match, and full matching is
//! skipped. The filter can report false positives, never false negatives.

use std::hash::{DefaultHasher, Hash, Hasher};

use trellis_dom::ElementNode;

use crate::matching::MatchOptions;
use crate::selector::{SelectorChain, SelectorComponent};

const KEY_BITS: u32 = 12;
const KEY_MASK: u32 = (1 << KEY_BITS) - 1;
const ARRAY_SIZE: usize = 1 << KEY_BITS;

#[derive(Hash)]
enum Salt {
    Tag,
    Id,
    Class,
}

/// Counting Bloom filter over the identifiers of an ancestor path.
pub struct AncestorFilter {
    counters: Box<[u8; ARRAY_SIZE]>,
    /// Hashes pushed for each open ancestor, innermost last.
    pushed: Vec<Vec<u32>>,
    options: MatchOptions,
}

impl AncestorFilter {
    pub fn new(options: MatchOptions) -> Self {
        Self {
            counters: Box::new([0; ARRAY_SIZE]),
            pushed: Vec::new(),
            options,
        }
    }

    /// Number of ancestors currently on the path.
    pub fn depth(&self) -> usize {
        self.pushed.len()
    }

    /// Enter `element`: its identifiers become visible to descendants.
    pub fn push(&mut self, element: &ElementNode) {
        let mut hashes = Vec::with_capacity(2 + element.classes.len());
        hashes.push(identifier_hash(Salt::Tag, &element.tag, true));
        if let Some(id) = &element.id {
            hashes.push(identifier_hash(Salt::Id, id, self.options.quirks_mode));
        }
        for class in &element.classes {
            hashes.push(identifier_hash(Salt::Class, class, self.options.quirks_mode));
        }
        for &hash in &hashes {
            for slot in slots(hash) {
                let counter = &mut self.counters[slot];
                // A saturated counter stays saturated so it never drops to
                // zero while an element still holds it.
                if *counter != u8::MAX {
                    *counter += 1;
                }
            }
        }
        self.pushed.push(hashes);
    }

    /// Leave the innermost element pushed.
    pub fn pop(&mut self) {
        let Some(hashes) = self.pushed.pop() else {
            return;
        };
        for hash in hashes {
            for slot in slots(hash) {
                let counter = &mut self.counters[slot];
                if *counter != u8::MAX {
                    *counter -= 1;
                }
            }
        }
    }

    fn may_contain(&self, hash: u32) -> bool {
        slots(hash).into_iter().all(|slot| self.counters[slot] != 0)
    }

    /// `false` only when `chain` is certain not to match any element whose
    /// ancestors are exactly those pushed.
    pub fn may_match(&self, chain: &SelectorChain) -> bool {
        let ancestors = &chain.compounds[..chain.compounds.len().saturating_sub(1)];
        ancestors
            .iter()
            .flat_map(|c| &c.components)
            .all(|component| match component {
                SelectorComponent::Type(tag) => self.may_contain(identifier_hash(Salt::Tag, tag, true)),
                SelectorComponent::Id(id) => {
                    self.may_contain(identifier_hash(Salt::Id, id, self.options.quirks_mode))
                },
                SelectorComponent::Class(class) => {
                    self.may_contain(identifier_hash(Salt::Class, class, self.options.quirks_mode))
                },
                SelectorComponent::Universal | SelectorComponent::PseudoClass(_) => true,
            })
    }
}

fn identifier_hash(salt: Salt, name: &str, fold_case: bool) -> u32 {
    let mut hasher = DefaultHasher::new();
    salt.hash(&mut hasher);
    if fold_case {
        name.to_ascii_lowercase().hash(&mut hasher);
    } else {
        name.hash(&mut hasher);
    }
    hasher.finish() as u32
}

fn slots(hash: u32) -> [usize; 2] {
    [
        (hash & KEY_MASK) as usize,
        ((hash >> KEY_BITS) & KEY_MASK) as usize,
    ]
}
