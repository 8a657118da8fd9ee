//! Cascade layers (`@layer`).
//!
//! Layers form a tree rooted at the implicit unlayered scope. Sibling
//! layers are ordered by their first declaration, and the rules placed
//! directly in a layer come after all of its sublayers. The cascade order
//! of layers is therefore a post-order walk of the tree, which puts
//! unlayered rules last.

pub type LayerId = usize;

/// The implicit outermost scope holding rules outside any `@layer`.
pub const UNLAYERED: LayerId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Layer {
    /// `None` for anonymous layers and the root.
    name: Option<String>,
    /// Dotted display path such as `A.B`. Empty for the root.
    path: String,
    children: Vec<LayerId>,
}

/// Every layer declared in a store, with its cascade position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTree {
    layers: Vec<Layer>,
    /// Post-order position of each layer. Higher wins between normal
    /// declarations.
    order: Vec<u32>,
}

impl Default for LayerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerTree {
    pub fn new() -> Self {
        Self {
            layers: vec![Layer {
                name: None,
                path: String::new(),
                children: Vec::new(),
            }],
            order: vec![0],
        }
    }

    pub fn contains(&self, id: LayerId) -> bool {
        id < self.layers.len()
    }

    /// The sublayer of `parent` called `name`, declared on first use.
    pub fn named(&mut self, parent: LayerId, name: &str) -> LayerId {
        let existing = self.layers[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.layers[c].name.as_deref() == Some(name));
        match existing {
            Some(id) => id,
            None => self.insert(parent, Some(name)),
        }
    }

    /// Resolve a dotted name such as `A.B` below `parent`, declaring any
    /// missing layers on the way.
    pub fn named_path(&mut self, parent: LayerId, dotted: &str) -> LayerId {
        dotted
            .split('.')
            .fold(parent, |layer, name| self.named(layer, name.trim()))
    }

    /// A new anonymous sublayer of `parent`. Anonymous layers are never
    /// reopened.
    pub fn anonymous(&mut self, parent: LayerId) -> LayerId {
        self.insert(parent, None)
    }

    fn insert(&mut self, parent: LayerId, name: Option<&str>) -> LayerId {
        let id = self.layers.len();
        let segment = name.unwrap_or("<anonymous>");
        let path = if parent == UNLAYERED {
            segment.to_string()
        } else {
            format!("{}.{segment}", self.layers[parent].path)
        };
        log::trace!("Declared layer {path} as {id}");
        self.layers.push(Layer {
            name: name.map(str::to_string),
            path,
            children: Vec::new(),
        });
        self.layers[parent].children.push(id);
        self.reorder();
        id
    }

    fn reorder(&mut self) {
        self.order.resize(self.layers.len(), 0);
        let mut position = 0;
        let mut stack: Vec<(LayerId, usize)> = vec![(UNLAYERED, 0)];
        while let Some(top) = stack.last_mut() {
            let (id, next_child) = *top;
            match self.layers[id].children.get(next_child) {
                Some(&child) => {
                    top.1 += 1;
                    stack.push((child, 0));
                },
                None => {
                    self.order[id] = position;
                    position += 1;
                    stack.pop();
                },
            }
        }
    }

    /// Cascade position of `id`. Unlayered rules have the highest.
    pub fn order(&self, id: LayerId) -> u32 {
        self.order[id]
    }

    /// Dotted path of `id`, or `None` for the unlayered scope.
    pub fn path(&self, id: LayerId) -> Option<&str> {
        (id != UNLAYERED).then(|| self.layers[id].path.as_str())
    }
}
