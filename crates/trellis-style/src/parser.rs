//! CSS1-level parser producing the values the cascade consumes.
//!
//! Grammar covered: type, class, ID and universal selectors, descendant
//! and child combinators, `:first-child`/`:last-child`, the pseudo-elements
//! `::before`/`::after`/`::first-letter`, comma-separated groups, and
//! declaration blocks with `!important`, and `@layer` blocks and
//! statements. Other at-rules are skipped.

use std::iter::Peekable;
use std::str::CharIndices;

use trellis_types::{EngineConfig, Result, TrellisError};

use crate::layer::{LayerId, LayerTree, UNLAYERED};
use crate::selector::{
    Combinator, CompoundSelector, PseudoClass, PseudoElement, SelectorChain, SelectorComponent,
};
use crate::stylesheet::{Declaration, StyleRule};

// -----------------------------------------------------------------------
// Stylesheets
// -----------------------------------------------------------------------

/// Parse a stylesheet into rules, in source order.
///
/// A rule whose selector list is invalid is dropped as a whole and the
/// rest of the sheet is still parsed. Rules inside `@layer` blocks are
/// assigned to layers declared in `layers`, which keeps the declaration
/// order across every sheet parsed into it.
pub fn parse_stylesheet(
    css: &str,
    config: &EngineConfig,
    layers: &mut LayerTree,
) -> Vec<StyleRule> {
    let css = strip_comments(css);
    let mut rules = Vec::new();
    // Open `@layer` blocks, innermost last. The root is never popped.
    let mut scopes = vec![UNLAYERED];
    let mut rest = css.as_str();

    loop {
        rest = rest.trim_start();
        // CDO/CDC tokens are allowed at the top level and ignored.
        if let Some(r) = rest.strip_prefix("<!--").or_else(|| rest.strip_prefix("-->")) {
            rest = r;
            continue;
        }
        if rest.is_empty() {
            break;
        }
        let scope = scopes.last().copied().unwrap_or(UNLAYERED);

        if let Some(r) = rest.strip_prefix('}') {
            if scopes.len() > 1 {
                scopes.pop();
            } else {
                log::warn!("Ignoring unmatched `}}`");
            }
            rest = r;
            continue;
        }

        if let Some(at_rule) = rest.strip_prefix('@') {
            let (prelude, terminator, after) = split_at_rule(at_rule);
            let (name, prelude) = split_ident(prelude);
            let is_layer = name.eq_ignore_ascii_case("layer");
            rest = match terminator {
                Some('{') if is_layer => match block_layer(prelude, scope, layers) {
                    Some(layer) => {
                        scopes.push(layer);
                        after
                    },
                    None => split_block(after).1,
                },
                Some('{') => {
                    log::debug!("Skipping @{name} block");
                    split_block(after).1
                },
                _ if is_layer => {
                    declare_layers(prelude, scope, layers);
                    after
                },
                _ => {
                    log::debug!("Skipping @{name} statement");
                    after
                },
            };
            continue;
        }

        let Some((open, brace)) = find_outside_strings(rest, |c| c == '{' || c == '}') else {
            log::warn!("Dropping trailing text without a block: {:?}", rest.trim());
            break;
        };
        let prelude = rest[..open].trim();
        if brace == '}' {
            log::warn!("Dropping text without a block: {prelude:?}");
            rest = &rest[open..];
            continue;
        }
        let (body, after) = split_block(&rest[open + 1..]);
        rest = after;

        match parse_selector_list(prelude, config) {
            Ok(selectors) => {
                rules.push(StyleRule::new(selectors, parse_declarations(body)).in_layer(scope));
            },
            Err(e) => log::warn!("Dropping rule: {e}"),
        }
    }

    rules
}

/// String-literal state of a character scan.
#[derive(Debug, Default)]
struct Quotes {
    open: Option<char>,
    escaped: bool,
}

impl Quotes {
    /// Feed the next character. Returns `true` when `c` lies outside every
    /// string literal and does not open one.
    ///
    /// An unescaped newline ends an unterminated string.
    fn outside(&mut self, c: char) -> bool {
        let Some(quote) = self.open else {
            if c == '"' || c == '\'' {
                self.open = Some(c);
                return false;
            }
            return true;
        };
        if self.escaped {
            self.escaped = false;
        } else if c == '\\' {
            self.escaped = true;
        } else if c == quote || c == '\n' {
            self.open = None;
        }
        false
    }
}

/// Byte offset and value of the first character outside strings that
/// satisfies `want`.
fn find_outside_strings(text: &str, want: impl Fn(char) -> bool) -> Option<(usize, char)> {
    let mut quotes = Quotes::default();
    text.char_indices().find(|&(_, c)| quotes.outside(c) && want(c))
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut quotes = Quotes::default();
    let mut pos = 0;
    while let Some(c) = css[pos..].chars().next() {
        if quotes.outside(c) && css[pos..].starts_with("/*") {
            let Some(end) = css[pos + 2..].find("*/") else {
                break;
            };
            // A comment separates tokens.
            out.push(' ');
            pos += 2 + end + 2;
            continue;
        }
        out.push(c);
        pos += c.len_utf8();
    }
    out
}

/// Split `text` (just after an opening brace) at its matching closing
/// brace. Braces inside strings do not count. An unclosed block runs to
/// the end of input.
fn split_block(text: &str) -> (&str, &str) {
    let mut depth = 1usize;
    let mut quotes = Quotes::default();
    for (i, c) in text.char_indices() {
        if !quotes.outside(c) {
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return (&text[..i], &text[i + 1..]);
                }
            },
            _ => {},
        }
    }
    (text, "")
}

/// Split an at-rule (after its `@`) at the first `;`, `{` or `}` outside
/// strings, returning the prelude, the terminator and what follows it. A
/// `}` closes the enclosing block, so it stays in the remainder.
fn split_at_rule(text: &str) -> (&str, Option<char>, &str) {
    match find_outside_strings(text, |c| matches!(c, ';' | '{' | '}')) {
        Some((i, '}')) => (&text[..i], Some('}'), &text[i..]),
        Some((i, c)) => (&text[..i], Some(c), &text[i + 1..]),
        None => (text, None, ""),
    }
}

fn split_ident(text: &str) -> (&str, &str) {
    let end = text.find(|c: char| !is_ident_char(c)).unwrap_or(text.len());
    text.split_at(end)
}

/// A dotted layer name such as `base.reset`, trimmed, or `None` if any
/// segment is not an identifier.
fn layer_name(text: &str) -> Option<&str> {
    let name = text.trim();
    let valid = name.split('.').all(|segment| {
        segment.chars().next().is_some_and(is_ident_start) && segment.chars().all(is_ident_char)
    });
    valid.then_some(name)
}

/// `@layer a, b.c;` declares every listed layer, in order. One bad name
/// invalidates the whole statement.
fn declare_layers(prelude: &str, scope: LayerId, layers: &mut LayerTree) {
    let names: Option<Vec<&str>> = prelude.split(',').map(layer_name).collect();
    match names {
        Some(names) => {
            for name in names {
                layers.named_path(scope, name);
            }
        },
        None => log::warn!("Ignoring invalid @layer statement: {:?}", prelude.trim()),
    }
}

/// The layer opened by `@layer name {` or `@layer {`, or `None` when the
/// prelude is invalid and the block must be skipped.
fn block_layer(prelude: &str, scope: LayerId, layers: &mut LayerTree) -> Option<LayerId> {
    if prelude.trim().is_empty() {
        return Some(layers.anonymous(scope));
    }
    match layer_name(prelude) {
        Some(name) => Some(layers.named_path(scope, name)),
        None => {
            log::warn!("Skipping @layer block with invalid name {:?}", prelude.trim());
            None
        },
    }
}

// -----------------------------------------------------------------------
// Selectors
// -----------------------------------------------------------------------

/// Parse a comma-separated selector group.
pub fn parse_selector_list(text: &str, config: &EngineConfig) -> Result<Vec<SelectorChain>> {
    if text.trim().is_empty() {
        return Err(TrellisError::selector(text, "empty selector"));
    }
    text.split(',')
        .map(|part| parse_selector(part.trim(), config))
        .collect()
}

/// Parse a single selector chain such as `ul > li.red::before`.
pub fn parse_selector(text: &str, config: &EngineConfig) -> Result<SelectorChain> {
    SelectorParser::new(text).parse(config.max_selector_compounds)
}

struct SelectorParser<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
    compounds: Vec<CompoundSelector>,
    combinators: Vec<Combinator>,
    current: CompoundSelector,
    pending: Option<Combinator>,
    pseudo_element: Option<PseudoElement>,
}

impl<'a> SelectorParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
            compounds: Vec::new(),
            combinators: Vec::new(),
            current: CompoundSelector::default(),
            pending: None,
            pseudo_element: None,
        }
    }

    fn error(&self, reason: impl Into<String>) -> TrellisError {
        TrellisError::selector(self.text, reason)
    }

    fn parse(mut self, max_compounds: usize) -> Result<SelectorChain> {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                self.end_compound(Combinator::Descendant)?;
                continue;
            }
            if self.pseudo_element.is_some() {
                return Err(self.error("pseudo-element must be last"));
            }
            match c {
                '>' => {
                    self.chars.next();
                    self.end_compound(Combinator::Child)?;
                },
                '.' => {
                    self.chars.next();
                    let name = self.ident("class name")?;
                    self.push(SelectorComponent::Class(name))?;
                },
                '#' => {
                    self.chars.next();
                    let name = self.ident("ID")?;
                    self.push(SelectorComponent::Id(name))?;
                },
                '*' => {
                    self.chars.next();
                    self.push(SelectorComponent::Universal)?;
                },
                ':' => {
                    self.chars.next();
                    self.pseudo()?;
                },
                c if is_ident_start(c) => {
                    let name = self.ident("type")?;
                    self.push(SelectorComponent::Type(name))?;
                },
                other => return Err(self.error(format!("unexpected character `{other}`"))),
            }
        }

        if !self.current.components.is_empty() {
            let compound = std::mem::take(&mut self.current);
            self.compounds.push(compound);
        } else if self.pending == Some(Combinator::Child) {
            return Err(self.error("dangling combinator"));
        }

        if self.compounds.is_empty() {
            return Err(self.error("empty selector"));
        }
        if self.compounds.len() > max_compounds {
            return Err(self.error(format!(
                "{} compounds exceed the limit of {max_compounds}",
                self.compounds.len()
            )));
        }

        Ok(SelectorChain {
            compounds: self.compounds,
            combinators: self.combinators,
            pseudo_element: self.pseudo_element,
        })
    }

    /// Close the current compound (if any) and record `combinator` as the
    /// candidate joining it to the next one. `>` upgrades a pending
    /// whitespace combinator; whitespace never downgrades `>`.
    fn end_compound(&mut self, combinator: Combinator) -> Result<()> {
        if !self.current.components.is_empty() {
            let compound = std::mem::take(&mut self.current);
            self.compounds.push(compound);
            self.pending = Some(combinator);
            return Ok(());
        }
        match (self.pending, combinator) {
            (_, Combinator::Descendant) => Ok(()),
            (Some(Combinator::Descendant), Combinator::Child) => {
                self.pending = Some(Combinator::Child);
                Ok(())
            },
            (Some(Combinator::Child), Combinator::Child) => Err(self.error("repeated combinator")),
            (None, Combinator::Child) => Err(self.error("combinator without a left-hand side")),
        }
    }

    /// Add a simple selector to the current compound, opening a new
    /// compound after a combinator if needed.
    fn push(&mut self, component: SelectorComponent) -> Result<()> {
        if self.current.components.is_empty() && !self.compounds.is_empty() {
            let combinator = self.pending.take().unwrap_or(Combinator::Descendant);
            self.combinators.push(combinator);
        }
        let is_type = matches!(
            component,
            SelectorComponent::Type(_) | SelectorComponent::Universal
        );
        if is_type && !self.current.components.is_empty() {
            return Err(self.error("type or universal selector must start a compound"));
        }
        self.current.components.push(component);
        Ok(())
    }

    fn pseudo(&mut self) -> Result<()> {
        let double = self.chars.next_if(|&(_, c)| c == ':').is_some();
        let name = self.ident("pseudo name")?;

        if let Some(pseudo) = PseudoElement::parse(&name) {
            // `li ::before` is `li *::before`.
            if self.current.components.is_empty() {
                self.push(SelectorComponent::Universal)?;
            }
            self.pseudo_element = Some(pseudo);
            return Ok(());
        }
        if double {
            return Err(self.error(format!("unsupported pseudo-element `::{name}`")));
        }
        match PseudoClass::parse(&name) {
            Some(pseudo) => self.push(SelectorComponent::PseudoClass(pseudo)),
            None => Err(self.error(format!("unsupported pseudo-class `:{name}`"))),
        }
    }

    fn ident(&mut self, what: &str) -> Result<String> {
        let mut name = String::new();
        while let Some((_, c)) = self.chars.next_if(|&(_, c)| is_ident_char(c)) {
            name.push(c);
        }
        match name.chars().next() {
            None => Err(self.error(format!("expected {what}"))),
            Some(first) if !is_ident_start(first) => {
                Err(self.error(format!("{what} `{name}` cannot start with `{first}`")))
            },
            Some(_) => Ok(name),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

// -----------------------------------------------------------------------
// Declarations
// -----------------------------------------------------------------------

/// Parse a declaration block body or a `style` attribute leniently:
/// malformed declarations are skipped.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    split_declarations(text)
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .filter_map(|part| match parse_declaration(part) {
            Ok(decl) => Some(decl),
            Err(e) => {
                log::debug!("Skipping declaration: {e}");
                None
            },
        })
        .collect()
}

/// Parse exactly one `property: value [!important]` pair.
pub fn parse_declaration(text: &str) -> Result<Declaration> {
    let Some((property, value)) = text.split_once(':') else {
        return Err(TrellisError::InvalidDeclaration(format!(
            "missing `:` in `{}`",
            text.trim()
        )));
    };
    let property = property.trim();
    if property.is_empty() || !property.chars().all(is_ident_char) {
        return Err(TrellisError::InvalidDeclaration(format!(
            "bad property name `{property}`"
        )));
    }

    let mut value = value.trim();
    let mut important = false;
    if let Some(bang) = last_bang(value) {
        if !value[bang + 1..].trim().eq_ignore_ascii_case("important") {
            return Err(TrellisError::InvalidDeclaration(format!(
                "unexpected `!` in value of `{property}`"
            )));
        }
        important = true;
        value = value[..bang].trim_end();
    }
    if value.is_empty() {
        return Err(TrellisError::InvalidDeclaration(format!(
            "empty value for `{property}`"
        )));
    }

    Ok(Declaration {
        important,
        ..Declaration::new(property, value)
    })
}

/// Offset of the last `!` outside strings and parentheses, where an
/// `!important` suffix would start.
fn last_bang(value: &str) -> Option<usize> {
    let mut quotes = Quotes::default();
    let mut parens = 0usize;
    let mut bang = None;
    for (i, c) in value.char_indices() {
        if !quotes.outside(c) {
            continue;
        }
        match c {
            '(' => parens += 1,
            ')' => parens = parens.saturating_sub(1),
            '!' if parens == 0 => bang = Some(i),
            _ => {},
        }
    }
    bang
}

/// Split on `;` outside of strings and parentheses.
fn split_declarations(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quotes = Quotes::default();
    let mut parens = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if !quotes.outside(c) {
            continue;
        }
        match c {
            '(' => parens += 1,
            ')' => parens = parens.saturating_sub(1),
            ';' if parens == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }
    parts.push(&text[start..]);
    parts
}
