//! Element paths: `/`-separated `tag(.class)*(#id)?` segments, outermost
//! first, e.g. `ul/li.item/ul/li#last`.

use anyhow::{Result, bail};
use trellis_dom::{Document, DocumentBuilder, ElementNode, NodeId};

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn check_name(name: &str, what: &str, segment: &str) -> Result<()> {
    if name.is_empty() {
        bail!("segment {segment:?} has an empty {what}");
    }
    if let Some(bad) = name.chars().find(|&c| !is_name_char(c)) {
        bail!("unexpected {bad:?} in {what} of segment {segment:?}");
    }
    Ok(())
}

/// Parse one path segment into an element.
pub fn parse_segment(segment: &str) -> Result<ElementNode> {
    let segment = segment.trim();
    let tag_end = segment.find(['.', '#']).unwrap_or(segment.len());
    let tag = &segment[..tag_end];
    check_name(tag, "tag name", segment)?;

    let mut element = ElementNode::new(tag);
    let mut has_id = false;
    let mut rest = &segment[tag_end..];
    while let Some(marker) = rest.chars().next() {
        let body = &rest[1..];
        let end = body.find(['.', '#']).unwrap_or(body.len());
        let name = &body[..end];
        match marker {
            '.' => {
                check_name(name, "class name", segment)?;
                if has_id {
                    bail!("classes must precede the id in segment {segment:?}");
                }
                element = element.with_class(name);
            },
            _ => {
                check_name(name, "id", segment)?;
                if has_id {
                    bail!("segment {segment:?} has more than one id");
                }
                has_id = true;
                element = element.with_id(name);
            },
        }
        rest = &body[end..];
    }
    Ok(element)
}

/// Build a document with one nested element per segment. Returns the
/// document and its innermost element.
pub fn build_document(path: &str) -> Result<(Document, NodeId)> {
    let mut builder = DocumentBuilder::new();
    let mut target = None;
    for segment in path.split('/').filter(|s| !s.trim().is_empty()) {
        target = Some(builder.open(parse_segment(segment)?));
    }
    let Some(target) = target else {
        bail!("element path {path:?} names no elements");
    };
    Ok((builder.finish(), target))
}
