//! Rendering an effective style for the terminal.

use std::fmt::Write;

use trellis_style::{AppliedDeclaration, EffectiveStyle, Origin};

const HEADERS: [&str; 4] = ["PROPERTY", "VALUE", "ORIGIN", "SELECTOR"];

fn row(property: &str, applied: &AppliedDeclaration) -> [String; 4] {
    let decl = &applied.declaration;
    let prov = &applied.provenance;
    let value = if decl.important {
        format!("{} !important", decl.value)
    } else {
        decl.value.clone()
    };
    let (origin, selector) = match prov.origin {
        Origin::AuthorSheet => {
            let mut origin = format!("rule {} {}", prov.source_order, prov.specificity);
            if let Some(layer) = &prov.layer {
                let _ = write!(origin, " layer {layer}");
            }
            (origin, prov.selector.clone().unwrap_or_default())
        },
        Origin::Inline => ("inline".to_string(), "style attribute".to_string()),
    };
    [property.to_string(), value, origin, selector]
}

fn write_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{}", line.trim_end());
}

/// Render one row per property, columns aligned.
pub fn render_table(style: &EffectiveStyle) -> String {
    if style.is_empty() {
        return "(no declarations apply)\n".to_string();
    }

    let rows: Vec<[String; 4]> = style
        .iter()
        .map(|(property, applied)| row(property, applied))
        .collect();
    let mut widths = HEADERS.map(str::len);
    for cells in &rows {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &HEADERS.map(String::from), &widths);
    for cells in &rows {
        write_row(&mut out, cells, &widths);
    }
    out
}

pub fn render_json(style: &EffectiveStyle) -> serde_json::Result<String> {
    serde_json::to_string_pretty(style)
}
