//! Turning parsed `scraper` elements into owned `Section`/`Node` snapshots.

use sectionmatch_core::{Error, Node, Result, Section};

/// Row-group wrappers the parser inserts (or the author wrote) between a table and its rows.
const ROW_GROUPS: [&str; 3] = ["thead", "tbody", "tfoot"];

/// Each text node trimmed, concatenated with no separator.
pub fn stripped_text(el: html_scraper::ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

/// Raw text with non-breaking spaces removed, trimmed at the ends.
pub fn plain_text(el: html_scraper::ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .replace('\u{a0}', "")
        .trim()
        .to_string()
}

fn first_descendant<'a>(
    el: html_scraper::ElementRef<'a>,
    tag: &str,
) -> Option<html_scraper::ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(html_scraper::ElementRef::wrap)
        .find(|e| e.value().name() == tag)
}

/// Stripped text of the first `table` nested inside the first `td`.
pub fn caption(el: html_scraper::ElementRef<'_>) -> Option<String> {
    let cell = first_descendant(el, "td")?;
    let table = first_descendant(cell, "table")?;
    Some(stripped_text(table))
}

/// Descendant element names in document order, not including `el` itself.
pub fn descendant_tags(el: html_scraper::ElementRef<'_>) -> Vec<String> {
    el.descendants()
        .skip(1)
        .filter_map(html_scraper::ElementRef::wrap)
        .map(|e| e.value().name().to_string())
        .collect()
}

pub fn section_of(el: html_scraper::ElementRef<'_>) -> Section {
    Section {
        tag: el.value().name().to_string(),
        text: stripped_text(el),
        plain_text: plain_text(el),
        caption: caption(el),
        tags: descendant_tags(el),
        html: el.html(),
        inner_html: el.inner_html(),
    }
}

fn to_node(
    value: &html_scraper::Node,
    element: Option<html_scraper::ElementRef<'_>>,
) -> Option<Node> {
    match value {
        html_scraper::Node::Comment(c) => Some(Node::Comment(String::from(&**c))),
        html_scraper::Node::Text(t) => Some(Node::Text(String::from(&**t))),
        html_scraper::Node::Element(_) => element.map(|el| Node::Element(section_of(el))),
        _ => None,
    }
}

fn is_row_group(el: &html_scraper::ElementRef<'_>) -> bool {
    ROW_GROUPS.contains(&el.value().name())
}

/// The container's children in document order, with row-group wrappers flattened in place.
///
/// Comments between rows stay in sequence with the rows even when the parser moved the
/// rows into an implicit `tbody`.
pub fn container_nodes(table: html_scraper::ElementRef<'_>) -> Vec<Node> {
    let mut out = Vec::new();
    for child in table.children() {
        match html_scraper::ElementRef::wrap(child) {
            Some(group) if is_row_group(&group) => {
                for inner in group.children() {
                    out.extend(to_node(inner.value(), html_scraper::ElementRef::wrap(inner)));
                }
            }
            element => out.extend(to_node(child.value(), element)),
        }
    }
    out
}

/// Direct `tr` children of a table, looking through row-group wrappers but not into nested tables.
pub fn direct_rows(table: html_scraper::ElementRef<'_>) -> Vec<html_scraper::ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(html_scraper::ElementRef::wrap) {
        if child.value().name() == "tr" {
            rows.push(child);
        } else if is_row_group(&child) {
            rows.extend(
                child
                    .children()
                    .filter_map(html_scraper::ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            );
        }
    }
    rows
}

pub fn parse_selector(selector: &str) -> Result<html_scraper::Selector> {
    html_scraper::Selector::parse(selector)
        .map_err(|e| Error::InvalidSelector(format!("{selector:?}: {e}")))
}

/// First element matching `selector`, or `None` when the document has no such element.
pub fn select_first<'a>(
    doc: &'a html_scraper::Html,
    selector: &str,
) -> Result<Option<html_scraper::ElementRef<'a>>> {
    let sel = parse_selector(selector)?;
    Ok(doc.select(&sel).next())
}
