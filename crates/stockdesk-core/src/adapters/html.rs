//! Tolerant markup scanning for portal pages and chart XML.
//!
//! Tag detection is ASCII case-insensitive and nesting-aware. Unclosed
//! elements end where the next sibling of the same tag starts. This is not a
//! conforming HTML parser; it only has to find tables, rows, cells and a few
//! attributes on pages whose layout we already know.

/// One element occurrence: raw attribute text and raw inner markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    pub attrs: &'a str,
    pub inner: &'a str,
}

impl<'a> Element<'a> {
    pub fn attribute(&self, name: &str) -> Option<String> {
        attribute(self.attrs, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|value| value.split_whitespace().any(|c| c.eq_ignore_ascii_case(class)))
            .unwrap_or(false)
    }

    pub fn text(&self) -> String {
        text_content(self.inner)
    }

    /// Descendant elements named `tag`, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<Element<'a>> {
        elements(self.inner, tag)
    }

    pub fn find_first(&self, tag: &str) -> Option<Element<'a>> {
        elements(self.inner, tag).into_iter().next()
    }
}

/// Every `tag` element in `html`, in document order, nested ones included.
pub fn elements<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    let lower = html.to_ascii_lowercase();
    let tag = tag.to_ascii_lowercase();
    let open_pat = format!("<{tag}");
    let close_pat = format!("</{tag}");

    let mut found = Vec::new();
    let mut search_from = 0;

    while let Some(start) = find_open(&lower, &open_pat, search_from) {
        let attrs_start = start + open_pat.len();
        let Some(gt) = lower[attrs_start..].find('>') else {
            break;
        };
        let attrs_end = attrs_start + gt;
        let content_start = attrs_end + 1;
        let raw_attrs = &html[attrs_start..attrs_end];

        if raw_attrs.trim_end().ends_with('/') {
            found.push(Element {
                attrs: raw_attrs.trim_end().trim_end_matches('/'),
                inner: "",
            });
            search_from = content_start;
            continue;
        }

        let content_end = matching_close(&lower, &open_pat, &close_pat, content_start)
            .or_else(|| find_open(&lower, &open_pat, content_start))
            .unwrap_or(html.len());

        found.push(Element {
            attrs: raw_attrs,
            inner: &html[content_start..content_end],
        });
        search_from = content_start;
    }

    found
}

fn find_open(lower: &str, open_pat: &str, from: usize) -> Option<usize> {
    let mut cursor = from;
    while let Some(rel) = lower.get(cursor..)?.find(open_pat) {
        let start = cursor + rel;
        let boundary = lower.as_bytes().get(start + open_pat.len());
        match boundary {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(start),
            _ => cursor = start + open_pat.len(),
        }
    }
    None
}

fn matching_close(lower: &str, open_pat: &str, close_pat: &str, from: usize) -> Option<usize> {
    let mut depth = 1_usize;
    let mut cursor = from;
    loop {
        let next_close = lower.get(cursor..)?.find(close_pat).map(|rel| cursor + rel)?;
        match find_open(lower, open_pat, cursor) {
            Some(next_open) if next_open < next_close => {
                depth += 1;
                cursor = next_open + open_pat.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(next_close);
                }
                cursor = next_close + close_pat.len();
            }
        }
    }
}

/// Value of attribute `name` in a raw attribute string.
pub fn attribute(attrs: &str, name: &str) -> Option<String> {
    let lower = attrs.to_ascii_lowercase();
    let name = name.to_ascii_lowercase();
    let mut cursor = 0;

    while let Some(rel) = lower[cursor..].find(&name) {
        let start = cursor + rel;
        let preceded_ok = start == 0
            || lower
                .as_bytes()
                .get(start - 1)
                .is_some_and(|b| b.is_ascii_whitespace());
        let rest = lower[start + name.len()..].trim_start();
        if !preceded_ok || !rest.starts_with('=') {
            cursor = start + name.len();
            continue;
        }

        let value_offset = attrs.len() - rest.len() + 1;
        let value = attrs[value_offset..].trim_start();
        let parsed = match value.chars().next() {
            Some(quote @ ('"' | '\'')) => value[1..].split(quote).next().unwrap_or_default(),
            Some(_) => value.split_whitespace().next().unwrap_or_default(),
            None => "",
        };
        return Some(decode_entities(parsed));
    }

    None
}

/// Visible text: tags dropped, entities decoded, whitespace collapsed.
pub fn text_content(fragment: &str) -> String {
    let mut raw = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                raw.push(' ');
            }
            _ if !in_tag => raw.push(ch),
            _ => {}
        }
    }

    decode_entities(&raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_owned();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';').filter(|&i| i <= 10) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };

        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" | "#39" => Some('\''),
            "nbsp" => Some(' '),
            _ => numeric_entity(entity),
        };

        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

/// Numeric cell value; thousands separators stripped, placeholders are `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|ch| !matches!(ch, ',' | ' ' | '\u{a0}' | '%'))
        .collect();
    match cleaned.as_str() {
        "" | "-" | "—" | "N/A" | "n/a" | "NaN" => None,
        value => value.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_tables_in_document_order() {
        let html = r#"<TABLE id="a"><tr><td><table id="b"><tr><td>x</td></tr></table></td></tr></TABLE><table id="c"></table>"#;
        let tables = elements(html, "table");
        let ids: Vec<_> = tables.iter().filter_map(|t| t.attribute("id")).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(tables[0].inner.contains(r#"id="b""#));
    }

    #[test]
    fn does_not_confuse_prefix_tags() {
        let html = "<thead><th>a</th></thead><tbody><tr><th>b</th></tr></tbody>";
        let ths = elements(html, "th");
        assert_eq!(ths.len(), 2);
        assert_eq!(elements(html, "thead").len(), 1);
    }

    #[test]
    fn unclosed_cells_end_at_next_sibling() {
        let html = "<tr><td>1<td>2<td>3</tr>";
        let cells: Vec<_> = elements(html, "td").iter().map(Element::text).collect();
        assert_eq!(cells, vec!["1", "2", "3"]);
    }

    #[test]
    fn reads_self_closing_items_and_attributes() {
        let xml = r#"<chartdata><item data="20220103|1|2|0.5|1.5|10" /><item data='x'/></chartdata>"#;
        let items = elements(xml, "item");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].attribute("data").as_deref(), Some("20220103|1|2|0.5|1.5|10"));
        assert_eq!(items[1].attribute("data").as_deref(), Some("x"));
    }

    #[test]
    fn attribute_lookup_requires_word_boundary() {
        assert_eq!(attribute(r#" data-id="1" id="2""#, "id").as_deref(), Some("2"));
        assert_eq!(attribute(r#" class="title main""#, "class").as_deref(), Some("title main"));
        assert_eq!(attribute(r#" class=title"#, "class").as_deref(), Some("title"));
    }

    #[test]
    fn text_content_strips_tags_and_entities() {
        assert_eq!(text_content("2023.12<br><em>(E)</em>"), "2023.12 (E)");
        assert_eq!(text_content("<strong>A&amp;B</strong>&nbsp; &#44608;"), "A&B 김");
        assert_eq!(decode_entities("a & b &unknown; c"), "a & b &unknown; c");
    }

    #[test]
    fn parses_portal_numbers() {
        assert_eq!(parse_number("2,796,048"), Some(2_796_048.0));
        assert_eq!(parse_number("-1,234.5"), Some(-1_234.5));
        assert_eq!(parse_number("12.3%"), Some(12.3));
        assert_eq!(parse_number(" - "), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
    }
}
