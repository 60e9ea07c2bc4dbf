//! HTML to forum BBCode conversion for scraped post bodies.
//!
//! Handles the markup the scraper actually produces: inline formatting,
//! links, line breaks, paragraphs and lists. Any other element is unwrapped
//! and its text kept; `script` and `style` bodies are dropped.

use std::borrow::Cow;

#[derive(Debug, PartialEq)]
struct Tag {
    name: String,
    closing: bool,
    href: Option<String>,
}

/// Converts an HTML fragment to BBCode. The result is trimmed.
pub fn html_to_bbcode(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut list_depth = 0usize;
    let mut links: Vec<bool> = Vec::new();
    let mut skipping: Option<String> = None;

    while !rest.is_empty() {
        let Some(pos) = rest.find('<') else {
            push_text(&mut out, rest, list_depth, skipping.is_some());
            break;
        };
        push_text(&mut out, &rest[..pos], list_depth, skipping.is_some());
        let markup = &rest[pos..];

        if markup.starts_with("<!--") {
            rest = markup.find("-->").map_or("", |end| &markup[end + 3..]);
            continue;
        }

        let Some((tag, consumed)) = parse_tag(markup) else {
            push_text(&mut out, "<", list_depth, skipping.is_some());
            rest = &markup[1..];
            continue;
        };
        rest = &markup[consumed..];

        if let Some(name) = &skipping {
            if tag.closing && tag.name == *name {
                skipping = None;
            }
            continue;
        }

        match (tag.name.as_str(), tag.closing) {
            ("br", _) => out.push('\n'),
            ("b" | "strong", false) => out.push_str("[b]"),
            ("b" | "strong", true) => out.push_str("[/b]"),
            ("i" | "em", false) => out.push_str("[i]"),
            ("i" | "em", true) => out.push_str("[/i]"),
            ("u", false) => out.push_str("[u]"),
            ("u", true) => out.push_str("[/u]"),
            ("ul" | "ol", false) => {
                end_line(&mut out);
                out.push_str("[list]\n");
                list_depth += 1;
            }
            ("ul" | "ol", true) => {
                end_line(&mut out);
                out.push_str("[/list]\n");
                list_depth = list_depth.saturating_sub(1);
            }
            ("li", false) => {
                end_line(&mut out);
                out.push_str("[*] ");
            }
            ("li", true) => end_line(&mut out),
            ("a", false) => match tag.href {
                Some(href) => {
                    out.push_str("[url=");
                    out.push_str(&href);
                    out.push(']');
                    links.push(true);
                }
                None => links.push(false),
            },
            ("a", true) => {
                if links.pop().unwrap_or(false) {
                    out.push_str("[/url]");
                }
            }
            ("p", true) => out.push('\n'),
            ("script" | "style", false) => skipping = Some(tag.name),
            _ => {}
        }
    }

    out.trim().to_string()
}

fn push_text(out: &mut String, text: &str, list_depth: usize, skipping: bool) {
    if skipping || text.is_empty() {
        return;
    }
    // Indentation between list items is layout, not content.
    if list_depth > 0 && text.trim().is_empty() {
        return;
    }
    out.push_str(&decode_entities(text));
}

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Parses the tag at the start of `input` (which begins with `<`), returning
/// it with the number of bytes it spans. `None` when `<` does not open a tag.
fn parse_tag(input: &str) -> Option<(Tag, usize)> {
    let end = tag_end(input)?;
    let inner = &input[1..end];

    if inner.starts_with('!') || inner.starts_with('?') {
        let tag = Tag {
            name: String::new(),
            closing: false,
            href: None,
        };
        return Some((tag, end + 1));
    }

    let (closing, inner) = match inner.strip_prefix('/') {
        Some(stripped) => (true, stripped),
        None => (false, inner),
    };

    if !inner.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    let name_len = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    let name = inner[..name_len].to_ascii_lowercase();
    let href = if closing {
        None
    } else {
        attribute(&inner[name_len..], "href")
    };

    Some((
        Tag {
            name,
            closing,
            href,
        },
        end + 1,
    ))
}

/// Byte index of the `>` closing the tag, skipping quoted attribute values.
fn tag_end(input: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in input.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(idx),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

fn attribute(attrs: &str, wanted: &str) -> Option<String> {
    let mut rest = attrs;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            return None;
        }

        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = &rest[..name_len];
        rest = rest[name_len..].trim_start();

        let value = match rest.strip_prefix('=') {
            None => None,
            Some(after) => {
                let after = after.trim_start();
                match after.chars().next() {
                    Some(q @ ('"' | '\'')) => {
                        let body = &after[1..];
                        let close = body.find(q).unwrap_or(body.len());
                        rest = body.get(close + 1..).unwrap_or("");
                        Some(&body[..close])
                    }
                    _ => {
                        let len = after.find(char::is_whitespace).unwrap_or(after.len());
                        rest = &after[len..];
                        Some(&after[..len])
                    }
                }
            }
        };

        if name.eq_ignore_ascii_case(wanted) {
            return value.map(|v| decode_entities(v).into_owned());
        }
    }
}

/// Decodes the named entities scraped content uses plus numeric references.
/// Unknown entities are left as written.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        // Entity names are short; the `;` must come within the next 11 chars.
        let decoded = candidate[1..]
            .char_indices()
            .take(11)
            .find(|(_, c)| *c == ';')
            .and_then(|(semi, _)| decode_entity(&candidate[1..semi + 1]).map(|c| (c, semi + 2)));

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_formatting_and_paragraphs() {
        assert_eq!(
            html_to_bbcode("<p>Hello <b>world</b></p><p><strong>Second</strong> <u>line</u></p>"),
            "Hello [b]world[/b]\n[b]Second[/b] [u]line[/u]"
        );
        assert_eq!(html_to_bbcode("<i>a</i><em>b</em>"), "[i]a[/i][i]b[/i]");
    }

    #[test]
    fn test_lists() {
        let html = "<ul>\n  <li>One</li>\n  <li>Two</li>\n</ul>";
        assert_eq!(html_to_bbcode(html), "[list]\n[*] One\n[*] Two\n[/list]");
        assert_eq!(
            html_to_bbcode("Intro<ol><li>x</li></ol>after"),
            "Intro\n[list]\n[*] x\n[/list]\nafter"
        );
    }

    #[test]
    fn test_links() {
        assert_eq!(
            html_to_bbcode(r#"Visit <a class="ext" href="https://example.com/?a=1&amp;b=2">site</a>!"#),
            "Visit [url=https://example.com/?a=1&b=2]site[/url]!"
        );
        assert_eq!(html_to_bbcode("<a name=top>anchor</a>"), "anchor");
        assert_eq!(
            html_to_bbcode("<a href='/x' title=\"a > b\">y</a>"),
            "[url=/x]y[/url]"
        );
    }

    #[test]
    fn test_line_breaks_and_entities() {
        assert_eq!(
            html_to_bbcode("a<br>b<BR/>c &lt;tag&gt; &amp; &#39;q&#39; &#x41; &copy;"),
            "a\nb\nc <tag> & 'q' A &copy;"
        );
    }

    #[test]
    fn test_unknown_elements_are_unwrapped() {
        assert_eq!(
            html_to_bbcode(r#"<div><span class="x">kept</span> <em>it</em></div>"#),
            "kept [i]it[/i]"
        );
        assert_eq!(html_to_bbcode("<script>alert(1)</script><!-- note -->text"), "text");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_to_bbcode("  1 < 2 and 3 > 2  "), "1 < 2 and 3 > 2");
        assert_eq!(html_to_bbcode(""), "");
        assert_eq!(html_to_bbcode("no markup"), "no markup");
    }

    #[test]
    fn test_entities_followed_by_non_ascii_text() {
        assert_eq!(decode_entities("&amp;éééé"), "&éééé");
        assert_eq!(decode_entities("caf&eacute;&nbsp;ü &lt;b&gt;"), "caf&eacute; ü <b>");
        assert_eq!(decode_entities("&#233;té"), "été");
        assert_eq!(
            html_to_bbcode("<b>Preis</b>&nbsp;&amp;&nbsp;Größe"),
            "[b]Preis[/b] & Größe"
        );
    }
}
