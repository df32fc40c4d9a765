use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};

/// Naive tag matcher used when the parsed text still carries markup.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]*>").expect("static tag pattern is valid")
});

/// Elements whose boundaries separate words in the rendered text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Elements whose text content is never visible.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template", "noscript"];

/// Strips markup from a free-text field and returns its visible text.
///
/// The HTML is parsed with `scraper` (html5ever recovers from any malformed
/// input) and the text nodes are joined with whitespace collapsed. Feeds that
/// double-escape their HTML decode to text that still looks like tags; those
/// leftovers go through a naive `<[^>]*>` pass.
///
/// Never fails: the worst case is the input with its tags removed.
///
/// # Examples
///
/// ```
/// use feedscout::util::strip_html;
///
/// assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
/// assert_eq!(strip_html("plain text"), "plain text");
/// ```
pub fn strip_html(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return collapse_whitespace(&strip_control_chars(html));
    }

    let text = visible_text(html);
    let text = if TAG_PATTERN.is_match(&text) {
        tracing::trace!("Parsed text still contains markup, applying tag fallback");
        TAG_PATTERN.replace_all(&text, " ").into_owned()
    } else {
        text
    };

    collapse_whitespace(&strip_control_chars(&text))
}

/// Strips markup, then truncates the result to at most `max_chars` characters.
pub fn sanitize(html: &str, max_chars: usize) -> String {
    let text = strip_html(html);
    truncate_chars(&text, max_chars).into_owned()
}

/// Truncates a string to at most `max_chars` characters, cutting on a char boundary.
///
/// Returns `Cow::Borrowed` when the string already fits.
///
/// # Examples
///
/// ```
/// use feedscout::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Hello World", 5), "Hello");
/// assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => Cow::Owned(s[..byte_idx].trim_end().to_owned()),
        None => Cow::Borrowed(s),
    }
}

fn visible_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element())
                    .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()));
                if !hidden {
                    out.push_str(text);
                }
            }
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push(' '),
            _ => {}
        }
    }

    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SEC-001: Strip terminal control characters and ANSI escape sequences from text.
///
/// Feed text is attacker-controlled and ends up on a terminal when the CLI
/// prints results. Strips C0 controls (except tab, newline, CR), DEL, and
/// CSI/OSC escape sequences.
///
/// Returns `Cow::Borrowed` when the input contains no control characters.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_control = |c: char| c == '\x1b' || c == '\x7f' || (c < ' ' && !matches!(c, '\t' | '\n' | '\r'));

    if !s.chars().any(is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            if !is_control(c) {
                out.push(c);
            }
            continue;
        }

        match chars.peek() {
            // CSI: parameter bytes until a final byte in 0x40..=0x7e
            Some('[') => {
                chars.next();
                for next in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&next) {
                        break;
                    }
                }
            }
            // OSC: until BEL or ST (ESC \)
            Some(']') => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '\x07' {
                        break;
                    }
                    if next == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}
