use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use scraper::{Html, Node};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[a-z]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Tokenize text into an ordered sequence of stemmed terms using NFKC
/// normalization and lowercasing. Tokens are maximal runs of ASCII letters;
/// digits and punctuation act as separators. No deduplication. Queries run
/// through this same function, so query terms and indexed terms stem
/// consistently.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    TOKEN_RE
        .find_iter(&normalized)
        .map(|mat| STEMMER.stem(mat.as_str()).to_string())
        .collect()
}

/// Tokenize a raw HTML document: drop script/style/noscript subtrees,
/// collect the remaining text nodes in document order, then run `tokenize`.
pub fn tokenize_html(html: &str) -> Vec<String> {
    tokenize(&visible_text(html))
}

fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut text = String::new();
    // Children pushed in reverse so text pops off in document order.
    let mut stack = vec![doc.tree.root().id()];
    while let Some(id) = stack.pop() {
        let Some(node) = doc.tree.get(id) else { continue };
        match node.value() {
            Node::Text(t) => {
                text.push_str(&t.text);
                text.push(' ');
            }
            Node::Element(el) if matches!(el.name(), "script" | "style" | "noscript") => continue,
            _ => {}
        }
        for child in node.children().rev() {
            stack.push(child.id());
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Running, runner's run!");
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn digits_split_tokens() {
        assert_eq!(tokenize("abc123def"), vec!["abc", "def"]);
    }

    #[test]
    fn html_skips_script_and_style() {
        let t = tokenize_html(
            "<html><head><style>body { color: red }</style></head>\
             <body><p>visible words</p><script>var hidden = 1;</script></body></html>",
        );
        assert_eq!(t, vec!["visibl", "word"]);
    }
}
