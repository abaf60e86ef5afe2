use std::collections::HashSet;

use ammonia::Builder;

/// Upper bound on strip/decode passes; each pass removes at least one layer of markup.
const MAX_PASSES: usize = 4;

/// Reduces user-authored text to plain text before it is stored.
///
/// Every tag is removed (`<script>` and `<style>` together with their content),
/// while characters such as `&`, `<` and `>` in ordinary text are kept as typed.
/// Markup hidden behind entities (`&lt;script&gt;`) is decoded and stripped again.
pub fn clean_text(input: &str) -> String {
    let mut text = input.to_string();
    for _ in 0..MAX_PASSES {
        let cleaned = decode_entities(&strip_tags(&text));
        if cleaned == text {
            break;
        }
        text = cleaned;
    }
    text
}

fn strip_tags(input: &str) -> String {
    Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string()
}

/// Undoes the escaping the HTML serializer applies to text nodes.
fn decode_entities(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
