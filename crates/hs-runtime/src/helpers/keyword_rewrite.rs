/// Property names that collide with Rhai keywords, and the names registered in their place.
const KEYWORD_PROPERTIES: &[(&str, &str)] = &[
    ("true", "true_"),
    ("false", "false_"),
    ("null", "null_"),
    ("is", "is_"),
    ("with", "with_"),
    ("global", "global_"),
    ("throw", "throws"),
    ("match", "matches"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Code,
    DoubleQuoted,
    CharLiteral,
    Backtick,
    LineComment,
    BlockComment,
}

/// Renames keyword-named links after a `.` so chains like `.to.be.true` parse.
/// String literals and comments pass through untouched.
pub(crate) fn rewrite_keyword_properties(source: &str) -> String {
    let chars = source.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(source.len() + 16);
    let mut state = LexState::Code;
    let mut index = 0usize;

    while index < chars.len() {
        let ch = chars[index];
        let next = chars.get(index + 1).copied();
        match state {
            LexState::Code => match (ch, next) {
                ('/', Some('/')) => {
                    state = LexState::LineComment;
                    out.push_str("//");
                    index += 2;
                    continue;
                }
                ('/', Some('*')) => {
                    state = LexState::BlockComment;
                    out.push_str("/*");
                    index += 2;
                    continue;
                }
                ('"', _) => state = LexState::DoubleQuoted,
                ('\'', _) => state = LexState::CharLiteral,
                ('`', _) => state = LexState::Backtick,
                ('.', _) => {
                    out.push('.');
                    index += 1;
                    let word_end = identifier_end(&chars, index);
                    let word = chars[index..word_end].iter().collect::<String>();
                    match replacement_for(&word) {
                        Some(replacement) => out.push_str(replacement),
                        None => out.push_str(&word),
                    }
                    index = word_end;
                    continue;
                }
                _ => {}
            },
            LexState::DoubleQuoted | LexState::CharLiteral | LexState::Backtick => {
                let closing = match state {
                    LexState::DoubleQuoted => '"',
                    LexState::CharLiteral => '\'',
                    _ => '`',
                };
                if ch == '\\' {
                    out.push(ch);
                    if let Some(escaped) = next {
                        out.push(escaped);
                    }
                    index += 2;
                    continue;
                }
                if ch == closing {
                    state = LexState::Code;
                }
            }
            LexState::LineComment => {
                if ch == '\n' {
                    state = LexState::Code;
                }
            }
            LexState::BlockComment => {
                if ch == '*' && next == Some('/') {
                    state = LexState::Code;
                    out.push_str("*/");
                    index += 2;
                    continue;
                }
            }
        }
        out.push(ch);
        index += 1;
    }

    out
}

fn identifier_end(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    end
}

fn replacement_for(word: &str) -> Option<&'static str> {
    KEYWORD_PROPERTIES
        .iter()
        .find(|(keyword, _)| *keyword == word)
        .map(|(_, replacement)| *replacement)
}

#[cfg(test)]
mod keyword_rewrite_tests {
    use super::*;

    #[test]
    fn rewrites_keyword_links_in_chains() {
        assert_eq!(
            rewrite_keyword_properties("pm.expect(x).to.be.true;"),
            "pm.expect(x).to.be.true_;"
        );
        assert_eq!(
            rewrite_keyword_properties("pm.expect(f).to.throw(); pm.expect(s).to.match(\"a\");"),
            "pm.expect(f).to.throws(); pm.expect(s).to.matches(\"a\");"
        );
        assert_eq!(
            rewrite_keyword_properties("x.that.is.null"),
            "x.that.is_.null_"
        );
        assert_eq!(
            rewrite_keyword_properties("hopp.env.global.get(\"k\")"),
            "hopp.env.global_.get(\"k\")"
        );
    }

    #[test]
    fn leaves_identifiers_with_keyword_prefixes_alone() {
        assert_eq!(
            rewrite_keyword_properties("x.trueish.isolated.matchAll"),
            "x.trueish.isolated.matchAll"
        );
        assert_eq!(rewrite_keyword_properties("let a = 1.5;"), "let a = 1.5;");
    }

    #[test]
    fn skips_strings_chars_and_comments() {
        let source = "let s = \"a.true \\\" .null\"; // x.true\n/* y.is */ z.false";
        assert_eq!(
            rewrite_keyword_properties(source),
            "let s = \"a.true \\\" .null\"; // x.true\n/* y.is */ z.false_"
        );
        assert_eq!(rewrite_keyword_properties("'.'"), "'.'");
        assert_eq!(
            rewrite_keyword_properties("`${a}.true`.len()"),
            "`${a}.true`.len()"
        );
    }
}
