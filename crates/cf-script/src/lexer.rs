use cf_core::{ByteRange, CfmlError, LineIndex, SourceSpan};

const PUNCTUATORS: &[&str] = &[
    "+=", "-=", "*=", "/=", "&=", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+", "-", "*",
    "/", "%", "&", "=", "<", ">", "!", "?", ":", ";", ",", ".", "(", ")", "[", "]", "{", "}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Punct,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Absolute byte offset in the document the script was cut from.
    pub offset: usize,
    pub span: SourceSpan,
}

impl Token {
    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    /// Case-insensitive keyword or word-operator check.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.eq_ignore_ascii_case(word)
    }
}

/// Splits `source` into tokens. `source` starts at `base_offset` of the text
/// indexed by `lines`, so token spans are document positions.
pub fn tokenize_script(
    source: &str,
    base_offset: usize,
    lines: &LineIndex,
) -> Result<Vec<Token>, CfmlError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    let make = |kind: TokenKind, start: usize, end: usize| Token {
        kind,
        text: source[start..end].to_string(),
        offset: base_offset + start,
        span: lines.span(ByteRange::new(base_offset + start, base_offset + end)),
    };
    let lex_error = |start: usize, message: String| {
        CfmlError::with_span(
            "SCRIPT_LEX_ERROR",
            message,
            lines.span(ByteRange::new(base_offset + start, base_offset + start)),
        )
    };

    while i < bytes.len() {
        let byte = bytes[i];
        if byte.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if source[i..].starts_with("//") {
            i = source[i..].find('\n').map_or(bytes.len(), |rel| i + rel + 1);
            continue;
        }
        if source[i..].starts_with("/*") {
            let Some(rel) = source[i + 2..].find("*/") else {
                return Err(lex_error(i, "Unterminated block comment.".to_string()));
            };
            i += 2 + rel + 2;
            continue;
        }

        let start = i;
        if byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$' {
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$')
            {
                i += 1;
            }
            tokens.push(make(TokenKind::Identifier, start, i));
            continue;
        }
        if byte.is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            tokens.push(make(TokenKind::Number, start, i));
            continue;
        }
        if byte == b'"' || byte == b'\'' {
            i += 1;
            loop {
                if i >= bytes.len() {
                    return Err(lex_error(start, "Unterminated string literal.".to_string()));
                }
                if bytes[i] == byte {
                    // A doubled quote is an escaped quote.
                    if i + 1 < bytes.len() && bytes[i + 1] == byte {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
            tokens.push(make(TokenKind::String, start, i));
            continue;
        }
        if let Some(punct) = PUNCTUATORS.iter().find(|punct| source[i..].starts_with(**punct)) {
            i += punct.len();
            tokens.push(make(TokenKind::Punct, start, i));
            continue;
        }

        let unexpected = source[i..].chars().next().unwrap_or_default();
        return Err(lex_error(i, format!("Unexpected character '{}'.", unexpected)));
    }

    tokens.push(make(TokenKind::Eof, bytes.len(), bytes.len()));
    Ok(tokens)
}

#[cfg(test)]
mod lexer_tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        tokenize_script(source, 0, &LineIndex::new(source)).expect("lex should pass")
    }

    #[test]
    fn splits_identifiers_numbers_strings_and_punctuators() {
        let tokens = lex("total += price * 1.5 & 'it''s';");
        let texts = tokens.iter().map(|token| token.text.as_str()).collect::<Vec<_>>();
        assert_eq!(
            texts,
            vec!["total", "+=", "price", "*", "1.5", "&", "'it''s'", ";", ""]
        );
        assert_eq!(tokens[4].kind, TokenKind::Number);
        assert_eq!(tokens[6].kind, TokenKind::String);
        assert_eq!(tokens.last().map(|token| token.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn comments_are_skipped_and_positions_are_tracked() {
        let tokens = lex("// heading\n  a /* note */ = b;");
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[0].span.start.line, 2);
        assert_eq!(tokens[0].span.start.column, 3);
        assert!(tokens[1].is_punct("="));
    }

    #[test]
    fn base_offset_maps_into_document_positions() {
        let document = "<cfscript>\nx = 1;</cfscript>";
        let lines = LineIndex::new(document);
        let tokens = tokenize_script(&document[10..17], 10, &lines).expect("lex");
        assert_eq!(tokens[0].offset, 11);
        assert_eq!(tokens[0].span.start.line, 2);
        assert_eq!(tokens[0].span.start.column, 1);
    }

    #[test]
    fn word_checks_ignore_case() {
        let tokens = lex("a GT b");
        assert!(tokens[1].is_word("gt"));
        assert!(!tokens[0].is_word("gt"));
    }

    #[test]
    fn unterminated_literals_and_stray_characters_fail_with_position() {
        let error = tokenize_script("x = \"abc", 0, &LineIndex::new("x = \"abc"))
            .expect_err("unterminated string");
        assert_eq!(error.code, "SCRIPT_LEX_ERROR");
        assert_eq!(error.column(), Some(5));

        let error =
            tokenize_script("a = @b;", 0, &LineIndex::new("a = @b;")).expect_err("stray char");
        assert!(error.message.contains('@'));

        let error = tokenize_script("/* open", 0, &LineIndex::new("/* open"))
            .expect_err("open comment");
        assert_eq!(error.line(), Some(1));
    }
}
