/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Hand-rolled lexer (spec §4.8). Mnemonics, directives, and register
//! names are case-insensitive; identifiers are case-sensitive. `;` starts
//! a line comment. Every token carries its 1-based line and column so the
//! parser and later passes can report precise positions.

use crate::errors::AssemblyError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Register(String),
    Number(i64),
    StringLiteral(String),
    Directive(String),
    Comma,
    Colon,
    LBracket,
    RBracket,
    Plus,
    Minus,
    Eol,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

const REGISTER_NAMES: &[&str] = &["AX", "BX", "CX", "DX", "EX", "IR", "SP", "SI"];
const DIRECTIVE_KEYWORDS: &[&str] = &["DATA", "CODE", "DB", "DW", "DA", "PAGE"];

pub fn tokenize(source: &str) -> (Vec<Token>, Vec<AssemblyError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (line_idx, line) in source.lines().enumerate() {
        let line_no = line_idx + 1;
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0usize;

        while i < chars.len() {
            let c = chars[i];
            let col = i + 1;

            if c == ';' {
                break;
            }
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            match c {
                ',' => {
                    tokens.push(Token { kind: TokenKind::Comma, line: line_no, col });
                    i += 1;
                }
                ':' => {
                    tokens.push(Token { kind: TokenKind::Colon, line: line_no, col });
                    i += 1;
                }
                '[' => {
                    tokens.push(Token { kind: TokenKind::LBracket, line: line_no, col });
                    i += 1;
                }
                ']' => {
                    tokens.push(Token { kind: TokenKind::RBracket, line: line_no, col });
                    i += 1;
                }
                '+' => {
                    tokens.push(Token { kind: TokenKind::Plus, line: line_no, col });
                    i += 1;
                }
                '-' => {
                    tokens.push(Token { kind: TokenKind::Minus, line: line_no, col });
                    i += 1;
                }
                '"' => match read_string_literal(&chars, i) {
                    Ok((value, next)) => {
                        tokens.push(Token { kind: TokenKind::StringLiteral(value), line: line_no, col });
                        i = next;
                    }
                    Err(reason) => {
                        errors.push(AssemblyError::LexError { line: line_no, col, reason });
                        i = chars.len();
                    }
                },
                _ if c.is_ascii_digit() => {
                    let (value, next) = read_number(&chars, i);
                    match value {
                        Ok(n) => tokens.push(Token { kind: TokenKind::Number(n), line: line_no, col }),
                        Err(reason) => errors.push(AssemblyError::LexError { line: line_no, col, reason }),
                    }
                    i = next;
                }
                _ if c.is_alphabetic() || c == '_' => {
                    let start = i;
                    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    let text: String = chars[start..i].iter().collect();
                    let upper = text.to_ascii_uppercase();
                    if REGISTER_NAMES.contains(&upper.as_str()) {
                        tokens.push(Token { kind: TokenKind::Register(upper), line: line_no, col });
                    } else if DIRECTIVE_KEYWORDS.contains(&upper.as_str()) {
                        tokens.push(Token { kind: TokenKind::Directive(upper), line: line_no, col });
                    } else {
                        tokens.push(Token { kind: TokenKind::Identifier(text), line: line_no, col });
                    }
                }
                other => {
                    errors.push(AssemblyError::LexError {
                        line: line_no,
                        col,
                        reason: format!("unexpected character '{other}'"),
                    });
                    i += 1;
                }
            }
        }

        tokens.push(Token { kind: TokenKind::Eol, line: line_no, col: chars.len() + 1 });
    }

    tokens.push(Token { kind: TokenKind::Eof, line: source.lines().count() + 1, col: 1 });
    (tokens, errors)
}

fn read_number(chars: &[char], start: usize) -> (Result<i64, String>, usize) {
    let mut i = start;
    if chars[i] == '0' && i + 1 < chars.len() && (chars[i + 1] == 'x' || chars[i + 1] == 'X') {
        i += 2;
        let digit_start = i;
        while i < chars.len() && chars[i].is_ascii_hexdigit() {
            i += 1;
        }
        let text: String = chars[digit_start..i].iter().collect();
        let value = i64::from_str_radix(&text, 16).map_err(|e| e.to_string());
        (value, i)
    } else if chars[i] == '0' && i + 1 < chars.len() && (chars[i + 1] == 'b' || chars[i + 1] == 'B') {
        i += 2;
        let digit_start = i;
        while i < chars.len() && (chars[i] == '0' || chars[i] == '1') {
            i += 1;
        }
        let text: String = chars[digit_start..i].iter().collect();
        let value = i64::from_str_radix(&text, 2).map_err(|e| e.to_string());
        (value, i)
    } else {
        let digit_start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let text: String = chars[digit_start..i].iter().collect();
        let value = text.parse::<i64>().map_err(|e| e.to_string());
        (value, i)
    }
}

fn read_string_literal(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let mut i = start + 1; // skip opening quote
    let mut out = String::new();
    while i < chars.len() {
        match chars[i] {
            '"' => return Ok((out, i + 1)),
            '\\' if i + 1 < chars.len() => {
                let escaped = match chars[i + 1] {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '\\' => '\\',
                    '"' => '"',
                    '0' => '\0',
                    other => return Err(format!("unknown escape sequence '\\{other}'")),
                };
                out.push(escaped);
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err("unterminated string literal".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn register_names_are_case_insensitive() {
        let k = kinds("ax Bx CX");
        assert_eq!(k[0], TokenKind::Register("AX".to_string()));
        assert_eq!(k[1], TokenKind::Register("BX".to_string()));
        assert_eq!(k[2], TokenKind::Register("CX".to_string()));
    }

    #[test]
    fn identifiers_are_case_sensitive() {
        let k = kinds("MyLabel myLabel");
        assert_eq!(k[0], TokenKind::Identifier("MyLabel".to_string()));
        assert_eq!(k[1], TokenKind::Identifier("myLabel".to_string()));
    }

    #[test]
    fn hex_and_decimal_numbers_parse() {
        let k = kinds("0x1F 31");
        assert_eq!(k[0], TokenKind::Number(31));
        assert_eq!(k[1], TokenKind::Number(31));
    }

    #[test]
    fn string_literal_handles_escapes() {
        let k = kinds("\"a\\nb\"");
        assert_eq!(k[0], TokenKind::StringLiteral("a\nb".to_string()));
    }

    #[test]
    fn semicolon_starts_a_comment() {
        let k = kinds("LD AX, 1 ; comment here");
        assert!(!k.iter().any(|t| matches!(t, TokenKind::Identifier(s) if s.contains("comment"))));
    }

    #[test]
    fn unterminated_string_is_reported() {
        let (_, errors) = tokenize("\"unterminated");
        assert_eq!(errors.len(), 1);
    }
}
