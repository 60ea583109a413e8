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

//! Recursive-descent parser (spec §4.9) over the hand-rolled lexer's token
//! stream. Every error is accumulated rather than raised immediately; on a
//! parse error the parser skips to the next `EOL` and resumes there, so one
//! bad line never hides the errors on every line after it.

use crate::ast::*;
use crate::errors::AssemblyError;
use crate::lexer::{Token, TokenKind};

pub fn parse(tokens: Vec<Token>) -> (Program, Vec<AssemblyError>) {
    let mut parser = Parser { tokens, pos: 0, errors: Vec::new() };
    let program = parser.parse_program();
    (program, parser.errors)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<AssemblyError>,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn skip_blank_lines(&mut self) {
        while matches!(self.peek().kind, TokenKind::Eol) {
            self.advance();
        }
    }

    fn error(&mut self, reason: String) {
        let tok = self.peek().clone();
        self.errors.push(AssemblyError::ParseError { line: tok.line, col: tok.col, reason });
    }

    fn recover_to_eol(&mut self) {
        while !matches!(self.peek().kind, TokenKind::Eol | TokenKind::Eof) {
            self.advance();
        }
        if matches!(self.peek().kind, TokenKind::Eol) {
            self.advance();
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut sections = Vec::new();
        self.skip_blank_lines();
        while !self.at_eof() {
            match &self.peek().kind {
                TokenKind::Directive(d) if d == "DATA" => {
                    self.advance();
                    self.expect_eol();
                    sections.push(Section::Data(self.parse_data_section()));
                }
                TokenKind::Directive(d) if d == "CODE" => {
                    self.advance();
                    self.expect_eol();
                    sections.push(Section::Code(self.parse_code_section()));
                }
                _ => {
                    self.error("expected 'DATA' or 'CODE' section directive".to_string());
                    self.recover_to_eol();
                }
            }
            self.skip_blank_lines();
        }
        Program { sections }
    }

    fn expect_eol(&mut self) {
        if matches!(self.peek().kind, TokenKind::Eol) {
            self.advance();
        } else if !self.at_eof() {
            self.error("expected end of line".to_string());
            self.recover_to_eol();
        }
    }

    fn parse_data_section(&mut self) -> DataSection {
        let mut definitions = Vec::new();
        let mut current_page: Option<u16> = None;
        self.skip_blank_lines();
        loop {
            match &self.peek().kind {
                TokenKind::Directive(d) if d == "DATA" || d == "CODE" => break,
                TokenKind::Eof => break,
                TokenKind::Directive(d) if d == "PAGE" => {
                    self.advance();
                    match self.parse_number_literal() {
                        Some(n) => current_page = Some(n as u16),
                        None => self.error("expected a page number after 'PAGE'".to_string()),
                    }
                    self.expect_eol();
                }
                TokenKind::Identifier(_) => {
                    if let Some(def) = self.parse_data_definition(current_page) {
                        definitions.push(def);
                    }
                    self.expect_eol();
                }
                _ => {
                    self.error("expected a data definition".to_string());
                    self.recover_to_eol();
                }
            }
            self.skip_blank_lines();
        }
        DataSection { definitions }
    }

    fn parse_number_literal(&mut self) -> Option<i64> {
        if let TokenKind::Number(n) = self.peek().kind {
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn parse_data_definition(&mut self, page_number: Option<u16>) -> Option<DataDefinition> {
        let line = self.peek().line;
        let label = match &self.peek().kind {
            TokenKind::Identifier(name) => name.clone(),
            _ => return None,
        };
        self.advance();
        if !matches!(self.peek().kind, TokenKind::Colon) {
            self.error("expected ':' after data label".to_string());
            self.recover_to_eol();
            return None;
        }
        self.advance();
        let data_type = match &self.peek().kind {
            TokenKind::Directive(d) if d == "DW" => DataType::Word,
            TokenKind::Directive(d) if d == "DB" => DataType::Byte,
            TokenKind::Directive(d) if d == "DA" => DataType::Address,
            _ => {
                self.error("expected 'DW', 'DB', or 'DA'".to_string());
                self.recover_to_eol();
                return None;
            }
        };
        self.advance();
        let mut values = Vec::new();
        loop {
            if let TokenKind::StringLiteral(s) = self.peek().kind.clone() {
                self.advance();
                for byte in s.bytes() {
                    values.push(Expression::Number(byte as i64));
                }
            } else if let Some(expr) = self.parse_expression() {
                values.push(expr);
            } else {
                self.error("expected a value in data definition".to_string());
                self.recover_to_eol();
                return None;
            }
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Some(DataDefinition { label, data_type, values, page_number, line })
    }

    fn parse_code_section(&mut self) -> CodeSection {
        let mut items = Vec::new();
        self.skip_blank_lines();
        loop {
            match &self.peek().kind {
                TokenKind::Directive(d) if d == "DATA" || d == "CODE" => break,
                TokenKind::Eof => break,
                TokenKind::Identifier(name) if self.next_is_colon() => {
                    let line = self.peek().line;
                    let name = name.clone();
                    self.advance();
                    self.advance(); // colon
                    items.push(CodeItem::Label(Label { name, line }));
                    self.expect_eol();
                }
                TokenKind::Identifier(_) => {
                    if let Some(instruction) = self.parse_instruction() {
                        items.push(CodeItem::Instruction(instruction));
                    }
                    self.expect_eol();
                }
                _ => {
                    self.error("expected a label or instruction".to_string());
                    self.recover_to_eol();
                }
            }
            self.skip_blank_lines();
        }
        CodeSection { items }
    }

    fn next_is_colon(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Colon))
    }

    fn parse_instruction(&mut self) -> Option<Instruction> {
        let line = self.peek().line;
        let mnemonic = match &self.peek().kind {
            TokenKind::Identifier(name) => name.to_ascii_uppercase(),
            _ => return None,
        };
        self.advance();
        let mut operands = Vec::new();
        if !matches!(self.peek().kind, TokenKind::Eol | TokenKind::Eof) {
            loop {
                match self.parse_operand() {
                    Some(op) => operands.push(op),
                    None => {
                        self.error("expected an operand".to_string());
                        self.recover_to_eol();
                        return None;
                    }
                }
                if matches!(self.peek().kind, TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        Some(Instruction { mnemonic, operands, line })
    }

    fn parse_operand(&mut self) -> Option<Operand> {
        match self.peek().kind.clone() {
            TokenKind::Register(name) => {
                self.advance();
                Some(Operand::Register(name))
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Some(Operand::InlineData(s.into_bytes()))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.parse_expression()?;
                if matches!(self.peek().kind, TokenKind::RBracket) {
                    self.advance();
                } else {
                    self.error("expected ']'".to_string());
                    return None;
                }
                Some(Operand::MemoryAccess(expr, false))
            }
            TokenKind::Number(_) | TokenKind::Minus | TokenKind::Identifier(_) => {
                match self.parse_expression()? {
                    Expression::Identifier(name) if matches!(self.peek().kind, TokenKind::LBracket) => {
                        self.advance();
                        let index = self.parse_expression()?;
                        if matches!(self.peek().kind, TokenKind::RBracket) {
                            self.advance();
                        } else {
                            self.error("expected ']'".to_string());
                            return None;
                        }
                        let expr = Expression::BinaryOp {
                            op: BinaryOperator::Add,
                            lhs: Box::new(Expression::Identifier(name)),
                            rhs: Box::new(index),
                        };
                        Some(Operand::MemoryAccess(expr, true))
                    }
                    Expression::Identifier(name) => Some(Operand::Identifier(name)),
                    other => Some(Operand::Immediate(other)),
                }
            }
            _ => None,
        }
    }

    fn parse_expression(&mut self) -> Option<Expression> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expression::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Some(lhs)
    }

    fn parse_term(&mut self) -> Option<Expression> {
        match self.peek().kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Some(Expression::Number(n))
            }
            TokenKind::Minus => {
                self.advance();
                match self.parse_term()? {
                    Expression::Number(n) => Some(Expression::Number(-n)),
                    other => Some(other),
                }
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Some(Expression::Identifier(name))
            }
            TokenKind::Register(name) => {
                self.advance();
                Some(Expression::Register(name))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_source(source: &str) -> (Program, Vec<AssemblyError>) {
        let (tokens, lex_errors) = tokenize(source);
        assert!(lex_errors.is_empty());
        parse(tokens)
    }

    #[test]
    fn parses_a_data_section_with_word_and_bytes() {
        let source = "DATA\ncount: DW 5\nmsg: DB \"hi\"\nCODE\nHALT\n";
        let (program, errors) = parse_source(source);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(program.sections.len(), 2);
        match &program.sections[0] {
            Section::Data(d) => assert_eq!(d.definitions.len(), 2),
            _ => panic!("expected data section"),
        }
    }

    #[test]
    fn parses_labels_and_instructions_with_memory_operand() {
        let source = "CODE\nloop:\nLD AX, 5\nSTA AX, [count]\nJMP loop\n";
        let (program, errors) = parse_source(source);
        assert!(errors.is_empty(), "{errors:?}");
        match &program.sections[0] {
            Section::Code(c) => {
                assert!(matches!(c.items[0], CodeItem::Label(_)));
                assert!(matches!(c.items[1], CodeItem::Instruction(_)));
                if let CodeItem::Instruction(i) = &c.items[2] {
                    assert!(matches!(i.operands[1], Operand::MemoryAccess(_, false)));
                }
            }
            _ => panic!("expected code section"),
        }
    }

    #[test]
    fn parses_indexed_bracket_sugar_as_a_memory_access() {
        let source = "CODE\nLD AX, value[BX]\nHALT\n";
        let (program, errors) = parse_source(source);
        assert!(errors.is_empty(), "{errors:?}");
        match &program.sections[0] {
            Section::Code(c) => {
                if let CodeItem::Instruction(i) = &c.items[0] {
                    match &i.operands[1] {
                        Operand::MemoryAccess(Expression::BinaryOp { op, lhs, rhs }, true) => {
                            assert_eq!(*op, BinaryOperator::Add);
                            assert!(matches!(**lhs, Expression::Identifier(ref n) if n == "value"));
                            assert!(matches!(**rhs, Expression::Register(ref n) if n == "BX"));
                        }
                        other => panic!("expected sugared memory access, got {other:?}"),
                    }
                } else {
                    panic!("expected instruction");
                }
            }
            _ => panic!("expected code section"),
        }
    }

    #[test]
    fn bad_line_is_recovered_and_subsequent_lines_still_parse() {
        let source = "CODE\n$$$ bad line\nLD AX, 1\n";
        let (program, errors) = parse_source(source);
        assert_eq!(errors.len(), 1);
        match &program.sections[0] {
            Section::Code(c) => assert_eq!(c.items.len(), 1),
            _ => panic!("expected code section"),
        }
    }
}
