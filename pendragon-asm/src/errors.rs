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

//! Assembler error taxonomy. Lexing and parsing accumulate every error they
//! find (spec §4.9: multi-error reporting) rather than stopping at the
//! first one; everything past that point is a single fail-fast `Result`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("{line}:{col}: lex error: {reason}")]
    LexError { line: usize, col: usize, reason: String },

    #[error("{line}:{col}: syntax error: {reason}")]
    ParseError { line: usize, col: usize, reason: String },

    #[error("{} error(s) found while assembling", .0.len())]
    Multiple(Vec<AssemblyError>),

    #[error("line {line}: semantic error: {reason}")]
    SemanticError { line: usize, reason: String },

    #[error("undefined symbol '{name}' referenced on line {line}")]
    UndefinedSymbol { name: String, line: usize },

    #[error("symbol '{name}' redefined on line {line}, first defined on line {first_line}")]
    DuplicateSymbol { name: String, line: usize, first_line: usize },

    #[error("line {line}: register operand expected, found '{found}'")]
    ExpectedRegister { line: usize, found: String },

    #[error("line {line}: value {value} does not fit in {bits} bits")]
    ValueOutOfRange { line: usize, value: i64, bits: u32 },

    #[error("line {line}: unknown mnemonic '{mnemonic}'")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: no opcode encoding of '{mnemonic}' matches the given operands")]
    NoMatchingEncoding { line: usize, mnemonic: String },

    #[error("program name '{0}' exceeds the 32-byte limit")]
    ProgramNameTooLong(String),

    #[error(transparent)]
    Loader(#[from] pendragon_isa::format::LoaderError),
}
