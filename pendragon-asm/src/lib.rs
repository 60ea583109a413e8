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

//! Assembler pipeline (spec §4): lex, parse, analyze, lay out, emit. Each
//! stage either returns its result or a batch of [`AssemblyError`]s -
//! lexing and parsing accumulate everything they can find before failing,
//! everything after that is fail-fast once the program is known to be
//! syntactically sound.

pub mod ast;
pub mod emitter;
pub mod encoder;
pub mod errors;
pub mod file_reader;
pub mod layout;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod symbol_table;

use anyhow::{Context, Result};
use pendragon_isa::format::Header;

use errors::AssemblyError;

pub fn assemble(program_name: &str, source: &str) -> Result<Vec<u8>> {
    if program_name.len() > 32 {
        return Err(AssemblyError::ProgramNameTooLong(program_name.to_string()).into());
    }

    let (tokens, lex_errors) = lexer::tokenize(source);
    if !lex_errors.is_empty() {
        return Err(AssemblyError::Multiple(lex_errors).into());
    }

    let (mut program, parse_errors) = parser::parse(tokens);
    if !parse_errors.is_empty() {
        return Err(AssemblyError::Multiple(parse_errors).into());
    }

    let mut symbols = semantic::analyze(&program).map_err(AssemblyError::Multiple).context("Failed during semantic analysis")?;
    semantic::rewrite_load_sugar(&mut program, &symbols);

    let data_layout = layout::layout_data(&program, &mut symbols).context("Failed during data layout")?;
    layout::layout_code(&program, &mut symbols).context("Failed during code layout")?;

    let data_segment = emitter::emit_data(&data_layout);
    let code_segment = emitter::emit_code(&program, &symbols).context("Failed during code generation")?;

    let header = Header::new(program_name, data_segment, code_segment);
    Ok(header.encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_a_small_program_end_to_end() {
        let source = "\
DATA
greeting: DB \"Hi\"
CODE
start:
LD AX, 5
ADD 10
HALT
";
        let bytes = assemble("demo", source).unwrap();
        let decoded = Header::decode(&bytes).unwrap();
        assert_eq!(decoded.program_name, "demo");
        assert!(!decoded.code_segment.is_empty());
        assert!(!decoded.data_segment.is_empty());
    }

    #[test]
    fn lexer_errors_are_reported_as_multiple() {
        let err = assemble("demo", "CODE\n\"unterminated\n").unwrap_err();
        assert!(err.downcast_ref::<AssemblyError>().is_some());
    }

    #[test]
    fn undefined_symbol_fails_the_whole_pipeline() {
        let err = assemble("demo", "CODE\nJMP nowhere\n").unwrap_err();
        assert!(format!("{err:#}").contains("semantic analysis"));
    }

    #[test]
    fn program_name_over_32_bytes_is_rejected() {
        let long_name: String = std::iter::repeat('a').take(40).collect();
        assert!(assemble(&long_name, "CODE\nHALT\n").is_err());
    }
}
