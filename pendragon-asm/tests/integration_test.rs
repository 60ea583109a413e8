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

use pendragon_asm::assemble;
use pendragon_isa::format::Header;

#[test]
fn assembles_a_halt_only_program() {
    let bytes = assemble("halt", "CODE\nHALT\n").unwrap();
    let header = Header::decode(&bytes).unwrap();
    assert_eq!(header.program_name, "halt");
    assert_eq!(header.code_segment, vec![0x01]);
}

#[test]
fn assembles_a_loop_with_a_forward_and_backward_label() {
    let source = "\
CODE
LD AX, 3
loop:
DEC AX
JPNZ loop
HALT
";
    let bytes = assemble("loop", source).unwrap();
    let header = Header::decode(&bytes).unwrap();
    // LD AX,3 (4 bytes) + DEC AX (2) + JPNZ loop (3) + HALT (1)
    assert_eq!(header.code_segment.len(), 10);
    assert_eq!(header.code_segment[4], 0x6B); // DEC
    assert_eq!(header.code_segment[6], 0x20); // JPNZ
    // JPNZ should target the DEC instruction at offset 4.
    assert_eq!(&header.code_segment[7..9], &4u16.to_le_bytes());
}

#[test]
fn assembles_data_section_with_bracket_addressed_load() {
    let source = "\
DATA
counter: DW 0
CODE
LDA AX, [counter]
HALT
";
    let bytes = assemble("data", source).unwrap();
    let header = Header::decode(&bytes).unwrap();
    assert_eq!(header.data_segment.len(), 256);
    assert_eq!(header.code_segment[0], 0x09); // LDA reg, addr16
}

#[test]
fn unresolved_label_fails_the_whole_assembly() {
    let err = assemble("bad", "CODE\nJMP ghost\n");
    assert!(err.is_err());
}

#[test]
fn duplicate_label_is_reported_and_assembly_fails() {
    let source = "CODE\nfoo:\nHALT\nfoo:\nHALT\n";
    assert!(assemble("dup", source).is_err());
}

#[test]
fn ld_cannot_dereference_a_bracketed_operand() {
    // LD has no RegAddr row (that's LDA); bracket syntax must be rejected
    // rather than silently falling back to some other addressing mode.
    let source = "DATA\nvalue: DW 0\nCODE\nLD AX, [value]\nHALT\n";
    assert!(assemble("bad-deref", source).is_err());
}

#[test]
fn program_name_is_preserved_through_the_loader_header() {
    let bytes = assemble("my-rom", "CODE\nNOP\nHALT\n").unwrap();
    let header = Header::decode(&bytes).unwrap();
    assert_eq!(header.program_name, "my-rom");
}
