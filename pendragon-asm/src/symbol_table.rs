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

//! The symbol table (spec §3): every label and data definition gets an
//! entry during semantic analysis; addresses are filled in during layout.

use std::collections::HashMap;

use crate::ast::DataType;
use crate::errors::AssemblyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Label,
    Data,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub defined_at: usize,
    pub references: Vec<usize>,
    pub size_bytes: u32,
    pub address: Option<u32>,
    pub page_number: Option<u16>,
    /// `Some` for `SymbolKind::Data` symbols; tells the sugar-operand
    /// rewrite (spec §4.10.4) whether a word- or byte-width load applies.
    pub data_type: Option<DataType>,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn define(&mut self, name: &str, kind: SymbolKind, line: usize, size_bytes: u32) -> Result<(), AssemblyError> {
        if let Some(existing) = self.symbols.get(name) {
            return Err(AssemblyError::DuplicateSymbol {
                name: name.to_string(),
                line,
                first_line: existing.defined_at,
            });
        }
        self.symbols.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                kind,
                defined_at: line,
                references: Vec::new(),
                size_bytes,
                address: None,
                page_number: None,
                data_type: None,
            },
        );
        Ok(())
    }

    pub fn set_data_type(&mut self, name: &str, data_type: DataType) {
        if let Some(symbol) = self.symbols.get_mut(name) {
            symbol.data_type = Some(data_type);
        }
    }

    pub fn record_reference(&mut self, name: &str, line: usize) {
        if let Some(symbol) = self.symbols.get_mut(name) {
            symbol.references.push(line);
        }
    }

    pub fn set_address(&mut self, name: &str, address: u32, page_number: Option<u16>) {
        if let Some(symbol) = self.symbols.get_mut(name) {
            symbol.address = Some(address);
            symbol.page_number = page_number;
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn resolve(&self, name: &str, line: usize) -> Result<&Symbol, AssemblyError> {
        self.symbols.get(name).ok_or_else(|| AssemblyError::UndefinedSymbol { name: name.to_string(), line })
    }

    pub fn resolved_address(&self, name: &str, line: usize) -> Result<u32, AssemblyError> {
        let symbol = self.resolve(name, line)?;
        symbol.address.ok_or_else(|| AssemblyError::SemanticError {
            line,
            reason: format!("symbol '{name}' was never assigned an address"),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_definition_is_rejected() {
        let mut table = SymbolTable::new();
        table.define("loop", SymbolKind::Label, 1, 0).unwrap();
        assert!(matches!(
            table.define("loop", SymbolKind::Label, 5, 0),
            Err(AssemblyError::DuplicateSymbol { first_line: 1, line: 5, .. })
        ));
    }

    #[test]
    fn unresolved_symbol_errors_with_reference_line() {
        let table = SymbolTable::new();
        assert!(matches!(table.resolve("missing", 9), Err(AssemblyError::UndefinedSymbol { line: 9, .. })));
    }

    #[test]
    fn resolved_address_requires_layout_to_have_run() {
        let mut table = SymbolTable::new();
        table.define("x", SymbolKind::Data, 1, 2).unwrap();
        assert!(table.resolved_address("x", 1).is_err());
        table.set_address("x", 0x10, Some(0));
        assert_eq!(table.resolved_address("x", 1).unwrap(), 0x10);
    }
}
