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

//! The binary loader format (spec §4.13/§6): little-endian throughout, a
//! small header naming the machine and the program, followed by a
//! size-prefixed data segment and a size-prefixed code segment.

use thiserror::Error;

pub const MACHINE_NAME: &str = "Pendragon";
pub const MACHINE_VERSION: MachineVersion = MachineVersion { major: 0, minor: 1, revision_hi: 0, revision_lo: 0 };
pub const HEADER_VERSION: MachineVersion = MACHINE_VERSION;
const MAX_PROGRAM_NAME: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineVersion {
    pub major: u8,
    pub minor: u8,
    pub revision_hi: u8,
    pub revision_lo: u8,
}

impl MachineVersion {
    fn to_bytes(self) -> [u8; 4] {
        [self.major, self.minor, self.revision_hi, self.revision_lo]
    }

    fn from_bytes(b: [u8; 4]) -> Self {
        MachineVersion { major: b[0], minor: b[1], revision_hi: b[2], revision_lo: b[3] }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("loader image truncated: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("machine name mismatch: expected \"{expected}\", found \"{found}\"")]
    WrongMachine { expected: String, found: String },
    #[error("program name is not valid ASCII")]
    InvalidProgramName,
}

/// A fully assembled program ready to be written to disk or loaded into a
/// code/data context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub program_name: String,
    pub data_segment: Vec<u8>,
    pub code_segment: Vec<u8>,
}

impl Header {
    pub fn new(program_name: &str, data_segment: Vec<u8>, code_segment: Vec<u8>) -> Self {
        let truncated: String = program_name.chars().take(MAX_PROGRAM_NAME).collect();
        Header { program_name: truncated, data_segment, code_segment }
    }

    /// Serialize to the on-disk loader format.
    pub fn encode(&self) -> Vec<u8> {
        let mut header_body = Vec::new();
        header_body.extend_from_slice(&HEADER_VERSION.to_bytes());
        header_body.push(MACHINE_NAME.len() as u8);
        header_body.extend_from_slice(MACHINE_NAME.as_bytes());
        header_body.extend_from_slice(&MACHINE_VERSION.to_bytes());
        let name_bytes = self.program_name.as_bytes();
        header_body.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        header_body.extend_from_slice(name_bytes);

        let mut out = Vec::new();
        out.extend_from_slice(&(header_body.len() as u16).to_le_bytes());
        out.extend_from_slice(&header_body);
        out.extend_from_slice(&(self.data_segment.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.data_segment);
        out.extend_from_slice(&(self.code_segment.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.code_segment);
        out
    }

    /// Parse a byte image produced by [`Header::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Header, LoaderError> {
        let mut cursor = Cursor::new(bytes);
        let header_size = cursor.take_u16()? as usize;
        let header_start = cursor.pos;
        let _version = MachineVersion::from_bytes(cursor.take_array()?);
        let name_len = cursor.take_u8()? as usize;
        let name_bytes = cursor.take_n(name_len)?;
        let machine_name = std::str::from_utf8(name_bytes)
            .map_err(|_| LoaderError::InvalidProgramName)?
            .to_string();
        if machine_name != MACHINE_NAME {
            return Err(LoaderError::WrongMachine { expected: MACHINE_NAME.to_string(), found: machine_name });
        }
        let _machine_version = MachineVersion::from_bytes(cursor.take_array()?);
        let program_name_len = cursor.take_u16()? as usize;
        let program_name_bytes = cursor.take_n(program_name_len)?;
        let program_name = std::str::from_utf8(program_name_bytes)
            .map_err(|_| LoaderError::InvalidProgramName)?
            .to_string();
        // Skip any header bytes this reader doesn't know about (forward compatibility).
        cursor.pos = header_start + header_size;

        let data_len = cursor.take_u32()? as usize;
        let data_segment = cursor.take_n(data_len)?.to_vec();
        let code_len = cursor.take_u32()? as usize;
        let code_segment = cursor.take_n(code_len)?.to_vec();

        Ok(Header { program_name, data_segment, code_segment })
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn take_n(&mut self, n: usize) -> Result<&'a [u8], LoaderError> {
        if self.pos + n > self.bytes.len() {
            return Err(LoaderError::Truncated { expected: self.pos + n, found: self.bytes.len() });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, LoaderError> {
        Ok(self.take_n(1)?[0])
    }

    fn take_u16(&mut self) -> Result<u16, LoaderError> {
        let b = self.take_n(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn take_u32(&mut self) -> Result<u32, LoaderError> {
        let b = self.take_n(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], LoaderError> {
        let b = self.take_n(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(b);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_data_and_code_segments() {
        let header = Header::new("hello", vec![1, 2, 3], vec![0x01, 0x02, 0x10]);
        let bytes = header.encode();
        let decoded = Header::decode(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn program_name_truncates_silently_past_32_chars() {
        let long_name: String = std::iter::repeat('a').take(50).collect();
        let header = Header::new(&long_name, vec![], vec![]);
        assert_eq!(header.program_name.len(), 32);
    }

    #[test]
    fn rejects_wrong_machine_name() {
        let mut bytes = Header::new("p", vec![], vec![]).encode();
        // Corrupt the machine-name length byte's following text.
        let machine_name_len_pos = 2 + 4; // header_size(2) + version(4)
        bytes[machine_name_len_pos + 1] = b'X';
        assert!(matches!(Header::decode(&bytes), Err(LoaderError::WrongMachine { .. })));
    }

    #[test]
    fn rejects_truncated_image() {
        let bytes = Header::new("p", vec![1, 2, 3], vec![4, 5]).encode();
        let truncated = &bytes[..bytes.len() - 1];
        assert!(Header::decode(truncated).is_err());
    }
}
