//! Byte signatures for the host's internal chat functions.
//!
//! A `SignatureSet` is a versioned table of named patterns. The built-in set
//! targets the current client; a JSON file with the same shape can replace it
//! when a patch moves the code.

mod scanner;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{Error, Result};

pub use scanner::SignatureScanner;

/// Accessor returning the live UI module instance
pub const UI_ACCESSOR: &str = "uiAccessor";
/// Routine that submits a chat line
pub const SEND_CHAT: &str = "sendChat";
/// Static slot holding the framework instance passed to the accessor
pub const UI_MODULE_STATIC: &str = "uiModuleStatic";

/// How a match is turned into an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum SignatureKind {
    /// A function entry point. A leading relative `call`/`jmp` is followed.
    CodePointer,
    /// A static address referenced by a RIP-relative operand in the pattern.
    StaticDataPointer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub pattern: String,
    pub kind: SignatureKind,
    /// Added to the match address before it is interpreted
    #[serde(default)]
    pub offset: i64,
}

impl Signature {
    pub fn new(name: &str, pattern: &str, kind: SignatureKind) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            kind,
            offset: 0,
        }
    }

    pub fn pattern_bytes(&self) -> Result<Vec<Option<u8>>> {
        parse_pattern(&self.pattern)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSet {
    pub version: String,
    pub signatures: Vec<Signature>,
}

impl SignatureSet {
    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.signatures
            .iter()
            .find(|signature| signature.name.eq_ignore_ascii_case(name))
    }

    /// Look up a signature that must be present.
    pub fn require(&self, name: &str) -> Result<&Signature> {
        self.get(name).ok_or_else(|| {
            Error::InvalidSignature(format!(
                "Signature '{}' missing from set {}",
                name, self.version
            ))
        })
    }
}

impl Default for SignatureSet {
    fn default() -> Self {
        builtin_signatures()
    }
}

pub fn load_signatures<P: AsRef<Path>>(path: P) -> Result<SignatureSet> {
    let content = fs::read_to_string(&path)?;
    let set: SignatureSet = serde_json::from_str(&content)?;
    for signature in &set.signatures {
        signature.pattern_bytes()?;
    }
    Ok(set)
}

pub fn save_signatures<P: AsRef<Path>>(path: P, signatures: &SignatureSet) -> Result<()> {
    let content = serde_json::to_string_pretty(signatures)?;
    fs::write(path, content)?;
    Ok(())
}

/// Parse `"48 8B 0D ?? ?? ?? ??"` into bytes with `None` wildcards.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidSignature(format!("Invalid signature token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidSignature(
            "Signature pattern is empty".to_string(),
        ));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn builtin_signatures() -> SignatureSet {
    SignatureSet {
        version: "*".to_string(),
        signatures: vec![
            Signature::new(
                UI_ACCESSOR,
                "E8 ?? ?? ?? ?? 48 83 7F ?? 00 48 8B F0",
                SignatureKind::CodePointer,
            ),
            Signature::new(
                SEND_CHAT,
                "48 89 5C 24 ?? 57 48 83 EC 20 48 8B FA 48 8B D9 45 84 C9",
                SignatureKind::CodePointer,
            ),
            Signature::new(
                UI_MODULE_STATIC,
                "48 8B 0D ?? ?? ?? ?? 48 8D 54 24 ?? 48 83 C1 10 E8 ?? ?? ?? ??",
                SignatureKind::StaticDataPointer,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern_with_wildcards() {
        let bytes = parse_pattern("48 8B 0D ?? ? ?? ??").unwrap();
        assert_eq!(bytes.len(), 7);
        assert_eq!(bytes[0], Some(0x48));
        assert_eq!(bytes[2], Some(0x0D));
        assert!(bytes[3..].iter().all(Option::is_none));
    }

    #[test]
    fn test_parse_pattern_rejects_garbage() {
        assert!(matches!(
            parse_pattern("48 ZZ"),
            Err(Error::InvalidSignature(_))
        ));
        assert!(matches!(parse_pattern("   "), Err(Error::InvalidSignature(_))));
    }

    #[test]
    fn test_format_pattern() {
        let pattern = vec![Some(0xE8), None, None, Some(0x0F)];
        assert_eq!(format_pattern(&pattern), "E8 ?? ?? 0F");
    }

    #[test]
    fn test_builtin_set_is_complete() {
        let set = builtin_signatures();
        for name in [UI_ACCESSOR, SEND_CHAT, UI_MODULE_STATIC] {
            let signature = set.require(name).unwrap();
            assert!(signature.pattern_bytes().is_ok(), "{} must parse", name);
        }
        assert_eq!(
            set.require(UI_MODULE_STATIC).unwrap().kind,
            SignatureKind::StaticDataPointer
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let set = builtin_signatures();
        assert!(set.get("SENDCHAT").is_some());
        assert!(set.get("missing").is_none());
        assert!(set.require("missing").is_err());
    }

    #[test]
    fn test_save_and_load_signatures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signatures.json");
        let mut set = builtin_signatures();
        set.version = "2024.01".to_string();
        set.signatures[0].offset = 2;

        save_signatures(&path, &set).unwrap();
        assert_eq!(load_signatures(&path).unwrap(), set);
    }

    #[test]
    fn test_load_rejects_bad_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signatures.json");
        fs::write(
            &path,
            r#"{"version":"x","signatures":[{"name":"sendChat","pattern":"GG","kind":"CodePointer"}]}"#,
        )
        .unwrap();

        assert!(matches!(
            load_signatures(&path),
            Err(Error::InvalidSignature(_))
        ));
    }
}
