use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The journal entry type, from the two-digit code in the first field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Opcode {
    Null,
    Pini,
    Pfin,
    Eof,
    Kill,
    Set,
    ZtStart,
    ZtCom,
    TStart,
    TCom,
    ZKill,
    ZtWorm,
    ZTrig,
    LgTrig,
    /// A code outside the table. Not an error.
    #[default]
    Unknown,
}

/// Field layout family of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeClass {
    /// SET, KILL, ZKILL, ZTRIG: carry a node reference.
    Mutation,
    /// TSTART, TCOM.
    TransactionBoundary,
    /// ZTSTART, ZTCOM: carry a fence token.
    ZTransaction,
    /// Everything else; nothing past the header is decoded.
    Informational,
}

const CODES: [(&str, Opcode); 14] = [
    ("00", Opcode::Null),
    ("01", Opcode::Pini),
    ("02", Opcode::Pfin),
    ("03", Opcode::Eof),
    ("04", Opcode::Kill),
    ("05", Opcode::Set),
    ("06", Opcode::ZtStart),
    ("07", Opcode::ZtCom),
    ("08", Opcode::TStart),
    ("09", Opcode::TCom),
    ("10", Opcode::ZKill),
    ("11", Opcode::ZtWorm),
    ("12", Opcode::ZTrig),
    ("13", Opcode::LgTrig),
];

impl Opcode {
    /// Resolve a two-digit numeric code.
    pub fn from_code(code: &str) -> Self {
        CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, op)| *op)
            .unwrap_or(Opcode::Unknown)
    }

    /// Resolve an operand name such as `SET`. The empty string is `Unknown`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.is_empty() {
            return Some(Opcode::Unknown);
        }
        CODES
            .iter()
            .map(|(_, op)| *op)
            .find(|op| op.name() == name)
    }

    /// The two-digit code, `None` for `Unknown`.
    pub fn code(self) -> Option<&'static str> {
        CODES.iter().find(|(_, op)| *op == self).map(|(c, _)| *c)
    }

    /// The operand name; empty for `Unknown`.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Null => "NULL",
            Opcode::Pini => "PINI",
            Opcode::Pfin => "PFIN",
            Opcode::Eof => "EOF",
            Opcode::Kill => "KILL",
            Opcode::Set => "SET",
            Opcode::ZtStart => "ZTSTART",
            Opcode::ZtCom => "ZTCOM",
            Opcode::TStart => "TSTART",
            Opcode::TCom => "TCOM",
            Opcode::ZKill => "ZKILL",
            Opcode::ZtWorm => "ZTWORM",
            Opcode::ZTrig => "ZTRIG",
            Opcode::LgTrig => "LGTRIG",
            Opcode::Unknown => "",
        }
    }

    pub fn class(self) -> OpcodeClass {
        match self {
            Opcode::Set | Opcode::Kill | Opcode::ZKill | Opcode::ZTrig => OpcodeClass::Mutation,
            Opcode::TStart | Opcode::TCom => OpcodeClass::TransactionBoundary,
            Opcode::ZtStart | Opcode::ZtCom => OpcodeClass::ZTransaction,
            Opcode::Null
            | Opcode::Pini
            | Opcode::Pfin
            | Opcode::Eof
            | Opcode::ZtWorm
            | Opcode::LgTrig
            | Opcode::Unknown => OpcodeClass::Informational,
        }
    }

    pub fn is_mutation(self) -> bool {
        self.class() == OpcodeClass::Mutation
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Opcode::Unknown)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Opcode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Opcode::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown operand: {}", name)))
    }
}
