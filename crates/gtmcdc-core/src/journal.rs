//! GT.M journal extract records.
//!
//! One extract line is a backslash-separated list of fields whose layout
//! depends on the opcode:
//!
//! ```text
//! NULL    = "00"\time\tnum\pid\clntpid\jsnum\strm_num\strm_seq\salvaged
//! PINI    = "01"\time\tnum\pid\nnam\unam\term\clntpid\clntnnam\clntunam\clntterm
//! PFIN    = "02"\time\tnum\pid\clntpid
//! EOF     = "03"\time\tnum\pid\clntpid\jsnum
//! KILL    = "04"\time\tnum\pid\clntpid\token_seq\strm_num\strm_seq\updnum\nodeflags\node
//! SET     = "05"\time\tnum\pid\clntpid\token_seq\strm_num\strm_seq\updnum\nodeflags\node=sarg
//! ZTSTART = "06"\time\tnum\pid\clntpid\token
//! ZTCOM   = "07"\time\tnum\pid\clntpid\token\partners
//! TSTART  = "08"\time\tnum\pid\clntpid\token_seq\strm_num\strm_seq
//! TCOM    = "09"\time\tnum\pid\clntpid\token_seq\strm_num\strm_seq\partners\tid
//! ZKILL   = "10"\time\tnum\pid\clntpid\token_seq\strm_num\strm_seq\updnum\nodeflags\node
//! ZTWORM  = "11"\time\tnum\pid\clntpid\token_seq\strm_num\strm_seq\updnum\ztwormhole
//! ZTRIG   = "12"\time\tnum\pid\clntpid\token_seq\strm_num\strm_seq\updnum\nodeflags\node
//! LGTRIG  = "13"\time\tnum\pid\clntpid\token_seq\strm_num\strm_seq\updnum\trigdefinition
//! ```

use std::str::FromStr;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::horolog;
use crate::lenient::{parse_or_default, TracingWarnings, WarningSink};
use crate::opcode::{Opcode, OpcodeClass};

/// Minimum number of fields in any record.
pub const MIN_FIELDS: usize = 5;

/// Fields common to every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// Seconds since the horolog origin; 0 for heartbeat records.
    pub timestamp: i64,
    pub pid: i64,
    pub client_pid: i64,
}

/// Replication stream bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Repl {
    pub stream_num: i64,
    pub stream_seq: i64,
    pub journal_seq: i64,
}

/// Transaction identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub token: String,
    pub num: String,
    pub token_seq: i64,
    pub update_num: i64,
    pub partners: String,
    pub tag: String,
}

/// The node reference and payload of a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detail {
    pub node_flags: String,
    pub value: String,
}

/// A SET, KILL, ZKILL or ZTRIG entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub token_seq: i64,
    pub update_num: i64,
    pub stream_num: i64,
    pub stream_seq: i64,
    /// The raw `^NAME(subs)` reference.
    pub node: String,
    /// Right-hand side of `=`, quotes stripped. `None` when there is no `=`.
    pub value: Option<String>,
}

/// Partner list and tag carried by a TCOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub partners: String,
    pub tag: String,
}

/// A TSTART or TCOM entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub token_seq: i64,
    pub stream_num: i64,
    pub stream_seq: i64,
    /// Present for TCOM only.
    pub commit: Option<Commit>,
}

/// A ZTSTART or ZTCOM entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZTransaction {
    pub token: String,
    /// Present for ZTCOM only.
    pub partners: Option<String>,
}

/// Opcode-specific part of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    Mutation(Mutation),
    TransactionBoundary(Boundary),
    ZTransaction(ZTransaction),
    Informational,
}

/// A decoded journal extract line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRecord {
    pub opcode: Opcode,
    pub header: Header,
    pub transaction_num: String,
    pub body: RecordBody,
}

impl JournalRecord {
    pub fn repl(&self) -> Repl {
        match &self.body {
            RecordBody::Mutation(m) => Repl {
                stream_num: m.stream_num,
                stream_seq: m.stream_seq,
                journal_seq: 0,
            },
            RecordBody::TransactionBoundary(b) => Repl {
                stream_num: b.stream_num,
                stream_seq: b.stream_seq,
                journal_seq: 0,
            },
            RecordBody::ZTransaction(_) | RecordBody::Informational => Repl::default(),
        }
    }

    /// Flat view of the transaction fields; fields outside the record's
    /// class are empty or zero.
    pub fn transaction(&self) -> Transaction {
        let mut tran = Transaction {
            num: self.transaction_num.clone(),
            ..Default::default()
        };

        match &self.body {
            RecordBody::Mutation(m) => {
                tran.token_seq = m.token_seq;
                tran.update_num = m.update_num;
            }
            RecordBody::TransactionBoundary(b) => {
                tran.token_seq = b.token_seq;
                if let Some(commit) = &b.commit {
                    tran.partners = commit.partners.clone();
                    tran.tag = commit.tag.clone();
                }
            }
            RecordBody::ZTransaction(z) => {
                tran.token = z.token.clone();
                tran.partners = z.partners.clone().unwrap_or_default();
            }
            RecordBody::Informational => {}
        }

        tran
    }

    pub fn detail(&self) -> Detail {
        match &self.body {
            RecordBody::Mutation(m) => Detail {
                node_flags: m.node.clone(),
                value: m.value.clone().unwrap_or_default(),
            },
            _ => Detail::default(),
        }
    }

    /// The `|`-separated parts of a mutation value, empty when there is none.
    pub fn node_values(&self) -> Vec<&str> {
        match &self.body {
            RecordBody::Mutation(Mutation {
                value: Some(value), ..
            }) => value.split('|').collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_mutation(&self) -> Option<&Mutation> {
        match &self.body {
            RecordBody::Mutation(m) => Some(m),
            _ => None,
        }
    }

    /// Calendar time of the record, `None` for a heartbeat timestamp.
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        if self.header.timestamp == 0 {
            return None;
        }
        horolog::Horolog::from_timestamp(self.header.timestamp)
            .and_then(horolog::Horolog::to_datetime)
            .ok()
    }
}

impl FromStr for JournalRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        JournalParser::new().parse(s)
    }
}

/// Positional access to the fields of one line.
struct Fields<'a, W: ?Sized> {
    raw: Vec<&'a str>,
    warnings: &'a W,
}

impl<'a, W: WarningSink + ?Sized> Fields<'a, W> {
    fn text(&self, index: usize) -> &'a str {
        self.raw.get(index).copied().unwrap_or("")
    }

    fn int(&self, index: usize, name: &'static str) -> i64 {
        parse_or_default(self.text(index), name, self.warnings)
    }

    fn last(&self) -> &'a str {
        self.raw.last().copied().unwrap_or("")
    }

    fn len(&self) -> usize {
        self.raw.len()
    }
}

/// Decodes journal extract lines into [`JournalRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct JournalParser<W = TracingWarnings> {
    warnings: W,
}

impl JournalParser<TracingWarnings> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<W: WarningSink> JournalParser<W> {
    /// Report malformed numeric fields to `warnings`.
    pub fn with_warnings(warnings: W) -> Self {
        Self { warnings }
    }

    /// Parse one extract line.
    ///
    /// Only a short line or a bad timestamp is an error; malformed numeric
    /// fields become 0 and are reported to the warning sink.
    pub fn parse(&self, line: &str) -> Result<JournalRecord> {
        let fields = Fields {
            raw: line.split('\\').collect(),
            warnings: &self.warnings,
        };

        if fields.len() < MIN_FIELDS {
            return Err(Error::InvalidRecord {
                expected: MIN_FIELDS,
                actual: fields.len(),
            });
        }

        let opcode = Opcode::from_code(fields.text(0));
        let timestamp = horolog::decode(fields.text(1))?;

        let client_pid = if opcode == Opcode::Pini && fields.len() >= 8 {
            fields.int(7, "client_pid")
        } else {
            fields.int(4, "client_pid")
        };

        let header = Header {
            timestamp,
            pid: fields.int(3, "pid"),
            client_pid,
        };

        let body = match opcode.class() {
            OpcodeClass::Mutation => RecordBody::Mutation(parse_mutation(&fields)),
            OpcodeClass::TransactionBoundary => {
                RecordBody::TransactionBoundary(parse_boundary(&fields, opcode))
            }
            OpcodeClass::ZTransaction => RecordBody::ZTransaction(ZTransaction {
                token: fields.text(5).to_string(),
                partners: (opcode == Opcode::ZtCom).then(|| fields.text(6).to_string()),
            }),
            OpcodeClass::Informational => {
                if opcode.is_unknown() {
                    info!(journal = line, "unknown journal entry");
                } else {
                    debug!(journal = line, opcode = %opcode, "journal entry ignored");
                }
                RecordBody::Informational
            }
        };

        Ok(JournalRecord {
            opcode,
            header,
            transaction_num: fields.text(2).to_string(),
            body,
        })
    }
}

/// The node and value are split at the first `=` of the last field. A `=`
/// inside a quoted subscript, as in `^x("a=b")="v"`, therefore ends the node
/// early and the record later fails node parsing.
fn parse_mutation<W: WarningSink + ?Sized>(fields: &Fields<'_, W>) -> Mutation {
    let (node, value) = match fields.last().split_once('=') {
        Some((node, value)) => (node, Some(strip_quotes(value).to_string())),
        None => (fields.last(), None),
    };

    Mutation {
        token_seq: fields.int(5, "token_seq"),
        stream_num: fields.int(6, "stream_num"),
        stream_seq: fields.int(7, "stream_seq"),
        update_num: fields.int(8, "update_num"),
        node: node.to_string(),
        value,
    }
}

fn parse_boundary<W: WarningSink + ?Sized>(fields: &Fields<'_, W>, opcode: Opcode) -> Boundary {
    // A transaction start has no partner list yet.
    let commit = (opcode == Opcode::TCom).then(|| Commit {
        partners: fields.text(8).to_string(),
        tag: fields.text(9).to_string(),
    });

    Boundary {
        token_seq: fields.int(5, "token_seq"),
        stream_num: fields.int(6, "stream_num"),
        stream_seq: fields.int(7, "stream_seq"),
        commit,
    }
}

/// Remove exactly one pair of enclosing double quotes.
fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Parse a line with the default parser.
pub fn parse(line: &str) -> Result<JournalRecord> {
    JournalParser::new().parse(line)
}
