pub mod error;
pub mod event;
pub mod horolog;
pub mod journal;
pub mod lenient;
pub mod node;
pub mod opcode;

pub use error::{Error, Result};
pub use event::{serialize, JournalEvent};
pub use horolog::Horolog;
pub use journal::{
    parse, Boundary, Commit, Detail, Header, JournalParser, JournalRecord, Mutation, RecordBody,
    Repl, Transaction, ZTransaction,
};
pub use lenient::{parse_or_default, CollectedWarnings, TracingWarnings, WarningSink};
pub use node::{parse_node_reference, NodeReference};
pub use opcode::{Opcode, OpcodeClass};
