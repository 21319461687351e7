use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::journal::JournalRecord;
use crate::node::parse_node_reference;
use crate::opcode::Opcode;

/// The change event published for a journal record.
///
/// Field order is the JSON key order. Empty strings and lists are omitted;
/// numeric fields are always written, including zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalEvent {
    #[serde(skip_serializing_if = "Opcode::is_unknown")]
    pub operand: Opcode,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub transaction_num: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    pub token_seq: i64,
    pub update_num: i64,
    pub stream_num: i64,
    pub stream_seq: i64,
    pub journal_seq: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub partners: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub transaction_tag: String,
    #[serde(rename = "pid")]
    pub process_id: i64,
    #[serde(rename = "client_pid")]
    pub client_process_id: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub global: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subscripts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub node_values: Vec<String>,
    pub time_stamp: i64,
}

impl JournalEvent {
    /// Project a record. Fails only when a mutation's node reference is
    /// malformed.
    pub fn from_record(rec: &JournalRecord) -> Result<Self> {
        let tran = rec.transaction();
        let repl = rec.repl();

        let mut event = JournalEvent {
            operand: rec.opcode,
            transaction_num: tran.num,
            token: tran.token,
            token_seq: tran.token_seq,
            update_num: tran.update_num,
            stream_num: repl.stream_num,
            stream_seq: repl.stream_seq,
            journal_seq: repl.journal_seq,
            partners: tran.partners,
            transaction_tag: tran.tag,
            process_id: rec.header.pid,
            client_process_id: rec.header.client_pid,
            time_stamp: rec.header.timestamp,
            ..Default::default()
        };

        if let Some(mutation) = rec.as_mutation() {
            let node = parse_node_reference(&mutation.node)
                .map_err(|e| Error::SerializationError(e.to_string()))?;
            event.key = node.key().to_string();
            event.subscripts = node.rest().to_vec();
            event.global = node.global;
            event.node_values = rec.node_values().into_iter().map(str::to_string).collect();
        }

        Ok(event)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Serialize a record into its JSON change event.
pub fn serialize(rec: &JournalRecord) -> Result<String> {
    JournalEvent::from_record(rec)?.to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::parse;

    #[test]
    fn test_serialize_set() {
        let rec = parse(r#"05\65282,59700\28\0\0\28\0\0\0\0\^acc("00027")="300.00""#).unwrap();
        let json = serialize(&rec).unwrap();
        assert_eq!(
            json,
            r#"{"operand":"SET","transaction_num":"28","token_seq":28,"update_num":0,"stream_num":0,"stream_seq":0,"journal_seq":0,"pid":0,"client_pid":0,"global":"ACC","key":"\"00027\"","node_values":["300.00"],"time_stamp":1569515700}"#
        );
    }

    #[test]
    fn test_serialize_subscripts() {
        let rec = parse(r#"05\65282,59700\30\1\2\3\4\5\6\0\^ACN(5877000047,51,"x")="1|2""#).unwrap();
        let event = JournalEvent::from_record(&rec).unwrap();
        assert_eq!(event.global, "ACN");
        assert_eq!(event.key, "5877000047");
        assert_eq!(event.subscripts, vec!["51", r#""x""#]);
        assert_eq!(event.node_values, vec!["1", "2"]);
        assert_eq!(event.token_seq, 3);
        assert_eq!(event.stream_num, 4);
        assert_eq!(event.stream_seq, 5);
        assert_eq!(event.update_num, 6);
    }

    #[test]
    fn test_serialize_tcom() {
        let rec = parse(r#"09\65282,59700\40\9\8\5\1\101\1\BATCH"#).unwrap();
        let json = serialize(&rec).unwrap();
        assert_eq!(
            json,
            r#"{"operand":"TCOM","transaction_num":"40","token_seq":5,"update_num":0,"stream_num":1,"stream_seq":101,"journal_seq":0,"partners":"1","transaction_tag":"BATCH","pid":9,"client_pid":8,"time_stamp":1569515700}"#
        );
    }

    #[test]
    fn test_serialize_informational_omits_node_fields() {
        let rec = parse(r#"00\0,0\\0\0\0\0\0\0"#).unwrap();
        let json = serialize(&rec).unwrap();
        assert_eq!(
            json,
            r#"{"operand":"NULL","token_seq":0,"update_num":0,"stream_num":0,"stream_seq":0,"journal_seq":0,"pid":0,"client_pid":0,"time_stamp":0}"#
        );
    }

    #[test]
    fn test_serialize_unknown_opcode_omits_operand() {
        let rec = parse(r#"42\0,0\7\0\0"#).unwrap();
        let json = serialize(&rec).unwrap();
        assert!(json.starts_with(r#"{"transaction_num":"7","token_seq":0"#));
    }

    #[test]
    fn test_serialize_invalid_node_is_serialization_error() {
        let rec = parse(r#"05\65282,59700\28\0\0\28\0\0\0\0\garbage=1"#).unwrap();
        let err = serialize(&rec).unwrap_err();
        assert!(matches!(err, Error::SerializationError(_)));
        assert!(!err.is_parse_error());
    }

    #[test]
    fn test_serialize_kill_has_no_node_values() {
        let rec = parse(r#"04\65282,59700\31\12\13\2\1\7\3\0\^ACN(1)"#).unwrap();
        let event = JournalEvent::from_record(&rec).unwrap();
        assert!(event.node_values.is_empty());
        assert_eq!(event.key, "1");
        assert!(event.subscripts.is_empty());
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let rec = parse(r#"05\65282,59700\28\0\0\28\0\0\0\0\^acc(1,2)="a|b""#).unwrap();
        assert_eq!(serialize(&rec).unwrap(), serialize(&rec).unwrap());
    }

    #[test]
    fn test_event_deserializes_sparse_json() {
        let rec = parse(r#"09\65282,59700\40\9\8\5\1\101\1\BATCH"#).unwrap();
        let event = JournalEvent::from_record(&rec).unwrap();
        let back: JournalEvent = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(back, event);
    }
}
