//! Code tables for fields, operations, particle types and info flags.

use crate::error::ProtocolError;
use std::fmt;

/// Type of a field record in a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    Namespace = 0,
    Set = 1,
    Key = 2,
    Digest = 4,
    DigestArray = 6,
    TransactionId = 7,
    ScanOptions = 8,
    SocketTimeout = 9,
    RecordsPerSecond = 10,
    PartitionIdArray = 11,
    DigestListArray = 12,
    MaxRecords = 13,
    BvalArray = 15,
    IndexName = 21,
    IndexRange = 22,
    IndexContext = 23,
    IndexType = 26,
    UdfFilename = 30,
    UdfFunction = 31,
    UdfArglist = 32,
    UdfOp = 33,
    QueryBinList = 40,
    BatchIndex = 41,
    BatchIndexWithSet = 42,
    FilterExpression = 43,
}

impl FieldType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Namespace => "NAMESPACE",
            FieldType::Set => "SET",
            FieldType::Key => "KEY",
            FieldType::Digest => "DIGEST",
            FieldType::DigestArray => "DIGEST_ARRAY",
            FieldType::TransactionId => "TRANSACTION_ID",
            FieldType::ScanOptions => "SCAN_OPTIONS",
            FieldType::SocketTimeout => "SOCKET_TIMEOUT",
            FieldType::RecordsPerSecond => "RECORDS_PER_SECOND",
            FieldType::PartitionIdArray => "PARTITION_ID_ARRAY",
            FieldType::DigestListArray => "DIGEST_LIST_ARRAY",
            FieldType::MaxRecords => "MAX_RECORDS",
            FieldType::BvalArray => "BVAL_ARRAY",
            FieldType::IndexName => "INDEX_NAME",
            FieldType::IndexRange => "INDEX_RANGE",
            FieldType::IndexContext => "INDEX_CONTEXT",
            FieldType::IndexType => "INDEX_TYPE",
            FieldType::UdfFilename => "UDF_FILENAME",
            FieldType::UdfFunction => "UDF_FUNCTION",
            FieldType::UdfArglist => "UDF_ARGLIST",
            FieldType::UdfOp => "UDF_OP",
            FieldType::QueryBinList => "QUERY_BINLIST",
            FieldType::BatchIndex => "BATCH_INDEX",
            FieldType::BatchIndexWithSet => "BATCH_INDEX_WITH_SET",
            FieldType::FilterExpression => "FILTER_EXPRESSION",
        }
    }
}

impl TryFrom<u8> for FieldType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => FieldType::Namespace,
            1 => FieldType::Set,
            2 => FieldType::Key,
            4 => FieldType::Digest,
            6 => FieldType::DigestArray,
            7 => FieldType::TransactionId,
            8 => FieldType::ScanOptions,
            9 => FieldType::SocketTimeout,
            10 => FieldType::RecordsPerSecond,
            11 => FieldType::PartitionIdArray,
            12 => FieldType::DigestListArray,
            13 => FieldType::MaxRecords,
            15 => FieldType::BvalArray,
            21 => FieldType::IndexName,
            22 => FieldType::IndexRange,
            23 => FieldType::IndexContext,
            26 => FieldType::IndexType,
            30 => FieldType::UdfFilename,
            31 => FieldType::UdfFunction,
            32 => FieldType::UdfArglist,
            33 => FieldType::UdfOp,
            40 => FieldType::QueryBinList,
            41 => FieldType::BatchIndex,
            42 => FieldType::BatchIndexWithSet,
            43 => FieldType::FilterExpression,
            other => {
                return Err(ProtocolError::malformed(
                    0,
                    format!("unknown field type: {}", other),
                ))
            }
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of an operation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpKind {
    Read = 1,
    Write = 2,
    CdtRead = 3,
    CdtModify = 4,
    Incr = 5,
    ExpRead = 7,
    ExpModify = 8,
    Append = 9,
    Prepend = 10,
    Touch = 11,
    BitRead = 12,
    BitModify = 13,
    DeleteAll = 14,
    HllRead = 15,
    HllModify = 16,
}

impl OpKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            OpKind::Read => "READ",
            OpKind::Write => "WRITE",
            OpKind::CdtRead => "CDT_READ",
            OpKind::CdtModify => "CDT_MODIFY",
            OpKind::Incr => "INCR",
            OpKind::ExpRead => "EXP_READ",
            OpKind::ExpModify => "EXP_MODIFY",
            OpKind::Append => "APPEND",
            OpKind::Prepend => "PREPEND",
            OpKind::Touch => "TOUCH",
            OpKind::BitRead => "BIT_READ",
            OpKind::BitModify => "BIT_MODIFY",
            OpKind::DeleteAll => "DELETE_ALL",
            OpKind::HllRead => "HLL_READ",
            OpKind::HllModify => "HLL_MODIFY",
        }
    }

    /// Returns whether the operation changes the record.
    pub fn is_write(self) -> bool {
        !matches!(
            self,
            OpKind::Read | OpKind::CdtRead | OpKind::ExpRead | OpKind::BitRead | OpKind::HllRead
        )
    }
}

impl TryFrom<u8> for OpKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => OpKind::Read,
            2 => OpKind::Write,
            3 => OpKind::CdtRead,
            4 => OpKind::CdtModify,
            5 => OpKind::Incr,
            7 => OpKind::ExpRead,
            8 => OpKind::ExpModify,
            9 => OpKind::Append,
            10 => OpKind::Prepend,
            11 => OpKind::Touch,
            12 => OpKind::BitRead,
            13 => OpKind::BitModify,
            14 => OpKind::DeleteAll,
            15 => OpKind::HllRead,
            16 => OpKind::HllModify,
            other => {
                return Err(ProtocolError::malformed(
                    0,
                    format!("unknown operation kind: {}", other),
                ))
            }
        })
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Primitive value-type tags shared by bin storage and expression values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParticleType {
    Null = 0,
    Integer = 1,
    Float = 2,
    String = 3,
    Blob = 4,
    Bool = 17,
    Hll = 18,
    Map = 19,
    List = 20,
    GeoJson = 23,
}

impl ParticleType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            ParticleType::Null => "NULL",
            ParticleType::Integer => "INTEGER",
            ParticleType::Float => "FLOAT",
            ParticleType::String => "STRING",
            ParticleType::Blob => "BLOB",
            ParticleType::Bool => "BOOL",
            ParticleType::Hll => "HLL",
            ParticleType::Map => "MAP",
            ParticleType::List => "LIST",
            ParticleType::GeoJson => "GEOJSON",
        }
    }
}

impl TryFrom<u8> for ParticleType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ParticleType::Null,
            1 => ParticleType::Integer,
            2 => ParticleType::Float,
            3 => ParticleType::String,
            4 => ParticleType::Blob,
            17 => ParticleType::Bool,
            18 => ParticleType::Hll,
            19 => ParticleType::Map,
            20 => ParticleType::List,
            23 => ParticleType::GeoJson,
            other => {
                return Err(ProtocolError::malformed(
                    0,
                    format!("unknown particle type: {}", other),
                ))
            }
        })
    }
}

impl fmt::Display for ParticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Body header flag bits.
///
/// The four info bytes travel as one big-endian word, `info1` in the most
/// significant byte. Constants here are already shifted into that word.
pub mod flags {
    const fn info1(bit: u32) -> u32 {
        bit << 24
    }
    const fn info2(bit: u32) -> u32 {
        bit << 16
    }
    const fn info3(bit: u32) -> u32 {
        bit << 8
    }

    pub const READ: u32 = info1(1 << 0);
    pub const GET_ALL: u32 = info1(1 << 1);
    pub const SHORT_QUERY: u32 = info1(1 << 2);
    pub const BATCH: u32 = info1(1 << 3);
    pub const XDR: u32 = info1(1 << 4);
    pub const GET_NO_BINS: u32 = info1(1 << 5);
    pub const READ_MODE_AP_ALL: u32 = info1(1 << 6);
    pub const COMPRESS_RESPONSE: u32 = info1(1 << 7);

    pub const WRITE: u32 = info2(1 << 0);
    pub const DELETE: u32 = info2(1 << 1);
    pub const GENERATION: u32 = info2(1 << 2);
    pub const GENERATION_GT: u32 = info2(1 << 3);
    pub const DURABLE_DELETE: u32 = info2(1 << 4);
    pub const CREATE_ONLY: u32 = info2(1 << 5);
    pub const RELAX_AP_LONG_QUERY: u32 = info2(1 << 6);
    pub const RESPOND_ALL_OPS: u32 = info2(1 << 7);

    pub const LAST: u32 = info3(1 << 0);
    pub const COMMIT_MASTER: u32 = info3(1 << 1);
    pub const PARTITION_DONE: u32 = info3(1 << 2);
    pub const UPDATE_ONLY: u32 = info3(1 << 3);
    pub const CREATE_OR_REPLACE: u32 = info3(1 << 4);
    pub const REPLACE_ONLY: u32 = info3(1 << 5);
    pub const SC_READ_TYPE: u32 = info3(1 << 6);
    pub const SC_READ_RELAX: u32 = info3(1 << 7);

    pub const TXN_VERIFY_READ: u32 = 1 << 0;
    pub const TXN_ROLL_FORWARD: u32 = 1 << 1;
    pub const TXN_ROLL_BACK: u32 = 1 << 2;
    pub const TXN_ON_LOCKING_ONLY: u32 = 1 << 4;

    /// All defined bits, in wire order, with their names.
    pub const NAMES: [(u32, &str); 28] = [
        (READ, "READ"),
        (GET_ALL, "GET_ALL"),
        (SHORT_QUERY, "SHORT_QUERY"),
        (BATCH, "BATCH"),
        (XDR, "XDR"),
        (GET_NO_BINS, "GET_NO_BINS"),
        (READ_MODE_AP_ALL, "READ_MODE_AP_ALL"),
        (COMPRESS_RESPONSE, "COMPRESS_RESPONSE"),
        (WRITE, "WRITE"),
        (DELETE, "DELETE"),
        (GENERATION, "GENERATION"),
        (GENERATION_GT, "GENERATION_GT"),
        (DURABLE_DELETE, "DURABLE_DELETE"),
        (CREATE_ONLY, "CREATE_ONLY"),
        (RELAX_AP_LONG_QUERY, "RELAX_AP_LONG_QUERY"),
        (RESPOND_ALL_OPS, "RESPOND_ALL_OPS"),
        (LAST, "LAST"),
        (COMMIT_MASTER, "COMMIT_MASTER"),
        (PARTITION_DONE, "PARTITION_DONE"),
        (UPDATE_ONLY, "UPDATE_ONLY"),
        (CREATE_OR_REPLACE, "CREATE_OR_REPLACE"),
        (REPLACE_ONLY, "REPLACE_ONLY"),
        (SC_READ_TYPE, "SC_READ_TYPE"),
        (SC_READ_RELAX, "SC_READ_RELAX"),
        (TXN_VERIFY_READ, "TXN_VERIFY_READ"),
        (TXN_ROLL_FORWARD, "TXN_ROLL_FORWARD"),
        (TXN_ROLL_BACK, "TXN_ROLL_BACK"),
        (TXN_ON_LOCKING_ONLY, "TXN_ON_LOCKING_ONLY"),
    ];

    /// Names of the bits set in `word`, in wire order.
    pub fn names(word: u32) -> Vec<&'static str> {
        NAMES
            .iter()
            .filter(|(bit, _)| word & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_codes() {
        for code in 0..=255u8 {
            if let Ok(ft) = FieldType::try_from(code) {
                assert_eq!(ft.code(), code);
            }
        }
        assert_eq!(FieldType::FilterExpression.code(), 43);
        assert!(FieldType::try_from(3).is_err());
    }

    #[test]
    fn test_op_kind_codes() {
        for code in 0..=255u8 {
            if let Ok(kind) = OpKind::try_from(code) {
                assert_eq!(kind.code(), code);
            }
        }
        assert!(OpKind::try_from(6).is_err());
        assert!(OpKind::CdtModify.is_write());
        assert!(!OpKind::ExpRead.is_write());
    }

    #[test]
    fn test_particle_type_codes() {
        assert_eq!(ParticleType::try_from(3).unwrap(), ParticleType::String);
        assert_eq!(ParticleType::try_from(20).unwrap(), ParticleType::List);
        assert!(ParticleType::try_from(5).is_err());
        assert_eq!(format!("{}", ParticleType::GeoJson), "GEOJSON");
    }

    #[test]
    fn test_flag_bits_are_distinct() {
        let mut seen = 0u32;
        for (bit, _) in flags::NAMES {
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(seen & bit, 0);
            seen |= bit;
        }
        assert_eq!(flags::READ, 0x0100_0000);
        assert_eq!(flags::WRITE, 0x0001_0000);
        assert_eq!(flags::LAST, 0x0000_0100);
    }

    #[test]
    fn test_flag_names() {
        let names = flags::names(flags::READ | flags::GET_ALL | flags::LAST);
        assert_eq!(names, vec!["READ", "GET_ALL", "LAST"]);
        assert!(flags::names(0).is_empty());
    }
}
