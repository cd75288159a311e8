use bytes::Bytes;
use serde::Serialize;

/// Identifier of a drained block, unique among blocks that are still in flight.
pub type BlockId = u32;

/// One serialized telemetry entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    data: Bytes,
}

impl LogRecord {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Serializes `entry` as a single-line JSON document.
    pub fn from_entry<T: Serialize>(entry: &T) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_vec(entry)?;
        Ok(Self::new(data))
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Volume accounted against storage limits, in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl From<&'static str> for LogRecord {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<Vec<u8>> for LogRecord {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<String> for LogRecord {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A transmission-sized group of records assembled by storage at drain time.
#[derive(Debug, Clone)]
pub struct LogBlock {
    block_id: BlockId,
    records: Vec<LogRecord>,
}

impl LogBlock {
    pub fn new(block_id: BlockId, records: Vec<LogRecord>) -> Self {
        Self { block_id, records }
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn volume(&self) -> usize {
        self.records.iter().map(LogRecord::size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Event<'a> {
        level: &'a str,
        msg: &'a str,
    }

    #[test]
    fn test_record_size_is_payload_length() {
        let record = LogRecord::new(vec![0u8; 42]);
        assert_eq!(record.size(), 42);
        assert_eq!(LogRecord::from("abc").size(), 3);
    }

    #[test]
    fn test_record_from_entry_is_compact_json() {
        let record = LogRecord::from_entry(&Event {
            level: "info",
            msg: "started",
        })
        .unwrap();

        assert_eq!(record.data().as_ref(), br#"{"level":"info","msg":"started"}"#);
    }

    #[test]
    fn test_block_volume_sums_records() {
        let block = LogBlock::new(7, vec![LogRecord::from("12345"), LogRecord::from("678")]);
        assert_eq!(block.block_id(), 7);
        assert_eq!(block.len(), 2);
        assert_eq!(block.volume(), 8);
        assert!(!block.is_empty());
    }
}
