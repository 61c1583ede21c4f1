//! A block that failed to parse, or whose type isn't recognised: the raw
//! bytes are kept so the file can still be written back out unchanged.

#[derive(Debug, Clone, PartialEq)]
pub struct UnreadableBlock {
    pub block_type: u8,
    pub min_version: u8,
    pub current_version: u8,
    pub data: Vec<u8>,
    pub error: String,
}
