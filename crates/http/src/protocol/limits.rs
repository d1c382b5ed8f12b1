use serde::Deserialize;

use crate::protocol::keyvalue::{DEFAULT_MAX_KEY_LEN, DEFAULT_MAX_VALUE_LEN};
use crate::protocol::KeyValueList;

/// Size bounds enforced while decoding a message.
///
/// Inputs exceeding a bound are rejected with a [`ParseError`](crate::protocol::ParseError),
/// never truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserLimits {
    /// Upper bound for a whole message: start line, headers and entity
    pub max_message_size: usize,
    /// Upper bound for a single start line or header line
    pub max_line_len: usize,
    pub max_key_len: usize,
    pub max_value_len: usize,
    pub max_headers: usize,
}

impl ParserLimits {
    pub fn new_key_value_list(&self) -> KeyValueList {
        KeyValueList::with_limits(self.max_key_len, self.max_value_len)
    }
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_message_size: 16 * 1024,
            max_line_len: 512,
            max_key_len: DEFAULT_MAX_KEY_LEN,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            max_headers: 64,
        }
    }
}
