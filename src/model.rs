use serde::{Deserialize, Serialize};

use crate::options::Options;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    Type {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class_name: Option<String>,
        #[serde(default, skip_serializing_if = "Options::is_empty")]
        options: Options,
    },
    Backspace {
        length: usize,
        #[serde(default, skip_serializing_if = "Options::is_empty")]
        options: Options,
    },
    Wait {
        delay_ms: u64,
    },
}

/// Engine position: the active instruction plus the sub-step within it
/// (letters typed so far, backspaces performed so far; unused for waits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub queue_index: usize,
    pub detail_index: usize,
}
