use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::Instruction;
use crate::options::{resolve, DelayRange, Options};

pub const SCRIPT_VERSION: u32 = 1;

/// A saved instruction sequence plus the base options it runs with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
    pub instructions: Vec<Instruction>,
}

impl Script {
    pub fn new(options: Options, instructions: Vec<Instruction>) -> Self {
        Self {
            version: SCRIPT_VERSION,
            options,
            instructions,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let script: Script = serde_json::from_str(json).context("failed to parse script JSON")?;

        if script.version != SCRIPT_VERSION {
            bail!(
                "unsupported script version {}; expected {SCRIPT_VERSION}",
                script.version
            );
        }

        script.options.validate()?;
        for instruction in &script.instructions {
            match instruction {
                Instruction::Type { options, .. } | Instruction::Backspace { options, .. } => {
                    options.validate()?;
                }
                Instruction::Wait { .. } => {}
            }
        }

        Ok(script)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize script")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptStats {
    pub instructions: usize,
    pub letters: usize,
    pub backspaces: usize,
    pub waits: usize,
    pub expected_ms: u64,
}

/// Expected midpoint of a delay range.
fn midpoint(range: DelayRange) -> u64 {
    range.min + range.max.saturating_sub(range.min) / 2
}

/// Walk an instruction list and total what a run of it would do, using the
/// midpoint of each resolved delay range as the duration estimate.
pub fn stats(instructions: &[Instruction], base: &Options) -> ScriptStats {
    let mut out = ScriptStats {
        instructions: instructions.len(),
        ..Default::default()
    };

    for instruction in instructions {
        match instruction {
            Instruction::Type { text, options, .. } => {
                let letters = text.chars().count();
                let effective = resolve(base, Some(options), false);
                out.letters += letters;
                out.expected_ms = out.expected_ms.saturating_add(
                    midpoint(effective.per_letter_delay).saturating_mul(letters as u64),
                );
            }
            Instruction::Backspace { length, options } => {
                let effective = resolve(base, Some(options), false);
                out.backspaces += length;
                out.expected_ms = out
                    .expected_ms
                    .saturating_add(midpoint(effective.erase_delay).saturating_mul(*length as u64));
            }
            Instruction::Wait { delay_ms } => {
                out.waits += 1;
                out.expected_ms = out.expected_ms.saturating_add(*delay_ms);
            }
        }
    }

    out
}
