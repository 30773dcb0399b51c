use std::fmt;
use std::sync::Arc;

use anyhow::{ensure, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Invoked with the fully rendered text after every state-changing step.
pub type RenderCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub const DEFAULT_LOCALE: &str = "en";
pub const DEFAULT_PER_LETTER_DELAY: DelayRange = DelayRange::new(40, 150);
pub const DEFAULT_ERASE_DELAY: DelayRange = DelayRange::new(150, 250);
pub const FAST_FORWARD_PER_LETTER_DELAY: DelayRange = DelayRange::new(10, 20);
pub const FAST_FORWARD_ERASE_DELAY: DelayRange = DelayRange::new(10, 20);

/// Inclusive range of milliseconds, sampled uniformly per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl DelayRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> u64 {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

/// One configuration layer. Unset fields fall through to the layer below;
/// see [`resolve`] for the precedence order.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Options {
    #[serde(skip)]
    pub callback: Option<RenderCallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_letter_delay: Option<DelayRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erase_delay: Option<DelayRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_special_char_errors: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Options {
    pub fn is_empty(&self) -> bool {
        self.callback.is_none()
            && self.per_letter_delay.is_none()
            && self.erase_delay.is_none()
            && self.error_multiplier.is_none()
            && self.no_special_char_errors.is_none()
            && self.locale.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(multiplier) = self.error_multiplier {
            ensure!(
                multiplier.is_finite() && multiplier >= 0.0,
                "error_multiplier must be finite and >= 0"
            );
        }

        for (name, range) in [
            ("per_letter_delay", self.per_letter_delay),
            ("erase_delay", self.erase_delay),
        ] {
            if let Some(range) = range {
                ensure!(range.min <= range.max, "{name} min must be <= max");
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("callback", &self.callback.as_ref().map(|_| ".."))
            .field("per_letter_delay", &self.per_letter_delay)
            .field("erase_delay", &self.erase_delay)
            .field("error_multiplier", &self.error_multiplier)
            .field("no_special_char_errors", &self.no_special_char_errors)
            .field("locale", &self.locale)
            .finish()
    }
}

/// The fully merged configuration one step runs with.
#[derive(Clone)]
pub struct EffectiveOptions {
    pub callback: RenderCallback,
    pub per_letter_delay: DelayRange,
    pub erase_delay: DelayRange,
    pub error_multiplier: f64,
    pub no_special_char_errors: bool,
    pub locale: String,
}

impl EffectiveOptions {
    fn apply(&mut self, layer: &Options) {
        if let Some(callback) = &layer.callback {
            self.callback = callback.clone();
        }
        if let Some(range) = layer.per_letter_delay {
            self.per_letter_delay = range;
        }
        if let Some(range) = layer.erase_delay {
            self.erase_delay = range;
        }
        if let Some(multiplier) = layer.error_multiplier {
            self.error_multiplier = multiplier;
        }
        if let Some(flag) = layer.no_special_char_errors {
            self.no_special_char_errors = flag;
        }
        if let Some(locale) = &layer.locale {
            self.locale = locale.clone();
        }
    }
}

impl fmt::Debug for EffectiveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveOptions")
            .field("per_letter_delay", &self.per_letter_delay)
            .field("erase_delay", &self.erase_delay)
            .field("error_multiplier", &self.error_multiplier)
            .field("no_special_char_errors", &self.no_special_char_errors)
            .field("locale", &self.locale)
            .finish()
    }
}

/// Merge the option layers, lowest to highest precedence: built-in defaults,
/// engine construction options, the active instruction's overrides, and the
/// fast-forward delay overrides. Callers re-resolve on every step rather than
/// caching, since the active instruction changes as the cursor advances.
pub fn resolve(constructor: &Options, item: Option<&Options>, fast_forward: bool) -> EffectiveOptions {
    let mut effective = EffectiveOptions {
        callback: Arc::new(|_| {}),
        per_letter_delay: DEFAULT_PER_LETTER_DELAY,
        erase_delay: DEFAULT_ERASE_DELAY,
        error_multiplier: 1.0,
        no_special_char_errors: false,
        locale: DEFAULT_LOCALE.to_string(),
    };

    effective.apply(constructor);
    if let Some(item) = item {
        effective.apply(item);
    }

    if fast_forward {
        effective.per_letter_delay = FAST_FORWARD_PER_LETTER_DELAY;
        effective.erase_delay = FAST_FORWARD_ERASE_DELAY;
    }

    effective
}
