use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::keyboard::{self, KeyboardLayout};
use crate::model::{Cursor, Instruction};
use crate::options::{resolve, EffectiveOptions, Options, DEFAULT_LOCALE};
use crate::render::RunBuffer;
use crate::reset::Resetter;

/// Per-item configuration for [`Typist::type_with`].
#[derive(Debug, Clone, Default)]
pub struct TypeOpts {
    pub class_name: Option<String>,
    pub overrides: Options,
}

/// The queue engine: owns the instruction list and steps through it one
/// atomic unit at a time, reporting every new rendering through the resolved
/// callback.
#[derive(Debug)]
pub struct Typist {
    queue: Vec<Instruction>,
    cursor: Cursor,
    results: RunBuffer,
    letters_since_error: u32,
    options: Options,
    layouts: HashMap<String, KeyboardLayout>,
    resetter: Resetter,
    fast_forward: Arc<AtomicBool>,
    rng: StdRng,
}

/// Cloneable control surface for an engine that is suspended in
/// [`Typist::run`]. Reset and fast-forward are the only operations an outside
/// caller may perform mid-run; the queue and result buffer stay with the
/// engine.
#[derive(Debug, Clone)]
pub struct TypistHandle {
    resetter: Resetter,
    fast_forward: Arc<AtomicBool>,
}

impl TypistHandle {
    /// Cancel the in-flight run: any pending delay resolves immediately and
    /// no further mutation or rendering happens. The run resolves normally.
    pub fn reset(&self) {
        self.resetter.reset();
    }

    /// Shorten future delays, skip waits, and cut the currently pending
    /// delay short. The run continues to completion faster.
    pub fn fast_forward(&self, enabled: bool) {
        self.fast_forward.store(enabled, Ordering::SeqCst);
        if enabled {
            self.resetter.interrupt();
        }
    }

    pub fn is_reset(&self) -> bool {
        self.resetter.is_reset()
    }
}

impl Typist {
    pub fn new(options: Options) -> Self {
        Self::with_rng(options, StdRng::from_entropy())
    }

    /// Engine with a caller-provided RNG, for reproducible runs.
    pub fn with_rng(options: Options, rng: StdRng) -> Self {
        let mut layouts = HashMap::new();
        layouts.insert(DEFAULT_LOCALE.to_string(), keyboard::qwerty());

        Self {
            queue: Vec::new(),
            cursor: Cursor::default(),
            results: RunBuffer::default(),
            letters_since_error: 0,
            options,
            layouts,
            resetter: Resetter::new(),
            fast_forward: Arc::new(AtomicBool::new(false)),
            rng,
        }
    }

    /// Register the key layout used to pick wrong neighbor keys for a
    /// locale. Layouts are owned per engine instance, not process-wide.
    pub fn add_keyboard(&mut self, locale: impl Into<String>, layout: KeyboardLayout) -> &mut Self {
        self.layouts.insert(locale.into(), layout);
        self
    }

    pub fn type_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.type_with(text, TypeOpts::default())
    }

    pub fn type_with(&mut self, text: impl Into<String>, opts: TypeOpts) -> &mut Self {
        self.queue.push(Instruction::Type {
            text: text.into(),
            class_name: opts.class_name,
            options: opts.overrides,
        });
        self
    }

    pub fn backspace(&mut self, length: usize) -> &mut Self {
        self.backspace_with(length, Options::default())
    }

    pub fn backspace_with(&mut self, length: usize, overrides: Options) -> &mut Self {
        self.queue.push(Instruction::Backspace {
            length,
            options: overrides,
        });
        self
    }

    pub fn wait(&mut self, delay_ms: u64) -> &mut Self {
        self.queue.push(Instruction::Wait { delay_ms });
        self
    }

    pub fn extend(&mut self, instructions: impl IntoIterator<Item = Instruction>) -> &mut Self {
        self.queue.extend(instructions);
        self
    }

    pub fn handle(&self) -> TypistHandle {
        TypistHandle {
            resetter: self.resetter.clone(),
            fast_forward: self.fast_forward.clone(),
        }
    }

    pub fn fast_forward(&mut self, enabled: bool) {
        self.fast_forward.store(enabled, Ordering::SeqCst);
        if enabled {
            self.resetter.interrupt();
        }
    }

    /// Clear the rendered result state and any in-flight delay, optionally
    /// empty the queue, then clear the cancellation flag so the next
    /// [`run`](Typist::run) starts cleanly.
    pub fn reset(&mut self, clear_texts: bool) {
        self.resetter.reset();
        self.results.clear();
        self.letters_since_error = 0;
        self.cursor = Cursor::default();
        if clear_texts {
            self.queue.clear();
        }
        self.resetter.resume();
    }

    /// Current snapshot in the callback's span markup.
    pub fn rendered(&self) -> String {
        self.results.render()
    }

    /// Current snapshot as plain text.
    pub fn text(&self) -> String {
        self.results.text()
    }

    pub fn queue(&self) -> &[Instruction] {
        &self.queue
    }

    /// Drive the queue from the start until it finishes or a reset stops it.
    ///
    /// Cancellation resolves normally; errors are reserved for invariant
    /// violations such as erasing from an empty result buffer.
    pub async fn run(&mut self) -> Result<()> {
        self.resetter.resume();
        self.cursor = Cursor::default();
        self.letters_since_error = 0;

        while self.step().await? {}

        Ok(())
    }

    async fn step(&mut self) -> Result<bool> {
        if self.resetter.is_reset() {
            return Ok(false);
        }

        let Some(instruction) = self.queue.get(self.cursor.queue_index).cloned() else {
            return Ok(false);
        };

        match instruction {
            Instruction::Type {
                text, class_name, ..
            } => self.step_type(&text, class_name.as_deref()).await,
            Instruction::Backspace { length, .. } => self.step_backspace(length).await,
            Instruction::Wait { delay_ms } => self.step_wait(delay_ms).await,
        }
    }

    async fn step_type(&mut self, text: &str, class_name: Option<&str>) -> Result<bool> {
        let chars: Vec<char> = text.chars().collect();
        if self.cursor.detail_index >= chars.len() {
            return self.advance();
        }

        let opts = self.effective_options();
        self.mistype(&chars, class_name, &opts).await?;
        if self.resetter.is_reset() {
            return Ok(false);
        }

        let letter = chars[self.cursor.detail_index];
        self.results.append(letter, class_name);
        self.letters_since_error += 1;
        self.emit(&opts);
        let delay = opts.per_letter_delay.sample(&mut self.rng);
        self.resetter.sleep(delay).await;

        self.cursor.detail_index += 1;
        if self.cursor.detail_index == chars.len() {
            return self.advance();
        }
        Ok(true)
    }

    async fn step_backspace(&mut self, length: usize) -> Result<bool> {
        if length == 0 || self.cursor.detail_index >= length {
            return self.advance();
        }

        let opts = self.effective_options();
        self.delete_letter()?;
        self.emit(&opts);
        let delay = opts.erase_delay.sample(&mut self.rng);
        self.resetter.sleep(delay).await;

        self.cursor.detail_index += 1;
        if self.cursor.detail_index == length {
            return self.advance();
        }
        Ok(true)
    }

    async fn step_wait(&mut self, delay_ms: u64) -> Result<bool> {
        if !self.fast_forward.load(Ordering::SeqCst) {
            self.resetter.sleep(delay_ms).await;
        }
        self.advance()
    }

    fn advance(&mut self) -> Result<bool> {
        if self.resetter.is_reset() {
            return Ok(false);
        }

        self.cursor.queue_index += 1;
        if self.cursor.queue_index >= self.queue.len() {
            return Ok(false);
        }
        self.cursor.detail_index = 0;
        Ok(true)
    }

    /// Recomputed on every access; the per-item layer follows the cursor.
    fn effective_options(&self) -> EffectiveOptions {
        let item = match self.queue.get(self.cursor.queue_index) {
            Some(Instruction::Type { options, .. }) => Some(options),
            Some(Instruction::Backspace { options, .. }) => Some(options),
            _ => None,
        };
        resolve(
            &self.options,
            item,
            self.fast_forward.load(Ordering::SeqCst),
        )
    }

    /// Occasionally types one or more wrong neighbor keys before the
    /// intended letter, then unwinds them with backspaces in reverse order.
    /// Each pending wrong letter raises the odds of a follow-up mistake.
    async fn mistype(
        &mut self,
        chars: &[char],
        class_name: Option<&str>,
        opts: &EffectiveOptions,
    ) -> Result<()> {
        let mut injected = 0usize;

        loop {
            if self.resetter.is_reset() {
                break;
            }

            let p = error_probability(self.letters_since_error, injected, opts.error_multiplier);
            let draw: f64 = self.rng.gen();
            if draw > p {
                break;
            }

            let Some(&intended) = chars.get(self.cursor.detail_index + injected) else {
                break;
            };
            if opts.no_special_char_errors && !intended.is_alphanumeric() {
                break;
            }
            let Some(wrong) = self
                .layouts
                .get(&opts.locale)
                .and_then(|layout| layout.neighbor(intended, &mut self.rng))
            else {
                break;
            };

            self.letters_since_error = 0;
            self.results.append(wrong, class_name);
            self.emit(opts);
            let delay = opts.per_letter_delay.sample(&mut self.rng);
            self.resetter.sleep(delay).await;

            injected += 1;
        }

        for _ in 0..injected {
            if self.resetter.is_reset() {
                break;
            }

            self.delete_letter()?;
            self.emit(opts);
            let delay = opts.erase_delay.sample(&mut self.rng);
            self.resetter.sleep(delay).await;
        }

        Ok(())
    }

    fn delete_letter(&mut self) -> Result<()> {
        if self.results.delete_last() {
            return Ok(());
        }
        if self.resetter.is_reset() {
            // Expected race: a reset cleared the buffer under in-flight work.
            return Ok(());
        }
        bail!("erase requested on an empty result buffer")
    }

    fn emit(&self, opts: &EffectiveOptions) {
        (opts.callback)(&self.results.render());
    }
}

/// Probability that the next letter is mistyped, given the streak of clean
/// letters and the number of wrong letters already pending correction.
///
/// The draw comparison callers use is `draw > p` means no error; keep that
/// inverted form — it changes the effective distribution at small `p`.
pub fn error_probability(streak: u32, pending: usize, multiplier: f64) -> f64 {
    let streak = streak as f64;
    let bonus = match pending {
        0 => 0.0,
        1 => 0.4,
        2 => 0.2,
        _ => 0.0,
    };
    (0.001 * streak * streak + bonus) * multiplier
}
