/// A maximal contiguous span of rendered text sharing one optional class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub class_name: Option<String>,
}

/// Ordered styled runs representing what has been typed so far.
///
/// Invariants: no two adjacent runs share a class, and no run is ever empty;
/// a run is removed the instant its last character is deleted.
#[derive(Debug, Clone, Default)]
pub struct RunBuffer {
    runs: Vec<Run>,
}

impl RunBuffer {
    pub fn append(&mut self, letter: char, class_name: Option<&str>) {
        if let Some(last) = self.runs.last_mut() {
            if last.class_name.as_deref() == class_name {
                last.text.push(letter);
                return;
            }
        }

        self.runs.push(Run {
            text: letter.to_string(),
            class_name: class_name.map(str::to_string),
        });
    }

    /// Drop the last character of the last run. Returns false when the
    /// buffer has nothing left to delete.
    pub fn delete_last(&mut self) -> bool {
        let Some(last) = self.runs.last_mut() else {
            return false;
        };

        last.text.pop();
        if last.text.is_empty() {
            self.runs.pop();
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Serialize every classed run as `<span class="C">TEXT</span>` and
    /// unclassed runs as raw text, in order. Consumers depend on this exact
    /// markup shape.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match &run.class_name {
                Some(class) => {
                    out.push_str("<span class=\"");
                    out.push_str(class);
                    out.push_str("\">");
                    out.push_str(&run.text);
                    out.push_str("</span>");
                }
                None => out.push_str(&run.text),
            }
        }
        out
    }
}
