/// Holds the most recent usable partial transcript.
///
/// Native engines report partials as full cumulative hypotheses, not deltas,
/// so each update replaces the stored value. Blank input is dropped so a
/// trailing empty partial cannot wipe out usable text.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    text: String,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffered transcript with `text`, unless it is blank.
    pub fn update(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.text.clear();
        self.text.push_str(text);
    }

    /// Current buffered transcript, or `""` if nothing usable arrived yet.
    pub fn snapshot(&self) -> String {
        self.text.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}
