use regex::{Regex, RegexBuilder};

/// Cleans harvested page text before it is handed to a model.
///
/// Output holds only printable ASCII and `\n`, has no configured boilerplate
/// phrase left in it, and is at most `max_chars` bytes long.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    boilerplate: Vec<Regex>,
    max_chars: usize,
    spaces: Regex,
    line_edges: Regex,
    blank_runs: Regex,
}

impl Sanitizer {
    /// Phrases match case-insensitively and literally, anywhere in the text.
    pub fn new<I, S>(phrases: I, max_chars: usize) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let boilerplate = phrases
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref().trim();
                (!p.is_empty()).then(|| regex::escape(p))
            })
            .map(|pattern| RegexBuilder::new(&pattern).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            boilerplate,
            max_chars,
            spaces: Regex::new(r" {2,}")?,
            line_edges: Regex::new(r" *\n *")?,
            blank_runs: Regex::new(r"\n{3,}")?,
        })
    }

    pub fn sanitize(&self, raw: &str) -> String {
        let mut text = self.normalize(raw);
        // Removing a phrase can splice its neighbours into a new match, and
        // normalizing can turn e.g. "Log\u{a0}in" into one; run to a fixpoint.
        // Every round that changes anything shortens the text.
        loop {
            let stripped = self.strip_boilerplate(&text);
            if stripped == text {
                break;
            }
            text = self.normalize(&stripped);
        }

        if text.len() > self.max_chars {
            // All ASCII by now, so any byte index is a char boundary.
            text.truncate(self.max_chars);
            text.truncate(text.trim_end().len());
        }
        text
    }

    fn strip_boilerplate(&self, text: &str) -> String {
        let mut out = text.to_string();
        for re in &self.boilerplate {
            if re.is_match(&out) {
                out = re.replace_all(&out, "").into_owned();
            }
        }
        out
    }

    fn normalize(&self, text: &str) -> String {
        let ascii: String = text
            .chars()
            .map(|c| match c {
                '\n' | ' '..='~' => c,
                _ => ' ',
            })
            .collect();
        let collapsed = self.spaces.replace_all(&ascii, " ");
        let lines = self.line_edges.replace_all(&collapsed, "\n");
        let paragraphs = self.blank_runs.replace_all(&lines, "\n\n");
        paragraphs.trim().to_string()
    }
}
