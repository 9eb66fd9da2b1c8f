//! Demo file ordering
//!
//! Files are presented in natural order: case-insensitive, with digit runs
//! compared by value so `demo2` sorts before `demo10`. Names that compare
//! equal that way fall back to plain byte order, which keeps the order total.

use std::cmp::Ordering;

/// Natural, case-insensitive comparison with a byte-order tie break
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key_cmp(a, b).then_with(|| a.cmp(b))
}

fn natural_key_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let ord = compare_digit_runs(&l_run, &r_run);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

/// Compare two digit runs by numeric value without overflowing
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Ordered view over the demo files known at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSequencer {
    files: Vec<String>,
}

impl FileSequencer {
    pub fn new(files: impl IntoIterator<Item = String>) -> Self {
        let mut files: Vec<String> = files.into_iter().collect();
        files.sort_by(|a, b| natural_cmp(a, b));
        files.dedup();
        Self { files }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn position(&self, path: &str) -> Option<usize> {
        self.files.iter().position(|f| f == path)
    }

    /// File after `path`, `None` at the end or for an unknown path
    pub fn next(&self, path: &str) -> Option<&str> {
        let pos = self.position(path)?;
        self.files.get(pos + 1).map(String::as_str)
    }

    /// File before `path`, `None` at the start or for an unknown path
    pub fn previous(&self, path: &str) -> Option<&str> {
        let pos = self.position(path)?;
        pos.checked_sub(1)
            .and_then(|p| self.files.get(p))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequencer(files: &[&str]) -> FileSequencer {
        FileSequencer::new(files.iter().map(|f| f.to_string()))
    }

    #[test]
    fn test_numeric_runs_compare_by_value() {
        let seq = sequencer(&["file10.json", "file2.json", "file1.json"]);
        assert_eq!(seq.files(), ["file1.json", "file2.json", "file10.json"]);
    }

    #[test]
    fn test_case_insensitive_with_byte_tie_break() {
        let seq = sequencer(&["b.json", "B.json", "a.json"]);
        assert_eq!(seq.files(), ["a.json", "B.json", "b.json"]);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(natural_cmp("demo007", "demo7"), "demo007".cmp("demo7"));
        assert_eq!(natural_cmp("demo008", "demo7"), Ordering::Greater);
    }

    #[test]
    fn test_long_digit_runs_do_not_overflow() {
        let big = "demo99999999999999999999999999.json";
        let small = "demo100.json";
        assert_eq!(natural_cmp(small, big), Ordering::Less);
    }

    #[test]
    fn test_neighbours() {
        let seq = sequencer(&[".demo/a.json", ".demo/b.json", ".demo/c.json"]);
        assert_eq!(seq.next(".demo/a.json"), Some(".demo/b.json"));
        assert_eq!(seq.next(".demo/c.json"), None);
        assert_eq!(seq.previous(".demo/b.json"), Some(".demo/a.json"));
        assert_eq!(seq.previous(".demo/a.json"), None);
        assert_eq!(seq.next(".demo/missing.json"), None);
        assert_eq!(seq.previous(".demo/missing.json"), None);
    }
}
