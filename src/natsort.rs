//! Natural alphanumeric ordering for dataset names.
//!
//! Splits a name on digit runs and compares segment by segment: digit runs
//! numerically, everything else lexically. This is the order humans expect
//! from numbered samples (`sample2` before `sample10`), matching `sort -V`.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Text(String),
}

fn segments(name: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_digits = false;

    for c in name.chars() {
        if c.is_ascii_digit() == in_digits {
            buf.push(c);
        } else {
            if !buf.is_empty() {
                out.push(flush(&buf, in_digits));
            }
            buf = c.to_string();
            in_digits = c.is_ascii_digit();
        }
    }
    if !buf.is_empty() {
        out.push(flush(&buf, in_digits));
    }
    out
}

fn flush(buf: &str, in_digits: bool) -> Segment {
    if in_digits {
        // Digit runs longer than u64 fall back to lexical comparison.
        buf.parse::<u64>()
            .map_or_else(|_| Segment::Text(buf.to_string()), Segment::Number)
    } else {
        Segment::Text(buf.to_string())
    }
}

/// Compare two names in natural alphanumeric order.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);
    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Segment::Number(x), Segment::Number(y)) => x.cmp(y),
            (Segment::Text(x), Segment::Text(y)) => x.cmp(y),
            // A digit run sorts before text at the same position.
            (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}

/// Sort a list of names in natural order, returning the sorted list.
#[must_use]
pub fn sorted_naturally<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Vec<String> {
    let mut out: Vec<String> = names
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect();
    out.sort_by(|a, b| natural_cmp(a, b));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_runs_compare_numerically() {
        assert_eq!(natural_cmp("sample2", "sample10"), Ordering::Less);
        assert_eq!(natural_cmp("sample10", "sampleA"), Ordering::Less);
        assert_eq!(natural_cmp("sample2", "sample2"), Ordering::Equal);
    }

    #[test]
    fn sorts_mixed_names() {
        let sorted = sorted_naturally(vec!["run12", "run2", "alpha", "run2b"]);
        assert_eq!(sorted, vec!["alpha", "run2", "run2b", "run12"]);
    }

    #[test]
    fn prefix_is_smaller() {
        assert_eq!(natural_cmp("run", "run1"), Ordering::Less);
    }

    #[test]
    fn huge_digit_runs_do_not_panic() {
        let big = "x99999999999999999999999999";
        assert_eq!(natural_cmp(big, big), Ordering::Equal);
    }
}
