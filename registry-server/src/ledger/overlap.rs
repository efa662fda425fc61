//! Range overlap detection
//!
//! Bounds of different widths inside one scope (prefix + language group,
//! ISMN prefix, ISSN block) are compared after padding to a common width:
//! begins with `0`, ends with `9`.

/// Compares bounds normalized to a fixed width
#[derive(Debug, Clone, Copy)]
pub struct RangeOverlapValidator {
    width: usize,
}

impl RangeOverlapValidator {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    fn pad(&self, value: &str, fill: char) -> String {
        let mut out = value.to_string();
        while out.len() < self.width {
            out.push(fill);
        }
        out
    }

    pub fn normalize_begin(&self, begin: &str) -> String {
        self.pad(begin, '0')
    }

    pub fn normalize_end(&self, end: &str) -> String {
        self.pad(end, '9')
    }

    /// Whether `[b1, e1]` and `[b2, e2]` intersect
    pub fn overlaps(&self, (b1, e1): (&str, &str), (b2, e2): (&str, &str)) -> bool {
        let (b1, e1) = (self.normalize_begin(b1), self.normalize_end(e1));
        let (b2, e2) = (self.normalize_begin(b2), self.normalize_end(e2));
        (b1 <= b2 && b2 <= e1) || (b2 <= b1 && b1 <= e2)
    }

    /// Id of the first existing range the candidate intersects
    pub fn first_overlap<'a, I>(&self, candidate: (&str, &str), existing: I) -> Option<i64>
    where
        I: IntoIterator<Item = (i64, &'a str, &'a str)>,
    {
        existing
            .into_iter()
            .find(|(_, begin, end)| self.overlaps(candidate, (*begin, *end)))
            .map(|(id, _, _)| id)
    }
}
