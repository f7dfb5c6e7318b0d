/// A continuous selection of (line, column) pairs: an anchor and a cursor,
/// each a (line, column) pair, with `disjoint`/`includes` queries over the
/// spans they bound. The GUI selection widget this would back is out of
/// scope here; only the selection-geometry queries are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span2D {
    anchor_line: u64,
    anchor_col: u64,
    cursor_line: u64,
    cursor_col: u64,
}

impl Span2D {
    /// Constructs a selection from anchor `(a_line, a_col)` to cursor `(c_line, c_col)`.
    pub fn new(a_line: u64, a_col: u64, c_line: u64, c_col: u64) -> Self {
        Self {
            anchor_line: a_line,
            anchor_col: a_col,
            cursor_line: c_line,
            cursor_col: c_col,
        }
    }

    fn first(&self) -> (u64, u64) {
        min_pair((self.anchor_line, self.anchor_col), (self.cursor_line, self.cursor_col))
    }

    fn last(&self) -> (u64, u64) {
        max_pair((self.anchor_line, self.anchor_col), (self.cursor_line, self.cursor_col))
    }

    /// True if `point` lies within `self`, inclusive of both ends.
    pub fn includes_point(&self, line: u64, col: u64) -> bool {
        let (fl, fc) = self.first();
        let (ll, lc) = self.last();
        (line, col) >= (fl, fc) && (line, col) <= (ll, lc)
    }

    /// True if `other` lies entirely within `self`.
    pub fn includes(&self, other: &Span2D) -> bool {
        self.includes_point(other.first().0, other.first().1)
            && self.includes_point(other.last().0, other.last().1)
    }

    /// True if `self` and `other` share no point.
    pub fn disjoint(&self, other: &Span2D) -> bool {
        let (fl, fc) = self.first();
        let (ll, lc) = self.last();
        let (ofl, ofc) = other.first();
        let (oll, olc) = other.last();
        (ll, lc) < (ofl, ofc) || (oll, olc) < (fl, fc)
    }
}

fn min_pair(a: (u64, u64), b: (u64, u64)) -> (u64, u64) {
    if a <= b {
        a
    } else {
        b
    }
}

fn max_pair(a: (u64, u64), b: (u64, u64)) -> (u64, u64) {
    if a >= b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_selections() {
        let a = Span2D::new(2, 5, 4, 1);
        let b = Span2D::new(0, 0, 1, 3);

        assert!(a.disjoint(&b));
        assert!(!a.includes(&b));
        assert!(!b.includes(&a));
    }

    #[test]
    fn overlapping_selections_are_not_disjoint() {
        let a = Span2D::new(0, 0, 5, 0);
        let b = Span2D::new(2, 0, 3, 0);

        assert!(!a.disjoint(&b));
        assert!(a.includes(&b));
        assert!(!b.includes(&a));
    }
}
