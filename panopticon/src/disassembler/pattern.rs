use std::collections::HashMap;

use crate::Error;

/// A single fixed-width token's bit-level match spec: each character of
/// the original spec string is `0`, `1`, `.` (wildcard, uncaptured) or a
/// lowercase letter (wildcard, captured under that name). Matching bits
/// accumulate into their named capture group most-significant-bit first,
/// across however many terminals in a pattern share that name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSpec {
    width: u32,
    mask: u64,
    value: u64,
    captures: Vec<(char, u32)>,
}

impl BitSpec {
    /// Parses a spec string of exactly `spec.len()` bits, high bit first.
    pub fn parse(spec: &str) -> Result<Self, Error> {
        let width = spec.chars().count() as u32;
        if width == 0 || width > 64 {
            return Err(Error::IllFormedMnemonic(format!(
                "bit pattern `{spec}` must be 1..=64 bits wide"
            )));
        }
        let mut mask = 0u64;
        let mut value = 0u64;
        let mut captures = Vec::new();
        for (i, c) in spec.chars().enumerate() {
            let bit = width - 1 - i as u32;
            match c {
                '0' => mask |= 1 << bit,
                '1' => {
                    mask |= 1 << bit;
                    value |= 1 << bit;
                }
                '.' => {}
                c if c.is_ascii_lowercase() => captures.push((c, bit)),
                other => {
                    return Err(Error::IllFormedMnemonic(format!(
                        "`{other}` is not a valid bit pattern character"
                    )))
                }
            }
        }
        Ok(Self {
            width,
            mask,
            value,
            captures,
        })
    }

    /// True if `token`'s fixed bits agree with this spec.
    pub fn matches(&self, token: u64) -> bool {
        token & self.mask == self.value
    }

    /// Extracts this spec's named capture bits from `token`, merging them
    /// (most-significant-first) into `captures`.
    pub fn capture_into(&self, token: u64, captures: &mut HashMap<String, u64>) {
        for (name, bit) in &self.captures {
            let b = (token >> bit) & 1;
            let entry = captures.entry(name.to_string()).or_insert(0);
            *entry = (*entry << 1) | b;
        }
    }
}

/// A pattern over a stream of fixed-width tokens, built from terminals,
/// sequences, alternations and zero-or-more repetition.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches exactly one token against a [`BitSpec`].
    Terminal(BitSpec),
    /// Matches each sub-pattern in order.
    Sequence(Vec<Pattern>),
    /// Matches the first sub-pattern that matches, in declaration order.
    Alternation(Vec<Pattern>),
    /// Matches its inner pattern zero or more times, greedily.
    Option(Box<Pattern>),
}

impl Pattern {
    /// A terminal matching a literal token value over `width` bits.
    pub fn literal(width: u32, value: u64) -> Self {
        let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
        Pattern::Terminal(BitSpec {
            width,
            mask,
            value: value & mask,
            captures: Vec::new(),
        })
    }

    /// A terminal matching a bit-spec string (see [`BitSpec::parse`]).
    pub fn bits(spec: &str) -> Result<Self, Error> {
        Ok(Pattern::Terminal(BitSpec::parse(spec)?))
    }

    /// `self >> next`: sequential composition.
    pub fn then(self, next: Pattern) -> Self {
        match self {
            Pattern::Sequence(mut v) => {
                v.push(next);
                Pattern::Sequence(v)
            }
            other => Pattern::Sequence(vec![other, next]),
        }
    }

    /// `*self`: zero-or-more repetition.
    pub fn repeated(self) -> Self {
        Pattern::Option(Box::new(self))
    }

    /// Attempts to match this pattern against `tokens`, starting at index
    /// 0. On success returns the number of tokens consumed and the merged
    /// capture-group map.
    pub fn matches(&self, tokens: &[u64]) -> Option<(usize, HashMap<String, u64>)> {
        let mut captures = HashMap::new();
        let consumed = self.match_at(tokens, &mut captures)?;
        Some((consumed, captures))
    }

    fn match_at(&self, tokens: &[u64], captures: &mut HashMap<String, u64>) -> Option<usize> {
        match self {
            Pattern::Terminal(spec) => {
                let token = *tokens.first()?;
                if spec.matches(token) {
                    spec.capture_into(token, captures);
                    Some(1)
                } else {
                    None
                }
            }
            Pattern::Sequence(parts) => {
                let mut offset = 0;
                for part in parts {
                    let consumed = part.match_at(&tokens[offset..], captures)?;
                    offset += consumed;
                }
                Some(offset)
            }
            Pattern::Alternation(alts) => alts.iter().find_map(|alt| {
                let mut local = captures.clone();
                let consumed = alt.match_at(tokens, &mut local)?;
                *captures = local;
                Some(consumed)
            }),
            Pattern::Option(inner) => {
                let mut offset = 0;
                loop {
                    match inner.match_at(&tokens[offset..], captures) {
                        Some(0) => break,
                        Some(consumed) => offset += consumed,
                        None => break,
                    }
                }
                Some(offset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_matches_exact_token() {
        let p = Pattern::literal(8, 0x90);
        assert_eq!(p.matches(&[0x90]).map(|(n, _)| n), Some(1));
        assert_eq!(p.matches(&[0x91]), None);
    }

    #[test]
    fn named_bits_accumulate_left_to_right() {
        let p = Pattern::bits("rrr00000").unwrap();
        let (consumed, captures) = p.matches(&[0b101_00000]).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(captures["r"], 0b101);
    }

    #[test]
    fn sequence_consumes_each_terminal_in_order() {
        let p = Pattern::literal(8, 0x0f).then(Pattern::literal(8, 0x1f));
        assert_eq!(p.matches(&[0x0f, 0x1f]).map(|(n, _)| n), Some(2));
        assert_eq!(p.matches(&[0x0f, 0x20]), None);
    }

    #[test]
    fn alternation_tries_in_declaration_order() {
        let p = Pattern::Alternation(vec![Pattern::literal(8, 1), Pattern::literal(8, 2)]);
        assert_eq!(p.matches(&[2]).map(|(n, _)| n), Some(1));
        assert_eq!(p.matches(&[3]), None);
    }

    #[test]
    fn option_matches_zero_or_more_greedily() {
        let p = Pattern::literal(8, 0x90).repeated();
        assert_eq!(p.matches(&[0x90, 0x90, 0x91]).map(|(n, _)| n), Some(2));
        assert_eq!(p.matches(&[0x91]).map(|(n, _)| n), Some(0));
    }
}
