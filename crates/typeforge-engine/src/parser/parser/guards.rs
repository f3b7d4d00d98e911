//! Parser guards to prevent infinite loops and stack overflow

use super::{ParseError, Parser};

/// Maximum iterations for any parser loop before bailing out
const MAX_LOOP_ITERATIONS: usize = 100_000;

/// Maximum nesting depth of statements and expressions
pub const MAX_PARSE_DEPTH: usize = 40;

/// Guard against infinite loops in parser
///
/// Tracks iteration count and returns error if exceeded.
pub struct LoopGuard {
    name: &'static str,
    count: usize,
    max: usize,
}

impl LoopGuard {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            count: 0,
            max: MAX_LOOP_ITERATIONS,
        }
    }

    /// Check iteration count, return error if exceeded
    #[inline]
    pub fn check(&mut self) -> Result<(), ParseError> {
        self.count += 1;
        if self.count > self.max {
            return Err(ParseError::parser_limit_exceeded(
                format!("Loop '{}' exceeded {} iterations", self.name, self.max),
                Default::default(),
            ));
        }
        Ok(())
    }
}

/// Run `f` one nesting level deeper, failing once `MAX_PARSE_DEPTH` is reached.
///
/// The depth counter is restored whether or not `f` succeeds.
pub fn nested<T>(
    parser: &mut Parser,
    what: &'static str,
    f: impl FnOnce(&mut Parser) -> Result<T, ParseError>,
) -> Result<T, ParseError> {
    if parser.depth >= MAX_PARSE_DEPTH {
        return Err(ParseError::parser_limit_exceeded(
            format!("Maximum nesting depth ({}) exceeded in {}", MAX_PARSE_DEPTH, what),
            parser.current_span(),
        ));
    }
    parser.depth += 1;
    let result = f(parser);
    parser.depth -= 1;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_guard_exceeds_limit() {
        let mut guard = LoopGuard {
            name: "test",
            count: 0,
            max: 3,
        };
        for _ in 0..3 {
            assert!(guard.check().is_ok());
        }
        assert!(guard.check().is_err());
    }

    #[test]
    fn test_nested_restores_depth_on_error() {
        let mut parser = Parser::new("x");
        let result: Result<(), ParseError> = nested(&mut parser, "test", |p| {
            assert_eq!(p.depth, 1);
            Err(ParseError::new("TF0000", "boom", p.current_span()))
        });
        assert!(result.is_err());
        assert_eq!(parser.depth, 0);
    }

    #[test]
    fn test_nested_rejects_past_limit() {
        let mut parser = Parser::new("x");
        parser.depth = MAX_PARSE_DEPTH;
        let result = nested(&mut parser, "test", |_| Ok(()));
        assert_eq!(result.map_err(|e| e.code), Err("TF8025"));
        assert_eq!(parser.depth, MAX_PARSE_DEPTH);
    }
}
