//! Result verification with buffered error reporting.
//!
//! Mismatches are collected per operation sequence and reported together
//! after the sequence completes, unless fail-fast is configured, in which
//! case the first mismatch aborts the run.

use crate::error::{BenchError, BenchResult};
use std::fmt::Display;

#[derive(Debug, Default)]
pub struct Verifier {
    fail_fast: bool,
    errors: Vec<String>,
}

impl Verifier {
    pub fn new(fail_fast: bool) -> Self {
        Self {
            fail_fast,
            errors: Vec::new(),
        }
    }

    /// Check an observed value against the expected one. Buffers the mismatch
    /// (naming both values), or raises immediately under fail-fast.
    pub fn expect_eq<T: PartialEq + Display>(
        &mut self,
        what: &str,
        expected: T,
        actual: T,
    ) -> BenchResult<()> {
        if expected != actual {
            let msg = format!("{what}: expected {expected}, actual {actual}");
            if self.fail_fast {
                return Err(BenchError::Verification(msg));
            }
            self.errors.push(msg);
        }
        Ok(())
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Drain the buffered errors for end-of-sequence reporting.
    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_values_leave_no_errors() {
        let mut v = Verifier::new(false);
        v.expect_eq("rows", 5, 5).unwrap();
        assert_eq!(v.error_count(), 0);
    }

    #[test]
    fn mismatch_is_buffered_with_both_values() {
        let mut v = Verifier::new(false);
        v.expect_eq("rows", 5, 7).unwrap();
        let errors = v.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains('5'));
        assert!(errors[0].contains('7'));
        // Drained: a second take is empty.
        assert!(v.take_errors().is_empty());
    }

    #[test]
    fn fail_fast_raises_immediately() {
        let mut v = Verifier::new(true);
        let err = v.expect_eq("rows", 5, 7).unwrap_err();
        assert!(matches!(err, BenchError::Verification(_)));
        assert!(err.to_string().contains('5') && err.to_string().contains('7'));
    }
}
