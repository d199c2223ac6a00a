//! Non-fatal format diagnostics
//!
//! Several header fields have only ever been observed as zero. When one is
//! not, decoding carries on with the value preserved and the finding is
//! reported alongside the result.

use std::fmt;

/// A format assumption that did not hold, usually a "should be zero" field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Which field was unexpected.
    pub context: &'static str,
    /// Absolute offset of the field in the source buffer.
    pub offset: usize,
    /// The value found.
    pub value: i64,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at 0x{:X}: unexpected value {}",
            self.context, self.offset, self.value
        )
    }
}

/// A decoded value together with the diagnostics raised while building it.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Decoded<T> {
    /// True when no format assumption was violated.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Discard diagnostics.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        Decoded {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }
}

/// Accumulates diagnostics during a decode.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn expect_zero(&mut self, context: &'static str, offset: usize, value: i64) {
        if value != 0 {
            self.report(context, offset, value);
        }
    }

    pub fn report(&mut self, context: &'static str, offset: usize, value: i64) {
        let diagnostic = Diagnostic {
            context,
            offset,
            value,
        };
        tracing::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn extend(&mut self, other: Vec<Diagnostic>) {
        self.entries.extend(other);
    }

    pub fn finish<T>(self, value: T) -> Decoded<T> {
        Decoded {
            value,
            diagnostics: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_nonzero_values_are_reported() {
        let mut log = DiagnosticLog::default();
        log.expect_zero("reserved", 0x04, 0);
        log.expect_zero("reserved", 0x20, 7);
        let decoded = log.finish(());
        assert_eq!(decoded.diagnostics.len(), 1);
        assert_eq!(decoded.diagnostics[0].offset, 0x20);
        assert_eq!(
            decoded.diagnostics[0].to_string(),
            "reserved at 0x20: unexpected value 7"
        );
    }
}
