use std::{fmt, panic::Location};

/// A position in the program's source, used for throw sites and misuse reports.
///
/// Displayed as `file:line`, the format used by every diagnostic of this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Source file name as produced by `file!()` or the compiler's caller tracking
    pub file: &'static str,
    /// 1-based line number
    pub line: u32,
}

impl SourceLocation {
    /// Creates a location from its parts.
    #[must_use]
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// The location of the caller, propagated through `#[track_caller]` functions.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_file_colon_line() {
        assert_eq!(SourceLocation::new("f.c", 10).to_string(), "f.c:10");
    }

    #[test]
    fn caller_points_here() {
        let expected_line = line!() + 1;
        let location = SourceLocation::caller();
        assert_eq!(location.line, expected_line);
        assert!(location.file.ends_with("location.rs"));
    }
}
