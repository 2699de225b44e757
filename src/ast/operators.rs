//! Operator types for LogQL expressions

use std::fmt;

// ============================================================================
// Operator Enums
// ============================================================================

/// Stream selector and string label matcher operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Eq,  // =
    Ne,  // !=
    Re,  // =~
    Nre, // !~
}

/// Comparison operators for numeric, duration, bytes and ip label filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq, // =, ==
    Ne, // !=
    Gt, // >
    Ge, // >=
    Lt, // <
    Le, // <=
}

/// Line filter kinds: `|=`, `!=`, `|~`, `!~`, `|>`, `!>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMatchType {
    Equal,
    NotEqual,
    Regexp,
    NotRegexp,
    Pattern,
    NotPattern,
}

impl LineMatchType {
    /// Whether siblings of this kind may be joined with `or`
    pub fn can_or(&self) -> bool {
        matches!(
            self,
            LineMatchType::Equal | LineMatchType::Regexp | LineMatchType::Pattern
        )
    }
}

// ============================================================================
// Parsing from operator tokens
// ============================================================================

impl MatchOp {
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "=" | "==" => Some(MatchOp::Eq),
            "!=" => Some(MatchOp::Ne),
            "=~" => Some(MatchOp::Re),
            "!~" => Some(MatchOp::Nre),
            _ => None,
        }
    }
}

impl CompareOp {
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "=" | "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            _ => None,
        }
    }
}

impl LineMatchType {
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "|=" => Some(LineMatchType::Equal),
            "!=" => Some(LineMatchType::NotEqual),
            "|~" => Some(LineMatchType::Regexp),
            "!~" => Some(LineMatchType::NotRegexp),
            "|>" => Some(LineMatchType::Pattern),
            "!>" => Some(LineMatchType::NotPattern),
            _ => None,
        }
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchOp::Eq => "=",
            MatchOp::Ne => "!=",
            MatchOp::Re => "=~",
            MatchOp::Nre => "!~",
        })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        })
    }
}

impl fmt::Display for LineMatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineMatchType::Equal => "|=",
            LineMatchType::NotEqual => "!=",
            LineMatchType::Regexp => "|~",
            LineMatchType::NotRegexp => "!~",
            LineMatchType::Pattern => "|>",
            LineMatchType::NotPattern => "!>",
        })
    }
}
