//! Single-slot compilation cache for `analyze-string`.
//!
//! Pattern and flags are evaluated at run time, so the compiled regex can
//! only be reused while both stay the same. The slot remembers the last
//! compilation and is replaced whenever either differs.

use crate::error::TransformError;
use regex::Regex;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
struct CompiledRegex {
    pattern: String,
    flags: String,
    regex: Arc<Regex>,
}

#[derive(Debug, Default)]
pub struct RegexCache {
    slot: Mutex<Option<CompiledRegex>>,
}

impl RegexCache {
    /// Returns the cached regex for (`pattern`, `flags`), compiling and
    /// storing a new one when the slot holds a different pair.
    pub fn get_or_compile(&self, pattern: &str, flags: &str) -> Result<Arc<Regex>, TransformError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = slot.as_ref()
            && cached.pattern == pattern
            && cached.flags == flags
        {
            return Ok(Arc::clone(&cached.regex));
        }

        log::debug!("compiling regex '{}' with flags '{}'", pattern, flags);
        let regex = Arc::new(compile(pattern, flags)?);
        *slot = Some(CompiledRegex {
            pattern: pattern.to_string(),
            flags: flags.to_string(),
            regex: Arc::clone(&regex),
        });
        Ok(regex)
    }

    /// The (pattern, flags) pair currently held, if any.
    pub fn cached_key(&self) -> Option<(String, String)> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|c| (c.pattern.clone(), c.flags.clone()))
    }
}

/// Compiles `pattern` under the given flag letters. Rejects patterns that
/// can match the empty string.
pub fn compile(pattern: &str, flags: &str) -> Result<Regex, TransformError> {
    let regex = Regex::new(&build_regex_pattern(pattern, flags))
        .map_err(|e| TransformError::pattern_syntax(pattern, e.to_string()))?;
    if regex.is_match("") {
        return Err(TransformError::dynamic(
            "XTDE1150",
            format!("regular expression '{}' matches a zero-length string", pattern),
        ));
    }
    Ok(regex)
}

/// Prefixes inline flag groups for `i`, `m`, `s` and `x`; flag letters are
/// matched case-insensitively and unknown letters are ignored.
fn build_regex_pattern(regex: &str, flags: &str) -> String {
    let flags = flags.to_ascii_lowercase();
    let mut pattern = String::new();

    if flags.contains('i') {
        pattern.push_str("(?i)");
    }
    if flags.contains('m') {
        pattern.push_str("(?m)");
    }
    if flags.contains('s') {
        pattern.push_str("(?s)");
    }
    if flags.contains('x') {
        pattern.push_str("(?x)");
    }

    pattern.push_str(regex);
    pattern
}
