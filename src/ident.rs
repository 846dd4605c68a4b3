//! Document identity and sequence tokens
//! -------------------------------------
//! Single source of truth for composing and splitting canonical document ids
//! (`library~topic~key`) and the per-(library, topic) sequence tokens used for
//! ordered range scans and context windows.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const ID_DELIMITER: char = '~';
/// Web-service wide wildcard library.
pub const SYSTEM_LIBRARY: &str = "system";
/// Every content library.
pub const ALL_DOMAINS: &str = "all";
/// Topic under which user identity records live in the SYSTEM library.
pub const USERS_TOPIC: &str = "users";

/// Zero-padded ordinal width; keeps lexical and numeric order identical.
pub const SEQ_WIDTH: usize = 9;
pub const SEQ_MAX: u64 = 999_999_999;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId {
    pub library: String,
    pub topic: String,
    pub key: String,
}

impl DocumentId {
    pub fn new(library: &str, topic: &str, key: &str) -> AppResult<Self> {
        check_part("library", library)?;
        check_part("topic", topic)?;
        check_part("key", key)?;
        Ok(Self { library: library.to_string(), topic: topic.to_string(), key: key.to_string() })
    }

    pub fn canonical(&self) -> String {
        format!("{}{d}{}{d}{}", self.library, self.topic, self.key, d = ID_DELIMITER)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn check_part(name: &str, part: &str) -> AppResult<()> {
    if part.is_empty() {
        return Err(AppError::malformed("malformed_id".to_string(), format!("{} must not be empty", name)));
    }
    if part.contains(ID_DELIMITER) {
        return Err(AppError::malformed(
            "malformed_id".to_string(),
            format!("{} '{}' contains the id delimiter '{}'", name, part, ID_DELIMITER),
        ));
    }
    Ok(())
}

/// Join (library, topic, key) into a canonical id.
pub fn build_id(library: &str, topic: &str, key: &str) -> AppResult<String> {
    Ok(DocumentId::new(library, topic, key)?.canonical())
}

/// Split a canonical id. Exact inverse of `build_id` for well-formed parts.
pub fn parse_id(id: &str) -> AppResult<DocumentId> {
    let parts: Vec<&str> = id.split(ID_DELIMITER).collect();
    if parts.len() != 3 {
        return Err(AppError::malformed(
            "malformed_id".to_string(),
            format!("id '{}' must have exactly three '{}'-separated parts", id, ID_DELIMITER),
        ));
    }
    DocumentId::new(parts[0], parts[1], parts[2])
}

/// Library part of a canonical id.
pub fn library_of(id: &str) -> AppResult<String> {
    Ok(parse_id(id)?.library)
}

/// Identity record id owned by a user.
pub fn user_record_id(username: &str) -> AppResult<String> {
    build_id(SYSTEM_LIBRARY, USERS_TOPIC, username)
}

pub fn is_wildcard_library(library: &str) -> bool {
    library == SYSTEM_LIBRARY || library == ALL_DOMAINS
}

/// Lexically sortable sequence token for a (library, topic) ordinal.
pub fn build_sequence(library: &str, topic: &str, ordinal: u64) -> AppResult<String> {
    if ordinal > SEQ_MAX {
        return Err(AppError::malformed("sequence_overflow".to_string(), format!("ordinal {} exceeds {}", ordinal, SEQ_MAX)));
    }
    let prefix = DocumentId::new(library, topic, "0")?;
    Ok(format!("{}{d}{}{d}{:0width$}", prefix.library, prefix.topic, ordinal, d = ID_DELIMITER, width = SEQ_WIDTH))
}

/// Split a sequence token back into (library, topic, ordinal).
pub fn parse_sequence(seq: &str) -> AppResult<(String, String, u64)> {
    let id = parse_id(seq)?;
    if id.key.len() != SEQ_WIDTH || !id.key.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::malformed("malformed_sequence".to_string(), format!("'{}' is not a sequence token", seq)));
    }
    let ordinal = id.key.parse::<u64>()
        .map_err(|e| AppError::malformed("malformed_sequence".to_string(), e.to_string()))?;
    Ok((id.library, id.topic, ordinal))
}

/// Bracket `n` records before and after `seq` within the same (library, topic).
/// The lower bound clamps at ordinal zero and the upper bound at `SEQ_MAX`.
pub fn window_bounds(seq: &str, n: u64) -> AppResult<(String, String)> {
    let (library, topic, ordinal) = parse_sequence(seq)?;
    let start = ordinal.saturating_sub(n);
    let end = ordinal.saturating_add(n).min(SEQ_MAX);
    Ok((build_sequence(&library, &topic, start)?, build_sequence(&library, &topic, end)?))
}

/// Issues monotonic ordinals per (library, topic). Each increment happens under a
/// single lock acquisition, so concurrent creators never observe the same ordinal.
#[derive(Debug, Default)]
pub struct SequenceIssuer {
    counters: Mutex<HashMap<(String, String), u64>>,
}

impl SequenceIssuer {
    pub fn new() -> Self { Self::default() }

    pub fn from_counters(counters: HashMap<(String, String), u64>) -> Self {
        Self { counters: Mutex::new(counters) }
    }

    /// Reserve the next sequence token for (library, topic).
    pub fn next(&self, library: &str, topic: &str) -> AppResult<String> {
        let ordinal = {
            let mut m = self.counters.lock();
            let slot = m.entry((library.to_string(), topic.to_string())).or_insert(0);
            if *slot >= SEQ_MAX {
                return Err(AppError::malformed("sequence_overflow".to_string(), format!("{}/{} exhausted", library, topic)));
            }
            *slot += 1;
            *slot
        };
        build_sequence(library, topic, ordinal)
    }

    pub fn counters(&self) -> HashMap<(String, String), u64> {
        self.counters.lock().clone()
    }
}
