// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Display;
use std::fmt::Formatter;
use std::str::FromStr;

use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::fail;

/// How well the learner recalled a card.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }

    /// Whether the rating counts as a successful recall.
    pub fn is_success(&self) -> bool {
        !matches!(self, Rating::Again)
    }

    /// Whether the rating counts towards session accuracy.
    pub fn is_correct(&self) -> bool {
        matches!(self, Rating::Good | Rating::Easy)
    }
}

impl Display for Rating {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Rating {
    type Err = ErrorReport;

    /// Accepts the rating name in any case, or its button number `1..=4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" | "1" => Ok(Rating::Again),
            "hard" | "2" => Ok(Rating::Hard),
            "good" | "3" => Ok(Rating::Good),
            "easy" | "4" => Ok(Rating::Easy),
            _ => fail(format!("Invalid rating: {s}")),
        }
    }
}

impl ToSql for Rating {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Rating {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        Rating::from_str(&string).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("again".parse::<Rating>(), Ok(Rating::Again));
        assert_eq!("Hard".parse::<Rating>(), Ok(Rating::Hard));
        assert_eq!(" 3 ".parse::<Rating>(), Ok(Rating::Good));
        assert_eq!("4".parse::<Rating>(), Ok(Rating::Easy));
    }

    #[test]
    fn test_malformed_rating_is_rejected() {
        for input in ["", "5", "0", "perfect", "goood"] {
            let err = input.parse::<Rating>().unwrap_err();
            assert!(err.message().starts_with("Invalid rating"));
        }
    }

    #[test]
    fn test_malformed_rating_is_rejected_by_serde() {
        let result: Result<Rating, _> = serde_json::from_str("\"meh\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_success_and_correctness() {
        assert!(!Rating::Again.is_success());
        assert!(Rating::Hard.is_success());
        assert!(!Rating::Hard.is_correct());
        assert!(Rating::Good.is_correct());
        assert!(Rating::Easy.is_correct());
    }
}
