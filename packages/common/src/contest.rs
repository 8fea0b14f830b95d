#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a contest. `Finished` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestState {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RUNNING"))]
    Running,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "FINISHED"))]
    Finished,
}

impl ContestState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl Default for ContestState {
    fn default() -> Self {
        Self::Running
    }
}

/// Per-(participant, problem) scoring state. `Accepted` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "NON_TRIED"))]
    NonTried,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TRIED"))]
    Tried,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ACCEPTED"))]
    Accepted,
}

impl ProblemStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl Default for ProblemStatus {
    fn default() -> Self {
        Self::NonTried
    }
}

/// Programming language of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CPP"))]
    Cpp,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PYTHON"))]
    Python,
}

impl Language {
    /// Canonical source filename for staged submissions.
    pub fn source_filename(&self) -> &'static str {
        match self {
            Self::Cpp => "solution.cpp",
            Self::Python => "solution.py",
        }
    }

    /// Whether submissions in this language go through a compile stage.
    pub fn requires_compilation(&self) -> bool {
        matches!(self, Self::Cpp)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpp => "CPP",
            Self::Python => "PYTHON",
        })
    }
}

/// Classification tag of a problem. Closed enumeration; problems carry
/// exactly one tag assigned by the importer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemTag {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "STRINGS"))]
    Strings,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "GEOMETRY"))]
    Geometry,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DYNAMIC_PROGRAMMING"))]
    DynamicProgramming,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "GRAPHS"))]
    Graphs,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "GREEDY"))]
    Greedy,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MATH"))]
    Math,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DATA_STRUCTURES"))]
    DataStructures,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SORTING"))]
    Sorting,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "BINARY_SEARCH"))]
    BinarySearch,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TWO_POINTERS"))]
    TwoPointers,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SLIDING_WINDOW"))]
    SlidingWindow,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "BACKTRACKING"))]
    Backtracking,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "BIT_MANIPULATION"))]
    BitManipulation,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TREE"))]
    Tree,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "HEAP"))]
    Heap,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "STACK"))]
    Stack,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "QUEUE"))]
    Queue,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "HASH_TABLE"))]
    HashTable,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ARRAY"))]
    Array,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "LINKED_LIST"))]
    LinkedList,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RECURSION"))]
    Recursion,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DIVIDE_AND_CONQUER"))]
    DivideAndConquer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SIMULATION"))]
    Simulation,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "IMPLEMENTATION"))]
    Implementation,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "BRUTE_FORCE"))]
    BruteForce,
}

impl Default for ProblemTag {
    fn default() -> Self {
        Self::Implementation
    }
}

/// Error when parsing an invalid language string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLanguageError {
    invalid: String,
}

impl fmt::Display for ParseLanguageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid language '{}'. Valid values: CPP, PYTHON", self.invalid)
    }
}

impl std::error::Error for ParseLanguageError {}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CPP" => Ok(Self::Cpp),
            "PYTHON" => Ok(Self::Python),
            _ => Err(ParseLanguageError {
                invalid: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contest_state_wire_values() {
        assert_eq!(
            serde_json::to_string(&ContestState::Running).unwrap(),
            "\"RUNNING\""
        );
        assert_eq!(
            serde_json::to_string(&ContestState::Finished).unwrap(),
            "\"FINISHED\""
        );
    }

    #[test]
    fn test_problem_status_default_is_non_tried() {
        assert_eq!(ProblemStatus::default(), ProblemStatus::NonTried);
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("CPP".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("PYTHON".parse::<Language>().unwrap(), Language::Python);
        assert!("JAVA".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_compile_stage() {
        assert!(Language::Cpp.requires_compilation());
        assert!(!Language::Python.requires_compilation());
    }
}
