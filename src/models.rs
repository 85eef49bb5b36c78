//! Plain records returned by the contract adapters
//!
//! Identifiers are assigned on-chain; nothing here mints or checks them.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::chain::units::format_ether;
use crate::chain::Address;
use crate::error::ClientError;

// ============================================================================
// COURSES
// ============================================================================

/// Course difficulty as stored by the contract (1-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner = 1,
    Intermediate = 2,
    Advanced = 3,
}

impl Difficulty {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u128> for Difficulty {
    type Error = ClientError;

    fn try_from(v: u128) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Difficulty::Beginner),
            2 => Ok(Difficulty::Intermediate),
            3 => Ok(Difficulty::Advanced),
            other => Err(ClientError::Decode(format!("unknown difficulty {other}"))),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "beginner" => Ok(Difficulty::Beginner),
            "2" | "intermediate" => Ok(Difficulty::Intermediate),
            "3" | "advanced" => Ok(Difficulty::Advanced),
            other => Err(ClientError::Validation(format!("unknown difficulty '{other}'"))),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

/// Descriptive part of a course (`getCourseInfo`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInfo {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub thumbnail_ipfs_hash: String,
    pub difficulty: Difficulty,
    /// Minutes
    pub duration: u64,
}

/// Commercial part of a course (`getCourseStats`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStats {
    pub creator: Address,
    pub is_active: bool,
    pub price_wei: u128,
    pub total_sales: u64,
    pub module_count: u64,
    pub enrolled_users: u64,
}

impl CourseStats {
    /// Price in ether, formatted like "0.05"
    pub fn price(&self) -> String {
        format_ether(self.price_wei)
    }
}

/// Info and stats of one course, the shape listings render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub info: CourseInfo,
    pub stats: CourseStats,
    /// Only readable by buyers and the creator, so usually absent in listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ipfs_hash: Option<String>,
}

impl Course {
    pub fn new(info: CourseInfo, stats: CourseStats) -> Self {
        Self {
            info,
            stats,
            content_ipfs_hash: None,
        }
    }
}

/// Arguments of `createCourse`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub category: String,
    pub thumbnail_ipfs_hash: String,
    pub content_ipfs_hash: String,
    pub difficulty: Difficulty,
    pub duration: u64,
    /// Ether amount as typed by the creator, e.g. "0.05"
    pub price: String,
    pub module_count: u64,
}

/// Arguments of `updateCourse`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    pub title: String,
    pub description: String,
    pub thumbnail_ipfs_hash: String,
    pub content_ipfs_hash: String,
    pub price: String,
    pub is_active: bool,
    pub module_count: u64,
}

/// Course content document published to storage; its identifier is the
/// course's content hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseManifest {
    pub intro_video_ipfs_hash: String,
    pub module_ipfs_hashes: Vec<String>,
    pub module_titles: Vec<String>,
    /// Module index (as a string key) -> material identifiers
    pub material_ipfs_hashes: BTreeMap<String, Vec<String>>,
    pub material_count: usize,
}

// ============================================================================
// ASSIGNMENTS
// ============================================================================

/// Placeholder in meta-prompts replaced by the submitted repository URL
pub const GITHUB_LINK_PLACEHOLDER: &str = "{{ github_link }}";

/// An assignment as stored by the assignment manager contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub question: String,
    pub evaluation_criteria: String,
    pub meta_prompt: String,
    pub created_at: DateTime<Utc>,
    pub creator: Address,
    pub is_active: bool,
}

/// One graded step parsed out of an assignment's evaluation criteria
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// 1-based position
    pub id: usize,
    pub title: String,
    pub description: String,
}

fn task_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Task \d+: ").expect("static regex"))
}

impl Assignment {
    /// Split the evaluation criteria into checkpoints.
    ///
    /// Blocks are separated by blank lines; the first line of a block is its
    /// title (with a leading `Task N: ` removed) and the rest its description.
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.evaluation_criteria
            .split("\n\n")
            .filter(|block| !block.trim().is_empty())
            .enumerate()
            .map(|(i, block)| {
                let mut lines = block.lines();
                let title = lines.next().unwrap_or_default();
                Checkpoint {
                    id: i + 1,
                    title: task_prefix().replace(title, "").trim().to_string(),
                    description: lines.collect::<Vec<_>>().join("\n"),
                }
            })
            .collect()
    }

    /// Meta-prompt with the repository URL substituted in
    pub fn render_prompt(&self, repo_url: &str) -> String {
        self.meta_prompt.replace(GITHUB_LINK_PLACEHOLDER, repo_url)
    }
}

/// Arguments of `createAssignment` / `updateAssignment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub title: String,
    pub description: String,
    pub question: String,
    pub evaluation_criteria: String,
    pub meta_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(criteria: &str) -> Assignment {
        Assignment {
            id: 0,
            title: "ERC-20".into(),
            description: "Build a token".into(),
            question: "Implement ERC-20".into(),
            evaluation_criteria: criteria.into(),
            meta_prompt: "Review {{ github_link }} against the rubric".into(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            creator: Address::ZERO,
            is_active: true,
        }
    }

    #[test]
    fn difficulty_conversions() {
        assert_eq!(Difficulty::try_from(2u128).unwrap(), Difficulty::Intermediate);
        assert!(Difficulty::try_from(0u128).is_err());
        assert!(Difficulty::try_from(4u128).is_err());
        assert_eq!("Advanced".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert_eq!("1".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert_eq!(Difficulty::Advanced.as_u8(), 3);
    }

    #[test]
    fn checkpoints_parse_task_blocks() {
        let a = assignment(
            "Task 1: Deploy the contract\nUse Hardhat\nVerify on explorer\n\nTask 2: Write tests\nCover transfer",
        );
        let checkpoints = a.checkpoints();
        assert_eq!(checkpoints.len(), 2);
        assert_eq!(checkpoints[0].id, 1);
        assert_eq!(checkpoints[0].title, "Deploy the contract");
        assert_eq!(checkpoints[0].description, "Use Hardhat\nVerify on explorer");
        assert_eq!(checkpoints[1].title, "Write tests");
        assert_eq!(checkpoints[1].description, "Cover transfer");
    }

    #[test]
    fn checkpoints_of_empty_criteria() {
        assert!(assignment("").checkpoints().is_empty());
        let single = assignment("Just one block").checkpoints();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].title, "Just one block");
        assert_eq!(single[0].description, "");
    }

    #[test]
    fn render_prompt_substitutes_link() {
        let a = assignment("");
        assert_eq!(
            a.render_prompt("https://github.com/alice/token"),
            "Review https://github.com/alice/token against the rubric"
        );
    }

    #[test]
    fn manifest_uses_camel_case_keys() {
        let mut materials = BTreeMap::new();
        materials.insert("0".to_string(), vec!["QmMat".to_string()]);
        let manifest = CourseManifest {
            intro_video_ipfs_hash: "QmIntro".into(),
            module_ipfs_hashes: vec!["QmVid".into()],
            module_titles: vec!["Intro".into()],
            material_ipfs_hashes: materials,
            material_count: 1,
        };
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["introVideoIpfsHash"], "QmIntro");
        assert_eq!(json["materialIpfsHashes"]["0"][0], "QmMat");
        assert_eq!(json["materialCount"], 1);
    }

    #[test]
    fn course_price_is_formatted_in_ether() {
        let stats = CourseStats {
            creator: Address::ZERO,
            is_active: true,
            price_wei: 50_000_000_000_000_000,
            total_sales: 0,
            module_count: 3,
            enrolled_users: 0,
        };
        assert_eq!(stats.price(), "0.05");
    }
}
