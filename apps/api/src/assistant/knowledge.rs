//! Knowledge base — the static reference blocks sent as system messages with
//! every crop-planning request.
//!
//! Built-in copies of the blocks ship with the binary. A directory can
//! override any of them at startup (`KNOWLEDGE_DIR`); blocks missing from the
//! directory keep their built-in text.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::llm_client::ChatMessage;

/// One system-message block, in the order it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceBlock {
    /// General usage instruction plus the report template format.
    Usage,
    Herbicides,
    Fungicides,
    Insecticides,
    Seeds,
    SoilFertility,
}

impl ReferenceBlock {
    pub const ALL: [ReferenceBlock; 6] = [
        ReferenceBlock::Usage,
        ReferenceBlock::Herbicides,
        ReferenceBlock::Fungicides,
        ReferenceBlock::Insecticides,
        ReferenceBlock::Seeds,
        ReferenceBlock::SoilFertility,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ReferenceBlock::Usage => "usage.md",
            ReferenceBlock::Herbicides => "herbicides.md",
            ReferenceBlock::Fungicides => "fungicides.md",
            ReferenceBlock::Insecticides => "insecticides.md",
            ReferenceBlock::Seeds => "seeds.md",
            ReferenceBlock::SoilFertility => "soil_fertility.md",
        }
    }

    fn builtin_text(self) -> &'static str {
        match self {
            ReferenceBlock::Usage => include_str!("../../knowledge/usage.md"),
            ReferenceBlock::Herbicides => include_str!("../../knowledge/herbicides.md"),
            ReferenceBlock::Fungicides => include_str!("../../knowledge/fungicides.md"),
            ReferenceBlock::Insecticides => include_str!("../../knowledge/insecticides.md"),
            ReferenceBlock::Seeds => include_str!("../../knowledge/seeds.md"),
            ReferenceBlock::SoilFertility => include_str!("../../knowledge/soil_fertility.md"),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The six reference blocks. Immutable after load; shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    blocks: [String; 6],
}

impl KnowledgeBase {
    pub fn builtin() -> Self {
        Self {
            blocks: ReferenceBlock::ALL.map(|b| b.builtin_text().to_string()),
        }
    }

    /// Loads `<dir>/<block file>` for every block, keeping the built-in text
    /// for files that do not exist. Empty files are rejected.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("Knowledge directory '{}' does not exist", dir.display());
        }

        let mut base = Self::builtin();
        let mut overridden = 0;

        for block in ReferenceBlock::ALL {
            let path = dir.join(block.file_name());
            if !path.is_file() {
                debug!("{} not found, using built-in {:?} block", path.display(), block);
                continue;
            }

            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read reference file '{}'", path.display()))?;
            if text.trim().is_empty() {
                bail!("Reference file '{}' is empty", path.display());
            }

            base.blocks[block.index()] = text;
            overridden += 1;
        }

        info!(
            "Knowledge base loaded from {} ({} of {} blocks overridden)",
            dir.display(),
            overridden,
            ReferenceBlock::ALL.len()
        );
        Ok(base)
    }

    pub fn block(&self, block: ReferenceBlock) -> &str {
        &self.blocks[block.index()]
    }

    /// One system message per block, in `ReferenceBlock::ALL` order.
    pub fn system_messages(&self) -> Vec<ChatMessage> {
        ReferenceBlock::ALL
            .iter()
            .map(|block| ChatMessage::system(self.block(*block)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::llm_client::Role;

    use super::*;

    #[test]
    fn test_builtin_blocks_are_non_empty() {
        let base = KnowledgeBase::builtin();
        for block in ReferenceBlock::ALL {
            assert!(!base.block(block).trim().is_empty(), "{block:?} is empty");
        }
    }

    #[test]
    fn test_usage_block_carries_report_format() {
        let usage = KnowledgeBase::builtin();
        let usage = usage.block(ReferenceBlock::Usage);
        assert!(usage.contains("Planting date:"));
        assert!(usage.contains("Fungicides:"));
    }

    #[test]
    fn test_system_messages_follow_block_order() {
        let base = KnowledgeBase::builtin();
        let messages = base.system_messages();

        assert_eq!(messages.len(), 6);
        assert!(messages.iter().all(|m| m.role == Role::System));
        for (message, block) in messages.iter().zip(ReferenceBlock::ALL) {
            assert_eq!(message.content, base.block(block));
        }
    }

    #[test]
    fn test_from_dir_overrides_present_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("herbicides.md"), "Only glyphosate.").unwrap();

        let base = KnowledgeBase::from_dir(dir.path()).unwrap();

        assert_eq!(base.block(ReferenceBlock::Herbicides), "Only glyphosate.");
        assert_eq!(
            base.block(ReferenceBlock::Seeds),
            KnowledgeBase::builtin().block(ReferenceBlock::Seeds)
        );
    }

    #[test]
    fn test_from_dir_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seeds.md"), "   \n").unwrap();

        let err = KnowledgeBase::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("seeds.md"));
    }

    #[test]
    fn test_from_dir_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(KnowledgeBase::from_dir(&missing).is_err());
    }
}
