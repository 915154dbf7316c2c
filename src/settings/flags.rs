//! Persistent onboarding flags
//!
//! Flags are stored as a flat JSON object of booleans. Missing keys read as
//! false, so a fresh install sees every prompt.

use super::SettingsError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name inside the state directory
pub const FLAGS_FILE: &str = "flags.json";

/// One-time prompts the user has been through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnboardingFlag {
    CharityPrompt,
    IntroAnimation,
}

impl OnboardingFlag {
    pub fn key(&self) -> &'static str {
        match self {
            OnboardingFlag::CharityPrompt => "HasSeenCharityPrompt",
            OnboardingFlag::IntroAnimation => "HasSeenIntroAnimation",
        }
    }
}

/// Boolean flags backed by a JSON file
pub struct FlagStore {
    path: PathBuf,
    flags: RwLock<BTreeMap<String, bool>>,
}

impl FlagStore {
    /// Open the store in `state_dir`, creating the directory if needed
    pub fn open(state_dir: &Path) -> Result<Self, SettingsError> {
        fs::create_dir_all(state_dir)?;
        let path = state_dir.join(FLAGS_FILE);

        let flags = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Loaded {} flags from {:?}", flags.len(), path);

        Ok(Self {
            path,
            flags: RwLock::new(flags),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, flag: OnboardingFlag) -> bool {
        self.flags.read().get(flag.key()).copied().unwrap_or(false)
    }

    pub fn has_seen_charity_prompt(&self) -> bool {
        self.get(OnboardingFlag::CharityPrompt)
    }

    pub fn has_seen_intro(&self) -> bool {
        self.get(OnboardingFlag::IntroAnimation)
    }

    pub fn set(&self, flag: OnboardingFlag, value: bool) -> Result<(), SettingsError> {
        let mut flags = self.flags.write();
        flags.insert(flag.key().to_string(), value);
        self.persist(&flags)
    }

    /// Forget a flag so its prompt shows again
    pub fn reset(&self, flag: OnboardingFlag) -> Result<(), SettingsError> {
        let mut flags = self.flags.write();
        if flags.remove(flag.key()).is_none() {
            return Ok(());
        }
        self.persist(&flags)
    }

    fn persist(&self, flags: &BTreeMap<String, bool>) -> Result<(), SettingsError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let content = serde_json::to_string_pretty(flags)?;

        // Write beside the target and rename over it
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(content.as_bytes())?;
        file.persist(&self.path)?;

        tracing::debug!("Saved flags to {:?}", self.path);
        Ok(())
    }
}
