//! Retention profiles for budgeted persistence.
//!
//! # Responsibility
//! - Name the truncation limits applied before each persistence attempt.
//! - Reject ladders that would not shrink from one step to the next.
//!
//! # Invariants
//! - A valid ladder never retains more at a lower step than at a higher one.
//! - Every character cap leaves room for the truncation marker.

use crate::history::compactor::TRUNCATION_MARKER;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Step of the retention ladder, from most to least faithful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileName {
    Full,
    Reduced,
    Minimal,
}

impl ProfileName {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(Self::Full),
            "reduced" => Some(Self::Reduced),
            "minimal" => Some(Self::Minimal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Reduced => "reduced",
            Self::Minimal => "minimal",
        }
    }
}

/// Caps applied to a session snapshot before one persistence attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionProfile {
    pub name: ProfileName,
    pub max_messages: usize,
    pub max_sections: usize,
    pub max_undo: usize,
    pub max_redo: usize,
    pub max_message_chars: usize,
    pub max_section_chars: usize,
    pub max_title_chars: usize,
}

impl RetentionProfile {
    pub const FULL: Self = Self {
        name: ProfileName::Full,
        max_messages: 200,
        max_sections: 200,
        max_undo: 50,
        max_redo: 50,
        max_message_chars: 20_000,
        max_section_chars: 50_000,
        max_title_chars: 200,
    };

    pub const REDUCED: Self = Self {
        name: ProfileName::Reduced,
        max_messages: 80,
        max_sections: 100,
        max_undo: 15,
        max_redo: 15,
        max_message_chars: 4_000,
        max_section_chars: 20_000,
        max_title_chars: 120,
    };

    pub const MINIMAL: Self = Self {
        name: ProfileName::Minimal,
        max_messages: 20,
        max_sections: 40,
        max_undo: 3,
        max_redo: 0,
        max_message_chars: 1_000,
        max_section_chars: 6_000,
        max_title_chars: 80,
    };

    fn char_caps(&self) -> [(&'static str, usize); 3] {
        [
            ("max_message_chars", self.max_message_chars),
            ("max_section_chars", self.max_section_chars),
            ("max_title_chars", self.max_title_chars),
        ]
    }

    fn retention(&self) -> [(&'static str, usize); 7] {
        [
            ("max_messages", self.max_messages),
            ("max_sections", self.max_sections),
            ("max_undo", self.max_undo),
            ("max_redo", self.max_redo),
            ("max_message_chars", self.max_message_chars),
            ("max_section_chars", self.max_section_chars),
            ("max_title_chars", self.max_title_chars),
        ]
    }
}

/// Invalid retention configuration. Not recoverable at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileConfigError {
    /// A ladder step carries the wrong name for its position.
    MisplacedProfile {
        expected: ProfileName,
        found: ProfileName,
    },
    /// The lead section must always fit.
    NoSections(ProfileName),
    /// A character cap cannot hold the truncation marker plus one char.
    CapTooSmall {
        profile: ProfileName,
        field: &'static str,
        value: usize,
    },
    /// A lower step retains more than the step above it.
    NotDecreasing {
        field: &'static str,
        higher: ProfileName,
        lower: ProfileName,
    },
}

impl Display for ProfileConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MisplacedProfile { expected, found } => write!(
                f,
                "profile `{}` found where `{}` was expected",
                found.as_str(),
                expected.as_str()
            ),
            Self::NoSections(profile) => {
                write!(f, "profile `{}` must keep at least one section", profile.as_str())
            }
            Self::CapTooSmall {
                profile,
                field,
                value,
            } => write!(
                f,
                "profile `{}` has {field}={value}, too small for the truncation marker",
                profile.as_str()
            ),
            Self::NotDecreasing {
                field,
                higher,
                lower,
            } => write!(
                f,
                "profile `{}` retains more {field} than `{}`",
                lower.as_str(),
                higher.as_str()
            ),
        }
    }
}

impl Error for ProfileConfigError {}

/// Ordered full → reduced → minimal retention steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLadder {
    full: RetentionProfile,
    reduced: RetentionProfile,
    minimal: RetentionProfile,
}

impl Default for ProfileLadder {
    fn default() -> Self {
        Self {
            full: RetentionProfile::FULL,
            reduced: RetentionProfile::REDUCED,
            minimal: RetentionProfile::MINIMAL,
        }
    }
}

impl ProfileLadder {
    /// Builds a validated ladder.
    pub fn try_new(
        full: RetentionProfile,
        reduced: RetentionProfile,
        minimal: RetentionProfile,
    ) -> Result<Self, ProfileConfigError> {
        let ladder = Self {
            full,
            reduced,
            minimal,
        };
        ladder.validate()?;
        Ok(ladder)
    }

    /// Checks naming, marker room and non-increasing retention.
    pub fn validate(&self) -> Result<(), ProfileConfigError> {
        let marker_len = TRUNCATION_MARKER.chars().count();
        let expected = [ProfileName::Full, ProfileName::Reduced, ProfileName::Minimal];
        for (profile, expected) in self.steps().iter().zip(expected) {
            if profile.name != expected {
                return Err(ProfileConfigError::MisplacedProfile {
                    expected,
                    found: profile.name,
                });
            }
            if profile.max_sections == 0 {
                return Err(ProfileConfigError::NoSections(profile.name));
            }
            for (field, value) in profile.char_caps() {
                if value <= marker_len {
                    return Err(ProfileConfigError::CapTooSmall {
                        profile: profile.name,
                        field,
                        value,
                    });
                }
            }
        }

        for pair in self.steps().windows(2) {
            let (higher, lower) = (&pair[0], &pair[1]);
            for ((field, high), (_, low)) in higher.retention().into_iter().zip(lower.retention()) {
                if low > high {
                    return Err(ProfileConfigError::NotDecreasing {
                        field,
                        higher: higher.name,
                        lower: lower.name,
                    });
                }
            }
        }
        Ok(())
    }

    /// Steps in attempt order.
    pub fn steps(&self) -> [RetentionProfile; 3] {
        [self.full, self.reduced, self.minimal]
    }

    pub fn get(&self, name: ProfileName) -> RetentionProfile {
        match name {
            ProfileName::Full => self.full,
            ProfileName::Reduced => self.reduced,
            ProfileName::Minimal => self.minimal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ProfileConfigError, ProfileLadder, ProfileName, RetentionProfile};

    #[test]
    fn default_ladder_is_valid() {
        assert_eq!(ProfileLadder::default().validate(), Ok(()));
    }

    #[test]
    fn ladder_rejects_growth_down_the_steps() {
        let reduced = RetentionProfile {
            max_undo: 80,
            ..RetentionProfile::REDUCED
        };
        let err = ProfileLadder::try_new(RetentionProfile::FULL, reduced, RetentionProfile::MINIMAL)
            .unwrap_err();
        assert_eq!(
            err,
            ProfileConfigError::NotDecreasing {
                field: "max_undo",
                higher: ProfileName::Full,
                lower: ProfileName::Reduced,
            }
        );
    }

    #[test]
    fn ladder_rejects_caps_without_room_for_marker() {
        let minimal = RetentionProfile {
            max_title_chars: 3,
            ..RetentionProfile::MINIMAL
        };
        let err = ProfileLadder::try_new(RetentionProfile::FULL, RetentionProfile::REDUCED, minimal)
            .unwrap_err();
        assert!(matches!(err, ProfileConfigError::CapTooSmall { field: "max_title_chars", .. }));
    }

    #[test]
    fn ladder_rejects_misordered_names() {
        let err = ProfileLadder::try_new(
            RetentionProfile::REDUCED,
            RetentionProfile::FULL,
            RetentionProfile::MINIMAL,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileConfigError::MisplacedProfile { .. }));
    }
}
