//! Hide rules
//!
//! A rule set is an ordered list of [`HideRule`]s parsed from a single
//! configuration string such as `[InactiveRegex],[PastDate:0:4h]`. The order
//! is the priority order: the first rule that matches a channel decides it.

pub mod parser;
pub mod predicates;

use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

pub use parser::{ParsedRules, RuleParser};
pub use predicates::{RuleContext, evaluate_rule};

/// Rule list used when the configured rule string is empty
pub const DEFAULT_HIDE_RULES: &str = "[BlankName],[InactiveRegex],[NoEventPattern],[EmptyPlaceholder],[WrongDayOfWeek],[PastDate:0],[FutureDate:14],[ShortDescription],[ShortChannelName],[NumberOnly],[NoEPG]";

/// Largest accepted `PastDate` grace period, one year
pub const MAX_GRACE_HOURS: i64 = 8760;

/// The closed set of hide rule kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum RuleTag {
    #[strum(serialize = "NoEPG")]
    NoEpg,
    BlankName,
    WrongDayOfWeek,
    NoEventPattern,
    EmptyPlaceholder,
    ShortDescription,
    ShortChannelName,
    NumberOnly,
    PastDate,
    FutureDate,
    InactiveRegex,
}

impl RuleTag {
    /// Whether the rule reads a day threshold parameter
    pub fn takes_days(&self) -> bool {
        matches!(self, Self::PastDate | Self::FutureDate)
    }

    /// Whether the rule reads a grace period parameter
    pub fn takes_grace(&self) -> bool {
        matches!(self, Self::PastDate)
    }
}

/// Parameter attached to a rule token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleParam {
    #[default]
    None,
    /// `Name:Int`
    Days(i64),
    /// `Name:Int:IntH`
    DaysWithGrace { days: i64, grace_hours: i64 },
}

impl RuleParam {
    pub fn days(&self) -> Option<i64> {
        match self {
            Self::None => None,
            Self::Days(days) | Self::DaysWithGrace { days, .. } => Some(*days),
        }
    }

    pub fn grace_hours(&self) -> Option<i64> {
        match self {
            Self::DaysWithGrace { grace_hours, .. } => Some(*grace_hours),
            _ => None,
        }
    }
}

/// One entry of the ordered rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HideRule {
    pub tag: RuleTag,
    pub param: RuleParam,
}

impl HideRule {
    pub fn new(tag: RuleTag) -> Self {
        Self {
            tag,
            param: RuleParam::None,
        }
    }

    pub fn with_param(tag: RuleTag, param: RuleParam) -> Self {
        Self { tag, param }
    }
}

impl fmt::Display for HideRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.param {
            RuleParam::None => write!(f, "[{}]", self.tag),
            RuleParam::Days(days) => write!(f, "[{}:{}]", self.tag, days),
            RuleParam::DaysWithGrace { days, grace_hours } => {
                write!(f, "[{}:{}:{}h]", self.tag, days, grace_hours)
            }
        }
    }
}
