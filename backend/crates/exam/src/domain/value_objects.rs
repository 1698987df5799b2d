//! Domain Value Objects
//!
//! Immutable value types for the exam domain.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// Exam mode
///
/// Only rated sessions are monitored by the integrity protocol; free
/// practice sessions never touch heartbeat or violation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamMode {
    Free,
    Rating,
}

impl ExamMode {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            ExamMode::Free => "FREE",
            ExamMode::Rating => "RATING",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "FREE" => Some(ExamMode::Free),
            "RATING" => Some(ExamMode::Rating),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_monitored(&self) -> bool {
        matches!(self, ExamMode::Rating)
    }
}

impl fmt::Display for ExamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Question difficulty on a 1..=10 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: Difficulty = Difficulty(1);
    pub const MAX: Difficulty = Difficulty(10);
    /// Points per level for a correct (or wrong) answer
    pub const POINTS_PER_LEVEL: i64 = 10;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0)
            .contains(&level)
            .then_some(Self(level))
    }

    /// Clamp an arbitrary level into range
    pub fn clamped(level: i32) -> Self {
        Self(level.clamp(Self::MIN.0 as i32, Self::MAX.0 as i32) as u8)
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.0
    }

    pub fn harder(self) -> Self {
        Self::clamped(self.0 as i32 + 1)
    }

    pub fn easier(self) -> Self {
        Self::clamped(self.0 as i32 - 1)
    }

    /// Base points at stake for a question of this difficulty
    pub fn points(&self) -> i64 {
        Self::POINTS_PER_LEVEL * self.0 as i64
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| format!("difficulty level out of range: {level}"))
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d.0
    }
}

/// One independently counted kind of client-side anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationCategory {
    TabSwitch,
    TextCopy,
    DevTools,
    DomTampering,
    FunctionTampering,
    ModuleTampering,
    PageClose,
    ExternalContent,
    AntiOcrTampering,
}

impl ViolationCategory {
    pub const COUNT: usize = 9;

    pub const ALL: [ViolationCategory; Self::COUNT] = [
        ViolationCategory::TabSwitch,
        ViolationCategory::TextCopy,
        ViolationCategory::DevTools,
        ViolationCategory::DomTampering,
        ViolationCategory::FunctionTampering,
        ViolationCategory::ModuleTampering,
        ViolationCategory::PageClose,
        ViolationCategory::ExternalContent,
        ViolationCategory::AntiOcrTampering,
    ];

    /// Position in [`ViolationCategory::ALL`]
    #[inline]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Categories summed against the aggregate tampering limit
    ///
    /// Tab-switch and text-copy each have their own limit instead.
    #[inline]
    pub const fn is_tampering_class(&self) -> bool {
        !matches!(
            self,
            ViolationCategory::TabSwitch | ViolationCategory::TextCopy
        )
    }

    pub const fn code(&self) -> &'static str {
        use ViolationCategory::*;
        match self {
            TabSwitch => "tab_switch",
            TextCopy => "text_copy",
            DevTools => "dev_tools",
            DomTampering => "dom_tampering",
            FunctionTampering => "function_tampering",
            ModuleTampering => "module_tampering",
            PageClose => "page_close",
            ExternalContent => "external_content",
            AntiOcrTampering => "anti_ocr_tampering",
        }
    }
}

impl fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Wire tag that does not name any event kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event tag: {0}")]
pub struct UnknownEventTag(pub String);

/// Internal event kind of an integrity signal
///
/// Every kind has two names: the internal one used in logs and code,
/// and a deliberately uninformative wire tag. Serde uses the wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    HeartBeat,
    TabSwitch,
    TextCopy,
    DevTools,
    DomTampering,
    FunctionTampering,
    ModuleTampering,
    PageClose,
    ExternalContent,
    AntiOcrTamp,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::HeartBeat,
        EventKind::TabSwitch,
        EventKind::TextCopy,
        EventKind::DevTools,
        EventKind::DomTampering,
        EventKind::FunctionTampering,
        EventKind::ModuleTampering,
        EventKind::PageClose,
        EventKind::ExternalContent,
        EventKind::AntiOcrTamp,
    ];

    pub const fn wire_tag(&self) -> &'static str {
        use EventKind::*;
        match self {
            HeartBeat => "UI_MENU_HB_CHECK",
            TabSwitch => "UI_PERFORMANCE_CHECK",
            TextCopy => "UI_TEXT_PROCESSING",
            DevTools => "UI_PAINT_FRAME",
            DomTampering => "UI_LAYOUT_RENDER",
            FunctionTampering => "UI_FUNCTION_WRAPPER",
            ModuleTampering => "UI_MODULE_HANDLER",
            PageClose => "UI_PAGE_LIFECYCLE",
            ExternalContent => "UI_CONTENT_SECURITY",
            AntiOcrTamp => "UI_MENU_OC_TAM",
        }
    }

    pub const fn internal_name(&self) -> &'static str {
        use EventKind::*;
        match self {
            HeartBeat => "HEART_BEAT",
            TabSwitch => "TAB_SWITCH",
            TextCopy => "TEXT_COPY",
            DevTools => "DEVTOOLS",
            DomTampering => "DOM_TAMPERING",
            FunctionTampering => "FUNCTION_TAMPERING",
            ModuleTampering => "MODULE_TAMPERING",
            PageClose => "PAGE_CLOSE",
            ExternalContent => "EXTERNAL_CONTENT",
            AntiOcrTamp => "ANTI_OCR_TAMP",
        }
    }

    pub fn from_wire_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_tag() == tag)
    }

    /// Violation category counted for this kind, `None` for heartbeats
    pub const fn violation_category(&self) -> Option<ViolationCategory> {
        use EventKind::*;
        match self {
            HeartBeat => None,
            TabSwitch => Some(ViolationCategory::TabSwitch),
            TextCopy => Some(ViolationCategory::TextCopy),
            DevTools => Some(ViolationCategory::DevTools),
            DomTampering => Some(ViolationCategory::DomTampering),
            FunctionTampering => Some(ViolationCategory::FunctionTampering),
            ModuleTampering => Some(ViolationCategory::ModuleTampering),
            PageClose => Some(ViolationCategory::PageClose),
            ExternalContent => Some(ViolationCategory::ExternalContent),
            AntiOcrTamp => Some(ViolationCategory::AntiOcrTampering),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.internal_name())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventTag;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::from_wire_tag(tag).ok_or_else(|| UnknownEventTag(tag.to_string()))
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_tag())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(de::Error::custom)
    }
}

/// Why a session was terminated, as surfaced to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationCause {
    Violations,
    FailCount,
}

impl TerminationCause {
    pub const fn reason(&self) -> &'static str {
        match self {
            TerminationCause::Violations => "Exam terminated due to rule violations",
            TerminationCause::FailCount => "Exam terminated: too many wrong answers",
        }
    }
}

/// Violation thresholds
///
/// Each limit is reached when the count is greater than or equal to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViolationLimits {
    pub max_tab_switch: u32,
    pub max_text_copy: u32,
    /// Aggregate over all tampering-class categories
    pub max_tampering: u32,
    pub max_heartbeat_missed: u32,
}

impl Default for ViolationLimits {
    fn default() -> Self {
        Self {
            max_tab_switch: 3,
            max_text_copy: 3,
            max_tampering: 2,
            max_heartbeat_missed: 3,
        }
    }
}

/// Heartbeat timing parameters, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatTiming {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub tolerance_ms: u64,
    /// Window for the absence check run at answer/next-question time
    pub long_absence_tolerance_ms: u64,
}

impl Default for HeartbeatTiming {
    fn default() -> Self {
        Self {
            min_interval_ms: 5_000,
            max_interval_ms: 10_000,
            tolerance_ms: 2_000,
            long_absence_tolerance_ms: 60_000,
        }
    }
}

/// Per-mode progression rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRules {
    /// Consecutive correct answers before difficulty goes up
    pub success_answers_to_level_up: u32,
    /// Consecutive wrong answers before difficulty goes down
    pub fail_answers_to_level_down: u32,
    /// Total wrong answers that end a rated exam
    pub fail_answers_absolute_limit: u32,
    pub requires_identity: bool,
}

impl ModeRules {
    pub fn free() -> Self {
        Self {
            success_answers_to_level_up: 3,
            fail_answers_to_level_down: 2,
            fail_answers_absolute_limit: u32::MAX,
            requires_identity: false,
        }
    }

    pub fn rating() -> Self {
        Self {
            success_answers_to_level_up: 3,
            fail_answers_to_level_down: 2,
            fail_answers_absolute_limit: 10,
            requires_identity: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_table_is_injective() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire_tag(kind.wire_tag()), Some(kind));
        }
        let mut tags: Vec<_> = EventKind::ALL.iter().map(|k| k.wire_tag()).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), EventKind::ALL.len());
    }

    #[test]
    fn test_wire_tags_are_exact() {
        assert_eq!(EventKind::HeartBeat.wire_tag(), "UI_MENU_HB_CHECK");
        assert_eq!(EventKind::TabSwitch.wire_tag(), "UI_PERFORMANCE_CHECK");
        assert_eq!(EventKind::AntiOcrTamp.wire_tag(), "UI_MENU_OC_TAM");
        assert_eq!("UI_PAINT_FRAME".parse(), Ok(EventKind::DevTools));
    }

    #[test]
    fn test_unknown_tag_fails_deserialization() {
        let err = serde_json::from_str::<EventKind>("\"UI_FOO\"").unwrap_err();
        assert!(err.to_string().contains("unknown event tag: UI_FOO"));

        // Internal names are not accepted on the wire
        assert!(serde_json::from_str::<EventKind>("\"HEART_BEAT\"").is_err());
    }

    #[test]
    fn test_event_kind_serializes_as_wire_tag() {
        let json = serde_json::to_string(&EventKind::PageClose).unwrap();
        assert_eq!(json, "\"UI_PAGE_LIFECYCLE\"");
    }

    #[test]
    fn test_difficulty_bounds() {
        assert!(Difficulty::new(0).is_none());
        assert!(Difficulty::new(11).is_none());
        assert_eq!(Difficulty::MAX.harder(), Difficulty::MAX);
        assert_eq!(Difficulty::MIN.easier(), Difficulty::MIN);
        assert_eq!(Difficulty::clamped(42), Difficulty::MAX);
        assert_eq!(Difficulty::new(4).unwrap().points(), 40);
        assert!(serde_json::from_str::<Difficulty>("0").is_err());
    }

    #[test]
    fn test_tampering_class() {
        let tampering: Vec<_> = ViolationCategory::ALL
            .into_iter()
            .filter(ViolationCategory::is_tampering_class)
            .collect();
        assert_eq!(tampering.len(), 7);
        assert!(tampering.contains(&ViolationCategory::DevTools));
        assert!(!tampering.contains(&ViolationCategory::TabSwitch));
    }

    #[test]
    fn test_category_index_matches_all() {
        for (i, category) in ViolationCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }
}
