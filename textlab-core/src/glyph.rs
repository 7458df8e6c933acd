//! Glyph registry - the fixed palette of radicals and strokes.
//!
//! | Group    | Glyphs                                                     |
//! |----------|------------------------------------------------------------|
//! | Radicals | 手 田 水 口 廿 卜 山 戈 人 心 日 尸 木 火 土 竹 大 中 金 女 月 弓 |
//! | Strokes  | 一 丨 丿 ㇏ ㇔ 𠃋                                             |
//!
//! Glyphs are identified by their pinyin name on the wire (`"shan"`,
//! `"heng"`, ...). The table is static: there is no registration or mutation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{LabError, LabResult};

/// Character shown for glyph names the registry does not know.
pub const PLACEHOLDER_CHAR: &str = "?";

/// Identifier of a glyph in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)] // Variants are pinyin names; the display table documents them.
pub enum GlyphId {
    Shou,
    Tian,
    Shui,
    Kou,
    Nian,
    Bu,
    Shan,
    Ge,
    Ren,
    Xin,
    Ri,
    Shi,
    Mu,
    Huo,
    Tu,
    Zhu,
    Da,
    Zhong,
    Jin,
    Nu,
    Yue,
    Gong,
    Heng,
    Shu,
    Pie,
    Na,
    Dian,
    Ti,
}

impl GlyphId {
    /// Every glyph, in palette order.
    pub const ALL: [GlyphId; 28] = [
        Self::Shou,
        Self::Tian,
        Self::Shui,
        Self::Kou,
        Self::Nian,
        Self::Bu,
        Self::Shan,
        Self::Ge,
        Self::Ren,
        Self::Xin,
        Self::Ri,
        Self::Shi,
        Self::Mu,
        Self::Huo,
        Self::Tu,
        Self::Zhu,
        Self::Da,
        Self::Zhong,
        Self::Jin,
        Self::Nu,
        Self::Yue,
        Self::Gong,
        Self::Heng,
        Self::Shu,
        Self::Pie,
        Self::Na,
        Self::Dian,
        Self::Ti,
    ];

    /// The canonical display character for this glyph.
    #[must_use]
    pub fn display_char(self) -> &'static str {
        match self {
            Self::Shou => "手",
            Self::Tian => "田",
            Self::Shui => "水",
            Self::Kou => "口",
            Self::Nian => "廿",
            Self::Bu => "卜",
            Self::Shan => "山",
            Self::Ge => "戈",
            Self::Ren => "人",
            Self::Xin => "心",
            Self::Ri => "日",
            Self::Shi => "尸",
            Self::Mu => "木",
            Self::Huo => "火",
            Self::Tu => "土",
            Self::Zhu => "竹",
            Self::Da => "大",
            Self::Zhong => "中",
            Self::Jin => "金",
            Self::Nu => "女",
            Self::Yue => "月",
            Self::Gong => "弓",
            Self::Heng => "一",
            Self::Shu => "丨",
            Self::Pie => "丿",
            Self::Na => "㇏",
            Self::Dian => "㇔",
            Self::Ti => "𠃋",
        }
    }

    /// The wire name of this glyph.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Shou => "shou",
            Self::Tian => "tian",
            Self::Shui => "shui",
            Self::Kou => "kou",
            Self::Nian => "nian",
            Self::Bu => "bu",
            Self::Shan => "shan",
            Self::Ge => "ge",
            Self::Ren => "ren",
            Self::Xin => "xin",
            Self::Ri => "ri",
            Self::Shi => "shi",
            Self::Mu => "mu",
            Self::Huo => "huo",
            Self::Tu => "tu",
            Self::Zhu => "zhu",
            Self::Da => "da",
            Self::Zhong => "zhong",
            Self::Jin => "jin",
            Self::Nu => "nu",
            Self::Yue => "yue",
            Self::Gong => "gong",
            Self::Heng => "heng",
            Self::Shu => "shu",
            Self::Pie => "pie",
            Self::Na => "na",
            Self::Dian => "dian",
            Self::Ti => "ti",
        }
    }

    /// Whether this glyph is a single brush stroke rather than a radical.
    #[must_use]
    pub fn is_stroke(self) -> bool {
        matches!(
            self,
            Self::Heng | Self::Shu | Self::Pie | Self::Na | Self::Dian | Self::Ti
        )
    }
}

impl fmt::Display for GlyphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GlyphId {
    type Err = LabError;

    fn from_str(s: &str) -> LabResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|glyph| glyph.name() == s)
            .ok_or_else(|| LabError::UnknownGlyph(s.to_string()))
    }
}

/// Resolve a raw glyph name to its display character.
///
/// Unknown names resolve to [`PLACEHOLDER_CHAR`] instead of failing.
#[must_use]
pub fn lookup_name(name: &str) -> &'static str {
    name.parse::<GlyphId>()
        .map_or(PLACEHOLDER_CHAR, GlyphId::display_char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_has_28_distinct_entries() {
        let names: HashSet<_> = GlyphId::ALL.iter().map(|g| g.name()).collect();
        let chars: HashSet<_> = GlyphId::ALL.iter().map(|g| g.display_char()).collect();
        assert_eq!(names.len(), 28);
        assert_eq!(chars.len(), 28);
    }

    #[test]
    fn test_name_roundtrips_through_from_str() {
        for glyph in GlyphId::ALL {
            assert_eq!(glyph.name().parse::<GlyphId>().expect("parse"), glyph);
        }
    }

    #[test]
    fn test_serde_uses_wire_name() {
        let json = serde_json::to_string(&GlyphId::Zhong).expect("serialize");
        assert_eq!(json, "\"zhong\"");
        let glyph: GlyphId = serde_json::from_str("\"ti\"").expect("deserialize");
        assert_eq!(glyph, GlyphId::Ti);
    }

    #[test]
    fn test_lookup_known_and_unknown() {
        assert_eq!(lookup_name("shan"), "山");
        assert_eq!(lookup_name("heng"), "一");
        assert_eq!(lookup_name("dragon"), PLACEHOLDER_CHAR);
        assert_eq!(lookup_name(""), PLACEHOLDER_CHAR);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let err = "Shan".parse::<GlyphId>().expect_err("case sensitive");
        assert!(matches!(err, LabError::UnknownGlyph(name) if name == "Shan"));
    }

    #[test]
    fn test_strokes() {
        assert!(GlyphId::Pie.is_stroke());
        assert!(!GlyphId::Kou.is_stroke());
        assert_eq!(GlyphId::ALL.iter().filter(|g| g.is_stroke()).count(), 6);
    }
}
