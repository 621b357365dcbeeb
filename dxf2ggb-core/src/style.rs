use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{EntityKind, EntryType};

#[derive(Debug, Error, PartialEq)]
pub enum StyleError {
    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
    #[error("style {key:?}: symbol code {code} is not a valid {family} symbol")]
    UnknownSymbol {
        key: String,
        family: StyleFamily,
        code: u8,
    },
    #[error("style {key:?}: size {size} outside 1..={max}")]
    SizeOutOfRange { key: String, size: u8, max: u8 },
}

/// 24 位颜色，文本形式为小写、补零的 `#rrggbb`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 从 0xRRGGBB 整数构造，高于 24 位的部分被忽略。
    #[inline]
    pub const fn from_u24(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }

    #[inline]
    pub const fn to_u24(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.to_u24())
    }
}

impl FromStr for Rgb {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StyleError::InvalidColor(s.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(Rgb::from_u24)
            .map_err(|_| StyleError::InvalidColor(s.to_string()))
    }
}

impl TryFrom<String> for Rgb {
    type Error = StyleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleFamily {
    Point,
    Line,
}

impl fmt::Display for StyleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleFamily::Point => f.pad("point"),
            StyleFamily::Line => f.pad("line"),
        }
    }
}

/// GeoGebra `pointStyle` 编码 0..=9。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSymbol {
    Dot,
    Cross,
    Circle,
    Plus,
    FilledDiamond,
    EmptyDiamond,
    TriangleNorth,
    TriangleSouth,
    TriangleEast,
    TriangleWest,
}

impl PointSymbol {
    pub const ALL: [PointSymbol; 10] = [
        PointSymbol::Dot,
        PointSymbol::Cross,
        PointSymbol::Circle,
        PointSymbol::Plus,
        PointSymbol::FilledDiamond,
        PointSymbol::EmptyDiamond,
        PointSymbol::TriangleNorth,
        PointSymbol::TriangleSouth,
        PointSymbol::TriangleEast,
        PointSymbol::TriangleWest,
    ];

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn glyph(self) -> &'static str {
        match self {
            PointSymbol::Dot => "⏺",
            PointSymbol::Cross => "x",
            PointSymbol::Circle => "⭘",
            PointSymbol::Plus => "+",
            PointSymbol::FilledDiamond => "◆",
            PointSymbol::EmptyDiamond => "◇",
            PointSymbol::TriangleNorth => "⮝",
            PointSymbol::TriangleSouth => "⮟",
            PointSymbol::TriangleEast => "⮞",
            PointSymbol::TriangleWest => "⮜",
        }
    }
}

/// GeoGebra `lineStyle type` 编码：0 实线，15 虚线。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

impl LineStyle {
    #[inline]
    pub fn code(self) -> u8 {
        match self {
            LineStyle::Solid => 0,
            LineStyle::Dashed => 15,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(LineStyle::Solid),
            15 => Some(LineStyle::Dashed),
            _ => None,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            LineStyle::Solid => "-----",
            LineStyle::Dashed => "- - -",
        }
    }
}

/// 某一实体类型可用的符号族与尺寸范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRules {
    pub family: StyleFamily,
    pub default_size: u8,
    pub max_size: u8,
}

impl StyleRules {
    pub const MIN_SIZE: u8 = 1;

    pub fn for_kind(kind: &EntityKind) -> Self {
        let (default_size, max_size) = match kind {
            EntityKind::Insert => (3, 9),
            _ => (2, 13),
        };
        Self {
            family: kind.family(),
            default_size,
            max_size,
        }
    }

    /// 分类键的第一个词即实体类型名。
    pub fn for_key(key: &str) -> Self {
        let kind = key.split(' ').next().unwrap_or_default();
        Self::for_kind(&EntityKind::from_dxf_name(kind))
    }

    pub fn accepts_symbol(&self, code: u8) -> bool {
        match self.family {
            StyleFamily::Point => PointSymbol::from_code(code).is_some(),
            StyleFamily::Line => LineStyle::from_code(code).is_some(),
        }
    }

    pub fn symbol_glyph(&self, code: u8) -> Option<&'static str> {
        match self.family {
            StyleFamily::Point => PointSymbol::from_code(code).map(PointSymbol::glyph),
            StyleFamily::Line => LineStyle::from_code(code).map(LineStyle::glyph),
        }
    }
}

/// 单个分类的导出样式。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "Style::default_included")]
    pub included: bool,
    #[serde(default)]
    pub symbol: u8,
    pub color: Rgb,
    pub size: u8,
}

impl Style {
    fn default_included() -> bool {
        true
    }

    pub fn default_for(entry: &EntryType) -> Self {
        let rules = StyleRules::for_kind(&entry.kind);
        Self {
            label: Some(entry.label()),
            included: true,
            symbol: 0,
            color: entry.display_color,
            size: rules.default_size,
        }
    }

    pub fn validate(&self, key: &str) -> Result<(), StyleError> {
        let rules = StyleRules::for_key(key);
        if !rules.accepts_symbol(self.symbol) {
            return Err(StyleError::UnknownSymbol {
                key: key.to_string(),
                family: rules.family,
                code: self.symbol,
            });
        }
        if self.size < StyleRules::MIN_SIZE || self.size > rules.max_size {
            return Err(StyleError::SizeOutOfRange {
                key: key.to_string(),
                size: self.size,
                max: rules.max_size,
            });
        }
        Ok(())
    }
}

/// 手写样式表中的一行，省略的字段沿用该分类的默认样式。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u8>,
}

impl StylePatch {
    /// 逐字段覆盖。
    pub fn apply_to(self, style: &mut Style) {
        if let Some(label) = self.label {
            style.label = Some(label);
        }
        if let Some(included) = self.included {
            style.included = included;
        }
        if let Some(symbol) = self.symbol {
            style.symbol = symbol;
        }
        if let Some(color) = self.color {
            style.color = color;
        }
        if let Some(size) = self.size {
            style.size = size;
        }
    }

    /// 只检查给出的字段。
    pub fn validate(&self, key: &str) -> Result<(), StyleError> {
        let rules = StyleRules::for_key(key);
        if let Some(code) = self.symbol {
            if !rules.accepts_symbol(code) {
                return Err(StyleError::UnknownSymbol {
                    key: key.to_string(),
                    family: rules.family,
                    code,
                });
            }
        }
        if let Some(size) = self.size {
            if size < StyleRules::MIN_SIZE || size > rules.max_size {
                return Err(StyleError::SizeOutOfRange {
                    key: key.to_string(),
                    size,
                    max: rules.max_size,
                });
            }
        }
        Ok(())
    }
}

impl From<Style> for StylePatch {
    fn from(style: Style) -> Self {
        Self {
            label: style.label,
            included: Some(style.included),
            symbol: Some(style.symbol),
            color: Some(style.color),
            size: Some(style.size),
        }
    }
}

/// 导出坐标的平移量（`coord - translation`）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub x: f64,
    pub y: f64,
}

impl Translation {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 样式表：分类键到样式的映射，按键排序，外加可选的平移量。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    #[serde(default)]
    pub styles: BTreeMap<String, Style>,
}

impl StyleSheet {
    pub fn defaults_for<'a>(entries: impl IntoIterator<Item = &'a EntryType>) -> Self {
        let styles = entries
            .into_iter()
            .map(|entry| (entry.key(), Style::default_for(entry)))
            .collect();
        Self {
            translation: None,
            styles,
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Style> {
        self.styles.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, style: Style) {
        self.styles.insert(key.into(), style);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Style)> {
        self.styles.iter()
    }

    /// 把用户样式表逐字段叠加到同名条目上；返回本表没有的键，这些行被忽略。
    pub fn merge(&mut self, overrides: StyleSheetPatch) -> Vec<String> {
        if overrides.translation.is_some() {
            self.translation = overrides.translation;
        }
        let mut unknown = Vec::new();
        for (key, patch) in overrides.styles {
            match self.styles.get_mut(&key) {
                Some(style) => patch.apply_to(style),
                None => unknown.push(key),
            }
        }
        unknown
    }

    pub fn validate(&self) -> Result<(), StyleError> {
        for (key, style) in &self.styles {
            style.validate(key)?;
        }
        Ok(())
    }
}

/// 从文件读入的样式表，只含用户写出的字段。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSheetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    #[serde(default)]
    pub styles: BTreeMap<String, StylePatch>,
}

impl StyleSheetPatch {
    #[inline]
    pub fn get(&self, key: &str) -> Option<&StylePatch> {
        self.styles.get(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn validate(&self) -> Result<(), StyleError> {
        for (key, patch) in &self.styles {
            patch.validate(key)?;
        }
        Ok(())
    }
}

impl From<StyleSheet> for StyleSheetPatch {
    fn from(sheet: StyleSheet) -> Self {
        Self {
            translation: sheet.translation,
            styles: sheet
                .styles
                .into_iter()
                .map(|(key, style)| (key, StylePatch::from(style)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_entry() -> EntryType {
        EntryType {
            kind: EntityKind::Insert,
            layer: "L1".to_string(),
            subtype_id: Some("ABM_1000".to_string()),
            subtype_name: Some("allgemeineMarke".to_string()),
            display_color: Rgb::from_u24(0xff0000),
        }
    }

    #[test]
    fn rgb_parses_and_prints_lowercase_hex() {
        let color: Rgb = "#DBdbdb".parse().expect("valid color");
        assert_eq!(color, Rgb::new(0xdb, 0xdb, 0xdb));
        assert_eq!(color.to_string(), "#dbdbdb");
        assert_eq!(Rgb::from_u24(0x0000ff).to_string(), "#0000ff");
        assert_eq!("00ff00".parse::<Rgb>(), Ok(Rgb::new(0, 255, 0)));
        assert!(matches!(
            "#12345".parse::<Rgb>(),
            Err(StyleError::InvalidColor(_))
        ));
        assert!("#gg0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn defaults_depend_on_entity_kind() {
        let style = Style::default_for(&insert_entry());
        assert!(style.included);
        assert_eq!(style.symbol, 0);
        assert_eq!(style.size, 3);
        assert_eq!(style.color, Rgb::new(255, 0, 0));
        assert_eq!(style.label.as_deref(), Some("INSERT L1 allgemeineMarke"));

        let text = StyleRules::for_kind(&EntityKind::Text);
        assert_eq!(text.family, StyleFamily::Point);
        assert_eq!(text.default_size, 2);
        assert_eq!(text.max_size, 13);

        let line = StyleRules::for_key("LINE grenze");
        assert_eq!(line.family, StyleFamily::Line);
        assert!(line.accepts_symbol(15));
        assert!(!line.accepts_symbol(3));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut style = Style::default_for(&insert_entry());
        style.size = 10;
        assert_eq!(
            style.validate("INSERT L1 ABM_1000"),
            Err(StyleError::SizeOutOfRange {
                key: "INSERT L1 ABM_1000".to_string(),
                size: 10,
                max: 9,
            })
        );
        assert!(style.validate("TEXT L1").is_ok());

        style.size = 2;
        style.symbol = 15;
        assert!(style.validate("LWPOLYLINE L1").is_ok());
        assert!(matches!(
            style.validate("INSERT L1 ABM_1000"),
            Err(StyleError::UnknownSymbol { code: 15, .. })
        ));

        style.symbol = 0;
        style.size = 0;
        assert!(style.validate("LINE L1").is_err());
    }

    #[test]
    fn merge_overrides_known_keys_and_reports_unknown_ones() {
        let mut sheet = StyleSheet::defaults_for([&insert_entry()]);
        let mut overrides = StyleSheetPatch {
            translation: Some(Translation::new(3000.0, 5000.0)),
            ..StyleSheetPatch::default()
        };
        overrides.styles.insert(
            "INSERT L1 ABM_1000".to_string(),
            StylePatch {
                included: Some(false),
                symbol: Some(4),
                ..StylePatch::default()
            },
        );
        overrides.styles.insert(
            "LINE elsewhere".to_string(),
            StylePatch {
                color: Some(Rgb::new(1, 2, 3)),
                ..StylePatch::default()
            },
        );

        let unknown = sheet.merge(overrides);
        assert_eq!(unknown, vec!["LINE elsewhere".to_string()]);
        assert_eq!(sheet.translation, Some(Translation::new(3000.0, 5000.0)));
        let merged = sheet.get("INSERT L1 ABM_1000").expect("style present");
        assert!(!merged.included);
        assert_eq!(merged.symbol, 4);
        assert_eq!(merged.color, Rgb::new(255, 0, 0));
        assert_eq!(merged.size, 3);
        assert_eq!(merged.label.as_deref(), Some("INSERT L1 allgemeineMarke"));
        assert_eq!(sheet.len(), 1);
        assert!(sheet.validate().is_ok());
    }

    #[test]
    fn patch_checks_only_given_fields() {
        let exclude_only = StylePatch {
            included: Some(false),
            ..StylePatch::default()
        };
        assert!(exclude_only.validate("INSERT L1 ABM_1000").is_ok());

        let too_big = StylePatch {
            size: Some(10),
            ..StylePatch::default()
        };
        assert!(too_big.validate("LINE grenze").is_ok());
        assert!(matches!(
            too_big.validate("INSERT L1 ABM_1000"),
            Err(StyleError::SizeOutOfRange { max: 9, .. })
        ));

        let full = StylePatch::from(Style::default_for(&insert_entry()));
        assert_eq!(full.size, Some(3));
        assert_eq!(full.color, Some(Rgb::new(255, 0, 0)));
    }
}
