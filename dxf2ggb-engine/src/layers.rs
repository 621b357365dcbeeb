use dxf2ggb_core::model::EntryType;
use indexmap::IndexMap;

/// 一行可配置的图层分类，附带引用它的几何数量。
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    pub entry_type: EntryType,
    pub occurrences: usize,
}

/// 批次中出现过的全部分类，键为 `EntryType::key()`。首次登记的颜色不会被覆盖。
#[derive(Debug, Default)]
pub struct LayerStyleRegistry {
    entries: IndexMap<String, LayerEntry>,
}

impl LayerStyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// 返回是否为新登记。
    pub fn register(&mut self, entry_type: EntryType) -> bool {
        let key = entry_type.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            LayerEntry {
                entry_type,
                occurrences: 0,
            },
        );
        true
    }

    pub fn record(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.occurrences += 1;
        }
    }

    /// 撤回一次计数，用于占位点被真实 INSERT 取代时。
    pub fn release(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.occurrences = entry.occurrences.saturating_sub(1);
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&LayerEntry> {
        self.entries.get(key)
    }

    /// 首次出现的顺序。
    pub fn iter(&self) -> impl Iterator<Item = &LayerEntry> {
        self.entries.values()
    }

    pub fn entry_types(&self) -> impl Iterator<Item = &EntryType> {
        self.entries.values().map(|entry| &entry.entry_type)
    }

    /// 按键排序，供展示使用。
    pub fn sorted(&self) -> Vec<(&str, &LayerEntry)> {
        let mut rows: Vec<_> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
