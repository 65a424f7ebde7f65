//! Evaluation inputs: the current item and the view arguments

use crate::value::{CvuValue, PropertyDict};
use serde::{Deserialize, Serialize};

/// Reference to a data item being displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
    pub item_type: String,
    pub uid: Option<i64>,
    pub properties: PropertyDict,
}

impl ItemRef {
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            uid: None,
            properties: PropertyDict::new(),
        }
    }

    pub fn with_uid(mut self, uid: i64) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<CvuValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Property lookup with the built-in `type` and `uid` fields as fallback.
    pub fn get(&self, key: &str) -> Option<CvuValue> {
        if let Some(value) = self.properties.get(key) {
            return Some(value.clone());
        }
        match key {
            "type" => Some(CvuValue::String(self.item_type.clone())),
            "uid" => self.uid.map(CvuValue::from),
            _ => None,
        }
    }
}

/// Ordered name/value arguments passed to a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewArguments {
    entries: Vec<(String, CvuValue)>,
}

impl ViewArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<CvuValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<CvuValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CvuValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CvuValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge caller arguments over these defaults. The caller wins on
    /// conflicts; order is ours first, then the caller's new names.
    pub fn merged_with(&self, caller: &ViewArguments) -> ViewArguments {
        let mut merged = self.clone();
        for (name, value) in caller.iter() {
            merged.set(name, value.clone());
        }
        merged
    }
}

/// Inputs available while evaluating an expression.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub item: Option<&'a ItemRef>,
    pub arguments: &'a ViewArguments,
}

impl<'a> EvalContext<'a> {
    pub fn new(item: Option<&'a ItemRef>, arguments: &'a ViewArguments) -> Self {
        Self { item, arguments }
    }
}
