use core::fmt;

use std::collections::BTreeMap;

use crate::config::Config;

/// Keys of the tags this tool knows how to set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum TagKey {
    /// Reference to the library a mini file depends on.
    Lib,
    /// Name of the person who ripped the file.
    Creator,
}

impl TagKey {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            TagKey::Lib => "_lib",
            TagKey::Creator => "2sfby",
        }
    }
}

impl fmt::Display for TagKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Tags to embed in a converted file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Tags {
    map: BTreeMap<TagKey, String>,
}

impl Tags {
    /// Assemble tags from configuration.
    pub(crate) fn from_config(config: &Config) -> Self {
        let mut tags = Tags::default();

        if let Some(lib) = &config.lib {
            tags.insert(TagKey::Lib, lib);
        }

        if let Some(creator) = &config.creator {
            tags.insert(TagKey::Creator, creator);
        }

        tags
    }

    /// Insert a tag, ignoring empty values.
    pub(crate) fn insert(&mut self, key: TagKey, value: &str) {
        if value.is_empty() {
            return;
        }

        self.map.insert(key, value.to_owned());
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: TagKey) -> Option<&str> {
        Some(self.map.get(&key)?.as_str())
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over tags in key order.
    #[inline]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (TagKey, &str)> + '_ {
        self.map.iter().map(|(k, v)| (*k, v.as_str()))
    }
}
