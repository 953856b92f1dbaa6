//! Deduplicated pool of names for the compressed format

use std::collections::HashMap;
use tracing::debug;

use crate::crc;
use crate::error::{Error, Result};

/// Maximum number of strings a 16 bit id can address
pub const MAX_STRINGS: usize = u16::MAX as usize;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    /// Strings may be added; ids are not final
    Building,

    /// Order is fixed; ids may be read
    Sorted,
}

/// Case insensitive string pool addressed by 16 bit ids
///
/// Strings are added while building, then [`StringTable::sort`] fixes their order by
/// [`crc::hash`]. Ids are positional, so they can only be read after sorting.
///
/// ```
/// # fn doit() -> coalesced_bin::error::Result<()> {
/// use coalesced_bin::StringTable;
///
/// let mut table = StringTable::new();
/// table.add("Engine.ini")?;
/// table.add("engine.INI")?;
/// table.sort();
///
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.get_string(table.get_id("ENGINE.ini")?)?, "engine.ini");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct StringTable {
    strings: Vec<String>,
    ids: HashMap<String, u16>,
    phase: Phase,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            strings: Vec::new(),
            ids: HashMap::new(),
            phase: Phase::Building,
        }
    }

    /// Table read from a file, kept exactly as stored
    pub fn from_stored(strings: Vec<String>) -> Self {
        let ids = strings
            .iter()
            .enumerate()
            .rev()
            .map(|(id, s)| (s.to_lowercase(), id as u16))
            .collect();

        Self {
            strings,
            ids,
            phase: Phase::Sorted,
        }
    }

    /// Number of distinct strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the table contains no strings
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Strings in id order
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Add a string, folded to lower case, unless it is already present.
    pub fn add(&mut self, s: &str) -> Result<()> {
        if self.phase != Phase::Building {
            return Err(Error::StringTablePhase);
        }

        let key = s.to_lowercase();
        if self.ids.contains_key(&key) {
            return Ok(());
        }

        if self.strings.len() >= MAX_STRINGS {
            return Err(Error::TooManyStrings);
        }

        self.ids.insert(key.clone(), self.strings.len() as u16);
        self.strings.push(key);
        Ok(())
    }

    /// Order strings by ascending hash and renumber them.
    ///
    /// Strings with equal hashes keep their relative order.
    pub fn sort(&mut self) {
        self.strings.sort_by_cached_key(|s| crc::hash(s));
        for (id, s) in self.strings.iter().enumerate() {
            self.ids.insert(s.clone(), id as u16);
        }
        self.phase = Phase::Sorted;

        debug!(strings = self.strings.len(), "sorted string table");
    }

    /// Id of a string, or 0 when it was never added.
    pub fn get_id(&self, s: &str) -> Result<u16> {
        if self.phase != Phase::Sorted {
            return Err(Error::StringTablePhase);
        }
        Ok(self.ids.get(&s.to_lowercase()).copied().unwrap_or(0))
    }

    pub fn get_string(&self, id: u16) -> Result<&str> {
        self.strings
            .get(id as usize)
            .map(String::as_str)
            .ok_or(Error::InvalidStringId {
                id,
                count: self.strings.len(),
            })
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::crc;
    use crate::error::{Error, ErrorKind, Result};
    use crate::string_table::{StringTable, MAX_STRINGS};

    #[test]
    fn add_folds_case() -> Result<()> {
        let mut table = StringTable::new();
        table.add("Foo")?;
        table.add("foo")?;
        table.add("FOO")?;
        table.add("bar")?;

        assert_eq!(table.len(), 2);
        assert_eq!(table.strings().collect::<Vec<_>>(), ["foo", "bar"]);

        Ok(())
    }

    #[test]
    fn sort_orders_by_hash() -> Result<()> {
        let mut table = StringTable::new();
        for s in ["", "Core.System", "Paths", "engine.ini", "SFXGame", "Key"] {
            table.add(s)?;
        }
        table.sort();

        let hashes = table.strings().map(crc::hash).collect::<Vec<_>>();
        assert!(hashes.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(table.get_string(0)?, "");

        for s in ["", "Core.System", "Paths", "engine.ini", "SFXGame", "Key"] {
            assert_eq!(table.get_string(table.get_id(s)?)?, s.to_lowercase());
        }
        assert_eq!(table.get_id("missing")?, 0);

        Ok(())
    }

    #[test]
    fn phases_are_enforced() -> Result<()> {
        let mut table = StringTable::new();
        table.add("a")?;
        assert!(matches!(table.get_id("a"), Err(Error::StringTablePhase)));

        table.sort();
        assert!(matches!(table.add("b"), Err(Error::StringTablePhase)));
        assert!(matches!(
            table.get_string(5),
            Err(Error::InvalidStringId { id: 5, count: 1 })
        ));

        Ok(())
    }

    #[test]
    fn stored_strings_keep_their_case() -> Result<()> {
        let table = StringTable::from_stored(vec!["Test".into(), "Main".into()]);

        assert_eq!(table.get_string(0)?, "Test");
        assert_eq!(table.get_id("main")?, 1);

        Ok(())
    }

    #[test]
    fn capacity_is_limited() -> Result<()> {
        let mut table = StringTable::new();
        for i in 0..MAX_STRINGS {
            table.add(&i.to_string())?;
        }

        let err = table.add("one too many").err();
        assert!(matches!(err, Some(Error::TooManyStrings)));
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Capacity));

        // existing strings can still be added again
        table.add("0")?;

        Ok(())
    }
}
