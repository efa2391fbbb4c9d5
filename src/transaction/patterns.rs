// src/transaction/patterns.rs

//! Hold/ignore pattern sets and install priorities

use crate::error::{Error, Result};
use crate::package::Package;
use glob::Pattern;
use std::fs;
use std::path::Path;
use tracing::debug;

fn compile(mask: &str) -> Result<Pattern> {
    Pattern::new(mask).map_err(|e| Error::InvalidPattern {
        pattern: mask.to_string(),
        reason: e.msg.to_string(),
    })
}

/// Shell-style masks matched against package names
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_masks<I, S>(masks: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for mask in masks {
            set.push(mask.as_ref())?;
        }
        Ok(set)
    }

    pub fn push(&mut self, mask: &str) -> Result<()> {
        let mask = mask.trim();
        if !mask.is_empty() {
            self.patterns.push(compile(mask)?);
        }
        Ok(())
    }

    pub fn extend(&mut self, other: PatternSet) {
        self.patterns.extend(other.patterns);
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn matches(&self, pkg: &Package) -> bool {
        self.patterns.iter().any(|p| p.matches(&pkg.name))
    }
}

/// Parse a mask list file: one mask per line, `#` comments
pub fn read_mask_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Install priorities from `mask [priority]` lines
///
/// Lower priorities install earlier; a line without a number means `-1`.
/// When several masks match a package, the one with the lowest priority
/// wins.
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    entries: Vec<(Pattern, i32)>,
}

/// Priority of a mask line with no number
pub const DEFAULT_MASK_PRIORITY: i32 = -1;

impl PriorityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse priority definitions; `origin` names the source in errors
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(mask) = fields.next() else {
                continue;
            };
            let priority = match fields.next() {
                None => DEFAULT_MASK_PRIORITY,
                Some(p) => p.parse::<i32>().map_err(|_| Error::ConfigSyntax {
                    path: origin.to_string(),
                    line: n + 1,
                    message: format!("syntax error near {}", p),
                })?,
            };

            debug!("priority mask {} = {}", mask, priority);
            entries.push((compile(mask)?, priority));
        }

        entries.sort_by_key(|(_, pri)| *pri);
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Priority of `pkg`, 0 when no mask matches
    pub fn priority_of(&self, pkg: &Package) -> i32 {
        let nevr = pkg.nevr();
        self.entries
            .iter()
            .find(|(p, _)| p.matches(&pkg.name) || p.matches(&nevr))
            .map(|(_, pri)| *pri)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::RpmVersion;
    use std::io::Write;

    fn pkg(name: &str) -> Package {
        Package::new(name, RpmVersion::parse("1.0-1").unwrap())
    }

    #[test]
    fn test_pattern_set() {
        let set = PatternSet::from_masks(["kernel*", "glibc"]).unwrap();
        assert!(set.matches(&pkg("kernel-smp")));
        assert!(set.matches(&pkg("glibc")));
        assert!(!set.matches(&pkg("glibc-devel")));
        assert!(PatternSet::from_masks(["[oops"]).is_err());
    }

    #[test]
    fn test_read_mask_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# held packages\n\nkernel*\n  glibc  ").unwrap();
        let masks = read_mask_file(file.path()).unwrap();
        assert_eq!(masks, vec!["kernel*", "glibc"]);
    }

    #[test]
    fn test_priority_table() {
        let table = PriorityTable::parse("# order\nglibc* -10\nbash\nkernel 5\n*-devel-* 2\n", "pri.conf")
            .unwrap();
        assert_eq!(table.priority_of(&pkg("glibc-common")), -10);
        assert_eq!(table.priority_of(&pkg("bash")), -1);
        assert_eq!(table.priority_of(&pkg("kernel")), 5);
        assert_eq!(table.priority_of(&pkg("zlib-devel")), 2);
        assert_eq!(table.priority_of(&pkg("vim")), 0);
    }

    #[test]
    fn test_priority_table_syntax_error() {
        let err = PriorityTable::parse("glibc\nbash high\n", "pri.conf").unwrap_err();
        assert_eq!(err.to_string(), "pri.conf:2: syntax error near high");
    }
}
