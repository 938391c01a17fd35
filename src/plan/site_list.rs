//! Loading site lists from disk.

use crate::errors::PlanError;
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};

/// The filtered, shuffled site identifiers loaded from one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteList {
    /// File stem of the source file (e.g. `iffy` for `lists/iffy.csv`)
    pub name: String,
    pub source: PathBuf,
    pub sites: Vec<String>,
}

impl SiteList {
    /// Read a list file, split on `separator`, drop blank entries, then shuffle.
    pub fn load<R: Rng + ?Sized>(
        path: &Path,
        separator: &str,
        rng: &mut R,
    ) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlanError::ListRead {
            path: path.to_path_buf(),
            source,
        })?;
        let name = list_name(path);
        let mut list = Self::parse(name, path.to_path_buf(), &content, separator);
        list.sites.shuffle(rng);
        Ok(list)
    }

    /// Split raw content into trimmed, non-empty identifiers, preserving file order.
    pub fn parse(name: String, source: PathBuf, content: &str, separator: &str) -> Self {
        let sites = content
            .split(separator)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            name,
            source,
            sites,
        }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// List name derived from the file stem.
pub fn list_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn test_parse_trims_and_drops_empty_tokens() {
        let list = SiteList::parse(
            "news".to_string(),
            PathBuf::from("news.txt"),
            " a.com, b.org ,,\n c.net ,  ,",
            ",",
        );
        assert_eq!(list.sites, vec!["a.com", "b.org", "c.net"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_parse_with_newline_separator() {
        let list = SiteList::parse(
            "lines".to_string(),
            PathBuf::from("lines.txt"),
            "a.com\nb.com\n\nc.com\n",
            "\n",
        );
        assert_eq!(list.sites, vec!["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn test_load_shuffles_but_keeps_members() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("iffy.txt");
        let sites: Vec<String> = (0..50).map(|i| format!("site{}.com", i)).collect();
        std::fs::write(&path, sites.join(",")).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let list = SiteList::load(&path, ",", &mut rng).unwrap();
        assert_eq!(list.name, "iffy");
        assert_eq!(list.len(), 50);

        let loaded: HashSet<_> = list.sites.iter().cloned().collect();
        let expected: HashSet<_> = sites.into_iter().collect();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn test_load_same_seed_same_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("l.txt");
        std::fs::write(&path, "a,b,c,d,e,f,g,h").unwrap();

        let a = SiteList::load(&path, ",", &mut StdRng::seed_from_u64(11)).unwrap();
        let b = SiteList::load(&path, ",", &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a.sites, b.sites);
    }

    #[test]
    fn test_load_missing_file_is_list_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let err = SiteList::load(&path, ",", &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, PlanError::ListRead { .. }));
    }

    #[test]
    fn test_list_name_is_file_stem() {
        assert_eq!(
            list_name(Path::new("/data/newsguard_trustworthy.csv")),
            "newsguard_trustworthy"
        );
        assert_eq!(list_name(Path::new("plain")), "plain");
    }
}
