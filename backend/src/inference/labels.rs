use std::io;
use std::path::Path;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// Class names in model output order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn parse(contents: &str) -> Self {
        Self::new(contents.lines().map(|line| line.trim().to_string()).collect())
    }

    /// Reads one label per line. A missing file yields an empty set.
    pub fn load(path: &Path) -> io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!(
                    "Label file {} not found, every class will render as {}",
                    path.display(),
                    UNKNOWN_LABEL
                );
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn get(&self, index: usize) -> &str {
        self.0.get(index).map(String::as_str).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_keeps_order() {
        let labels = LabelSet::parse("Rice___Brown_Spot\r\n  Rice___healthy \nRice___Leaf_Blast\n");
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get(0), "Rice___Brown_Spot");
        assert_eq!(labels.get(1), "Rice___healthy");
        assert_eq!(labels.get(2), "Rice___Leaf_Blast");
    }

    #[test]
    fn out_of_bounds_is_unknown() {
        let labels = LabelSet::parse("only_one");
        assert_eq!(labels.get(1), UNKNOWN_LABEL);
        assert_eq!(LabelSet::default().get(0), UNKNOWN_LABEL);
    }

    #[test]
    fn missing_file_is_empty() {
        let labels = LabelSet::load(Path::new("does/not/exist/classes.txt")).unwrap();
        assert_eq!(labels.len(), 0);
    }
}
