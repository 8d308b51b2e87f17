//! LibSVM format dataset implementation
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1

use crate::core::{Dataset, Result, SVMError, SparseVector};
use crate::features::FeatureSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Dataset loaded from a LibSVM format file, stored as sparse real features
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    features: Arc<FeatureSet>,
    labels: Vec<f64>,
}

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a dataset from a reader (for testing and flexibility)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut vectors = Vec::new();
        let mut labels = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, vector) = Self::parse_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            labels.push(label);
            vectors.push(vector);
        }

        if vectors.is_empty() {
            return Err(SVMError::EmptyTrainingSet(
                "no samples in LibSVM input".to_string(),
            ));
        }

        Ok(Self {
            features: Arc::new(FeatureSet::sparse(vectors)),
            labels,
        })
    }

    /// Parse a single line in libsvm format
    ///
    /// Labels are mapped to ±1: positive values become +1, everything else −1.
    fn parse_line(line: &str) -> Result<(f64, SparseVector)> {
        let mut parts = line.split_whitespace();
        let label_str = parts
            .next()
            .ok_or_else(|| SVMError::ParseError("Empty line".to_string()))?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| SVMError::ParseError(format!("Invalid label: {label_str}")))?;
        let label = if label > 0.0 { 1.0 } else { -1.0 };

        let mut indices = Vec::new();
        let mut values = Vec::new();

        for feature_str in parts {
            let (index_str, value_str) = feature_str.split_once(':').ok_or_else(|| {
                SVMError::ParseError(format!("Invalid feature format: {feature_str}"))
            })?;

            let index = index_str.parse::<usize>().map_err(|_| {
                SVMError::ParseError(format!("Invalid feature index: {index_str}"))
            })?;
            let value = value_str.parse::<f64>().map_err(|_| {
                SVMError::ParseError(format!("Invalid feature value: {value_str}"))
            })?;

            // libsvm uses 1-based indexing
            if index == 0 {
                return Err(SVMError::ParseError(
                    "Feature index must be positive: 0".to_string(),
                ));
            }
            if let Some(&prev) = indices.last() {
                if index - 1 <= prev {
                    return Err(SVMError::ParseError(format!(
                        "Feature indices must be ascending: {index} follows {}",
                        prev + 1
                    )));
                }
            }

            indices.push(index - 1);
            values.push(value);
        }

        Ok((label, SparseVector::new(indices, values)))
    }
}

impl Dataset for LibSVMDataset {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn dim(&self) -> usize {
        self.features.dim()
    }

    fn features(&self) -> Arc<FeatureSet> {
        Arc::clone(&self.features)
    }

    fn labels(&self) -> &[f64] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureClass;
    use std::io::Cursor;

    #[test]
    fn test_parse_line_basic() {
        let (label, vector) = LibSVMDataset::parse_line("+1 1:0.5 3:1.2").unwrap();

        assert_eq!(label, 1.0);
        assert_eq!(vector.indices, vec![0, 2]); // 1-based to 0-based
        assert_eq!(vector.values, vec![0.5, 1.2]);
    }

    #[test]
    fn test_parse_line_binary_conversion() {
        let (label, _) = LibSVMDataset::parse_line("2 1:1.0").unwrap();
        assert_eq!(label, 1.0);

        let (label, _) = LibSVMDataset::parse_line("0 1:1.0").unwrap();
        assert_eq!(label, -1.0);

        let (label, vector) = LibSVMDataset::parse_line("-3").unwrap();
        assert_eq!(label, -1.0);
        assert!(vector.is_empty());
    }

    #[test]
    fn test_parse_line_invalid_format() {
        assert!(LibSVMDataset::parse_line("+1 1").is_err());
        assert!(LibSVMDataset::parse_line("+1 abc:1.0").is_err());
        assert!(LibSVMDataset::parse_line("+1 1:abc").is_err());
        assert!(LibSVMDataset::parse_line("+1 0:1.0").is_err());
        assert!(LibSVMDataset::parse_line("yes 1:1.0").is_err());
    }

    #[test]
    fn test_parse_line_rejects_unordered_indices() {
        assert!(LibSVMDataset::parse_line("+1 1:1 1:1").is_err());
        assert!(LibSVMDataset::parse_line("+1 3:1 2:1").is_err());
        assert!(LibSVMDataset::parse_line("+1 2:1 3:1").is_ok());
    }

    #[test]
    fn test_duplicate_index_reports_line() {
        let result = LibSVMDataset::from_reader(Cursor::new("-1 1:1\n+1 1:1 1:1\n"));
        match result {
            Err(SVMError::ParseError(msg)) => {
                assert!(msg.contains("line 2"));
                assert!(msg.contains("ascending"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_reader_basic() {
        let data = "+1 1:0.5 3:1.2\n-1 2:0.3 5:2.1\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 5);
        assert_eq!(dataset.features().feature_class(), FeatureClass::Sparse);

        let sample = dataset.get_sample(1);
        assert_eq!(sample.label, -1.0);
        assert_eq!(sample.features.indices, vec![1, 4]);
    }

    #[test]
    fn test_from_reader_empty_lines_and_comments() {
        let data = "# Comment line\n+1 1:0.5\n\n# Another comment\n-1 2:0.3\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.labels(), &[1.0, -1.0]);
    }

    #[test]
    fn test_from_reader_empty_dataset() {
        let result = LibSVMDataset::from_reader(Cursor::new("# Only comments\n\n"));
        assert!(matches!(result, Err(SVMError::EmptyTrainingSet(_))));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let result = LibSVMDataset::from_reader(Cursor::new("+1 1:0.5\n-1 2:x\n"));
        match result {
            Err(SVMError::ParseError(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_large_dimension_handling() {
        let data = "+1 1:1.0 1000:2.0 5000:3.0\n-1 2:1.0 500:2.0\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.dim(), 5000);
        let sample = dataset.get_sample(0);
        assert_eq!(sample.features.indices, vec![0, 999, 4999]);
        assert_eq!(sample.features.values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "+1 1:0.5 3:1.2").expect("Failed to write");
        writeln!(temp_file, "-1 2:0.3 5:2.1").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let dataset = LibSVMDataset::from_file(temp_file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 5);
    }

    #[test]
    fn test_from_file_io_error() {
        let result = LibSVMDataset::from_file("/non/existent/file.libsvm");
        assert!(matches!(result, Err(SVMError::IoError(_))));
    }
}
