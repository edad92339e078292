//! Binds a step's templated argument string to concrete storage prefixes.
//!
//! Placeholders have the form `[<path>]:<kind>` where kind is `d` (dataset,
//! read/write), `i` (input) or `o` (output). A path whose first segment is a
//! bound dataset label is moved under `<dataset-id>-d`; anything else belongs
//! to the analysis and is moved under `<analysis-id>-a`.

use crate::constants::{prefixes, MAX_LABEL_LEN};
use crate::errors::DomainError;
use crate::model::{AnalysisId, DatasetMap};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\[([^\[\]\s]*)\]:([dio])").unwrap()
});

static LABEL: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^\w+$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Dataset,
    Input,
    Output,
}

impl PathKind {
    fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "d" => Some(PathKind::Dataset),
            "i" => Some(PathKind::Input),
            "o" => Some(PathKind::Output),
            _ => None,
        }
    }
}

/// One placeholder found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub path: &'a str,
    pub kind: PathKind,
}

pub fn placeholders(template: &str) -> Vec<Placeholder<'_>> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| {
            let path = caps.get(1)?.as_str();
            let kind = PathKind::from_marker(caps.get(2)?.as_str())?;
            Some(Placeholder { path, kind })
        })
        .collect()
}

pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && label.chars().count() <= MAX_LABEL_LEN && LABEL.is_match(label)
}

/// Checks the label/id mapping a template will be bound against.
pub fn validate_datasets(datasets: &DatasetMap) -> Result<(), DomainError> {
    if datasets.is_empty() {
        return Err(DomainError::validation("'datasets' must not be empty"));
    }
    if let Some(label) = datasets.keys().find(|label| !is_valid_label(label)) {
        return Err(DomainError::validation(format!(
            "dataset label '{}' must be 1-{} word characters",
            label, MAX_LABEL_LEN
        )));
    }
    let unbound: Vec<String> = datasets
        .iter()
        .filter(|(_, id)| id.is_nil())
        .map(|(label, _)| format!("dataset label '{}' is not bound to a dataset", label))
        .collect();
    if !unbound.is_empty() {
        return Err(DomainError::NotFound {
            what: "Dataset",
            reasons: unbound,
        });
    }
    Ok(())
}

fn rewrite_path(path: &str, datasets: &DatasetMap, analysis_id: &AnalysisId) -> String {
    let relative = path.trim_start_matches('/');
    if path.starts_with('/') {
        let (label, rest) = match relative.split_once('/') {
            Some((label, rest)) => (label, Some(rest)),
            None => (relative, None),
        };
        if let Some(dataset_id) = datasets.get(label) {
            let prefix = format!("/{}{}", dataset_id, prefixes::DATASET_SUFFIX);
            return match rest {
                Some(rest) => format!("{}/{}", prefix, rest),
                None => prefix,
            };
        }
    }
    format!(
        "/{}{}/{}",
        analysis_id,
        prefixes::ANALYSIS_SUFFIX,
        relative
    )
}

/// Rewrites every placeholder in `template`, leaving other text untouched.
pub fn rewrite_args(template: &str, datasets: &DatasetMap, analysis_id: &AnalysisId) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            format!(
                "[{}]:{}",
                rewrite_path(&caps[1], datasets, analysis_id),
                &caps[2]
            )
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn fixture() -> (DatasetMap, AnalysisId, Uuid) {
        let reads = Uuid::parse_str("3f0c3a4e-8d59-4c9b-9a57-0d2c6f1b7e21").unwrap();
        let mut datasets = DatasetMap::new();
        datasets.insert("Reads".to_string(), reads);
        (datasets, AnalysisId::from("an-42"), reads)
    }

    #[test]
    fn test_dataset_path_is_moved_under_dataset_prefix() {
        let (datasets, analysis, reads) = fixture();
        let out = rewrite_args("cat [/Reads/lane1/r1.fq]:i", &datasets, &analysis);
        assert_eq!(out, format!("cat [/{}-d/lane1/r1.fq]:i", reads));
    }

    #[test]
    fn test_bare_dataset_directory() {
        let (datasets, analysis, reads) = fixture();
        assert_eq!(
            rewrite_args("[/Reads]:d", &datasets, &analysis),
            format!("[/{}-d]:d", reads)
        );
        assert_eq!(
            rewrite_args("[/Reads/]:d", &datasets, &analysis),
            format!("[/{}-d/]:d", reads)
        );
    }

    #[test]
    fn test_unlabelled_paths_belong_to_the_analysis() {
        let (datasets, analysis, _) = fixture();
        assert_eq!(
            rewrite_args("-o [results/aligned.bam]:o", &datasets, &analysis),
            "-o [/an-42-a/results/aligned.bam]:o"
        );
        assert_eq!(
            rewrite_args("-t [/tmp/scratch]:o", &datasets, &analysis),
            "-t [/an-42-a/tmp/scratch]:o"
        );
    }

    #[test]
    fn test_label_must_be_a_whole_segment() {
        let (datasets, analysis, _) = fixture();
        assert_eq!(
            rewrite_args("[/ReadsExtra/x]:i", &datasets, &analysis),
            "[/an-42-a/ReadsExtra/x]:i"
        );
    }

    #[test]
    fn test_text_outside_placeholders_is_untouched() {
        let (datasets, analysis, reads) = fixture();
        let template = "bwa mem -t 4 /Reads/not-a-placeholder [/Reads/r.fq]:i [x]:q";
        assert_eq!(
            rewrite_args(template, &datasets, &analysis),
            format!(
                "bwa mem -t 4 /Reads/not-a-placeholder [/{}-d/r.fq]:i [x]:q",
                reads
            )
        );
    }

    #[test]
    fn test_placeholders_are_listed_in_order() {
        let found = placeholders("[/Reads/a]:i [out]:o [/Reads]:d");
        assert_eq!(
            found,
            vec![
                Placeholder {
                    path: "/Reads/a",
                    kind: PathKind::Input
                },
                Placeholder {
                    path: "out",
                    kind: PathKind::Output
                },
                Placeholder {
                    path: "/Reads",
                    kind: PathKind::Dataset
                },
            ]
        );
    }

    #[test]
    fn test_label_pattern() {
        assert!(is_valid_label("Reads_2"));
        assert!(!is_valid_label(""));
        assert!(!is_valid_label("has-dash"));
        assert!(!is_valid_label(&"x".repeat(51)));
        assert!(is_valid_label(&"x".repeat(50)));
    }

    #[test]
    fn test_validate_datasets_reports_every_unbound_label() {
        let mut datasets = DatasetMap::new();
        datasets.insert("Reads".to_string(), Uuid::nil());
        datasets.insert("Ref".to_string(), Uuid::nil());
        let err = validate_datasets(&datasets).unwrap_err();
        assert_eq!(err.reasons().len(), 2);
    }

    #[test]
    fn test_validate_datasets_rejects_empty_and_bad_labels() {
        assert!(validate_datasets(&DatasetMap::new()).is_err());
        let mut datasets = DatasetMap::new();
        datasets.insert("bad label".to_string(), Uuid::new_v4());
        assert!(matches!(
            validate_datasets(&datasets),
            Err(DomainError::Validation(_))
        ));
    }
}
