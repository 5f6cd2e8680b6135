use thiserror::Error;

use crate::result::SpeedTestResult;

/// A label name and value
pub type Label = (String, String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid label format: {0}")]
pub struct LabelFormatError(pub String);

/// Parses a comma separated list of labels, e.g. "environment=production,site=home".
///
/// Every pair must contain exactly one `=`; names and values are trimmed.
pub fn parse_labels(input: &str) -> Result<Vec<Label>, LabelFormatError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(',')
        .map(|pair| {
            let name_value = pair.split('=').collect::<Vec<_>>();
            match name_value.as_slice() {
                [name, value] => Ok((name.trim().to_string(), value.trim().to_string())),
                _ => Err(LabelFormatError(pair.to_string())),
            }
        })
        .collect()
}

/// The labels which identify a speedtest run, attached to every series.
pub fn base_labels(result: &SpeedTestResult) -> Vec<Label> {
    vec![
        ("isp".into(), result.isp.clone()),
        ("server_id".into(), result.server.id.to_string()),
        ("server_name".into(), result.server.name.clone()),
        ("result_id".into(), result.result.id.clone()),
        ("result_url".into(), result.result.url.clone()),
    ]
}

/// Base labels followed by any user supplied labels.
///
/// Duplicate names are kept as-is; see [`colliding_labels`].
pub fn static_labels(result: &SpeedTestResult, extra: &[Label]) -> Vec<Label> {
    let mut labels = base_labels(result);
    labels.extend(extra.iter().cloned());
    labels
}

/// Returns each label name that appears more than once, in order of first repeat.
pub fn colliding_labels(labels: &[Label]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for (i, (name, _)) in labels.iter().enumerate() {
        let repeated = labels[..i].iter().any(|(prev, _)| prev == name);
        if repeated && !out.contains(&name.as_str()) {
            out.push(name.as_str());
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn label(name: &str, value: &str) -> Label {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn parses_label_lists() {
        assert_eq!(parse_labels("").unwrap(), Vec::<Label>::new());
        assert_eq!(
            parse_labels("a=1,b=2").unwrap(),
            vec![label("a", "1"), label("b", "2")]
        );

        // It trims whitespace on both sides of `=`
        assert_eq!(parse_labels(" a = 1 ").unwrap(), vec![label("a", "1")]);

        // Empty names and values are passed through
        assert_eq!(parse_labels("a=").unwrap(), vec![label("a", "")]);
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert_eq!(
            parse_labels("a=1,b").unwrap_err(),
            LabelFormatError("b".to_string())
        );
        assert!(parse_labels("a=b=c").is_err());
        assert!(parse_labels("a=1,").is_err());
        assert!(parse_labels(",").is_err());
        assert_eq!(
            parse_labels("a=1,b").unwrap_err().to_string(),
            "invalid label format: b"
        );
    }

    #[test]
    fn builds_static_labels() {
        let mut result = SpeedTestResult::default();
        result.isp = "X".into();
        result.server.id = 5;
        result.server.name = "Y".into();
        result.result.id = "Z".into();
        result.result.url = "W".into();

        let labels = static_labels(&result, &[label("env", "prod")]);
        assert_eq!(
            labels,
            vec![
                label("isp", "X"),
                label("server_id", "5"),
                label("server_name", "Y"),
                label("result_id", "Z"),
                label("result_url", "W"),
                label("env", "prod"),
            ]
        );
        assert!(colliding_labels(&labels).is_empty());
    }

    #[test]
    fn keeps_colliding_labels() {
        let result = SpeedTestResult::default();
        let extra = vec![label("isp", "override"), label("a", "1"), label("a", "2")];
        let labels = static_labels(&result, &extra);

        // Collisions are reported but not removed
        assert_eq!(labels.len(), 8);
        assert_eq!(colliding_labels(&labels), vec!["isp", "a"]);
    }
}
