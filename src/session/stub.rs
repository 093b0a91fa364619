use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::session::InferenceSession;
use crate::{DetectorError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct FedInput {
    pub name: String,
    pub data: Vec<u8>,
    pub dims: [usize; 4],
}

/// Session that answers every run with canned output tensors.
#[derive(Debug, Default)]
pub struct StubSession {
    outputs: HashMap<String, Vec<f32>>,
    last_input: Option<FedInput>,
    runs: usize,
    stats: bool,
    closed: bool,
}

impl StubSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, name: impl Into<String>, values: Vec<f32>) -> Self {
        self.outputs.insert(name.into(), values);
        self
    }

    /// Reads outputs from a JSON object mapping tensor names to float arrays.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let outputs: HashMap<String, Vec<f32>> = serde_json::from_reader(reader)?;
        tracing::debug!(path = %path.display(), tensors = outputs.len(), "loaded stub outputs");
        Ok(Self {
            outputs,
            ..Self::default()
        })
    }

    pub fn last_input(&self) -> Option<&FedInput> {
        self.last_input.as_ref()
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(DetectorError::session("stub session is closed"))
        } else {
            Ok(())
        }
    }
}

impl InferenceSession for StubSession {
    fn feed(&mut self, name: &str, data: &[u8], dims: [usize; 4]) -> Result<()> {
        self.ensure_open()?;
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(DetectorError::session(format!(
                "input '{name}' expects {expected} bytes, got {}",
                data.len()
            )));
        }
        self.last_input = Some(FedInput {
            name: name.to_string(),
            data: data.to_vec(),
            dims,
        });
        Ok(())
    }

    fn run(&mut self, output_names: &[String], collect_stats: bool) -> Result<()> {
        self.ensure_open()?;
        if self.last_input.is_none() {
            return Err(DetectorError::session("run before feed"));
        }
        if let Some(missing) = output_names.iter().find(|name| !self.outputs.contains_key(*name)) {
            return Err(DetectorError::session(format!("unknown output tensor '{missing}'")));
        }
        self.runs += 1;
        self.stats = collect_stats;
        Ok(())
    }

    fn fetch(&mut self, name: &str, dst: &mut [f32]) -> Result<usize> {
        self.ensure_open()?;
        if self.runs == 0 {
            return Err(DetectorError::session("fetch before run"));
        }
        let values = self
            .outputs
            .get(name)
            .ok_or_else(|| DetectorError::session(format!("unknown output tensor '{name}'")))?;
        let len = values.len().min(dst.len());
        dst[..len].copy_from_slice(&values[..len]);
        Ok(len)
    }

    fn stat_string(&self) -> String {
        if self.stats {
            format!("stub runs: {}", self.runs)
        } else {
            String::new()
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fetch_copies_up_to_dst() {
        let mut session = StubSession::new().with_output("scores", vec![0.1, 0.2, 0.3]);
        session.feed("in", &[0; 3], [1, 1, 1, 3]).unwrap();
        session.run(&["scores".to_string()], false).unwrap();

        let mut short = [0.0f32; 2];
        assert_eq!(session.fetch("scores", &mut short).unwrap(), 2);
        assert_eq!(short, [0.1, 0.2]);

        let mut long = [0.0f32; 5];
        assert_eq!(session.fetch("scores", &mut long).unwrap(), 3);
        assert_eq!(session.runs(), 1);
        assert_eq!(session.stat_string(), "");
    }

    #[test]
    fn test_rejects_mismatched_input() {
        let mut session = StubSession::new();
        assert!(session.feed("in", &[0; 5], [1, 2, 2, 3]).is_err());
        assert!(session.last_input().is_none());
    }

    #[test]
    fn test_unknown_output() {
        let mut session = StubSession::new();
        session.feed("in", &[0; 3], [1, 1, 1, 3]).unwrap();
        assert!(session.run(&["boxes".to_string()], false).is_err());
    }

    #[test]
    fn test_closed_session_errors() {
        let mut session = StubSession::new();
        session.close();
        session.close();
        assert!(session.is_closed());
        assert!(session.feed("in", &[0; 3], [1, 1, 1, 3]).is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"num_detections": [1.0], "detection_scores": [0.5]}"#)
            .unwrap();
        let session = StubSession::from_json_file(file.path()).unwrap();
        assert_eq!(session.outputs.len(), 2);
        assert_eq!(session.outputs["detection_scores"], vec![0.5]);
    }
}
