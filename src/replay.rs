// src/replay.rs - Recorded pose sessions (JSON lines) as a pose source
use crate::landmarks::PoseObservation;
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

pub fn load_observations(path: impl AsRef<Path>) -> Result<Vec<PoseObservation>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open recording {}", path.display()))?;
    read_observations(file).with_context(|| format!("Invalid recording {}", path.display()))
}

/// One `PoseObservation` per line; blank lines are skipped.
pub fn read_observations(reader: impl Read) -> Result<Vec<PoseObservation>> {
    let mut observations = Vec::new();
    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let observation: PoseObservation = serde_json::from_str(&line)
            .with_context(|| format!("line {}: not a pose observation", index + 1))?;
        observations.push(observation);
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_lines_and_skips_blanks() {
        let input = "{\"timestamp_ms\": 0, \"hands\": []}\n\n{\"timestamp_ms\": 33}\n";
        let observations = read_observations(input.as_bytes()).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1].timestamp_ms, 33);
        assert!(observations[1].hands.is_empty());
    }

    #[test]
    fn test_bad_line_is_reported() {
        let input = "{\"timestamp_ms\": 0}\nnot json\n";
        let err = read_observations(input.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
