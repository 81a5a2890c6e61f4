//! CSV trace of per-tick results for the CLI frontend.

use std::io::Write;

use crate::circuit::{ElementId, Network};
use crate::error::{CirsimError, Result};

/// Writes one CSV row per sampled tick.
///
/// Columns are `time`, `shorted`, then `<name>.i` and `<name>.v` for every
/// probed element.
pub struct TraceWriter<W: Write> {
    out: W,
    probes: Vec<ElementId>,
}

impl<W: Write> TraceWriter<W> {
    /// Resolve probe names and write the header row.
    ///
    /// An empty probe list traces every element.
    pub fn new(mut out: W, network: &Network, probes: &[String]) -> Result<Self> {
        let probes: Vec<ElementId> = if probes.is_empty() {
            network.elements().map(|(id, _)| id).collect()
        } else {
            probes
                .iter()
                .map(|name| {
                    network
                        .find_element(name)
                        .ok_or_else(|| CirsimError::ComponentNotFound { name: name.clone() })
                })
                .collect::<Result<_>>()?
        };

        let mut header = String::from("time,shorted");
        for &id in &probes {
            if let Some(e) = network.element(id) {
                header.push_str(&format!(",{0}.i,{0}.v", e.name));
            }
        }
        writeln!(out, "{}", header).map_err(output_error)?;

        Ok(Self { out, probes })
    }

    /// Append the network's current outputs.
    pub fn write_row(&mut self, time: f64, shorted: bool, network: &Network) -> Result<()> {
        let mut row = format!("{},{}", time, u8::from(shorted));
        for &id in &self.probes {
            let (current, voltage) = network
                .element(id)
                .map(|e| (e.current, e.voltage))
                .unwrap_or((0.0, 0.0));
            row.push_str(&format!(",{},{}", current, voltage));
        }
        writeln!(self.out, "{}", row).map_err(output_error)
    }

    /// Flush the output stream.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(output_error)
    }

    /// Get the underlying writer back.
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn output_error(e: std::io::Error) -> CirsimError {
    CirsimError::OutputError {
        message: e.to_string(),
    }
}
