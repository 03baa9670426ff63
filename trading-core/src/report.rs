use crate::fs::persistence::save_state;
use anyhow::Context;
use log::info;
use std::path::PathBuf;
use trading::{CycleSummary, ReportError, ReportSink};

/// Writes the latest summary to a JSON file for whatever renders reports.
pub struct JsonReportSink {
    file_path: PathBuf,
}

impl JsonReportSink {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }
}

impl ReportSink for JsonReportSink {
    fn publish(&mut self, summary: &CycleSummary) -> Result<(), ReportError> {
        save_state(&self.file_path, summary)
            .with_context(|| format!("writing cycle report {}", self.file_path.display()))?;
        Ok(())
    }
}

/// Logs a one-line summary.
#[derive(Default)]
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn publish(&mut self, summary: &CycleSummary) -> Result<(), ReportError> {
        info!(
            "Cycle {} on {}: {} orders executed, valuation {:.2}, guarantee met: {}, traded this week: {}",
            summary.cycle_id,
            summary.date.format("%Y-%m-%d"),
            summary.orders_executed,
            summary.portfolio_valuation,
            summary.guarantee_met,
            summary.trade_satisfied_this_week
        );
        Ok(())
    }
}

/// Fans a summary out to several sinks. Every sink is attempted; the first
/// error is returned.
#[derive(Default)]
pub struct CompositeReportSink {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl CompositeReportSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }
}

impl ReportSink for CompositeReportSink {
    fn publish(&mut self, summary: &CycleSummary) -> Result<(), ReportError> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.publish(summary) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
