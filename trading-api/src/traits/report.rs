use crate::error::ReportError;
use crate::model::report::CycleSummary;

/// Receiver of the per-cycle activity summary. Formatting and delivery are
/// the sink's concern.
pub trait ReportSink: Send {
    fn publish(&mut self, summary: &CycleSummary) -> Result<(), ReportError>;
}
