//! Fixed-width text report

use crate::{RenderResult, Renderer};
use ctb_trace::{CandidateAggregate, Flag, Report};
use std::io::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Summary lines, a ranked table, then any error skips
pub struct TextRenderer {
    request_width: usize,
}

impl TextRenderer {
    pub fn new(request_width: usize) -> Self {
        Self {
            request_width: request_width.max(8),
        }
    }

    fn write_summary(&self, report: &Report, out: &mut dyn Write) -> RenderResult<()> {
        writeln!(
            out,
            "Scanned {} sessions and {} events in {} ms (time threshold {} us, tombstone threshold {}, cap {})",
            report.scan.sessions_scanned,
            report.scan.events_scanned,
            report.elapsed_ms,
            report.thresholds.time_threshold_us,
            report.thresholds.tombstone_threshold,
            report.thresholds.result_cap,
        )?;
        writeln!(out, "{} sessions satisfy criteria", report.satisfying_criteria)?;
        writeln!(
            out,
            "{} sessions skipped due to null duration",
            report.skipped_null_duration
        )?;
        writeln!(
            out,
            "{} sessions skipped due to errors",
            report.skipped_error_count()
        )?;
        if report.scan.malformed_events > 0 {
            writeln!(out, "{} malformed events ignored", report.scan.malformed_events)?;
        }
        if report.scan.locality_violations > 0 {
            writeln!(
                out,
                "{} events arrived after their session was finalized",
                report.scan.locality_violations
            )?;
        }
        if report.is_partial {
            writeln!(out, "PARTIAL: analysis was cancelled before completion")?;
        }
        Ok(())
    }

    fn write_header(&self, out: &mut dyn Write) -> RenderResult<()> {
        writeln!(
            out,
            "{:<36}  {:>12}  {:<23}  {:<11}  {:<7}  {:<5}  {:>14}  {:>16}  {}",
            "Session",
            "Duration(us)",
            "Started At",
            Flag::ReadRepair.label(),
            Flag::Timeout.label(),
            Flag::IndexUsed.label(),
            "Max Tombstones",
            "Total Tombstones",
            "Request",
        )?;
        Ok(())
    }

    fn write_row(&self, agg: &CandidateAggregate, out: &mut dyn Write) -> RenderResult<()> {
        writeln!(
            out,
            "{:<36}  {:>12}  {:<23}  {:<11}  {:<7}  {:<5}  {:>14}  {:>16}  {}",
            agg.session_id,
            agg.duration_us,
            agg.started_at.format(TIME_FORMAT).to_string(),
            mark(agg, Flag::ReadRepair),
            mark(agg, Flag::Timeout),
            mark(agg, Flag::IndexUsed),
            agg.max_tombstones_single_event,
            agg.total_tombstones,
            truncate(&agg.request, self.request_width),
        )?;
        Ok(())
    }
}

fn mark(agg: &CandidateAggregate, flag: Flag) -> &'static str {
    if agg.has_flag(flag) {
        "yes"
    } else {
        "no"
    }
}

/// Shorten `text` to at most `width` characters, marking the cut with "..."
fn truncate(text: &str, width: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

impl Renderer for TextRenderer {
    fn render(&self, report: &Report, out: &mut dyn Write) -> RenderResult<()> {
        self.write_summary(report, out)?;

        if !report.ranked.is_empty() {
            writeln!(out)?;
            self.write_header(out)?;
            for agg in &report.ranked {
                self.write_row(agg, out)?;
            }
        }

        if !report.skipped_errors.is_empty() {
            writeln!(out)?;
            writeln!(out, "Errors:")?;
            for skip in &report.skipped_errors {
                writeln!(
                    out,
                    "{}: {}",
                    skip.session_id,
                    skip.message.as_deref().unwrap_or("unknown error")
                )?;
            }
        }

        out.flush()?;
        Ok(())
    }
}
