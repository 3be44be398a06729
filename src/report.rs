//! Console rendering of harness results.

use std::io::{self, Write};

use crate::harness::{CheckResult, HarnessReport, Mark, Outcome, ReportLine};
use crate::plan::CheckPlan;

const RULE_WIDTH: usize = 70;

pub fn render_section(out: &mut dyn Write, title: &str) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "  {title}")?;
    writeln!(out, "{rule}")
}

pub fn render_banner(out: &mut dyn Write, plan: &CheckPlan, model: &str) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "{rule}")?;
    writeln!(out, "  {}", plan.title)?;
    writeln!(out, "{rule}")?;
    writeln!(out)?;
    writeln!(out, "Model: {model}")?;
    writeln!(out, "Suite: {}", plan.suite)?;
    writeln!(
        out,
        "Harness: {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

pub fn render_check(out: &mut dyn Write, index: usize, result: &CheckResult) -> io::Result<()> {
    render_section(out, &format!("TEST {index}: {}", result.title))?;
    for line in &result.lines {
        render_line(out, line)?;
    }
    Ok(())
}

fn render_line(out: &mut dyn Write, line: &ReportLine) -> io::Result<()> {
    match line.mark {
        Mark::Pass => writeln!(out, "✓ {}", line.text),
        Mark::Fail => writeln!(out, "✗ {}", line.text),
        Mark::Skip => writeln!(out, "⊘ {}", line.text),
        Mark::Info => writeln!(out, "  - {}", line.text),
    }
}

fn outcome_mark(outcome: Outcome) -> &'static str {
    match outcome.mark() {
        Mark::Pass => "✓",
        Mark::Fail => "✗",
        Mark::Skip | Mark::Info => "⊘",
    }
}

/// `model_registry` -> `Model Registry`
pub fn display_name(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_summary(
    out: &mut dyn Write,
    report: &HarnessReport,
    plan: &CheckPlan,
) -> io::Result<()> {
    render_section(out, "TEST SUMMARY")?;
    for result in report.results() {
        writeln!(
            out,
            "{} {}: {}",
            outcome_mark(result.outcome),
            result.outcome.label(),
            display_name(&result.name)
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "Results: {}/{} checks passed",
        report.passed_count(),
        report.total_count()
    )?;
    if report.skipped_count() > 0 {
        writeln!(out, "({} skipped)", report.skipped_count())?;
    }

    if report.passed_count() == report.total_count() {
        writeln!(out)?;
        writeln!(out, "✓ ALL CHECKS PASSED for {}", report.model)?;
        if let Some(hint) = &plan.success_hint {
            writeln!(out)?;
            writeln!(out, "{}", hint.replace("{model}", &report.model))?;
        }
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "✗ Some checks failed. Please check the errors above.")?;
    let hints: Vec<&str> = report
        .results()
        .iter()
        .filter(|result| result.outcome == Outcome::Failed)
        .filter_map(|result| plan.find(&result.name)?.hint.as_deref())
        .collect();
    if !hints.is_empty() {
        writeln!(out)?;
        writeln!(out, "Recommendations:")?;
        for (number, hint) in hints.iter().enumerate() {
            writeln!(out, "  {}. {}", number + 1, hint)?;
        }
    }
    Ok(())
}
