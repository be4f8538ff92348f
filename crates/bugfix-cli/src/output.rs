use bugfix_core::cherry_pick::{BranchOutcome, PropagationReport};
use bugfix_core::transition::{StepStatus, TransitionReport};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

// ---------------------------------------------------------------------------
// Report rendering
// ---------------------------------------------------------------------------

pub fn outcome_cells(outcome: &BranchOutcome) -> (String, String) {
    match outcome {
        BranchOutcome::Applied => ("COMPLETE".to_string(), String::new()),
        BranchOutcome::ResolvedConflict => {
            ("COMPLETE".to_string(), "conflict resolved".to_string())
        }
        BranchOutcome::EmptyCommit { reason } => {
            ("COMPLETE".to_string(), format!("empty commit: {reason}"))
        }
        BranchOutcome::Skipped { reason } => ("SKIPPED".to_string(), reason.clone()),
    }
}

pub fn print_propagation(report: &PropagationReport) {
    println!(
        "\n{} {} across {} branch(es): {} complete, {} skipped",
        report.mode.label(),
        short_commit(&report.commit),
        report.branches.len(),
        report.completed(),
        report.skipped()
    );
    let rows = report
        .branches
        .iter()
        .map(|r| {
            let (status, detail) = outcome_cells(&r.outcome);
            vec![r.branch.clone(), status, detail]
        })
        .collect();
    print_table(&["BRANCH", "STATUS", "DETAIL"], rows);
}

pub fn print_transitions(report: &TransitionReport) {
    println!("\nFix version: {} ({})", report.fix_version.name, report.fix_version.id);
    if report.request.skipped {
        println!("Request transitions skipped.");
    }
    if report.creation.skipped {
        println!("Creation transitions skipped.");
    }
    if let Some(err) = &report.linked_lookup_error {
        println!("Linked issue lookup failed: {err}");
    }

    let rows: Vec<Vec<String>> = report
        .request
        .steps
        .iter()
        .chain(report.creation.steps.iter())
        .map(|s| {
            let (status, detail) = match &s.status {
                StepStatus::Complete => ("COMPLETE".to_string(), String::new()),
                StepStatus::Failed {
                    http_status: Some(code),
                    reason,
                } => ("FAILED".to_string(), format!("{code}: {reason}")),
                StepStatus::Failed {
                    http_status: None,
                    reason,
                } => ("FAILED".to_string(), reason.clone()),
            };
            vec![s.issue.clone(), s.step.to_string(), status, detail]
        })
        .collect();
    if !rows.is_empty() {
        print_table(&["ISSUE", "STEP", "STATUS", "DETAIL"], rows);
    }
}

pub fn short_commit(commit: &str) -> &str {
    commit.get(..10).unwrap_or(commit)
}
