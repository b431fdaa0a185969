//! `quill plan show` command: parse a plan and print what it proposes.

use anyhow::Result;

use quill_core::ParsedPlan;

use crate::generate_cmd::load_plan;

/// Render a parsed plan for the terminal.
fn render_plan(plan_path: &str, plan: &ParsedPlan) -> String {
    let mut out = String::new();
    out.push_str(&format!("Plan: {plan_path}\n"));
    out.push_str(&format!("Main topic: {}\n", plan.metadata.main_topic));
    if !plan.metadata.source.is_empty() {
        out.push_str(&format!("Sources: {}\n", plan.metadata.source.join("; ")));
    }
    out.push_str(&format!("Proposals: {}\n", plan.proposals.len()));
    for (i, proposal) in plan.proposals.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} ({})\n     {}\n",
            i + 1,
            proposal.title,
            proposal.kind,
            proposal.description
        ));
    }
    out
}

/// Run the plan show command.
pub fn run_plan_show(plan_path: &str) -> Result<()> {
    let plan = load_plan(plan_path)?;
    print!("{}", render_plan(plan_path, &plan));
    if plan.proposals.is_empty() {
        println!("(no lines matched the proposal grammar)");
    }
    Ok(())
}
