//! Prompt templates for each session phase.
//!
//! The first line of every prompt is a `GOAL:` header naming the task. The
//! expected output format is spelled out and the agent is asked to attach its
//! answer as `<stem>.json` (see [`crate::output::OutputName`]).

use pipeline::{ActionPlan, FeasibilityResult, Issue, RepositoryUrl};

const READ_ONLY_RESTRICTIONS: &str = "\
RESTRICTIONS:
- DO NOT write, modify, or create any code files
- DO NOT execute any commands or scripts
- DO NOT make any changes to the repository
- ONLY analyse and produce the requested JSON document";

/// Renders an issue for inclusion in a prompt.
fn describe(issue: &Issue) -> String {
    let mut out = format!("Issue #{}: {}\n", issue.number, issue.title);
    if !issue.labels.is_empty() {
        out.push_str(&format!("Labels: {}\n", issue.labels.join(", ")));
    }
    if !issue.body.trim().is_empty() {
        out.push('\n');
        out.push_str(issue.body.trim());
        out.push('\n');
    }
    out
}

pub fn list_issues(repo: &RepositoryUrl) -> String {
    format!(
        r#"GOAL: List every open issue in {repo}.

Save the result as an "issues.json" attachment with this format:
[{{"number": 1, "title": "...", "body": "...", "state": "open", "created_at": "...", "updated_at": "...", "labels": ["..."]}}]

Every entry must have number, title, body, created_at and labels.

{READ_ONLY_RESTRICTIONS}"#
    )
}

pub fn scan(repo: &RepositoryUrl, issue: &Issue) -> String {
    format!(
        r#"GOAL: Identify the files in {repo} most relevant to a GitHub issue.

INSTRUCTIONS:
- Look at the first lines of each source file to understand its purpose
- Check file names, imports and function signatures
- Ignore documentation and configuration unless the issue is about them
- Return at most 15 files, most relevant first

OUTPUT FORMAT (save as "scan.json" attachment):
{{
  "relevant_files": [
    {{"path": "src/file.rs", "relevance_score": 9, "reason": "why this file matters"}}
  ],
  "total_files_scanned": 0,
  "scan_summary": "one sentence"
}}

{READ_ONLY_RESTRICTIONS}

INPUT:
{issue}"#,
        issue = describe(issue),
    )
}

const FEASIBILITY_FORMAT: &str = r#"OUTPUT FORMAT (save as "analysis.json" attachment):
{
  "feasibility_score": 0,
  "complexity_score": 0,
  "confidence": 0,
  "scope_assessment": {"size": "Small/Medium/Large", "impact": "Minimal/Module-wide/System-wide"},
  "technical_analysis": {
    "estimated_files": ["src/file.rs"],
    "dependencies": ["dependency"],
    "risks": ["risk"]
  }
}

All scores are integers from 0 to 100."#;

pub fn targeted_analysis(repo: &RepositoryUrl, issue: &Issue, files: &[String]) -> String {
    format!(
        r#"GOAL: Analyse GitHub issue feasibility in {repo}, focusing on the files listed below.

Relevant files identified by a previous scan:
{files}

INSTRUCTIONS:
- Read the listed files in depth
- Estimate how implementable the issue is and how complex the change would be
- Identify the files to modify, affected dependencies and risks

{FEASIBILITY_FORMAT}

{READ_ONLY_RESTRICTIONS}

INPUT:
{issue}"#,
        files = files
            .iter()
            .map(|f| format!("- {f}"))
            .collect::<Vec<_>>()
            .join("\n"),
        issue = describe(issue),
    )
}

pub fn full_analysis(repo: &RepositoryUrl, issue: &Issue) -> String {
    format!(
        r#"GOAL: Analyse GitHub issue feasibility across the whole repository {repo}.

INSTRUCTIONS:
- Explore the codebase to understand the context of the issue
- Estimate how implementable the issue is and how complex the change would be
- Identify the files to modify, affected dependencies and risks

{FEASIBILITY_FORMAT}

{READ_ONLY_RESTRICTIONS}

INPUT:
{issue}"#,
        issue = describe(issue),
    )
}

pub fn planning(
    repo: &RepositoryUrl,
    issue: &Issue,
    feasibility: Option<&FeasibilityResult>,
) -> String {
    let context = feasibility
        .and_then(|f| serde_json::to_string_pretty(f).ok())
        .map(|json| format!("\nFeasibility assessment:\n{json}\n"))
        .unwrap_or_default();

    format!(
        r#"GOAL: Create an implementation plan for a GitHub issue in {repo}.

INSTRUCTIONS:
- Analyse the repository structure and the issue requirements
- Break the work into ordered steps, naming the files each step touches
- Estimate the overall effort

OUTPUT FORMAT (save as "plan.json" attachment):
{{
  "summary": "overview of the approach",
  "action_plan": [
    {{"step": 1, "description": "what to do", "files": ["src/file.rs"]}}
  ],
  "estimated_effort": "Small/Medium/Large",
  "risks": ["risk"],
  "dependencies": ["dependency"]
}}

{READ_ONLY_RESTRICTIONS}

INPUT:
{issue}{context}"#,
        issue = describe(issue),
    )
}

pub fn execution(repo: &RepositoryUrl, issue: &Issue, plan: &ActionPlan) -> String {
    let plan_json = serde_json::to_string_pretty(plan).unwrap_or_default();
    format!(
        r#"GOAL: Implement the approved plan in {repo} and open a pull request.

You must:
1. Implement every step of the plan below
2. Create a new branch for the changes
3. Commit the changes with a descriptive message
4. Push the branch to GitHub
5. Open a pull request that references issue #{number}
6. Finish with the message "PR is ready for review: <pull request URL>"

Also save an "execution.json" attachment:
{{"pr_url": "https://github.com/owner/repo/pull/N", "branch": "branch-name", "summary": "what changed"}}

The plan has been approved; start implementing immediately.

INPUT:
{issue}
Approved plan:
{plan_json}"#,
        number = issue.number,
        issue = describe(issue),
    )
}
