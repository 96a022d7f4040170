//! Prompt builders.
//!
//! Every builder is a pure function of its inputs so that the same goal
//! produces the same prompt, and therefore the same cache key.

use std::fmt::Write;

use super::{GoalContext, ProgressEntry};

pub(crate) const COACH_SYSTEM_PROMPT: &str = "You are a supportive, practical goal coach. \
Keep answers short, specific and encouraging. Never invent facts about the user.";

fn describe_goal(goal: &GoalContext) -> String {
    let mut out = format!("Goal: {}\nCategory: {}\n", goal.title, goal.category.as_str());
    if let Some(description) = goal.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "Description: {}", description.trim());
    }
    if let Some(target) = &goal.target_date {
        let _ = writeln!(out, "Target date: {target}");
    }
    if let Some(progress) = goal.progress {
        let _ = writeln!(out, "Current progress: {progress}/10");
    }
    out
}

pub(crate) fn goal_analysis(goal: &GoalContext) -> String {
    format!(
        "{}\nAnalyze this goal. Respond with JSON only, in the form:\n\
         {{\"summary\": string, \"strengths\": [string], \"obstacles\": [string], \
         \"suggestions\": [string]}}\n\
         Give at most three items per list.",
        describe_goal(goal)
    )
}

pub(crate) fn progress_analysis(goal: &GoalContext, history: &[ProgressEntry]) -> String {
    let mut log = String::new();
    for entry in history {
        let _ = write!(log, "- {}: {}/10", entry.date, entry.score);
        if let Some(note) = entry.note.as_deref().filter(|n| !n.trim().is_empty()) {
            let _ = write!(log, " ({})", note.trim());
        }
        log.push('\n');
    }
    if log.is_empty() {
        log.push_str("- no check-ins yet\n");
    }
    format!(
        "{}\nProgress history (0-10 scale):\n{log}\n\
         Assess the trend. Respond with JSON only, in the form:\n\
         {{\"trend\": \"improving\" | \"steady\" | \"declining\", \"insight\": string, \
         \"encouragement\": string, \"next_steps\": [string]}}",
        describe_goal(goal)
    )
}

pub(crate) fn checkin_questions(goal: &GoalContext) -> String {
    format!(
        "{}\nWrite three short reflective check-in questions for today. \
         Respond with JSON only: {{\"questions\": [string]}}",
        describe_goal(goal)
    )
}

pub(crate) fn todos(goal: &GoalContext) -> String {
    format!(
        "{}\nBreak this goal into three to five concrete to-dos that can each be done in a day. \
         Respond with JSON only: {{\"todos\": [{{\"title\": string, \
         \"priority\": \"low\" | \"medium\" | \"high\", \"estimated_minutes\": number}}]}}",
        describe_goal(goal)
    )
}

pub(crate) fn image_query(goal: &GoalContext) -> String {
    format!(
        "{}\nSuggest a two to four word stock-photo search query that visually represents \
         this goal. Respond with JSON only: {{\"query\": string}}",
        describe_goal(goal)
    )
}
