use crate::tools::{Catalog, LoadSummary};
use colored::*;

/// Print every registered tool with its adapter and parameters
pub fn display_catalog(catalog: &Catalog) {
    if catalog.is_empty() {
        println!("{}", "No tools registered.".yellow());
        return;
    }

    for tool in catalog.iter() {
        println!(
            "{} {} {}",
            tool.name().green().bold(),
            format!("[{}]", tool.handler().kind()).dimmed(),
            tool.description()
        );
        for param in tool.parameters() {
            let marker = if param.is_required() && param.default().is_none() {
                "required".red()
            } else {
                "optional".dimmed()
            };
            let mut line = format!(
                "    {} ({}, {})",
                param.name().cyan(),
                param.param_type().as_str(),
                marker
            );
            if let Some(default) = param.default() {
                line.push_str(&format!(" default={}", default));
            }
            if !param.description().is_empty() {
                line.push_str(&format!(" - {}", param.description()));
            }
            println!("{}", line);
        }
    }
    println!();
    println!("{}", format!("{} tools", catalog.len()).dimmed());
}

/// Print the result of a load pass, one line per failed file
pub fn display_summary(summary: &LoadSummary) {
    for failure in &summary.failures {
        eprintln!("{} {}", "✗".red(), failure.error);
    }
    if summary.is_clean() {
        println!("{} {}", "✓".green(), summary);
    } else {
        println!("{} {}", "!".yellow(), summary);
    }
}

pub fn display_answer(answer: &str) {
    // Avoid double newline if the answer already ends with one
    if answer.ends_with('\n') {
        print!("{}", answer);
    } else {
        println!("{}", answer);
    }
}

pub fn display_truncated(turns: usize) {
    eprintln!(
        "{}",
        format!(
            "Stopped after {} turns without a final answer. Raise --max-turns to let the model continue.",
            turns
        )
        .yellow()
    );
}
