//! Tool availability check.

use console::style;

use docsift::engine::tools::{check_tools, install_hint};

/// Report which external tools are installed.
pub async fn cmd_check() -> anyhow::Result<()> {
    println!("\n{}", style("Tool Status").bold());
    println!("{}", "-".repeat(50));

    let mut all_found = true;
    for (tool, available) in check_tools() {
        let status = if available {
            style("✓ found".to_string()).green()
        } else {
            all_found = false;
            style(format!("✗ not found (install {})", install_hint(&tool))).red()
        };
        println!("  {:<15} {}", tool, status);
    }

    println!();
    if all_found {
        println!("{} All tools available", style("✓").green());
    } else {
        println!(
            "{} Some tools are missing; scanned documents cannot be processed",
            style("!").yellow()
        );
    }
    Ok(())
}
