use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::error::GroupFailure;
use crate::models::License;

/// Print a colored summary of one run.
pub fn render(licenses: &[License], failures: &[GroupFailure], written: Option<&Path>, quiet: bool) {
    if quiet {
        println!(
            "Licenses: {}  Failed groups: {}",
            licenses.len().to_string().green(),
            failures.len().to_string().red(),
        );
        return;
    }

    println!(
        "\n {} v{}\n",
        "license-collect".bold(),
        env!("CARGO_PKG_VERSION")
    );

    if !licenses.is_empty() {
        println!("{}", table(licenses));
        println!();
    }

    for failure in failures {
        println!(" {} {} failed: {}", "✗".red(), failure.group, failure.error);
    }

    match written {
        Some(path) => println!(
            " {} {} licenses written to {}\n",
            "✓".green(),
            licenses.len(),
            path.display()
        ),
        None => println!(" {} No output written\n", "⚠".yellow()),
    }
}

fn table(licenses: &[License]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Identity").add_attribute(Attribute::Bold),
            Cell::new("First line").add_attribute(Attribute::Bold),
            Cell::new("Lines").add_attribute(Attribute::Bold),
        ]);

    for license in licenses {
        table.add_row(vec![
            Cell::new(&license.name),
            Cell::new(&license.identity).fg(Color::DarkGrey),
            Cell::new(headline(&license.text)),
            Cell::new(license.text.lines().count()).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// First non-blank line of a license, which usually names it.
fn headline(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}
