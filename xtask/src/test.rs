//! `cargo xtask test`: run every workspace package's suites one by one and
//! finish with a per-package table.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// A workspace member and how its tests are built.
struct Package {
    name: &'static str,
    features: &'static str,
    /// `xtask` is a binary, the others are libraries
    has_lib: bool,
}

const PACKAGES: [Package; 3] = [
    Package {
        name: "platform",
        features: "std",
        has_lib: true,
    },
    Package {
        name: "playback",
        features: "std,mp3",
        has_lib: true,
    },
    Package {
        name: "xtask",
        features: "",
        has_lib: false,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suite {
    Unit,
    Integration,
    Doc,
}

impl Suite {
    fn label(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Integration => "integration",
            Self::Doc => "doc",
        }
    }

    /// Which suites the flags ask for. No flag runs everything.
    fn selected(unit_only: bool, integration_only: bool) -> Vec<Self> {
        match (unit_only, integration_only) {
            (false, false) => vec![Self::Unit, Self::Integration, Self::Doc],
            (unit, integration) => [(unit, Self::Unit), (integration, Self::Integration)]
                .into_iter()
                .filter_map(|(on, suite)| on.then_some(suite))
                .collect(),
        }
    }
}

/// `cargo` arguments for one suite of one package, or `None` when the
/// package has no such suite.
fn cargo_args(package: &Package, suite: Suite) -> Option<Vec<&'static str>> {
    let target: &[&'static str] = match (suite, package.has_lib) {
        (Suite::Unit, true) => &["--lib"],
        (Suite::Unit, false) => &["--bins"],
        (Suite::Integration, true) => &["--test", "*"],
        (Suite::Doc, true) => &["--doc"],
        (Suite::Integration | Suite::Doc, false) => return None,
    };
    let mut args = vec!["test", "-p", package.name];
    args.extend_from_slice(target);
    if !package.features.is_empty() {
        args.extend(["--features", package.features]);
    }
    Some(args)
}

/// Totals over every `test result:` line in a cargo test run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    passed: u32,
    failed: u32,
    ignored: u32,
}

impl Counts {
    fn parse(output: &str) -> Self {
        let mut counts = Self::default();
        for line in output.lines() {
            let Some(result) = line.split("test result:").nth(1) else {
                continue;
            };
            for field in result.split(';') {
                let mut words = field.split_whitespace().rev();
                let (Some(kind), Some(n)) = (words.next(), words.next()) else {
                    continue;
                };
                let Ok(n) = n.parse::<u32>() else {
                    continue;
                };
                match kind {
                    "passed" => counts.passed += n,
                    "failed" => counts.failed += n,
                    "ignored" => counts.ignored += n,
                    _ => {}
                }
            }
        }
        counts
    }

    fn add(&mut self, other: Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.ignored += other.ignored;
    }
}

struct Row {
    package: &'static str,
    counts: Counts,
    secs: f64,
    failed_suites: Vec<Suite>,
}

fn run_suite(package: &Package, suite: Suite, args: &[&str]) -> Result<(Counts, bool)> {
    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {} {} tests", package.name, suite.label()))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let counts = Counts::parse(&stdout);

    if output.status.success() {
        println!(
            "{}",
            format!(
                "  ✓ {} {}: {} passed, {} ignored",
                package.name,
                suite.label(),
                counts.passed,
                counts.ignored
            )
            .green()
        );
    } else {
        eprintln!("{}", format!("  ✗ {} {} tests failed", package.name, suite.label()).red().bold());
        eprintln!();
        for line in stdout.lines().chain(String::from_utf8_lossy(&output.stderr).lines()) {
            eprintln!("  {}", line);
        }
    }
    Ok((counts, output.status.success()))
}

fn print_table(rows: &[Row]) {
    println!("{}", format!("  {:<10} {:>7} {:>7} {:>8} {:>8}", "package", "passed", "failed", "ignored", "time").bold());
    let mut total = Counts::default();
    for row in rows {
        let line = format!(
            "  {:<10} {:>7} {:>7} {:>8} {:>7.2}s",
            row.package, row.counts.passed, row.counts.failed, row.counts.ignored, row.secs
        );
        if row.failed_suites.is_empty() {
            println!("{line}");
        } else {
            let suites: Vec<_> = row.failed_suites.iter().map(|s| s.label()).collect();
            println!("{}  ({})", line.red(), suites.join(", "));
        }
        total.add(row.counts);
    }
    println!(
        "  {:<10} {:>7} {:>7} {:>8}",
        "total", total.passed, total.failed, total.ignored
    );
}

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();
    let suites = Suite::selected(unit_only, integration_only);
    let mut rows = Vec::new();

    for package in &PACKAGES {
        println!("{}", format!("  Testing {}...", package.name).cyan());
        let start = Instant::now();
        let mut row = Row {
            package: package.name,
            counts: Counts::default(),
            secs: 0.0,
            failed_suites: Vec::new(),
        };
        for &suite in &suites {
            let Some(args) = cargo_args(package, suite) else {
                continue;
            };
            let (counts, ok) = run_suite(package, suite, &args)?;
            row.counts.add(counts);
            if !ok {
                row.failed_suites.push(suite);
            }
        }
        row.secs = start.elapsed().as_secs_f64();
        rows.push(row);
        println!();
    }

    print_table(&rows);
    println!();

    let failed: Vec<_> = rows
        .iter()
        .filter(|r| !r.failed_suites.is_empty())
        .map(|r| r.package)
        .collect();
    if !failed.is_empty() {
        anyhow::bail!("tests failed in {}", failed.join(", "));
    }

    println!(
        "{}",
        format!("✓ All tests completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn counts_sum_every_result_line() {
        let out = "running 3 tests\n\
                   test a ... ok\n\
                   test result: ok. 3 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out; finished in 0.01s\n\
                   running 2 tests\n\
                   test result: FAILED. 1 passed; 1 failed; 0 ignored; 0 measured; 0 filtered out\n";
        assert_eq!(
            Counts::parse(out),
            Counts {
                passed: 4,
                failed: 1,
                ignored: 1
            }
        );
        assert_eq!(Counts::parse("nothing here"), Counts::default());
    }

    #[test]
    fn library_suites_are_split_per_package() {
        let playback = &PACKAGES[1];
        assert_eq!(
            cargo_args(playback, Suite::Unit).unwrap(),
            ["test", "-p", "playback", "--lib", "--features", "std,mp3"]
        );
        assert_eq!(
            cargo_args(playback, Suite::Integration).unwrap(),
            ["test", "-p", "playback", "--test", "*", "--features", "std,mp3"]
        );
        assert_eq!(
            cargo_args(&PACKAGES[0], Suite::Integration).unwrap(),
            ["test", "-p", "platform", "--test", "*", "--features", "std"]
        );
    }

    #[test]
    fn binary_package_only_has_unit_tests() {
        let xtask = &PACKAGES[2];
        assert_eq!(cargo_args(xtask, Suite::Unit).unwrap(), ["test", "-p", "xtask", "--bins"]);
        assert_eq!(cargo_args(xtask, Suite::Integration), None);
        assert_eq!(cargo_args(xtask, Suite::Doc), None);
    }

    #[test]
    fn flags_pick_suites() {
        assert_eq!(
            Suite::selected(false, false),
            [Suite::Unit, Suite::Integration, Suite::Doc]
        );
        assert_eq!(Suite::selected(true, false), [Suite::Unit]);
        assert_eq!(Suite::selected(false, true), [Suite::Integration]);
        assert_eq!(Suite::selected(true, true), [Suite::Unit, Suite::Integration]);
    }
}
