use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use std::path::Path;

use tosa_compliance::compliance::{self, PrintMode};
use tosa_compliance::report::{self, VerifyReport};
use tosa_compliance::spec::Spec;
use tosa_compliance::{Result, diagnostics};

#[derive(Parser)]
#[command(name = "tosa-compliance")]
#[command(about = "TOSA compliance table exporter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export both compliance tables (verifies them unless told not to).
    Export {
        #[arg(long)]
        xml: String,

        #[arg(short = 'o', long)]
        outdir: String,

        /// Write a JSON summary of the exported tables.
        #[arg(long)]
        summary: Option<String>,

        #[arg(long)]
        no_verify: bool,
    },
    /// Verify an emitted compliance table.
    Verify {
        #[arg(long)]
        input: String,
    },
    /// Run the verifier against its known-bad fragments.
    SelfTest,
    /// Load the specification and report what it contains.
    Check {
        #[arg(long)]
        xml: String,

        /// Write the loaded model as JSON.
        #[arg(long)]
        dump: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Export {
            xml,
            outdir,
            summary,
            no_verify,
        } => {
            // 1) Load + validate the XML.
            let spec = Spec::load(&xml)?;

            // 2) Emit both tables.
            let outdir = Path::new(&outdir);
            let exported = compliance::export_tables(&spec, outdir)?;
            for table in &exported.tables {
                println!("Wrote {}", outdir.join(&table.file).display());
            }

            // 3) Re-read what was written and verify it.
            if !no_verify {
                run_self_test()?;
                for mode in PrintMode::ALL {
                    let path = outdir.join(mode.file_name());
                    verify_file(&path)?;
                }
            }

            if let Some(summary) = summary {
                report::write_json(&summary, &exported)?;
                println!("Wrote {}", summary);
            }
        }
        Commands::Verify { input } => {
            run_self_test()?;
            let report = verify_file(Path::new(&input))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::SelfTest => {
            run_self_test()?;
        }
        Commands::Check { xml, dump } => {
            let spec = Spec::load(&xml)?;
            diagnostics::info(format!("TOSA specification {}", spec.version));
            diagnostics::info(format!(
                "{} profiles, {} extensions, {} levels",
                spec.profiles.len(),
                spec.profile_extensions.len(),
                spec.levels.len()
            ));
            diagnostics::info(format!(
                "{} operator groups, {} operators, {} enums",
                spec.operator_groups.len(),
                spec.operators().count(),
                spec.enums.len()
            ));

            if let Some(dump) = dump {
                report::write_json(&dump, &spec)?;
                println!("Wrote {}", dump);
            }
        }
    }

    Ok(())
}

fn run_self_test() -> Result<()> {
    let cases = compliance::self_test().map_err(|e| anyhow!(diagnostics::error_message(e)))?;
    diagnostics::info(format!("Verifier self-test passed ({} cases)", cases));
    Ok(())
}

fn verify_file(path: &Path) -> Result<VerifyReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| diagnostics::error_message(format!("read {}", path.display())))?;
    let report = compliance::verify_table(&text)
        .map_err(|e| anyhow!(diagnostics::error_message(format!("{}: {}", path.display(), e))))?;

    for op in &report.invalid_conditions {
        diagnostics::warn(format!(
            "{}: {} uses the invalid combinator",
            path.display(),
            op
        ));
    }
    diagnostics::info(format!(
        "Verified {}: {} operations, {} entries, {} type tuples",
        path.display(),
        report.operations,
        report.compliance_entries,
        report.type_tuples
    ));
    Ok(report)
}
