//! Threat command handlers.

use tabled::Tabled;

use sentinel_core::{NewThreat, Threat};

use crate::cli::{GlobalOpts, ThreatsArgs, ThreatsCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ThreatRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Detected")]
    detected: String,
}

impl From<&Threat> for ThreatRow {
    fn from(t: &Threat) -> Self {
        Self {
            id: t.id.to_string(),
            level: t.level.clone(),
            description: output::opt(t.description.as_deref()),
            source: output::opt(t.source.as_deref()),
            detected: util::timestamp(t.created_at.as_ref()),
        }
    }
}

pub async fn handle(args: ThreatsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let records = config::record_service(global)?;

    match args.command {
        ThreatsCommand::List => {
            let threats = records.threats().await?;
            let out = output::render_list(
                &global.output,
                &threats,
                |t| ThreatRow::from(t),
                |t| t.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ThreatsCommand::Add {
            level,
            description,
            source,
        } => {
            let threat = records
                .add_threat(&NewThreat {
                    level,
                    description,
                    source,
                })
                .await?;
            if !global.quiet {
                eprintln!("Threat recorded");
            }
            let out = output::render_list(
                &global.output,
                std::slice::from_ref(&threat),
                |t| ThreatRow::from(t),
                |t| t.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
