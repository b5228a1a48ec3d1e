//! Soldier command handlers.

use tabled::Tabled;

use sentinel_core::{RecordId, Soldier, SoldierFields};

use crate::cli::{GlobalOpts, SoldierFieldArgs, SoldiersArgs, SoldiersCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SoldierRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Rank")]
    rank: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&Soldier> for SoldierRow {
    fn from(s: &Soldier) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            rank: s.rank.clone(),
            unit: output::opt(s.unit.as_deref()),
            status: output::opt(s.status.as_deref()),
            confidence: s.confidence.map(|c| format!("{c:.2}")).unwrap_or_default(),
            created: util::timestamp(s.created_at.as_ref()),
        }
    }
}

impl From<SoldierFieldArgs> for SoldierFields {
    fn from(a: SoldierFieldArgs) -> Self {
        Self {
            name: a.name,
            rank: a.rank,
            unit: a.unit,
            clearance: a.clearance,
            status: a.status,
            last_seen: a.last_seen,
            confidence: a.confidence,
            avatar_url: a.avatar_url,
        }
    }
}

fn detail(s: &Soldier) -> String {
    let mut lines = vec![
        format!("ID:         {}", s.id),
        format!("Name:       {}", s.name),
        format!("Rank:       {}", s.rank),
    ];
    let optional = [
        ("Unit:       ", s.unit.as_deref()),
        ("Clearance:  ", s.clearance.as_deref()),
        ("Status:     ", s.status.as_deref()),
        ("Last seen:  ", s.last_seen.as_deref()),
        ("Avatar:     ", s.avatar_url.as_deref()),
    ];
    for (label, value) in optional {
        if let Some(v) = value {
            lines.push(format!("{label}{v}"));
        }
    }
    if let Some(c) = s.confidence {
        lines.push(format!("Confidence: {c:.2}"));
    }
    if s.created_at.is_some() {
        lines.push(format!("Created:    {}", util::timestamp(s.created_at.as_ref())));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SoldiersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let records = config::record_service(global)?;

    match args.command {
        SoldiersCommand::List => {
            let soldiers = records.soldiers().await?;
            let out = output::render_list(
                &global.output,
                &soldiers,
                |s| SoldierRow::from(s),
                |s| s.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SoldiersCommand::Add(fields) => {
            let soldier = records.add_soldier(&fields.into()).await?;
            let out = output::render_single(&global.output, &soldier, detail, |s| s.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SoldiersCommand::Update { id, fields } => {
            let soldier = records
                .update_soldier(&RecordId::from(id), &fields.into())
                .await?;
            let out = output::render_single(&global.output, &soldier, detail, |s| s.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SoldiersCommand::Remove { id } => {
            if !util::confirm(
                &format!("Delete soldier '{id}'? This cannot be undone."),
                "delete a soldier",
                global.yes,
            )? {
                return Ok(());
            }
            records.remove_soldier(&RecordId::from(id)).await?;
            if !global.quiet {
                eprintln!("Soldier deleted");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soldier() -> Soldier {
        Soldier {
            id: RecordId::Serial(7),
            name: "Ada Reyes".into(),
            rank: "Captain".into(),
            unit: Some("Recon".into()),
            clearance: None,
            status: Some("active".into()),
            last_seen: None,
            confidence: Some(0.912),
            avatar_url: None,
            created_at: None,
        }
    }

    #[test]
    fn row_formats_confidence_and_blanks() {
        let row = SoldierRow::from(&soldier());
        assert_eq!(row.id, "7");
        assert_eq!(row.confidence, "0.91");
        assert_eq!(row.created, "");
    }

    #[test]
    fn detail_skips_missing_columns() {
        let text = detail(&soldier());
        assert!(text.contains("Unit:       Recon"));
        assert!(!text.contains("Clearance"));
    }
}
