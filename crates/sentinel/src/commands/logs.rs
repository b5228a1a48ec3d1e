//! System log command handlers.

use tabled::Tabled;

use sentinel_api::store::DEFAULT_LOG_LEVEL;
use sentinel_core::{NewSystemLog, SystemLog};

use crate::cli::{GlobalOpts, LogsArgs, LogsCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&SystemLog> for LogRow {
    fn from(l: &SystemLog) -> Self {
        Self {
            time: util::timestamp(l.created_at.as_ref()),
            level: l.level.clone(),
            tag: output::opt(l.tag.as_deref()),
            message: l.message.clone(),
        }
    }
}

pub async fn handle(args: LogsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let records = config::record_service(global)?;

    match args.command {
        LogsCommand::List => {
            let logs = records.system_logs().await?;
            let out = output::render_list(
                &global.output,
                &logs,
                |l| LogRow::from(l),
                |l| l.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LogsCommand::Add {
            message,
            level,
            tag,
            context,
        } => {
            let mut entry = NewSystemLog::new(message);
            entry.level = level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.into());
            entry.tag = tag;
            if let Some(raw) = context {
                entry.context = util::parse_json_object("context", &raw)?;
            }

            let log = records.add_system_log(&entry).await?;
            let out = output::render_single(
                &global.output,
                &log,
                |l| format!("[{}] {}", l.level, l.message),
                |l| l.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
