//! Client command handlers.

use std::sync::Arc;

use tabled::Tabled;

use pigmea_core::{Client, ClientFilter, Workspace};

use crate::cli::{ClientListArgs, ClientsArgs, ClientsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CIF")]
    tax_id: String,
    #[tabled(rename = "Town")]
    town: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Arc<Client>> for ClientRow {
    fn from(c: &Arc<Client>) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name.clone(),
            tax_id: output::cell(c.tax_id.as_deref()),
            town: output::cell(c.town.as_deref()),
            phone: output::cell(c.phone.as_deref()),
            status: c.status.to_string(),
        }
    }
}

fn filters(args: &ClientListArgs) -> Vec<ClientFilter> {
    let mut filters = Vec::new();
    if let Some(term) = &args.filter {
        filters.push(ClientFilter::Search(term.clone()));
    }
    if let Some(status) = args.status {
        filters.push(ClientFilter::ByStatus(status));
    } else if !args.all {
        filters.push(ClientFilter::Current);
    }
    filters
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    workspace: &Workspace,
    args: ClientsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ClientsCommand::List(list) => {
            let repo = workspace.clients();
            repo.ensure_initialized().await?;

            let filters = filters(&list);
            let rows = repo
                .store()
                .filter(|c| filters.iter().all(|f| f.matches(c)));
            let out = output::render_list(global.output, &rows, |c| ClientRow::from(c))?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
