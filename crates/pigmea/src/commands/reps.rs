//! Sales rep command handlers.

use std::sync::Arc;

use tabled::Tabled;

use pigmea_core::{SalesRep, SalesRepFilter, Workspace};

use crate::cli::{GlobalOpts, RepListArgs, RepsArgs, RepsCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct RepRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Active")]
    active: String,
}

fn row(rep: &Arc<SalesRep>, color: bool) -> RepRow {
    RepRow {
        id: rep.id.to_string(),
        name: rep.name.clone(),
        email: output::cell(rep.email.as_deref()),
        phone: output::cell(rep.phone.as_deref()),
        active: output::paint_flag(rep.active, color),
    }
}

fn filters(args: &RepListArgs) -> Vec<SalesRepFilter> {
    let mut filters = Vec::new();
    if let Some(term) = &args.filter {
        filters.push(SalesRepFilter::Search(term.clone()));
    }
    if args.active {
        filters.push(SalesRepFilter::Active);
    }
    if args.inactive {
        filters.push(SalesRepFilter::Inactive);
    }
    filters
}

pub async fn handle(
    workspace: &Workspace,
    args: RepsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        RepsCommand::List(list) => {
            let repo = workspace.sales_reps();
            repo.ensure_initialized().await?;

            let filters = filters(&list);
            let color = output::should_color(global.color);
            let rows = repo
                .store()
                .filter(|r| filters.iter().all(|f| f.matches(r)));
            let out = output::render_list(global.output, &rows, |r| row(r, color))?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
