//! Production order command handlers.

use std::sync::Arc;

use tabled::Tabled;

use pigmea_core::{Order, OrderFilter, Workspace};

use crate::cli::{GlobalOpts, OrderListArgs, OrdersArgs, OrdersCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Order")]
    number: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Machine")]
    machine: String,
    #[tabled(rename = "Delivery")]
    delivery: String,
}

fn row(order: &Arc<Order>, color: bool) -> OrderRow {
    OrderRow {
        id: order.id.to_string(),
        number: order.order_number.clone(),
        client: order.client_name.clone(),
        stage: output::paint_stage(&order.stage, color),
        priority: output::paint_priority(order.priority, color),
        machine: output::cell(order.machine.as_deref()),
        // Dates arrive as ISO-8601; the day is enough for a listing.
        delivery: output::cell(order.delivery_date.as_deref().map(|d| d.get(..10).unwrap_or(d))),
    }
}

fn filters(args: &OrderListArgs) -> Vec<OrderFilter> {
    let mut filters = Vec::new();
    if let Some(term) = &args.filter {
        filters.push(OrderFilter::Search(term.clone()));
    }
    if let Some(stage) = &args.stage {
        filters.push(OrderFilter::ByStage(stage.clone()));
    }
    if let Some(priority) = args.priority {
        filters.push(OrderFilter::ByPriority(priority));
    }
    if args.in_production {
        filters.push(OrderFilter::InProduction);
    }
    filters
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    workspace: &Workspace,
    args: OrdersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        OrdersCommand::List(list) => {
            let repo = workspace.orders();
            repo.ensure_initialized().await?;

            let filters = filters(&list);
            let color = output::should_color(global.color);
            let mut rows = repo
                .store()
                .filter(|o| filters.iter().all(|f| f.matches(o)));
            // Board order: most urgent first, stable within a priority.
            rows.sort_by_key(|o| o.priority.rank());

            let out = output::render_list(global.output, &rows, |o| row(o, color))?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
