//! `pigmea watch <kind>`: print store transitions as push events land.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use owo_colors::OwoColorize;
use serde::Serialize;

use pigmea_core::{Entity, EntityId, EntityStream, Repository, Workspace};

use crate::cli::{GlobalOpts, KindArg, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// One record-level difference between two consecutive snapshots.
#[derive(Debug, Serialize)]
#[serde(tag = "change", rename_all = "lowercase")]
enum Change<K: Entity> {
    Added { id: EntityId, record: Arc<K> },
    Updated { id: EntityId, record: Arc<K> },
    Removed { id: EntityId, label: String },
}

impl<K: Entity> Change<K> {
    fn render(&self, color: bool) -> String {
        let (mark, id, label) = match self {
            Self::Added { id, record } => ("+", id, record.label()),
            Self::Updated { id, record } => ("~", id, record.label()),
            Self::Removed { id, label } => ("-", id, label.clone()),
        };
        if !color {
            return format!("{mark} {id}  {label}");
        }
        let mark = match self {
            Self::Added { .. } => mark.green().to_string(),
            Self::Updated { .. } => mark.yellow().to_string(),
            Self::Removed { .. } => mark.red().to_string(),
        };
        format!("{mark} {}  {label}", id.dimmed())
    }
}

/// Compare snapshots by id. Same `Arc` means untouched.
fn diff<K: Entity>(previous: &[Arc<K>], next: &[Arc<K>]) -> Vec<Change<K>> {
    let before: HashMap<&EntityId, &Arc<K>> = previous.iter().map(|r| (r.id(), r)).collect();
    let mut seen = HashSet::with_capacity(next.len());
    let mut changes = Vec::new();

    for record in next {
        seen.insert(record.id());
        match before.get(record.id()) {
            None => changes.push(Change::Added {
                id: record.id().clone(),
                record: Arc::clone(record),
            }),
            Some(old) if !Arc::ptr_eq(old, record) && ***old != **record => {
                changes.push(Change::Updated {
                    id: record.id().clone(),
                    record: Arc::clone(record),
                });
            }
            Some(_) => {}
        }
    }
    for record in previous {
        if !seen.contains(record.id()) {
            changes.push(Change::Removed {
                id: record.id().clone(),
                label: record.label(),
            });
        }
    }
    changes
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    workspace: &Workspace,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    workspace.connect_push().await?;
    let result = match args.kind {
        KindArg::Clients => follow(workspace.clients(), global).await,
        KindArg::Reps => follow(workspace.sales_reps(), global).await,
        KindArg::Orders => follow(workspace.orders(), global).await,
    };
    workspace.shutdown().await;
    result
}

async fn follow<K: Entity>(repo: &Repository<K>, global: &GlobalOpts) -> Result<(), CliError> {
    repo.ensure_initialized().await?;

    let color = output::should_color(global.color);
    let mut stream = repo.store().watch();

    if !global.quiet {
        eprintln!(
            "Watching {} {} records (Ctrl-C to stop)",
            stream.current().len(),
            K::KIND.title().to_lowercase()
        );
    }

    follow_changes(&mut stream, tokio::signal::ctrl_c(), |change| {
        let line = match global.output {
            OutputFormat::Table => change.render(color),
            OutputFormat::Json => output::render_json_line(&change)?,
        };
        output::print_output(&line, global.quiet);
        Ok(())
    })
    .await
}

/// Hand each record-level change to `emit` until `shutdown` resolves or
/// the store goes away. `shutdown` is polled as one future for the whole
/// run, so a signal raised while a batch is being emitted still stops it.
async fn follow_changes<K, S, E>(
    stream: &mut EntityStream<K>,
    shutdown: S,
    mut emit: E,
) -> Result<(), CliError>
where
    K: Entity,
    S: Future + Send,
    E: FnMut(Change<K>) -> Result<(), CliError> + Send,
{
    let mut previous = Arc::clone(stream.current());
    tokio::pin!(shutdown);

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            next = stream.changed() => match next {
                Some(next) => next,
                None => break,
            },
        };

        if let Some(err) = stream.state().error() {
            tracing::warn!(error = %err, "reload failed");
        }

        for change in diff(&previous, &next) {
            emit(change)?;
        }
        previous = next;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Notify;
    use url::Url;

    use super::*;
    use pigmea_core::{CoreConfig, SalesRep};

    fn rep(id: &str, name: &str) -> Arc<SalesRep> {
        Arc::new(
            serde_json::from_value(serde_json::json!({ "id": id, "nombre": name })).unwrap(),
        )
    }

    #[test]
    fn diff_reports_added_updated_and_removed() {
        let kept = rep("1", "Ana");
        let previous = vec![Arc::clone(&kept), rep("2", "Luis"), rep("3", "Marta")];
        let next = vec![rep("4", "Sara"), kept, rep("2", "Luis Gil")];

        let changes = diff(&previous, &next);
        let rendered: Vec<String> = changes.iter().map(|c| c.render(false)).collect();
        assert_eq!(rendered, vec!["+ 4  Sara", "~ 2  Luis Gil", "- 3  Marta"]);
    }

    #[test]
    fn equal_copies_are_not_updates() {
        let previous = vec![rep("1", "Ana")];
        let next = vec![rep("1", "Ana")];
        assert!(diff(&previous, &next).is_empty());
    }

    #[test]
    fn json_lines_are_tagged() {
        let change = Change::<SalesRep>::Removed {
            id: EntityId::new("9"),
            label: "Pepe".into(),
        };
        let line = output::render_json_line(&change).unwrap();
        assert_eq!(line, r#"{"change":"removed","id":"9","label":"Pepe"}"#);
    }

    #[tokio::test]
    async fn shutdown_raised_while_emitting_stops_the_loop() {
        let config = CoreConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
        let workspace = Workspace::new(config).unwrap();
        let store = workspace.sales_reps().store();
        let mut stream = store.watch();

        store.apply_create(Arc::unwrap_or_clone(rep("1", "Ana")));
        store.apply_create(Arc::unwrap_or_clone(rep("2", "Luis")));

        let stop = Notify::new();
        let mut seen = Vec::new();
        let run = follow_changes(&mut stream, stop.notified(), |change| {
            seen.push(change.render(false));
            // Only futures that already exist hear this.
            stop.notify_waiters();
            Ok(())
        });

        let finished = tokio::time::timeout(Duration::from_secs(1), run).await;
        assert!(finished.is_ok(), "loop kept waiting after shutdown");
        finished.unwrap().unwrap();
        assert_eq!(seen, vec!["+ 2  Luis", "+ 1  Ana"]);
    }
}
