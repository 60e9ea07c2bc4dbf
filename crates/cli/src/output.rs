use engine_config::report::summary::RunSummary;
use model::entity::EntityKind;

/// Row counts of one entity on both sides of the sync.
pub struct EntityCounts {
    pub entity: EntityKind,
    pub source: Option<u64>,
    pub target: Option<u64>,
}

pub fn print_summary(summary: &RunSummary) {
    let mode = if summary.dry_run { " (dry run)" } else { "" };
    println!("Sync summary{mode}:");
    println!("-----------------------------");
    println!(
        "{:<22} {:>8} {:>9} {:>8} {:>9} {:>7}",
        "Entity", "Read", "Migrated", "Skipped", "Rejected", "Failed"
    );
    for report in &summary.entities {
        println!(
            "{:<22} {:>8} {:>9} {:>8} {:>9} {:>7}",
            report.entity.table(),
            report.read,
            report.migrated,
            report.skipped(),
            report.rejected,
            report.failed
        );
    }
    let totals = &summary.totals;
    println!(
        "{:<22} {:>8} {:>9} {:>8} {:>9} {:>7}",
        "Total", totals.read, totals.migrated, totals.skipped, totals.rejected, totals.failed
    );
    println!("Finished in {:.2}s", summary.duration_ms as f64 / 1000.0);
}

pub fn print_counts(counts: &[EntityCounts]) {
    let show = |n: Option<u64>| n.map_or_else(|| "n/a".to_string(), |n| n.to_string());
    println!("{:<22} {:>10} {:>10}", "Entity", "Source", "Target");
    for row in counts {
        println!(
            "{:<22} {:>10} {:>10}",
            row.entity.table(),
            show(row.source),
            show(row.target)
        );
    }
}
