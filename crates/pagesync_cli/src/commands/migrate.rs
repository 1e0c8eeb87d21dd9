use console::style;
use pagesync::db;
use pagesync::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
                return Ok(());
            }
            Migrator::up(&db, None).await?;
            println!("{} Applied {pending} migration(s).", style("✓").green());
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            println!("{} Rolled back the latest migration.", style("✓").green());
        }
        MigrateAction::Status => {
            Migrator::status(&db).await?;
        }
        MigrateAction::Fresh => {
            println!(
                "{} Dropping sync configs and recreating the schema...",
                style("⚠").yellow()
            );
            Migrator::fresh(&db).await?;
            println!("{} Schema recreated.", style("✓").green());
        }
    }

    Ok(())
}
