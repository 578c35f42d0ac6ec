use clap::Parser;
use parallelization_issues::config::setup_logging;
use sea_orm_migration::MigratorTrait;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = parallelization_issues::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let db = match parallelization_issues::db::connect_db(&cli.database_path).await {
        Ok(db) => db,
        Err(err) => {
            error!("Database connection error: {}", err);
            return;
        }
    };

    if let Err(err) = parallelization_issues::db::migrations::Migrator::up(&db, None).await {
        error!("Database migration error: {}", err);
        return;
    }

    if let Err(err) =
        parallelization_issues::web::setup_server(&cli.listen_address, cli.port, db).await
    {
        error!("Application error: {}", err);
    }
}
